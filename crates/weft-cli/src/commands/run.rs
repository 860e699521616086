//! `weft run` — execute one workflow synchronously for local testing.

use std::path::Path;

use weft_core::state::AppStateInner;

pub async fn run(base_path: &str, workflow_id: &str, input: &str) -> Result<(), String> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weft_core=warn".into()),
        )
        .try_init();

    let state = AppStateInner::new(Path::new(base_path));
    let result = state
        .engine
        .run(workflow_id, input)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", result);
    Ok(())
}
