//! `weft serve` — run the HTTP backend until interrupted.

use weft_server::{start_server, ServerConfig};

pub async fn run(base_path: &str, host: String, port: u16) -> Result<(), String> {
    let addr = start_server(ServerConfig {
        host,
        port,
        base_path: base_path.to_string(),
    })
    .await?;

    println!("Weft server listening on http://{}", addr);
    println!("  POST /api/workflows/submit/{{workflowId}}");
    println!("  GET  /api/workflows/status/{{jobId}}");
    println!("  GET  /api/discovery/agents");
    println!("  GET  /api/discovery/workflows");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
    println!("Shutting down.");
    Ok(())
}
