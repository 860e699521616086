//! Integration test: on-disk edits to agent configs and prompts are picked
//! up by the watcher-fed registry within the reload window.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use weft_core::events::workflow_event_channel;
use weft_core::registry::AgentRegistry;
use weft_core::watcher::FileWatcher;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn wait_for<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[test]
fn agent_reload_visible_within_two_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("agents/greeter/greeter.yaml");
    let prompt = dir.path().join("agents/greeter/prompts/system.md");
    write(
        &yaml,
        "id: greeter\nname: Greeter\nsystemPromptPath: prompts/system.md\nmodel:\n  provider: ollama\n  name: llama3\n",
    );
    write(&prompt, "You greet people politely.");

    let (tx, _rx) = workflow_event_channel();
    let registry = Arc::new(AgentRegistry::new(dir.path(), tx));
    registry.load_all();
    assert_eq!(
        registry.get("greeter").unwrap().system_prompt,
        "You greet people politely."
    );

    let watcher = FileWatcher::with_interval(Duration::from_millis(200));
    Arc::clone(&registry).watch(&watcher);
    // Let the baseline snapshot land before mutating the tree.
    std::thread::sleep(Duration::from_millis(300));

    // Overwriting the prompt must reload the owning YAML.
    write(&prompt, "You greet people in pirate speak.");
    assert!(
        wait_for(
            || registry.get("greeter").map(|a| a.system_prompt.clone())
                == Some("You greet people in pirate speak.".to_string()),
            Duration::from_secs(2),
        ),
        "prompt change not observed within 2s"
    );

    // Overwriting the YAML itself must replace the definition atomically.
    write(
        &yaml,
        "id: greeter\nname: Greeter v2\nsystemPromptPath: prompts/system.md\nmodel:\n  provider: ollama\n  name: llama3\n",
    );
    assert!(
        wait_for(
            || registry.get("greeter").map(|a| a.name.clone()) == Some("Greeter v2".to_string()),
            Duration::from_secs(2),
        ),
        "yaml change not observed within 2s"
    );

    // A brand-new agent directory is discovered without a restart.
    write(
        &dir.path().join("agents/closer/closer.yaml"),
        "id: closer\nmodel:\n  provider: ollama\n  name: llama3\n",
    );
    assert!(
        wait_for(|| registry.get("closer").is_some(), Duration::from_secs(2)),
        "new agent not observed within 2s"
    );

    watcher.stop();
}
