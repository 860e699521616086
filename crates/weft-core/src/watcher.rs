//! Polling file watcher for the configuration tree.
//!
//! Observes a directory recursively on a dedicated thread, diffing
//! (mtime, len) snapshots once per poll interval and delivering
//! create/modify/delete events for files matching a set of extensions.
//! `.git` and `target` directories are pruned. The watcher performs no
//! deduplication or debouncing; consumers are expected to be idempotent.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

const PRUNED_DIRS: &[&str] = &[".git", "target"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
}

/// A single observed change. Delivered on the watcher's poll thread;
/// callbacks must be thread-safe.
#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Recursive polling watcher. `start` spawns the poll thread; `stop` is an
/// idempotent teardown and also runs on drop.
pub struct FileWatcher {
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl FileWatcher {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    pub fn with_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Begin observing `root`. A missing root is logged and leaves the
    /// watcher inert; it does not retry.
    pub fn start<F>(&self, root: &Path, extensions: &[&str], callback: F)
    where
        F: Fn(FileEvent) + Send + Sync + 'static,
    {
        let mut slot = self.handle.lock().unwrap();
        if slot.is_some() {
            tracing::warn!("[FileWatcher] already started, ignoring second start()");
            return;
        }

        if !root.is_dir() {
            tracing::warn!(
                "[FileWatcher] directory does not exist, skipping watcher: {}",
                root.display()
            );
            return;
        }

        self.shutdown.store(false, Ordering::Relaxed);
        let shutdown = Arc::clone(&self.shutdown);
        let root = root.to_path_buf();
        let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
        let interval = self.poll_interval;

        tracing::info!(
            "[FileWatcher] watching {} for extensions {:?}",
            root.display(),
            extensions
        );

        let spawned = thread::Builder::new()
            .name("weft-file-watcher".to_string())
            .spawn(move || {
                let mut previous = HashMap::new();
                scan(&root, &extensions, &mut previous);

                while !shutdown.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }

                    let mut current = HashMap::new();
                    scan(&root, &extensions, &mut current);

                    for (path, stamp) in &current {
                        match previous.get(path) {
                            None => callback(FileEvent {
                                path: path.clone(),
                                kind: FileEventKind::Created,
                            }),
                            Some(prev) if prev != stamp => callback(FileEvent {
                                path: path.clone(),
                                kind: FileEventKind::Modified,
                            }),
                            Some(_) => {}
                        }
                    }
                    for path in previous.keys() {
                        if !current.contains_key(path) {
                            callback(FileEvent {
                                path: path.clone(),
                                kind: FileEventKind::Deleted,
                            });
                        }
                    }

                    previous = current;
                }
            });

        match spawned {
            Ok(handle) => *slot = Some(handle),
            Err(e) => tracing::error!("[FileWatcher] failed to spawn poll thread: {}", e),
        }
    }

    /// Idempotent teardown; joins the poll thread.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Default for FileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Snapshot all matching files under `dir`. Scan errors are logged and the
/// subtree is skipped; the poll loop keeps running.
fn scan(dir: &Path, extensions: &[String], out: &mut HashMap<PathBuf, FileStamp>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("[FileWatcher] failed to read {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if PRUNED_DIRS.contains(&name) {
                continue;
            }
            scan(&path, extensions, out);
        } else if matches_extension(&path, extensions) {
            if let Ok(meta) = entry.metadata() {
                out.insert(
                    path,
                    FileStamp {
                        modified: meta.modified().ok(),
                        len: meta.len(),
                    },
                );
            }
        }
    }
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collect_events(rx: &mpsc::Receiver<FileEvent>, window: Duration) -> Vec<FileEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(window) {
            events.push(event);
        }
        events
    }

    #[test]
    fn delivers_create_modify_delete() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("agents/sub");
        fs::create_dir_all(&nested).unwrap();

        let watcher = FileWatcher::with_interval(Duration::from_millis(50));
        let (tx, rx) = mpsc::channel();
        watcher.start(dir.path(), &[".yaml"], move |event| {
            let _ = tx.send(event);
        });
        // Let the baseline snapshot land before mutating the tree.
        thread::sleep(Duration::from_millis(150));

        let target = nested.join("agent.yaml");
        fs::write(&target, "id: a\n").unwrap();
        let events = collect_events(&rx, Duration::from_millis(500));
        assert!(events
            .iter()
            .any(|e| e.kind == FileEventKind::Created && e.path == target));

        fs::write(&target, "id: a\nname: changed\n").unwrap();
        let events = collect_events(&rx, Duration::from_millis(500));
        assert!(events
            .iter()
            .any(|e| e.kind == FileEventKind::Modified && e.path == target));

        fs::remove_file(&target).unwrap();
        let events = collect_events(&rx, Duration::from_millis(500));
        assert!(events
            .iter()
            .any(|e| e.kind == FileEventKind::Deleted && e.path == target));

        watcher.stop();
        watcher.stop(); // idempotent
    }

    #[test]
    fn filters_extensions_and_pruned_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();

        let watcher = FileWatcher::with_interval(Duration::from_millis(50));
        let (tx, rx) = mpsc::channel();
        watcher.start(dir.path(), &[".yaml"], move |event| {
            let _ = tx.send(event);
        });

        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join(".git").join("conf.yaml"), "ignored").unwrap();
        fs::write(dir.path().join("target").join("out.yaml"), "ignored").unwrap();

        let events = collect_events(&rx, Duration::from_millis(400));
        assert!(events.is_empty(), "unexpected events: {:?}", events);
        watcher.stop();
    }

    #[test]
    fn missing_root_leaves_watcher_inert() {
        let watcher = FileWatcher::new();
        watcher.start(Path::new("/nonexistent/weft-watch-root"), &[".yaml"], |_| {
            panic!("no events expected");
        });
        watcher.stop();
    }
}
