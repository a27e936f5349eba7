use std::path::Path;
use std::sync::mpsc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches the library root recursively; the rescan thread drains
/// `events` and reacts by reindexing.
pub struct LibraryWatcher {
    _watcher: RecommendedWatcher,
    pub events: mpsc::Receiver<notify::Result<Event>>,
}

impl LibraryWatcher {
    pub fn new(path: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(LibraryWatcher {
            _watcher: watcher,
            events: rx,
        })
    }
}
