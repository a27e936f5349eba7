mod catalog;
mod error;
mod modcount;
mod nav;
mod readstate;
mod scan;
mod server;
mod uripath;
mod walker;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use catalog::Catalog;
use server::ServerState;
use watcher::LibraryWatcher;

struct Config {
    library: PathBuf,
    db_path: PathBuf,
    bind_addr: String,
}

impl Config {
    fn from_env() -> Option<Config> {
        let library = match std::env::var_os("PICSHELF_LIBRARY") {
            Some(dir) => PathBuf::from(dir),
            None => {
                log::error!("PICSHELF_LIBRARY is not set; point it at your picture library");
                return None;
            }
        };
        let db_path = std::env::var_os("PICSHELF_DB")
            .map(PathBuf::from)
            .or_else(|| dirs_next::config_dir().map(|d| d.join("picshelf").join("shelf.db")))?;
        let bind_addr =
            std::env::var("PICSHELF_BIND").unwrap_or_else(|_| "0.0.0.0:3030".to_string());
        Some(Config {
            library,
            db_path,
            bind_addr,
        })
    }
}

fn main() {
    env_logger::init();

    let Some(config) = Config::from_env() else {
        std::process::exit(1);
    };

    let cat = match Catalog::open(&config.db_path) {
        Ok(cat) => cat,
        Err(e) => {
            log::error!("Failed to open catalog {}: {e}", config.db_path.display());
            std::process::exit(1);
        }
    };

    log::info!("Indexing {}", config.library.display());
    if let Err(e) = scan::scan(&cat, &config.library) {
        log::error!("Initial scan failed: {e}");
        std::process::exit(1);
    }

    let state = Arc::new(ServerState::new(cat));

    let rescan_state = Arc::clone(&state);
    let rescan_root = config.library.clone();
    let rescan_thread = std::thread::Builder::new()
        .name("picshelf-rescan".into())
        .spawn(move || rescan_loop(rescan_state, rescan_root))
        .expect("spawn rescan thread");

    let Some((handle, url)) = server::start_server(&config.bind_addr, Arc::clone(&state)) else {
        std::process::exit(1);
    };
    log::info!("Serving library at {url}");

    let ctrlc_state = Arc::clone(&state);
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Shutting down");
        ctrlc_state.shutdown.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Could not install Ctrl-C handler: {e}");
    }

    handle.join();
    let _ = rescan_thread.join();
}

/// Watch the library and rescan when something changes. Events are
/// drained with a short settle window so one copy burst becomes one scan.
fn rescan_loop(state: Arc<ServerState>, library: PathBuf) {
    let watcher = match LibraryWatcher::new(&library) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("Library watcher unavailable, rescan on restart only: {e}");
            return;
        }
    };

    loop {
        if state.shutdown.load(Ordering::Relaxed) {
            break;
        }
        match watcher.events.recv_timeout(Duration::from_secs(1)) {
            Ok(_) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
        // Let the burst settle, then drop whatever queued up meanwhile.
        std::thread::sleep(Duration::from_secs(2));
        while watcher.events.try_recv().is_ok() {}

        log::info!("Library changed, rescanning");
        let result = {
            let catalog = state.catalog.lock().unwrap();
            scan::scan(&catalog, &library)
        };
        match result {
            Ok(()) => {
                state.mod_count.increment();
            }
            Err(e) => log::warn!("Rescan failed: {e}"),
        }
    }
}
