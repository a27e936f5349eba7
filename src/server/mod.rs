pub mod http;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::catalog::Catalog;
use crate::modcount::ModCount;

/// Shared state for the HTTP workers and the rescan thread. The catalog
/// connection is not thread-safe, so it sits behind a mutex; requests run
/// their statements sequentially while holding it.
pub struct ServerState {
    pub catalog: Mutex<Catalog>,
    pub mod_count: ModCount,
    pub shutdown: AtomicBool,
}

impl ServerState {
    pub fn new(catalog: Catalog) -> Self {
        ServerState {
            catalog: Mutex::new(catalog),
            mod_count: ModCount::new(),
            shutdown: AtomicBool::new(false),
        }
    }
}

pub struct ServerHandle {
    state: Arc<ServerState>,
    http_thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Block until the worker pool exits (after the shutdown flag is set).
    pub fn join(mut self) {
        if let Some(t) = self.http_thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Start the JSON API server on `bind_addr`. Returns the handle and the
/// resolved URL.
pub fn start_server(bind_addr: &str, state: Arc<ServerState>) -> Option<(ServerHandle, String)> {
    let server = match tiny_http::Server::http(bind_addr) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to bind {bind_addr}: {e}");
            return None;
        }
    };
    let url = match server.server_addr().to_ip() {
        Some(addr) => format!("http://{addr}"),
        None => format!("http://{bind_addr}"),
    };

    let http_state = Arc::clone(&state);
    let http_thread = std::thread::Builder::new()
        .name("picshelf-http".into())
        .spawn(move || http::run(server, http_state))
        .ok()?;

    Some((
        ServerHandle {
            state,
            http_thread: Some(http_thread),
        },
        url,
    ))
}
