use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use super::ServerState;
use crate::uripath;

type HttpResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn run(server: tiny_http::Server, state: Arc<ServerState>) {
    let server = Arc::new(server);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            std::thread::Builder::new()
                .name(format!("picshelf-http-{i}"))
                .spawn(move || {
                    loop {
                        if state.shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        let request = match server.recv_timeout(Duration::from_secs(1)) {
                            Ok(Some(req)) => req,
                            Ok(None) => continue,
                            Err(_) => break,
                        };

                        let url = request.url().to_string();
                        let method = request.method().to_string();

                        log::debug!("HTTP {} {}", method, url);

                        if let Err(e) = route(request, &method, &url, &state) {
                            log::debug!("HTTP response error: {}", e);
                        }
                    }
                })
                .unwrap()
        })
        .collect();

    for w in workers {
        let _ = w.join();
    }
}

fn route(request: tiny_http::Request, method: &str, url: &str, state: &ServerState) -> HttpResult {
    let (url, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    // Writes may carry the client's last-known change token; a stale one
    // means the client acted on an outdated view and must refetch.
    if method == "POST" {
        if let Some(token) = token_from_query(query) {
            if !state.mod_count.validate(token) {
                return serve_conflict(request, state);
            }
        }
    }

    match (method, url) {
        ("GET", "/api/modcount") => {
            respond_json(request, json!({ "modCount": state.mod_count.get() }))
        }
        ("GET", "/api/bookmarks") => {
            let bookmarks = {
                let catalog = state.catalog.lock().unwrap();
                catalog.bookmarks()
            };
            match bookmarks {
                Ok(bookmarks) => respond_json(request, serde_json::to_value(bookmarks)?),
                Err(e) => serve_500(request, &e),
            }
        }
        ("GET", path) if path.starts_with("/api/listing") => {
            serve_listing(request, state, folder_arg(path, "/api/listing"))
        }
        ("POST", path) if path.starts_with("/api/latest/") => {
            serve_latest(request, state, path_arg(path, "/api/latest"))
        }
        ("POST", path) if path.starts_with("/api/read/") => {
            serve_mark(request, state, folder_arg(path, "/api/read"), true)
        }
        ("POST", path) if path.starts_with("/api/unread/") => {
            serve_mark(request, state, folder_arg(path, "/api/unread"), false)
        }
        ("POST", path) if path.starts_with("/api/bookmarks/add/") => {
            serve_bookmark(request, state, path_arg(path, "/api/bookmarks/add"), true)
        }
        ("POST", path) if path.starts_with("/api/bookmarks/remove/") => {
            serve_bookmark(request, state, path_arg(path, "/api/bookmarks/remove"), false)
        }
        _ => serve_404(request),
    }
}

/// Decode the path argument after `prefix`. `/api/listing/a%20b/` turns
/// into `/a b/`.
fn path_arg(url: &str, prefix: &str) -> String {
    let tail = &url[prefix.len()..];
    if tail.is_empty() {
        "/".to_string()
    } else {
        uripath::decode(tail)
    }
}

fn folder_arg(url: &str, prefix: &str) -> String {
    uripath::normalize_folder(&path_arg(url, prefix))
}

fn token_from_query(query: Option<&str>) -> Option<u64> {
    query?
        .split('&')
        .find_map(|kv| kv.strip_prefix("modCount="))
        .and_then(|v| v.parse().ok())
}

fn serve_listing(request: tiny_http::Request, state: &ServerState, path: String) -> HttpResult {
    let listing = {
        let catalog = state.catalog.lock().unwrap();
        catalog.listing(&path, state.mod_count.get())
    };
    match listing {
        Ok(Some(listing)) => respond_json(request, serde_json::to_value(&listing)?),
        Ok(None) => serve_404(request),
        Err(e) => serve_500(request, &e),
    }
}

fn serve_latest(request: tiny_http::Request, state: &ServerState, path: String) -> HttpResult {
    let folder = {
        let mut catalog = state.catalog.lock().unwrap();
        catalog.set_latest_picture(&path)
    };
    match folder {
        Err(e) => serve_500(request, &e),
        Ok(Some(folder)) => {
            state.mod_count.increment();
            respond_json(
                request,
                json!({ "folder": folder, "modCount": state.mod_count.get() }),
            )
        }
        Ok(None) => serve_404(request),
    }
}

fn serve_mark(
    request: tiny_http::Request,
    state: &ServerState,
    path: String,
    read: bool,
) -> HttpResult {
    let changed = {
        let mut catalog = state.catalog.lock().unwrap();
        if read {
            catalog.mark_folder_read(&path)
        } else {
            catalog.mark_folder_unread(&path)
        }
    };
    let changed = match changed {
        Ok(n) => n,
        Err(e) => return serve_500(request, &e),
    };
    if changed > 0 {
        state.mod_count.increment();
    }
    respond_json(
        request,
        json!({ "changed": changed, "modCount": state.mod_count.get() }),
    )
}

fn serve_bookmark(
    request: tiny_http::Request,
    state: &ServerState,
    path: String,
    add: bool,
) -> HttpResult {
    let changed = {
        let catalog = state.catalog.lock().unwrap();
        if add {
            catalog.add_bookmark(&path)
        } else {
            catalog.remove_bookmark(&path)
        }
    };
    let changed = match changed {
        Ok(c) => c,
        Err(e) => return serve_500(request, &e),
    };
    if changed {
        state.mod_count.increment();
    }
    respond_json(
        request,
        json!({ "changed": changed, "modCount": state.mod_count.get() }),
    )
}

fn respond_json(request: tiny_http::Request, value: serde_json::Value) -> HttpResult {
    let response = tiny_http::Response::from_string(value.to_string()).with_header(
        "Content-Type: application/json; charset=utf-8"
            .parse::<tiny_http::Header>()
            .unwrap(),
    );
    request.respond(response)?;
    Ok(())
}

fn serve_conflict(request: tiny_http::Request, state: &ServerState) -> HttpResult {
    let body = json!({ "modCount": state.mod_count.get() }).to_string();
    let response = tiny_http::Response::from_string(body)
        .with_status_code(409)
        .with_header(
            "Content-Type: application/json; charset=utf-8"
                .parse::<tiny_http::Header>()
                .unwrap(),
        );
    request.respond(response)?;
    Ok(())
}

fn serve_500(request: tiny_http::Request, error: &crate::error::Error) -> HttpResult {
    log::warn!("Request failed: {error}");
    let response = tiny_http::Response::from_string("Internal Server Error").with_status_code(500);
    request.respond(response)?;
    Ok(())
}

fn serve_404(request: tiny_http::Request) -> HttpResult {
    let response = tiny_http::Response::from_string("Not Found").with_status_code(404);
    request.respond(response)?;
    Ok(())
}
