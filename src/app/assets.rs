//! Static files for the browser UI.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::{Method, Response, StatusCode};

/// Map a request path onto a file under `root`.
///
/// Returns `None` for anything that could step outside `root`.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let relative = if relative.is_empty() || relative.ends_with('/') {
        format!("{relative}index.html")
    } else {
        relative.to_owned()
    };

    let relative = Path::new(&relative);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// `Content-Type` for a file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve `request_path` from `root`.
pub async fn serve(root: &Path, method: &Method, request_path: &str) -> Response {
    if *method != Method::Get {
        return Response::text(StatusCode::MethodNotAllowed, "method not allowed").header("Allow", "GET");
    }
    let Some(file) = resolve(root, request_path) else {
        debug!(path = request_path, "rejected static path");
        return Response::text(StatusCode::NotFound, "not found");
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => Response::new(StatusCode::Ok)
            .header("Content-Type", content_type(&file))
            .body_bytes(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Response::text(StatusCode::NotFound, "not found")
        }
        // Reading a directory fails with a platform-specific kind.
        Err(e) if file.is_dir() => {
            debug!(path = %file.display(), error = %e, "directory without trailing slash");
            Response::text(StatusCode::NotFound, "not found")
        }
        Err(e) => {
            warn!(path = %file.display(), error = %e, "failed to read static file");
            Response::text(StatusCode::InternalServerError, "error reading file")
        }
    }
}
