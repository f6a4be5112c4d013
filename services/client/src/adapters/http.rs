//! services/client/src/adapters/http.rs
//!
//! Shared plumbing for the HTTP adapters: endpoint resolution and the mapping of
//! `reqwest` failures and non-2xx responses onto `PortError`.

use docustream_core::{PortError, PortResult};
use reqwest::{Response, StatusCode, Url};

/// Resolves a path relative to the configured API base url.
pub fn endpoint(base_url: &Url, path: &str) -> PortResult<Url> {
    base_url
        .join(path.trim_start_matches('/'))
        .map_err(|e| PortError::Unexpected(format!("Invalid endpoint '{}': {}", path, e)))
}

/// Maps a `reqwest` error, which is foreign to the core crate, onto a port error.
pub fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Transport(format!("request timed out: {}", e))
    } else {
        PortError::Transport(e.to_string())
    }
}

/// Passes 2xx responses through and turns everything else into a port error.
pub async fn ensure_success(response: Response, what: &str) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(PortError::NotFound(what.to_string()));
    }
    Err(PortError::Rejected {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            body
        },
    })
}
