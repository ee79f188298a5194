//! Static asset resolution.
//!
//! Runs ahead of sessions and routing. Each mount maps a URL prefix onto a
//! directory; the first mount holding an existing file answers the request.
//! A miss on every mount falls through to the rest of the stack, so "not
//! found" is only ever rendered by the router fallback.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

#[derive(Debug, Clone)]
pub struct Mount {
    prefix: String,
    dir: PathBuf,
}

impl Mount {
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The request path relative to this mount, if it falls under it.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix == "/" {
            return Some(path);
        }
        match path.strip_prefix(self.prefix.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }
}

/// Ordered set of `(prefix → directory)` mounts.
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    mounts: Vec<Mount>,
}

impl StaticAssets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mount. Earlier mounts win when prefixes overlap.
    #[must_use]
    pub fn mount(mut self, prefix: &str, dir: impl Into<PathBuf>) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        let prefix = if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() };
        self.mounts.push(Mount { prefix, dir: dir.into() });
        self
    }

    #[must_use]
    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }
}

/// Middleware: serve a file from the first matching mount, else fall through.
pub async fn serve_static(State(assets): State<StaticAssets>, request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    for mount in assets.mounts() {
        let Some(rest) = mount.strip(request.uri().path()) else {
            continue;
        };
        let Ok(uri) = rest.parse::<Uri>() else {
            continue;
        };

        let mut lookup = Request::new(Body::empty());
        *lookup.method_mut() = request.method().clone();
        *lookup.uri_mut() = uri;
        *lookup.headers_mut() = request.headers().clone();

        let service = ServeDir::new(mount.dir()).append_index_html_on_directories(false);
        let response = match service.oneshot(lookup).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        if response.status() != StatusCode::NOT_FOUND {
            return response.into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
