//! Test utilities and common setup.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
};
use revid_serve::{AppState, MemoryFileSystem, ServedRoot, config::resolve_served_root, create_router};
use tower::ServiceExt;

/// Served root used by the in-memory fixtures.
pub const ROOT: &str = "/srv/media";

/// In-memory tree with a `docs/` directory and a 500 byte `readme.txt`,
/// plus a sibling directory that shares the root's name as a prefix.
pub fn sample_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_dir("/srv/media/docs")
        .with_file("/srv/media/docs/guide.md", "# Guide\n")
        .with_file("/srv/media/readme.txt", vec![b'r'; 500])
        .with_file("/srv/media-evil/secret.txt", "top secret")
        .with_file("/etc/passwd", "root:x:0:0")
}

/// Router over an in-memory filesystem.
pub fn memory_app(fs: Arc<MemoryFileSystem>) -> Router {
    let root = ServedRoot::new(ROOT).unwrap();
    create_router(AppState::new(root).with_fs(fs))
}

/// Router over a real directory on disk.
pub fn disk_app(dir: &Path) -> Router {
    let root = resolve_served_root(dir).unwrap();
    create_router(AppState::new(root))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn request(app: Router, method: Method, uri: &str) -> TestResponse {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn get(app: Router, uri: &str) -> TestResponse {
    request(app, Method::GET, uri).await
}
