//! Access log middleware for HTTP requests.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use http_body::{Body as HttpBody, Frame, SizeHint};
use tracing::info;

/// One line of the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogRecord {
    pub method: Method,
    pub path: String,
    /// Peer address; absent when the server runs without connect info.
    pub remote: Option<SocketAddr>,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl AccessLogRecord {
    pub fn emit(&self) {
        let remote = self
            .remote
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());

        info!(
            method = %self.method,
            path = %self.path,
            remote = %remote,
            status = self.status.as_u16(),
            duration_ms = self.elapsed.as_millis() as u64,
            "Req"
        );
    }
}

/// Everything known about a request once its response head exists.
struct PendingRecord {
    method: Method,
    path: String,
    remote: Option<SocketAddr>,
    status: StatusCode,
    start: Instant,
}

impl PendingRecord {
    fn finish(self) {
        AccessLogRecord {
            method: self.method,
            path: self.path,
            remote: self.remote,
            status: self.status,
            elapsed: self.start.elapsed(),
        }
        .emit();
    }
}

/// Response body that emits its access log record exactly once: when the
/// last frame has been yielded, when the inner body fails, or when it is
/// dropped early (e.g. the client went away).
struct LoggedBody {
    inner: Body,
    pending: Option<PendingRecord>,
}

impl LoggedBody {
    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.finish();
        }
    }
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(poll, Poll::Ready(None | Some(Err(_)))) {
            this.finish();
        }
        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for LoggedBody {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Record method, path, peer, status and duration of every request.
///
/// The status is taken from the response head; the duration runs until the
/// body has been fully sent. The response itself passes through untouched.
pub async fn access_log(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let response = next.run(req).await;
    let pending = PendingRecord {
        method,
        path,
        remote,
        status: response.status(),
        start,
    };

    let (parts, body) = response.into_parts();
    Response::from_parts(
        parts,
        Body::new(LoggedBody {
            inner: body,
            pending: Some(pending),
        }),
    )
}
