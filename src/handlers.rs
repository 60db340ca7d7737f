use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;
use crate::error::ServeError;
use crate::fs::{EntryMetadata, OpenEntry};
use crate::listing::DirectoryListing;
use crate::render;
use crate::resolver::ResolvedPath;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// GET /{*path} - Stream a file or render a directory listing
pub async fn serve_path(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ServeError> {
    let request_path = decode_request_path(uri.path())?;
    let resolved = state.root.resolve(&request_path)?;

    let mut entry = state
        .fs
        .open(resolved.as_path())
        .await
        .map_err(|err| ServeError::from_open(err, resolved.request_path()))?;

    let metadata = entry.stat().await?;

    if !metadata.is_dir {
        return Ok(file_response(&resolved, metadata, entry));
    }

    let children = entry.read_dir().await?;
    drop(entry);

    debug!(
        "Listing {} entries for {}",
        children.len(),
        resolved.request_path()
    );

    let listing = DirectoryListing::build(resolved.request_path(), children);
    let html = render::render_listing(&listing)?;

    Ok(([(header::CONTENT_TYPE, HTML_CONTENT_TYPE)], html).into_response())
}

/// Percent-decode the raw URI path so encoded separators and dot segments
/// go through normal resolution.
fn decode_request_path(raw: &str) -> Result<String, ServeError> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ServeError::InvalidPath(raw.to_string()))
}

fn file_response(
    resolved: &ResolvedPath,
    metadata: EntryMetadata,
    entry: Box<dyn OpenEntry>,
) -> Response {
    debug!("Streaming file: {}", resolved.as_path().display());

    let mime = mime_guess::from_path(resolved.as_path())
        .first_or_octet_stream()
        .to_string();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_LENGTH, metadata.len.to_string()),
        ],
        Body::from_stream(entry.into_stream()),
    )
        .into_response()
}
