use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while handling a single request.
///
/// Every variant is recovered at the request boundary and turned into a
/// plain-text response; none of them affect other requests.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Path is outside root directory: {0}")]
    PathEscape(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Render(#[from] askama::Error),
}

impl ServeError {
    /// Classify a failed open of `request_path`.
    pub fn from_open(err: std::io::Error, request_path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => {
                ServeError::NotFound(request_path.to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                ServeError::PermissionDenied(request_path.to_string())
            }
            _ => ServeError::Io(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::PathEscape(_) | ServeError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ServeError::NotFound(_) => StatusCode::NOT_FOUND,
            ServeError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ServeError::Io(_) | ServeError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServeError::PathEscape(_) | ServeError::PermissionDenied(_) => "Forbidden",
            ServeError::NotFound(_) => {
                debug!("{}", self);
                "Not found"
            }
            ServeError::InvalidPath(_) => "Bad request",
            ServeError::Io(err) => {
                error!("Failed to read from served directory: {}", err);
                "Internal server error"
            }
            ServeError::Render(err) => {
                error!("Error executing listing template: {}", err);
                "Internal server error"
            }
        };

        (self.status(), body).into_response()
    }
}

/// Fatal errors detected while establishing the server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("served root must be an absolute path: {}", .0.display())]
    RelativeRoot(PathBuf),

    #[error("directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("served path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read config file {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_errors_are_classified() {
        let err = ServeError::from_open(std::io::ErrorKind::NotFound.into(), "/missing.txt");
        assert!(matches!(err, ServeError::NotFound(ref p) if p == "/missing.txt"));

        let err = ServeError::from_open(std::io::ErrorKind::NotADirectory.into(), "/a.txt/b");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ServeError::from_open(std::io::ErrorKind::PermissionDenied.into(), "/secret");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = ServeError::from_open(std::io::ErrorKind::Interrupted.into(), "/x");
        assert!(matches!(err, ServeError::Io(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = ServeError::PathEscape("/../etc/passwd".to_string());
        assert_eq!(err.to_string(), "Path is outside root directory: /../etc/passwd");

        let err = ConfigError::MissingDirectory(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "directory does not exist: /nope");
    }
}
