//! Error types for the render service

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for render-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the render pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// The request payload failed validation; client-fixable
    #[error("invalid render request: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Failed to launch the browser or open a tab
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Failed to load the page content
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The browser failed to produce the artifact
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The render exceeded the allotted time
    #[error("Rendering timed out after {0}s")]
    Timeout(u64),

    /// The scratch path is already occupied
    #[error("scratch file already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    /// The renderer reported success but wrote nothing
    #[error("renderer produced no file at {}", .0.display())]
    ArtifactNotProduced(PathBuf),

    /// Filesystem error while handling the scratch artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is the caller's to fix (HTTP 400) rather than a
    /// renderer or environment malfunction (HTTP 500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Render(err.to_string())
    }
}
