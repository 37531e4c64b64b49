//! Error types shared by every stage of the capture-to-model pipeline
//!
//! The `Display` text of each variant doubles as the status message shown to
//! the user when a stage fails, so keep them short and human-readable.

use thiserror::Error;

use crate::pipeline::Stage;

/// Result type for snapforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, generating or displaying an asset
#[derive(Error, Debug)]
pub enum Error {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera device found: {0}")]
    DeviceNotFound(String),

    #[error("Insecure context: {0}")]
    InsecureContext(String),

    #[error("No active camera session, start the camera first")]
    NoActiveDevice,

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Remote service returned HTTP {status}: {message}")]
    RemoteError { status: u16, message: String },

    #[error("Enhancement response did not contain an image")]
    NoImageReturned,

    #[error("Rendering toolkit unavailable: {0}")]
    LibraryUnavailable(String),

    #[error("Asset has no displayable scene")]
    AssetHasNoScene,

    #[error("Failed to decode asset: {0}")]
    AssetDecodeError(String),

    #[error("{0} is already running")]
    StageBusy(Stage),

    #[error("{0} result discarded, a newer capture superseded it")]
    Superseded(Stage),

    #[error("Render surface error: {0}")]
    Surface(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure came from the remote side or the network and a
    /// user-initiated retry of the same stage may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RemoteError { .. } | Error::Transport(_) | Error::NoImageReturned
        )
    }
}
