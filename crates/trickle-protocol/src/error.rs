//! Protocol decode errors

use crate::paths::Path;

/// Errors produced while decoding one received frame
///
/// Decode errors are always local to the frame that produced them; the
/// connection itself stays healthy.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame has no path field")]
    MissingPath,

    #[error("Unknown path: {0}")]
    UnknownPath(String),

    #[error("Client path received from server: {0}")]
    UnexpectedPath(Path),

    #[error("Malformed {path} payload: {source}")]
    Payload {
        path: Path,
        source: serde_json::Error,
    },
}
