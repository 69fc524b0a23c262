//! # Deskew Error Types
//!
//! This module defines the error taxonomy shared by the pipeline and the
//! execution host. Errors are split into two recovery classes: fatal errors
//! terminate the host instance (a fresh host is required), while per-request
//! errors leave the host usable and the caller free to retry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced by the deskew pipeline and its execution host.
///
/// Serializable so worker responses can carry the error as a structured
/// field across the isolation boundary instead of a bare string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeskewError {
    /// The vision runtime did not become ready within the configured ceiling.
    /// Fatal for the host instance.
    InitTimeout { timeout_secs: u64 },
    /// The vision runtime failed to load or its warm-up self-check failed.
    /// Fatal for the host instance.
    InitLoadFailure(String),
    /// The inbound pixel buffer does not match the declared dimensions or
    /// channel layout. Recoverable; reported per request.
    InvalidImageData(String),
    /// An image with an unsupported channel count reached a primitive that
    /// only handles 1-, 3-, or 4-channel layouts. Recoverable.
    UnsupportedFormat { channels: u8 },
    /// A deskew request arrived before initialization completed successfully.
    /// Recoverable; retry after init.
    NotReady,
    /// An internal primitive failure (e.g. a degenerate transform matrix).
    /// Recoverable; reported per request.
    Processing(String),
    /// The worker thread is gone and can no longer service requests. Fatal.
    HostUnavailable,
}

impl fmt::Display for DeskewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeskewError::InitTimeout { timeout_secs } => {
                write!(f, "vision runtime init timed out after {}s", timeout_secs)
            }
            DeskewError::InitLoadFailure(msg) => {
                write!(f, "vision runtime failed to initialize: {}", msg)
            }
            DeskewError::InvalidImageData(msg) => {
                write!(f, "invalid image data: {}", msg)
            }
            DeskewError::UnsupportedFormat { channels } => {
                write!(
                    f,
                    "unsupported image format: {} channels (expected 1, 3 or 4)",
                    channels
                )
            }
            DeskewError::NotReady => {
                write!(f, "vision runtime not ready")
            }
            DeskewError::Processing(msg) => {
                write!(f, "image processing failed: {}", msg)
            }
            DeskewError::HostUnavailable => {
                write!(f, "deskew worker is no longer running")
            }
        }
    }
}

impl std::error::Error for DeskewError {}

impl DeskewError {
    /// Whether this error terminates the host instance.
    ///
    /// Fatal errors require spawning a fresh host; non-fatal errors are
    /// per-request and the same host can service the next request. The
    /// worker response exposes this as a dedicated field so callers never
    /// have to parse error strings to pick a recovery strategy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeskewError::InitTimeout { .. }
                | DeskewError::InitLoadFailure(_)
                | DeskewError::HostUnavailable
        )
    }
}

/// Result type alias for convenience
pub type DeskewResult<T> = Result<T, DeskewError>;
