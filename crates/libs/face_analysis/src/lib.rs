//! Face detection capability: image bytes in, face regions with embeddings
//! out. Detection itself is an external service; this crate holds the trait
//! the pipeline consumes, the HTTP client for a remote detector, and a
//! scriptable mock for tests.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

#[cfg(feature = "mock")]
mod mock;
mod remote;

#[cfg(feature = "mock")]
pub use mock::MockDetector;
pub use remote::RemoteDetector;

use async_trait::async_trait;
use common_types::FaceRegion;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
    #[error("Invalid face payload: {0}")]
    Payload(String),
}

/// External face detection capability. Zero detected faces is a valid,
/// non-error outcome; callers degrade errors to "no faces" per item.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceRegion>, DetectorError>;
}
