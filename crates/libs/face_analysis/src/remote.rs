use crate::{DetectorError, FaceDetector};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use common_types::{BoundingBox, FaceRegion};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// One face as reported by the detection service. Coordinates are
/// normalized, the crop is base64-encoded JPEG.
#[derive(Debug, Deserialize)]
struct FacePayload {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    crop: String,
    embedding: Vec<f32>,
}

/// HTTP client for a face detection service exposing `POST {base}/detect`.
pub struct RemoteDetector {
    http_client: Client,
    base_url: String,
}

impl RemoteDetector {
    /// Create detector client.
    ///
    /// # Panics
    /// if it can't create the client.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn convert(payload: FacePayload) -> Result<FaceRegion, DetectorError> {
        let crop = general_purpose::STANDARD
            .decode(&payload.crop)
            .map_err(|e| DetectorError::Payload(format!("crop is not valid base64: {e}")))?;
        if payload.embedding.is_empty() {
            return Err(DetectorError::Payload("empty embedding".to_string()));
        }
        Ok(FaceRegion {
            bounding_box: BoundingBox {
                x: payload.x,
                y: payload.y,
                width: payload.width,
                height: payload.height,
            },
            crop,
            embedding: payload.embedding,
        })
    }
}

#[async_trait]
impl FaceDetector for RemoteDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceRegion>, DetectorError> {
        let url = format!("{}/detect", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("content-type", "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let faces: Vec<FacePayload> = response.json().await?;
                faces.into_iter().map(Self::convert).collect()
            }
            status => {
                let text = response.text().await?;
                Err(DetectorError::UnexpectedStatus { status, text })
            }
        }
    }
}
