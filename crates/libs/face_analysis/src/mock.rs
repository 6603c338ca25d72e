use crate::{DetectorError, FaceDetector};
use async_trait::async_trait;
use common_types::FaceRegion;
use std::collections::HashMap;

/// In-memory detector for tests: scripted faces per exact image bytes,
/// unknown images yield zero faces.
#[derive(Default)]
pub struct MockDetector {
    faces_by_image: HashMap<Vec<u8>, Vec<FaceRegion>>,
    failing_images: Vec<Vec<u8>>,
}

impl MockDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_faces(mut self, image: impl Into<Vec<u8>>, faces: Vec<FaceRegion>) -> Self {
        self.faces_by_image.insert(image.into(), faces);
        self
    }

    /// Any detect call with these exact bytes fails.
    #[must_use]
    pub fn failing_on(mut self, image: impl Into<Vec<u8>>) -> Self {
        self.failing_images.push(image.into());
        self
    }
}

#[async_trait]
impl FaceDetector for MockDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceRegion>, DetectorError> {
        if self.failing_images.iter().any(|img| img == image) {
            return Err(DetectorError::Payload("scripted failure".to_string()));
        }
        Ok(self.faces_by_image.get(image).cloned().unwrap_or_default())
    }
}
