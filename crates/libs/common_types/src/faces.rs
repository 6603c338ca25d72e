use serde::{Deserialize, Serialize};

/// Face bounding box in normalized image coordinates (0..=1).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Raw output of the face detection capability for one face.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaceRegion {
    pub bounding_box: BoundingBox,
    /// JPEG bytes of the face crop, owned by this detection result.
    #[serde(skip)]
    pub crop: Vec<u8>,
    pub embedding: Vec<f32>,
}

/// One detected face with its match state, transient per scan.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectedFace {
    pub region: FaceRegion,
    pub matched_name: Option<String>,
    pub match_distance: Option<f32>,
    pub is_ambiguous: bool,
    /// Up to three candidate names, best first, when the match is ambiguous.
    pub ambiguous_candidates: Vec<String>,
}

impl DetectedFace {
    #[must_use]
    pub fn unmatched(region: FaceRegion) -> Self {
        Self {
            region,
            matched_name: None,
            match_distance: None,
            is_ambiguous: false,
            ambiguous_candidates: Vec::new(),
        }
    }
}
