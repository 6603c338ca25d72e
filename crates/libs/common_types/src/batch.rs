use crate::{DetectedFace, MediaEntry};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Pipeline phases, in the order a page moves through them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Scanning,
    FaceReview,
    Generating,
    Review,
    Applying,
    Done,
}

/// One photo's working state while its page moves through the pipeline.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub entry: MediaEntry,
    /// Display-resolution bytes, absent when the download degraded.
    pub display_bytes: Option<Vec<u8>>,
    pub faces: Vec<DetectedFace>,
    /// Distinct matched names in face order, derived from `faces`.
    pub identified_names: Vec<String>,
    /// Empty until the Generating phase resolves for this item.
    pub suggested_name: String,
    pub selected: bool,
    /// Date the photo was taken, from metadata or fallbacks.
    pub photo_date: Option<NaiveDateTime>,
    /// Decimal "lat, lon" from embedded GPS metadata.
    pub location: Option<String>,
}

impl BatchItem {
    #[must_use]
    pub fn new(entry: MediaEntry) -> Self {
        Self {
            entry,
            display_bytes: None,
            faces: Vec::new(),
            identified_names: Vec::new(),
            suggested_name: String::new(),
            selected: true,
            photo_date: None,
            location: None,
        }
    }

    /// Recomputes `identified_names` from the current face match state.
    pub fn refresh_identified_names(&mut self) {
        let mut names: Vec<String> = Vec::new();
        for face in &self.faces {
            if let Some(name) = &face.matched_name
                && !names.iter().any(|n| n == name)
            {
                names.push(name.clone());
            }
        }
        self.identified_names = names;
    }
}

/// One reference image per identified person, rebuilt after each face review.
#[derive(Debug, Clone)]
pub struct PersonReference {
    pub person_name: String,
    pub image: Vec<u8>,
    pub source_item_id: String,
}

/// Aggregate progress snapshot for progressive rendering by a UI or CLI.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub phase: Phase,
    /// Items finished in the currently running phase.
    pub completed: usize,
    /// Items in the current page.
    pub total: usize,
    /// Zero-based page index.
    pub page: usize,
    pub total_pages: usize,
    pub renamed_total: usize,
}

impl BatchProgress {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            completed: 0,
            total: 0,
            page: 0,
            total_pages: 0,
            renamed_total: 0,
        }
    }
}

/// Per-page outcome of the apply stage.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub renamed: usize,
    pub failed: usize,
}

/// Terminal summary of one pipeline run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub renamed_total: usize,
    pub pages_processed: usize,
}
