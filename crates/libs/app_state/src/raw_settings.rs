use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    #[serde(default)]
    pub matching: MatchSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub naming: NamingSettings,
    pub services: ServiceSettings,
}

/// Tunables for the face match engine. The threshold and both ambiguity
/// margins are configuration on purpose: no single value is obviously right.
#[derive(Debug, Deserialize, Clone)]
pub struct MatchSettings {
    /// Maximum embedding distance for a person to count as a match at all.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// A runner-up within `best * relative_margin` makes the match ambiguous.
    #[serde(default = "default_margin")]
    pub ambiguity_relative_margin: f32,
    /// Absolute floor for the ambiguity gap.
    #[serde(default = "default_margin")]
    pub ambiguity_absolute_margin: f32,
    /// Samples dated further than this from the probe photo are skipped.
    #[serde(default = "default_age_window_years")]
    pub age_window_years: i64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            ambiguity_relative_margin: default_margin(),
            ambiguity_absolute_margin: default_margin(),
            age_window_years: default_age_window_years(),
        }
    }
}

/// Batch sizing, per-stage concurrency ceilings, and retry budget.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_concurrency")]
    pub scan_concurrency: usize,
    #[serde(default = "default_concurrency")]
    pub title_concurrency: usize,
    #[serde(default = "default_concurrency")]
    pub apply_concurrency: usize,
    /// Attempts per AI title request before the error marker is stored.
    #[serde(default = "default_title_attempts")]
    pub title_attempts: u32,
    /// Longest edge requested for display-resolution downloads.
    #[serde(default = "default_display_max_dimension")]
    pub display_max_dimension: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            scan_concurrency: default_concurrency(),
            title_concurrency: default_concurrency(),
            apply_concurrency: default_concurrency(),
            title_attempts: default_title_attempts(),
            display_max_dimension: default_display_max_dimension(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NamingSettings {
    /// Token template rendered into the final photo name.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

/// Endpoints for the external face detection and title generation services,
/// and the face store location.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    pub detector_url: String,
    pub vision_url: String,
    #[serde(default)]
    pub vision_model: String,
    pub face_store_file: PathBuf,
}

fn default_threshold() -> f32 {
    1.0
}

fn default_margin() -> f32 {
    0.1
}

fn default_age_window_years() -> i64 {
    10
}

fn default_page_size() -> usize {
    50
}

fn default_concurrency() -> usize {
    10
}

fn default_title_attempts() -> u32 {
    5
}

fn default_display_max_dimension() -> u32 {
    1280
}

fn default_template() -> String {
    "{date} - {title}".to_string()
}
