use app_state::AppSettings;
use face_analysis::FaceDetector;
use face_store::FaceStore;
use photo_host::PhotoHost;
use std::sync::Arc;
use title_model::TitleGenerator;

/// Everything a pipeline run needs: the three external collaborators, the
/// identity store, and settings. Owned and passed explicitly, no globals.
pub struct PipelineContext {
    pub host: Arc<dyn PhotoHost>,
    pub detector: Arc<dyn FaceDetector>,
    pub titler: Arc<dyn TitleGenerator>,
    /// Single-writer: only user labeling actions mutate the store. Scans
    /// read through a snapshot taken at page start.
    pub store: FaceStore,
    pub settings: AppSettings,
}

impl PipelineContext {
    #[must_use]
    pub fn new(
        host: Arc<dyn PhotoHost>,
        detector: Arc<dyn FaceDetector>,
        titler: Arc<dyn TitleGenerator>,
        store: FaceStore,
        settings: AppSettings,
    ) -> Self {
        Self {
            host,
            detector,
            titler,
            store,
            settings,
        }
    }
}
