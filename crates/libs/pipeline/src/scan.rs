use crate::metadata;
use app_state::MatchSettings;
use chrono::NaiveDateTime;
use common_types::{DetectedFace, FaceRegion, MediaEntry, VariantKind};
use face_analysis::FaceDetector;
use face_store::{MatchOutcome, StoreSnapshot, match_face};
use photo_host::PhotoHost;
use std::sync::Arc;
use tracing::warn;

/// Display-resolution preference: a dedicated display rendition first, the
/// original as fallback, a thumbnail as last resort.
const DISPLAY_PREFERENCE: &[VariantKind] = &[
    VariantKind::Display,
    VariantKind::FullRes,
    VariantKind::Thumbnail,
];

/// Everything the scan stage learns about one item. Always produced: a
/// download or detection failure degrades to "no data", never an error.
pub(crate) struct ScanData {
    pub display_bytes: Option<Vec<u8>>,
    pub faces: Vec<DetectedFace>,
    pub photo_date: Option<NaiveDateTime>,
    pub location: Option<String>,
}

impl ScanData {
    fn empty() -> Self {
        Self {
            display_bytes: None,
            faces: Vec::new(),
            photo_date: None,
            location: None,
        }
    }
}

/// Scans one item: download display bytes, extract date and GPS metadata,
/// detect and match faces against the page's store snapshot.
pub(crate) async fn scan_item(
    host: Arc<dyn PhotoHost>,
    detector: Arc<dyn FaceDetector>,
    snapshot: StoreSnapshot,
    matching: MatchSettings,
    collection: String,
    entry: MediaEntry,
    display_max_dimension: u32,
) -> ScanData {
    let Some(variant) = entry.best_variant(DISPLAY_PREFERENCE) else {
        warn!("Item {} has no downloadable variant", entry.id);
        return ScanData::empty();
    };

    let bytes = match host
        .download(&variant.reference, Some(display_max_dimension))
        .await
    {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!("Download for {} failed, continuing without data: {error}", entry.id);
            return ScanData::empty();
        }
    };

    let regions = match detector.detect(&bytes).await {
        Ok(regions) => regions,
        Err(error) => {
            warn!("Face detection for {} failed, continuing without faces: {error}", entry.id);
            Vec::new()
        }
    };

    // EXIF parsing and embedding matching are CPU-bound; keep them off the
    // scheduler that drives the network fan-out.
    let item_id = entry.id.clone();
    let analyzed = tokio::task::spawn_blocking(move || {
        let photo_date = metadata::photo_date(&bytes)
            .or_else(|| metadata::year_from_path(&collection))
            .or(entry.created);
        let location = metadata::gps_location(&bytes);
        let target_date = photo_date.map(|dt| dt.date());
        let faces = regions
            .into_iter()
            .map(|region| match_region(region, &snapshot, target_date, &matching))
            .collect();
        (bytes, faces, photo_date, location)
    })
    .await;

    match analyzed {
        Ok((bytes, faces, photo_date, location)) => ScanData {
            display_bytes: Some(bytes),
            faces,
            photo_date,
            location,
        },
        Err(error) => {
            warn!("Scan analysis for {item_id} panicked: {error}");
            ScanData::empty()
        }
    }
}

fn match_region(
    region: FaceRegion,
    snapshot: &StoreSnapshot,
    target_date: Option<chrono::NaiveDate>,
    matching: &MatchSettings,
) -> DetectedFace {
    let mut face = DetectedFace::unmatched(region);
    match match_face(snapshot, &face.region.embedding, target_date, matching) {
        MatchOutcome::NoMatch => {}
        MatchOutcome::Confident { name, distance } => {
            face.matched_name = Some(name);
            face.match_distance = Some(distance);
        }
        MatchOutcome::Ambiguous {
            candidates,
            best_distance,
        } => {
            face.is_ambiguous = true;
            face.match_distance = Some(best_distance);
            face.ambiguous_candidates = candidates.into_iter().map(|(name, _)| name).collect();
        }
    }
    face
}
