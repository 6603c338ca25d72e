use crate::Args;
use app_state::AppSettings;
use color_eyre::Result;
use common_types::Phase;
use face_analysis::RemoteDetector;
use face_store::FaceStore;
use photo_host::LocalFolderHost;
use pipeline::{BatchPipeline, PipelineContext};
use std::sync::Arc;
use title_model::VisionClient;
use tracing::{info, warn};

/// Drives one full pipeline run over the collection, page by page. Faces the
/// matcher could not settle are logged for later labeling; this host is
/// non-interactive, so review continues without corrections.
pub async fn run(args: &Args, settings: AppSettings) -> Result<()> {
    let store = FaceStore::load(&settings.services.face_store_file).await?;
    let host = Arc::new(LocalFolderHost::new(&args.root));
    let detector = Arc::new(RemoteDetector::new(&settings.services.detector_url));
    let titler = Arc::new(
        VisionClient::with_base_url(&settings.services.vision_url)
            .model(settings.services.vision_model.clone())
            .build(),
    );

    let ctx = PipelineContext::new(host, detector, titler, store, settings);
    let mut pipeline = BatchPipeline::new(ctx, args.collection.clone());
    pipeline.start().await?;

    loop {
        match pipeline.phase() {
            Phase::FaceReview => {
                report_face_review(&pipeline);
                pipeline
                    .continue_to_generating(args.notes.as_deref())
                    .await?;
            }
            Phase::Review => {
                report_suggestions(&pipeline);
                if !args.yes {
                    info!("Dry run, stopping before apply. Pass --yes to rename.");
                    return Ok(());
                }
                let report = pipeline.apply().await?;
                info!("{} renamed, {} failed", report.renamed, report.failed);
            }
            Phase::Done => break,
            phase => {
                warn!("Unexpected phase {phase:?}, stopping");
                break;
            }
        }
    }

    let summary = pipeline.summary();
    info!(
        "🏁 Finished: {} photos renamed over {} pages.",
        summary.renamed_total, summary.pages_processed
    );
    Ok(())
}

fn report_face_review(pipeline: &BatchPipeline) {
    for item in pipeline.items() {
        for face in &item.faces {
            if face.is_ambiguous {
                info!(
                    "🤔 {}: ambiguous face, candidates: {}",
                    item.entry.filename,
                    face.ambiguous_candidates.join(", ")
                );
            } else if face.matched_name.is_none() {
                info!("❓ {}: unknown face, label it to improve matching", item.entry.filename);
            }
        }
        if !item.identified_names.is_empty() {
            info!(
                "👤 {}: {}",
                item.entry.filename,
                item.identified_names.join(", ")
            );
        }
    }
}

fn report_suggestions(pipeline: &BatchPipeline) {
    for item in pipeline.items() {
        info!("📷 {} -> {}", item.entry.filename, item.suggested_name);
    }
}
