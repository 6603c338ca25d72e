use app_state::{AppSettings, MatchSettings, NamingSettings, PipelineSettings, ServiceSettings};
use common_types::{BoundingBox, FaceRegion, Phase};
use face_analysis::MockDetector;
use face_store::FaceStore;
use photo_host::MockHost;
use pipeline::{BatchPipeline, PipelineContext, TITLE_ERROR_MARKER};
use std::path::Path;
use std::sync::Arc;
use title_model::MockTitler;

fn settings(page_size: usize, store_file: &Path) -> AppSettings {
    AppSettings {
        matching: MatchSettings::default(),
        pipeline: PipelineSettings {
            page_size,
            ..PipelineSettings::default()
        },
        naming: NamingSettings {
            template: "{seq} {title}".to_string(),
        },
        services: ServiceSettings {
            detector_url: String::new(),
            vision_url: String::new(),
            vision_model: String::new(),
            face_store_file: store_file.to_path_buf(),
        },
    }
}

async fn pipeline_with(
    host: MockHost,
    detector: MockDetector,
    titler: MockTitler,
    page_size: usize,
    dir: &Path,
) -> BatchPipeline {
    let store = FaceStore::load(dir.join("faces.json")).await.expect("store");
    let ctx = PipelineContext::new(
        Arc::new(host),
        Arc::new(detector),
        Arc::new(titler),
        store,
        settings(page_size, &dir.join("faces.json")),
    );
    BatchPipeline::new(ctx, "album")
}

fn face_region(embedding: Vec<f32>, size: f32) -> FaceRegion {
    FaceRegion {
        bounding_box: BoundingBox {
            x: 0.1,
            y: 0.1,
            width: size,
            height: size,
        },
        crop: b"crop".to_vec(),
        embedding,
    }
}

#[tokio::test(start_paused = true)]
async fn two_titles_one_exhausted_retry_then_partial_apply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new()
        .with_photo("i1", b"img1".to_vec())
        .with_photo("i2", b"img2".to_vec())
        .with_photo("i3", b"img3".to_vec());
    let titler = MockTitler::new()
        .with_script(b"img1".to_vec(), vec![Ok("Beach".to_string())])
        .with_script(b"img2".to_vec(), vec![Ok("Hills".to_string())])
        .always_failing(b"img3".to_vec());

    let mut pipeline =
        pipeline_with(host, MockDetector::new(), titler, 50, dir.path()).await;
    pipeline.start().await.expect("start");
    assert_eq!(pipeline.phase(), Phase::FaceReview);

    pipeline.continue_to_generating(None).await.expect("generate");
    assert_eq!(pipeline.phase(), Phase::Review);
    let names: Vec<&str> = pipeline
        .items()
        .iter()
        .map(|item| item.suggested_name.as_str())
        .collect();
    assert_eq!(names, vec!["001 Beach", "002 Hills", TITLE_ERROR_MARKER]);

    // All three stay selected; the error-marker item must be refused by the
    // apply guard and counted as failed.
    let report = pipeline.apply().await.expect("apply");
    assert_eq!(report.renamed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(pipeline.phase(), Phase::Done);
    assert_eq!(pipeline.summary().renamed_total, 2);
}

#[tokio::test(start_paused = true)]
async fn download_failure_degrades_the_item_not_the_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new()
        .with_photo("ok", b"img-ok".to_vec())
        .with_photo("broken", b"img-broken".to_vec())
        .failing_download("broken");
    let titler = MockTitler::new().with_script(b"img-ok".to_vec(), vec![Ok("Fine".to_string())]);

    let mut pipeline =
        pipeline_with(host, MockDetector::new(), titler, 50, dir.path()).await;
    pipeline.start().await.expect("start");

    let broken = &pipeline.items()[1];
    assert!(broken.display_bytes.is_none());
    assert!(broken.faces.is_empty());

    pipeline.continue_to_generating(None).await.expect("generate");
    // No bytes means no AI request; the item surfaces the error marker.
    assert_eq!(pipeline.items()[0].suggested_name, "001 Fine");
    assert_eq!(pipeline.items()[1].suggested_name, TITLE_ERROR_MARKER);
}

#[tokio::test]
async fn listing_failure_is_fatal_and_returns_to_idle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new().failing_listing();
    let mut pipeline =
        pipeline_with(host, MockDetector::new(), MockTitler::new(), 50, dir.path()).await;

    assert!(pipeline.start().await.is_err());
    assert_eq!(pipeline.phase(), Phase::Idle);
}

#[tokio::test]
async fn empty_collection_finishes_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut pipeline = pipeline_with(
        MockHost::new(),
        MockDetector::new(),
        MockTitler::new(),
        50,
        dir.path(),
    )
    .await;
    pipeline.start().await.expect("start");
    assert_eq!(pipeline.phase(), Phase::Done);
}

#[tokio::test(start_paused = true)]
async fn labeling_updates_ui_state_idempotently_but_store_is_append_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new().with_photo("i1", b"img1".to_vec());
    let detector = MockDetector::new()
        .with_faces(b"img1".to_vec(), vec![face_region(vec![0.5; 4], 0.3)]);

    let mut pipeline =
        pipeline_with(host, detector, MockTitler::new(), 50, dir.path()).await;
    pipeline.start().await.expect("start");

    let face = &pipeline.items()[0].faces[0];
    assert!(face.matched_name.is_none());

    pipeline.label_face(0, 0, "Alice").await.expect("label");
    pipeline.label_face(0, 0, "Alice").await.expect("relabel");

    // Two labeling actions, two samples; the visible state is unchanged by
    // the second one.
    assert_eq!(pipeline.store().len(), 2);
    let item = &pipeline.items()[0];
    assert_eq!(item.faces[0].matched_name.as_deref(), Some("Alice"));
    assert_eq!(item.identified_names, vec!["Alice"]);
}

#[tokio::test(start_paused = true)]
async fn pagination_advances_automatically_with_monotonic_sequences() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new()
        .with_photo("a", b"img-a".to_vec())
        .with_photo("b", b"img-b".to_vec())
        .with_photo("c", b"img-c".to_vec())
        .with_photo("d", b"img-d".to_vec());

    let mut pipeline = pipeline_with(
        host,
        MockDetector::new(),
        MockTitler::new(),
        2,
        dir.path(),
    )
    .await;
    pipeline.start().await.expect("start");
    assert_eq!(pipeline.items().len(), 2);

    pipeline.continue_to_generating(None).await.expect("generate");
    let report = pipeline.apply().await.expect("apply page 1");
    assert_eq!(report.renamed, 2);
    // Apply auto-advanced into the next page's face review.
    assert_eq!(pipeline.phase(), Phase::FaceReview);

    pipeline.continue_to_generating(None).await.expect("generate");
    // Sequence numbers continue across pages: two renamed so far.
    assert_eq!(pipeline.items()[0].suggested_name, "003 Untitled photo");
    pipeline.apply().await.expect("apply page 2");

    assert_eq!(pipeline.phase(), Phase::Done);
    assert_eq!(pipeline.summary().renamed_total, 4);
    assert_eq!(pipeline.summary().pages_processed, 2);
}

#[tokio::test(start_paused = true)]
async fn rename_failures_are_counted_but_never_abort_the_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new()
        .with_photo("good", b"img-good".to_vec())
        .with_photo("flaky", b"img-flaky".to_vec())
        .failing_rename("flaky");

    let mut pipeline = pipeline_with(
        host,
        MockDetector::new(),
        MockTitler::new(),
        50,
        dir.path(),
    )
    .await;
    pipeline.start().await.expect("start");
    pipeline.continue_to_generating(None).await.expect("generate");

    let report = pipeline.apply().await.expect("apply");
    assert_eq!(report.renamed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(pipeline.phase(), Phase::Done);
}

#[tokio::test(start_paused = true)]
async fn retry_selected_regenerates_only_selected_items() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new()
        .with_photo("i1", b"img1".to_vec())
        .with_photo("i2", b"img2".to_vec());
    let mut flaky_script: Vec<Result<String, String>> =
        vec![Err("boom".to_string()); 5];
    flaky_script.push(Ok("Second try".to_string()));
    let titler = MockTitler::new()
        .with_script(b"img1".to_vec(), vec![Ok("First".to_string())])
        .with_script(b"img2".to_vec(), flaky_script);

    let mut pipeline =
        pipeline_with(host, MockDetector::new(), titler, 50, dir.path()).await;
    pipeline.start().await.expect("start");
    pipeline.continue_to_generating(None).await.expect("generate");
    assert_eq!(pipeline.items()[1].suggested_name, TITLE_ERROR_MARKER);

    pipeline.set_selected(0, false).expect("deselect");
    pipeline
        .retry_selected(Some("it is a birthday party"))
        .await
        .expect("retry");

    assert_eq!(pipeline.phase(), Phase::Review);
    // The deselected item kept its old suggestion, the retried one healed.
    assert_eq!(pipeline.items()[0].suggested_name, "001 First");
    assert_eq!(pipeline.items()[1].suggested_name, "002 Second try");
}

#[tokio::test(start_paused = true)]
async fn user_name_overrides_are_committed_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new().with_photo("i1", b"img1".to_vec());
    let host_handle = Arc::new(host);
    let store = FaceStore::load(dir.path().join("faces.json"))
        .await
        .expect("store");
    let ctx = PipelineContext::new(
        host_handle.clone(),
        Arc::new(MockDetector::new()),
        Arc::new(MockTitler::new()),
        store,
        settings(50, &dir.path().join("faces.json")),
    );
    let mut pipeline = BatchPipeline::new(ctx, "album");

    pipeline.start().await.expect("start");
    pipeline.continue_to_generating(None).await.expect("generate");
    pipeline.override_name(0, "My own name").expect("override");
    let report = pipeline.apply().await.expect("apply");

    assert_eq!(report.renamed, 1);
    assert_eq!(
        host_handle.renames(),
        vec![("i1".to_string(), "My own name".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn corrections_take_effect_in_the_next_pages_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Same person appears on one photo per page.
    let host = MockHost::new()
        .with_photo("p1", b"img-p1".to_vec())
        .with_photo("p2", b"img-p2".to_vec());
    let detector = MockDetector::new()
        .with_faces(b"img-p1".to_vec(), vec![face_region(vec![0.2; 4], 0.3)])
        .with_faces(b"img-p2".to_vec(), vec![face_region(vec![0.2; 4], 0.4)]);

    let mut pipeline =
        pipeline_with(host, detector, MockTitler::new(), 1, dir.path()).await;
    pipeline.start().await.expect("start");

    // Page 1: unknown face, user labels it.
    assert!(pipeline.items()[0].faces[0].matched_name.is_none());
    pipeline.label_face(0, 0, "Alice").await.expect("label");
    pipeline.continue_to_generating(None).await.expect("generate");
    pipeline.apply().await.expect("apply");

    // Page 2 scanned against a fresh snapshot that includes the correction.
    assert_eq!(pipeline.phase(), Phase::FaceReview);
    let face = &pipeline.items()[0].faces[0];
    assert_eq!(face.matched_name.as_deref(), Some("Alice"));
    assert!(!face.is_ambiguous);
}

#[tokio::test(start_paused = true)]
async fn cancel_between_phases_resets_to_idle_and_allows_a_new_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = MockHost::new().with_photo("i1", b"img1".to_vec());
    let mut pipeline =
        pipeline_with(host, MockDetector::new(), MockTitler::new(), 50, dir.path()).await;

    pipeline.start().await.expect("start");
    assert_eq!(pipeline.phase(), Phase::FaceReview);
    pipeline.cancel();
    assert_eq!(pipeline.phase(), Phase::Idle);

    // A cancelled token must not poison the next run.
    pipeline.start().await.expect("second run");
    assert_eq!(pipeline.phase(), Phase::FaceReview);
}
