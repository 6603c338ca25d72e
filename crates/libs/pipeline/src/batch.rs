use crate::PipelineContext;
use crate::apply::{RenameJob, apply_rename};
use crate::generate::{TITLE_ERROR_MARKER, request_title_with_retry};
use crate::references::select_references;
use crate::scan::{ScanData, scan_item};
use color_eyre::eyre::{Result, eyre};
use common_types::{
    ApplyReport, BatchItem, BatchProgress, MediaEntry, PersonReference, Phase, RunSummary,
};
use futures_util::{StreamExt, pin_mut};
use naming::NameContext;
use task_pool::map_bounded_cancellable;
use title_model::TitleRequest;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The batch pipeline state machine. One instance drives one run over one
/// collection: `Idle → Scanning → FaceReview → Generating → Review → Applying
/// → (next page | Done)`.
///
/// Every fan-out stage goes through the bounded mapper; results are indexed
/// by the item's position in the page, never by arrival order.
pub struct BatchPipeline {
    ctx: PipelineContext,
    collection: String,
    phase: Phase,
    /// Full listing, fetched once per run and paged locally.
    entries: Option<Vec<MediaEntry>>,
    page_index: usize,
    pages_processed: usize,
    /// Renames committed so far across pages; monotonic for the run.
    renamed_total: usize,
    items: Vec<BatchItem>,
    references: Vec<PersonReference>,
    notes: String,
    cancel: CancellationToken,
    progress: watch::Sender<BatchProgress>,
}

impl BatchPipeline {
    #[must_use]
    pub fn new(ctx: PipelineContext, collection: impl Into<String>) -> Self {
        let (progress, _) = watch::channel(BatchProgress::idle());
        Self {
            ctx,
            collection: collection.into(),
            phase: Phase::Idle,
            entries: None,
            page_index: 0,
            pages_processed: 0,
            renamed_total: 0,
            items: Vec::new(),
            references: Vec::new(),
            notes: String::new(),
            cancel: CancellationToken::new(),
            progress,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    #[must_use]
    pub fn references(&self) -> &[PersonReference] {
        &self.references
    }

    #[must_use]
    pub fn store(&self) -> &face_store::FaceStore {
        &self.ctx.store
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            renamed_total: self.renamed_total,
            pages_processed: self.pages_processed,
        }
    }

    /// Progress snapshots for progressive rendering by the embedding host.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    /// Handle the embedding host can trip from another task to stop the run.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops the run: no new operations start, in-flight ones finish and are
    /// discarded. When no stage is running the pipeline resets immediately.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if matches!(self.phase, Phase::FaceReview | Phase::Review | Phase::Done) {
            self.reset_to_idle();
        }
    }

    /// Starts a run: fetches the collection listing once, then scans the
    /// first page. A listing failure is fatal and returns the pipeline to
    /// Idle with the error surfaced.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(eyre!("Pipeline can only start from Idle, not {:?}", self.phase));
        }
        self.page_index = 0;
        self.pages_processed = 0;
        self.renamed_total = 0;
        self.notes.clear();

        match self.ctx.host.list_items(&self.collection).await {
            Ok(entries) => {
                info!("Collection {:?} has {} items", self.collection, entries.len());
                self.entries = Some(entries);
            }
            Err(error) => {
                self.reset_to_idle();
                return Err(error.wrap_err("Listing the collection failed"));
            }
        }
        if self.entries.as_ref().is_some_and(Vec::is_empty) {
            self.phase = Phase::Done;
            self.publish_progress(0);
            return Ok(());
        }
        self.scan_current_page().await
    }

    /// Labels one detected face with a person name. Persists a new face
    /// sample (append-only, one per labeling action) and updates the item's
    /// identified names in place. Relabeling with the same name leaves the
    /// visible match state unchanged.
    pub async fn label_face(
        &mut self,
        item_index: usize,
        face_index: usize,
        name: &str,
    ) -> Result<()> {
        if self.phase != Phase::FaceReview {
            return Err(eyre!("Faces can only be labeled during face review"));
        }
        let item = self
            .items
            .get(item_index)
            .ok_or_else(|| eyre!("No item at index {item_index}"))?;
        let face = item
            .faces
            .get(face_index)
            .ok_or_else(|| eyre!("No face at index {face_index}"))?;

        let embedding = face.region.embedding.clone();
        let crop = face.region.crop.clone();
        let sample_date = item.photo_date.map(|dt| dt.date());
        self.ctx
            .store
            .add_sample(name, embedding, &crop, sample_date)
            .await?;

        let item = &mut self.items[item_index];
        let face = &mut item.faces[face_index];
        face.matched_name = Some(name.trim().to_string());
        face.match_distance = None;
        face.is_ambiguous = false;
        face.ambiguous_candidates.clear();
        item.refresh_identified_names();
        Ok(())
    }

    /// Leaves face review: rebuilds person references from the corrected
    /// state and generates titles for the whole page.
    pub async fn continue_to_generating(&mut self, notes: Option<&str>) -> Result<()> {
        if self.phase != Phase::FaceReview {
            return Err(eyre!("Generating can only follow face review"));
        }
        if let Some(notes) = notes {
            self.notes = notes.to_string();
        }
        self.references = select_references(&self.items);
        let all: Vec<usize> = (0..self.items.len()).collect();
        self.generate_for(&all).await;
        if self.phase == Phase::Generating {
            self.phase = Phase::Review;
            self.publish_progress(self.items.len());
        }
        Ok(())
    }

    /// Re-generates titles for the currently selected items only, optionally
    /// merging extra user notes into the requests.
    pub async fn retry_selected(&mut self, extra_notes: Option<&str>) -> Result<()> {
        if self.phase != Phase::Review {
            return Err(eyre!("Retry is only available during review"));
        }
        if let Some(extra) = extra_notes {
            if self.notes.is_empty() {
                self.notes = extra.to_string();
            } else {
                self.notes.push(' ');
                self.notes.push_str(extra);
            }
        }
        let selected: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.selected)
            .map(|(index, _)| index)
            .collect();
        self.generate_for(&selected).await;
        if self.phase == Phase::Generating {
            self.phase = Phase::Review;
            self.publish_progress(self.items.len());
        }
        Ok(())
    }

    pub fn set_selected(&mut self, item_index: usize, selected: bool) -> Result<()> {
        if self.phase != Phase::Review {
            return Err(eyre!("Selection can only change during review"));
        }
        let item = self
            .items
            .get_mut(item_index)
            .ok_or_else(|| eyre!("No item at index {item_index}"))?;
        item.selected = selected;
        Ok(())
    }

    pub fn override_name(&mut self, item_index: usize, name: &str) -> Result<()> {
        if self.phase != Phase::Review {
            return Err(eyre!("Names can only be edited during review"));
        }
        let item = self
            .items
            .get_mut(item_index)
            .ok_or_else(|| eyre!("No item at index {item_index}"))?;
        item.suggested_name = name.to_string();
        Ok(())
    }

    /// Commits the reviewed names. Rename failures are tallied, never fatal;
    /// selected items whose name is empty or the error marker are refused
    /// locally and counted as failed. Afterwards the pipeline automatically
    /// scans the next page, or finishes the run.
    pub async fn apply(&mut self) -> Result<ApplyReport> {
        if self.phase != Phase::Review {
            return Err(eyre!("Apply is only available during review"));
        }
        self.phase = Phase::Applying;
        self.publish_progress(0);

        let mut report = ApplyReport::default();
        let mut jobs = Vec::new();
        for item in &self.items {
            if !item.selected {
                continue;
            }
            if item.suggested_name.is_empty() || item.suggested_name == TITLE_ERROR_MARKER {
                // Reviewed but not committable; surfaces in the tally.
                report.failed += 1;
                continue;
            }
            jobs.push(RenameJob {
                item_id: item.entry.id.clone(),
                new_name: item.suggested_name.clone(),
            });
        }

        let host = self.ctx.host.clone();
        let stream = map_bounded_cancellable(
            jobs,
            self.ctx.settings.pipeline.apply_concurrency,
            self.cancel.clone(),
            move |_, job| apply_rename(host.clone(), job),
        );
        pin_mut!(stream);
        let mut completed = 0;
        while let Some((_, renamed)) = stream.next().await {
            if self.cancel.is_cancelled() {
                continue;
            }
            if renamed {
                report.renamed += 1;
            } else {
                report.failed += 1;
            }
            completed += 1;
            self.publish_progress(completed);
        }
        if self.cancel.is_cancelled() {
            self.reset_to_idle();
            return Ok(report);
        }

        self.renamed_total += report.renamed;
        self.pages_processed += 1;
        info!(
            "Applied page {}/{}: {} renamed, {} failed",
            self.page_index + 1,
            self.total_pages(),
            report.renamed,
            report.failed
        );

        if self.has_more_pages() {
            self.page_index += 1;
            self.clear_page_state();
            self.scan_current_page().await?;
        } else {
            self.clear_page_state();
            self.phase = Phase::Done;
            self.publish_progress(0);
            info!(
                "Run finished: {} renamed over {} pages",
                self.renamed_total, self.pages_processed
            );
        }
        Ok(report)
    }

    async fn scan_current_page(&mut self) -> Result<()> {
        self.phase = Phase::Scanning;
        let page_size = self.ctx.settings.pipeline.page_size.max(1);
        let entries = self
            .entries
            .as_ref()
            .ok_or_else(|| eyre!("Scan without a cached listing"))?;
        let start = self.page_index * page_size;
        let page: Vec<MediaEntry> = entries
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();
        self.items = page.iter().cloned().map(BatchItem::new).collect();
        self.publish_progress(0);

        let snapshot = self.ctx.store.snapshot();
        let matching = self.ctx.settings.matching.clone();
        let max_dimension = self.ctx.settings.pipeline.display_max_dimension;
        let host = self.ctx.host.clone();
        let detector = self.ctx.detector.clone();
        let collection = self.collection.clone();

        let stream = map_bounded_cancellable(
            page,
            self.ctx.settings.pipeline.scan_concurrency,
            self.cancel.clone(),
            move |_, entry| {
                scan_item(
                    host.clone(),
                    detector.clone(),
                    snapshot.clone(),
                    matching.clone(),
                    collection.clone(),
                    entry,
                    max_dimension,
                )
            },
        );
        pin_mut!(stream);
        let mut completed = 0;
        while let Some((index, data)) = stream.next().await {
            if self.cancel.is_cancelled() {
                continue;
            }
            self.apply_scan_data(index, data);
            completed += 1;
            self.publish_progress(completed);
        }
        if self.cancel.is_cancelled() {
            self.reset_to_idle();
            return Ok(());
        }

        self.references = select_references(&self.items);
        self.phase = Phase::FaceReview;
        self.publish_progress(completed);
        Ok(())
    }

    fn apply_scan_data(&mut self, index: usize, data: ScanData) {
        let Some(item) = self.items.get_mut(index) else {
            warn!("Scan result for unknown item index {index}");
            return;
        };
        item.display_bytes = data.display_bytes;
        item.faces = data.faces;
        item.photo_date = data.photo_date;
        item.location = data.location;
        item.refresh_identified_names();
    }

    /// Runs title generation for the given item indices and stores each
    /// suggestion (or the error marker) as it resolves.
    async fn generate_for(&mut self, indices: &[usize]) {
        self.phase = Phase::Generating;
        self.publish_progress(0);

        let jobs: Vec<(usize, Option<TitleRequest>)> = indices
            .iter()
            .map(|&index| (index, self.title_request_for(index)))
            .collect();
        let titler = self.ctx.titler.clone();
        let attempts = self.ctx.settings.pipeline.title_attempts;

        let stream = map_bounded_cancellable(
            jobs,
            self.ctx.settings.pipeline.title_concurrency,
            self.cancel.clone(),
            move |_, (item_index, request)| {
                let titler = titler.clone();
                async move {
                    let title = match request {
                        Some(request) => {
                            request_title_with_retry(titler.as_ref(), &request, attempts).await
                        }
                        // No display bytes, nothing to show the model.
                        None => None,
                    };
                    (item_index, title)
                }
            },
        );
        pin_mut!(stream);
        let mut completed = 0;
        while let Some((_, (item_index, title))) = stream.next().await {
            if self.cancel.is_cancelled() {
                continue;
            }
            self.store_suggestion(item_index, title);
            completed += 1;
            self.publish_progress(completed);
        }
        if self.cancel.is_cancelled() {
            self.reset_to_idle();
        }
    }

    fn title_request_for(&self, index: usize) -> Option<TitleRequest> {
        let item = &self.items[index];
        let bytes = item.display_bytes.as_ref()?;
        let references: Vec<PersonReference> = self
            .references
            .iter()
            .filter(|r| item.identified_names.contains(&r.person_name))
            .cloned()
            .collect();
        Some(TitleRequest {
            image: bytes.clone(),
            people: item.identified_names.clone(),
            references,
            album_path: (!self.collection.is_empty()).then(|| self.collection.clone()),
            location: item.location.clone(),
            notes: (!self.notes.trim().is_empty()).then(|| self.notes.clone()),
        })
    }

    fn store_suggestion(&mut self, item_index: usize, title: Option<String>) {
        let Some(title) = title else {
            self.items[item_index].suggested_name = TITLE_ERROR_MARKER.to_string();
            return;
        };
        let sequence = u32::try_from(self.renamed_total + item_index + 1).unwrap_or(u32::MAX);
        let item = &self.items[item_index];
        let name_ctx = NameContext {
            date: item.photo_date,
            sequence: Some(sequence),
            title: Some(title),
            people: item.identified_names.clone(),
            album: (!self.collection.is_empty()).then(|| self.collection.clone()),
            original_filename: Some(item.entry.file_stem().to_string()),
            location: item.location.clone(),
        };
        self.items[item_index].suggested_name =
            naming::render(&self.ctx.settings.naming.template, &name_ctx);
    }

    fn has_more_pages(&self) -> bool {
        let page_size = self.ctx.settings.pipeline.page_size.max(1);
        self.entries
            .as_ref()
            .is_some_and(|entries| (self.page_index + 1) * page_size < entries.len())
    }

    fn total_pages(&self) -> usize {
        let page_size = self.ctx.settings.pipeline.page_size.max(1);
        self.entries
            .as_ref()
            .map_or(0, |entries| entries.len().div_ceil(page_size))
    }

    fn clear_page_state(&mut self) {
        self.items.clear();
        self.references.clear();
    }

    fn reset_to_idle(&mut self) {
        self.clear_page_state();
        self.entries = None;
        self.page_index = 0;
        self.phase = Phase::Idle;
        self.notes.clear();
        // A tripped token is permanent; a future run needs a fresh one.
        self.cancel = CancellationToken::new();
        self.publish_progress(0);
    }

    fn publish_progress(&self, completed: usize) {
        self.progress.send_replace(BatchProgress {
            phase: self.phase,
            completed,
            total: self.items.len(),
            page: self.page_index,
            total_pages: self.total_pages(),
            renamed_total: self.renamed_total,
        });
    }
}
