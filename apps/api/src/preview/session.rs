//! Preview session: wires a resume snapshot through render → measure → paginate.
//!
//! The newest snapshot always wins: each update supersedes the in-flight
//! measurement, and the partition is published over a `watch` channel that holds
//! only the latest value. Until the first measurement lands, subscribers see the
//! single placeholder page.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::blocks::{render_blocks, Document};
use crate::layout::{
    layout_pages, LayoutBackend, MeasureError, MeasuredBlock, MeasurementSurface, PageFrame,
    PageGeometry, PagePartition,
};
use crate::models::resume::ResumeData;
use crate::preview::scaler::{ScaleConfig, ViewportTracker};

/// What a preview shows at one point in time.
#[derive(Debug, Clone)]
pub struct PaginationSnapshot {
    /// Increments on every publish.
    pub revision: u64,
    /// Fingerprint of the document the partition was measured from.
    pub fingerprint: Option<u64>,
    pub partition: Arc<PagePartition>,
}

impl PaginationSnapshot {
    pub fn is_laying_out(&self) -> bool {
        self.partition.is_placeholder()
    }
}

/// Settings shared by every session the service creates.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub geometry: PageGeometry,
    pub settle_delay: Duration,
    pub scale: ScaleConfig,
}

/// Inputs of the current partition. Held locked for the whole of every publish,
/// so a finished pass and a height change never interleave.
struct Published {
    usable_height_px: f32,
    /// Last measured blocks and the fingerprint they belong to.
    measured: Option<(u64, Vec<MeasuredBlock>)>,
}

struct Shared {
    state: watch::Sender<PaginationSnapshot>,
    revision: AtomicU64,
    published: Mutex<Published>,
}

impl Shared {
    /// Recomputes the partition from scratch and publishes it.
    ///
    /// Takes the guard rather than locking, so callers update inputs and
    /// publish in one critical section.
    fn publish(&self, published: &MutexGuard<'_, Published>) {
        let (fingerprint, blocks) = match &published.measured {
            Some((fingerprint, blocks)) => (Some(*fingerprint), blocks.as_slice()),
            None => (None, &[][..]),
        };
        let partition = PagePartition::new(blocks, published.usable_height_px);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            revision,
            pages = partition.page_count(),
            blocks = partition.block_count(),
            usable_height_px = published.usable_height_px,
            "Publishing page partition"
        );
        self.state.send_replace(PaginationSnapshot {
            revision,
            fingerprint,
            partition: Arc::new(partition),
        });
    }
}

pub struct PreviewSession {
    id: Uuid,
    settings: SessionSettings,
    surface: MeasurementSurface,
    shared: Arc<Shared>,
    /// Latest submitted document and its title, whether or not measured yet.
    latest: Mutex<Option<(Document, Option<String>)>>,
    viewport: ViewportTracker,
}

impl PreviewSession {
    pub fn new(id: Uuid, backend: Arc<dyn LayoutBackend>, settings: SessionSettings) -> Self {
        let geometry = settings.geometry;
        let usable = geometry.usable_height_px();
        let (state, state_rx) = watch::channel(PaginationSnapshot {
            revision: 0,
            fingerprint: None,
            partition: Arc::new(PagePartition::placeholder(usable)),
        });
        let viewport = ViewportTracker::spawn(
            geometry.width_px(),
            geometry.height_px(),
            settings.scale,
            state_rx,
        );

        Self {
            id,
            settings,
            surface: MeasurementSurface::new(
                backend,
                geometry.usable_width_px(),
                settings.settle_delay,
            ),
            shared: Arc::new(Shared {
                state,
                revision: AtomicU64::new(0),
                published: Mutex::new(Published {
                    usable_height_px: usable,
                    measured: None,
                }),
            }),
            latest: Mutex::new(None),
            viewport,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn geometry(&self) -> PageGeometry {
        self.settings.geometry
    }

    pub fn scale_config(&self) -> ScaleConfig {
        self.settings.scale
    }

    /// Submits a new snapshot. Returns `false` when it renders to the document
    /// that is already being measured or already shown, in which case nothing is
    /// re-measured.
    pub fn update(&self, data: &ResumeData) -> bool {
        let document = render_blocks(data);
        let fingerprint = document.fingerprint();
        let title = data.title.clone();

        // Held until the pass is requested: the newest stored document is always
        // the one the surface measures last.
        let mut latest = lock(&self.latest);
        if let Some((current, current_title)) = latest.as_mut() {
            if current.fingerprint() == fingerprint && self.is_settled_on(fingerprint) {
                *current_title = title;
                debug!(session = %self.id, "Snapshot unchanged, keeping current partition");
                return false;
            }
        }
        *latest = Some((document.clone(), title));

        info!(session = %self.id, blocks = document.len(), "Measuring new document");
        let shared = Arc::clone(&self.shared);
        self.surface.request(document, move |measured| {
            let mut published = lock(&shared.published);
            published.measured = Some((fingerprint, measured));
            shared.publish(&published);
        });
        true
    }

    /// A pass for `fingerprint` is in flight, or its partition is on display.
    fn is_settled_on(&self, fingerprint: u64) -> bool {
        if self.surface.is_measuring() {
            return true;
        }
        let snapshot = self.snapshot();
        snapshot.fingerprint == Some(fingerprint) && !snapshot.is_laying_out()
    }

    /// Changes the page height budget and re-paginates the last measurement.
    ///
    /// Measurement is not repeated: block heights depend on width only.
    pub fn set_usable_height(&self, usable_height_px: f32) {
        let mut published = lock(&self.shared.published);
        published.usable_height_px = usable_height_px;
        info!(session = %self.id, usable_height_px, "Usable height changed, repaginating");
        self.shared.publish(&published);
    }

    pub fn usable_height_px(&self) -> f32 {
        lock(&self.shared.published).usable_height_px
    }

    pub fn snapshot(&self) -> PaginationSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PaginationSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn frames(&self) -> Vec<PageFrame> {
        layout_pages(&self.snapshot().partition, &self.settings.geometry)
    }

    pub fn is_measuring(&self) -> bool {
        self.surface.is_measuring()
    }

    pub fn viewport(&self) -> &ViewportTracker {
        &self.viewport
    }

    pub fn latest_title(&self) -> Option<String> {
        lock(&self.latest).as_ref().and_then(|(_, title)| title.clone())
    }

    /// The partition for the latest submitted document.
    ///
    /// Returns the published partition when it was measured from that document.
    /// Otherwise (a pass still in flight, or only the placeholder) runs one
    /// measurement pass and paginates it with the same paginator and height.
    /// Published state is left untouched either way.
    pub async fn partition_for_latest(&self) -> Result<Arc<PagePartition>, MeasureError> {
        let snapshot = self.snapshot();
        let latest = lock(&self.latest).as_ref().map(|(doc, _)| doc.clone());

        let Some(document) = latest else {
            return Ok(snapshot.partition);
        };
        if snapshot.fingerprint == Some(document.fingerprint()) && !snapshot.is_laying_out() {
            return Ok(snapshot.partition);
        }

        debug!(session = %self.id, "Published partition is stale, measuring latest document");
        let measured = self.surface.measure_once(&document).await?;
        Ok(Arc::new(PagePartition::new(&measured, self.usable_height_px())))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// Live preview sessions keyed by resume id.
///
/// Removing a session drops it, which cancels its pending measurement and stops
/// its viewport subscription.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Arc<PreviewSession>>>>,
}

impl PreviewRegistry {
    pub fn get(&self, id: Uuid) -> Option<Arc<PreviewSession>> {
        lock(&self.sessions).get(&id).cloned()
    }

    pub fn get_or_create(
        &self,
        id: Uuid,
        backend: &Arc<dyn LayoutBackend>,
        settings: SessionSettings,
    ) -> Arc<PreviewSession> {
        let mut sessions = lock(&self.sessions);
        Arc::clone(sessions.entry(id).or_insert_with(|| {
            info!(session = %id, "Opening preview session");
            Arc::new(PreviewSession::new(id, Arc::clone(backend), settings))
        }))
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let removed = lock(&self.sessions).remove(&id);
        if removed.is_some() {
            info!(session = %id, "Closed preview session");
        }
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::tests::FakeBackend;
    use crate::layout::MetricLayoutBackend;
    use crate::models::resume::WorkExperienceEntry;
    use std::sync::atomic::Ordering;

    fn settings() -> SessionSettings {
        SessionSettings {
            geometry: PageGeometry::a4(),
            settle_delay: Duration::from_millis(200),
            scale: ScaleConfig::default(),
        }
    }

    fn metric_backend() -> Arc<dyn LayoutBackend> {
        Arc::new(MetricLayoutBackend::new(Duration::from_millis(16)))
    }

    fn make_data(jobs: usize) -> ResumeData {
        let mut data = ResumeData {
            title: Some("Backend Resume".to_string()),
            full_name: "Lin Wei".to_string(),
            email: "lin@example.com".to_string(),
            ..Default::default()
        };
        for i in 0..jobs {
            data.work_experiences.push(WorkExperienceEntry {
                company_name: format!("Company {i}"),
                position: "Engineer".to_string(),
                description: "Shipped features. ".repeat(30),
                sort_order: i as i32,
                ..Default::default()
            });
        }
        data
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_with_placeholder_page() {
        let session = PreviewSession::new(Uuid::new_v4(), metric_backend(), settings());
        let snapshot = session.snapshot();
        assert!(snapshot.is_laying_out());
        assert_eq!(snapshot.partition.page_count(), 1);
        assert_eq!(snapshot.partition.block_count(), 0);
        assert_eq!(snapshot.revision, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_publishes_partition_after_measurement() {
        let session = PreviewSession::new(Uuid::new_v4(), metric_backend(), settings());
        let mut rx = session.subscribe();

        assert!(session.update(&make_data(2)));
        let snapshot = rx.wait_for(|s| !s.is_laying_out()).await.unwrap().clone();

        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.partition.block_count(), 2);
        assert_eq!(session.frames().len(), snapshot.partition.page_count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_state_reflects_only_latest_document() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());

        session.update(&make_data(1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.update(&make_data(5));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.revision, 1, "only one partition may ever be published");
        assert_eq!(snapshot.partition.block_count(), 2);
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
        let experience = &snapshot.partition.pages.last().unwrap().blocks.last().unwrap();
        // FakeBackend: 100px per paragraph; title + 5 × (heading + 1 description line).
        assert_eq!(experience.height_px, 1100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_update_does_not_remeasure() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());

        assert!(session.update(&make_data(2)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let before = session.snapshot();

        let mut same = make_data(2);
        same.title = Some("Renamed".to_string());
        assert!(!session.update(&same));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let after = session.snapshot();
        assert_eq!(before.revision, after.revision);
        assert_eq!(before.partition, after.partition);
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
        assert_eq!(session.latest_title().as_deref(), Some("Renamed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_usable_height_change_repaginates_without_measuring() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());
        session.update(&make_data(3));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let pages_before = session.snapshot().partition.page_count();

        session.set_usable_height(400.0);
        let after = session.snapshot();
        assert!(after.partition.page_count() > pages_before);
        assert_eq!(after.partition.usable_height_px, 400.0);
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_backend_keeps_placeholder() {
        let backend = Arc::new(FakeBackend::new());
        backend.mounted.store(false, Ordering::SeqCst);
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());
        session.update(&make_data(1));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = session.snapshot();
        assert!(snapshot.is_laying_out());
        assert_eq!(snapshot.revision, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partition_for_latest_measures_when_stale() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());
        session.update(&make_data(1));

        // Pass still in flight: export must not wait for, or alter, the preview.
        let partition = session.partition_for_latest().await.unwrap();
        assert_eq!(partition.block_count(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let published = session.snapshot().partition;
        assert_eq!(*partition, *published, "same inputs must paginate identically");
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_remove_tears_down_session() {
        let registry = PreviewRegistry::default();
        let backend: Arc<dyn LayoutBackend> = Arc::new(FakeBackend::new());
        let id = Uuid::new_v4();

        let session = registry.get_or_create(id, &backend, settings());
        let again = registry.get_or_create(id, &backend, settings());
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(registry.len(), 1);

        let rx = session.subscribe();
        session.update(&make_data(1));
        drop(again);
        drop(session);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.get(id).is_none());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.has_changed().is_err(), "session state must be gone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_after_not_ready_pass_remeasures() {
        let backend = Arc::new(FakeBackend::new());
        backend.mounted.store(false, Ordering::SeqCst);
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());

        assert!(session.update(&make_data(1)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(session.snapshot().is_laying_out());

        backend.mounted.store(true, Ordering::SeqCst);
        assert!(session.update(&make_data(1)), "placeholder must not count as up to date");
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = session.snapshot();
        assert!(!snapshot.is_laying_out());
        assert_eq!(snapshot.partition.block_count(), 2);
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_while_measuring_is_skipped() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());

        assert!(session.update(&make_data(2)));
        assert!(session.is_measuring());
        assert!(!session.update(&make_data(2)));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(session.snapshot().revision, 1);
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_publish_latest_document() {
        let settings = SessionSettings {
            settle_delay: Duration::ZERO,
            ..settings()
        };
        let session = Arc::new(PreviewSession::new(
            Uuid::new_v4(),
            Arc::new(FakeBackend::new()),
            settings,
        ));

        for round in 0..20 {
            let tasks: Vec<_> = [1, 2]
                .into_iter()
                .map(|jobs| {
                    let session = Arc::clone(&session);
                    tokio::spawn(async move { session.update(&make_data(jobs)) })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            while session.is_measuring() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let latest = lock(&session.latest).as_ref().map(|(doc, _)| doc.fingerprint());
            assert_eq!(
                session.snapshot().fingerprint,
                latest,
                "round {round}: preview shows a superseded document"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_usable_height_change_during_pass_is_kept() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());

        session.update(&make_data(3));
        session.set_usable_height(400.0);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snapshot = session.snapshot();
        assert!(!snapshot.is_laying_out());
        assert_eq!(snapshot.partition.usable_height_px, 400.0);
        assert_eq!(session.usable_height_px(), 400.0);
        assert_eq!(snapshot.revision, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_changes_leave_partition_untouched() {
        let backend = Arc::new(FakeBackend::new());
        let session = PreviewSession::new(Uuid::new_v4(), backend.clone(), settings());
        session.update(&make_data(5));
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.set_usable_height(600.0);

        let before = session.snapshot();
        assert!(before.partition.page_count() >= 2);
        let page_ids = |frames: &[PageFrame]| -> Vec<Vec<_>> {
            frames
                .iter()
                .map(|frame| frame.blocks.iter().map(|placed| placed.id).collect())
                .collect()
        };
        let ids_before = page_ids(&session.frames());

        let page_width = session.geometry().width_px();
        for (width, scroll) in [
            (200.0, 0.0),
            (page_width / 2.0, 300.0),
            (page_width, 1500.0),
            (2000.0, 0.0),
        ] {
            session.viewport().resize(width);
            session.viewport().scroll(scroll);
            let state = session
                .viewport()
                .settled(session.viewport().inputs())
                .await
                .unwrap();
            assert_eq!(state.total_pages, before.partition.page_count());

            let after = session.snapshot();
            assert_eq!(after.revision, before.revision, "scaling must not republish");
            assert_eq!(after.partition, before.partition);
            assert_eq!(page_ids(&session.frames()), ids_before);
        }
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
    }
}
