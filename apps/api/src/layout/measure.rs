//! Measurement Surface: reads each block's laid-out height from a layout backend.
//!
//! # Protocol
//! 1. The document is laid out off-screen at the page's usable content width.
//! 2. Wait for the backend's next frame, then for the settle wait (fonts, reflow).
//! 3. Read every top-level box: border-box height plus resolved vertical margins.
//!
//! # Supersession
//! `request` keeps a single slot holding the newest request token and the handle
//! of the in-flight pass. A new request aborts the previous pass (its pending frame
//! wait and settle timer are dropped with the task) and overwrites the token. The
//! publish step re-checks the token under the slot lock, so a superseded pass can
//! never deliver results, even if it was already past its last await point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::blocks::{Block, Document};

#[derive(Debug, Error, PartialEq)]
pub enum MeasureError {
    #[error("measurement surface is not mounted")]
    NotMounted,

    #[error("layout backend returned {actual} boxes for {expected} blocks")]
    BoxCountMismatch { expected: usize, actual: usize },
}

/// Box metrics of one top-level child of the surface, in reference pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxMetrics {
    pub height_px: f32,
    pub margin_top_px: f32,
    pub margin_bottom_px: f32,
}

/// A block together with the height it measured at on the surface.
#[derive(Debug, Clone)]
pub struct MeasuredBlock {
    pub block: Arc<Block>,
    pub height_px: f32,
    pub margin_top_px: f32,
    pub margin_bottom_px: f32,
}

impl MeasuredBlock {
    /// Vertical space the block consumes on a page, margins included.
    pub fn total_height(&self) -> f32 {
        self.height_px + self.margin_top_px + self.margin_bottom_px
    }
}

impl PartialEq for MeasuredBlock {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.block, &other.block) || self.block == other.block)
            && self.height_px == other.height_px
            && self.margin_top_px == other.margin_top_px
            && self.margin_bottom_px == other.margin_bottom_px
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Backend seam
// ────────────────────────────────────────────────────────────────────────────

/// The rendering/layout engine that hosts the off-screen surface.
///
/// Only the three protocol steps are exposed, so the paginator and page container
/// never depend on which engine did the layout.
#[async_trait]
pub trait LayoutBackend: Send + Sync {
    fn is_mounted(&self) -> bool {
        true
    }

    /// Resolves once the engine has produced a layout frame for the surface.
    async fn next_frame(&self);

    /// Waits until asynchronous layout effects have settled.
    ///
    /// The default is a fixed delay. Engines that can signal "layout stable"
    /// directly should override this.
    async fn settle(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Reads the box metrics of every block, in document order.
    fn read_boxes(&self, document: &Document, content_width_px: f32) -> Vec<BoxMetrics>;
}

// ────────────────────────────────────────────────────────────────────────────
// Surface
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RequestSlot {
    latest: u64,
    in_flight: Option<JoinHandle<()>>,
}

pub struct MeasurementSurface {
    backend: Arc<dyn LayoutBackend>,
    content_width_px: f32,
    settle_delay: Duration,
    slot: Arc<Mutex<RequestSlot>>,
}

impl MeasurementSurface {
    pub fn new(backend: Arc<dyn LayoutBackend>, content_width_px: f32, settle_delay: Duration) -> Self {
        Self {
            backend,
            content_width_px,
            settle_delay,
            slot: Arc::new(Mutex::new(RequestSlot::default())),
        }
    }

    pub fn content_width_px(&self) -> f32 {
        self.content_width_px
    }

    /// Starts a measurement pass for `document`, superseding any pass in flight.
    ///
    /// `on_measured` runs at most once, and only if no newer request was made in
    /// the meantime. A pass that cannot measure (unmounted surface, backend
    /// mismatch) delivers an empty list. Returns the request token.
    pub fn request<F>(&self, document: Document, on_measured: F) -> u64
    where
        F: FnOnce(Vec<MeasuredBlock>) + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        slot.latest += 1;
        let token = slot.latest;

        if let Some(previous) = slot.in_flight.take() {
            previous.abort();
            debug!(token, "Measurement pass superseded");
        }

        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.slot);
        let width = self.content_width_px;
        let settle = self.settle_delay;

        let handle = tokio::spawn(async move {
            let measured = match run_pass(backend.as_ref(), &document, width, settle).await {
                Ok(measured) => measured,
                Err(e) => {
                    warn!(token, error = %e, "Measurement not ready, emitting empty result");
                    Vec::new()
                }
            };

            let mut slot = lock(&shared);
            if slot.latest != token {
                debug!(token, latest = slot.latest, "Discarding stale measurement");
                return;
            }
            slot.in_flight = None;
            debug!(token, blocks = measured.len(), "Measurement pass complete");
            on_measured(measured);
        });

        slot.in_flight = Some(handle);
        token
    }

    /// Runs one pass outside the supersession slot and returns its result directly.
    pub async fn measure_once(&self, document: &Document) -> Result<Vec<MeasuredBlock>, MeasureError> {
        run_pass(
            self.backend.as_ref(),
            document,
            self.content_width_px,
            self.settle_delay,
        )
        .await
    }

    /// Cancels the in-flight pass, if any. Its callback will never run.
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        slot.latest += 1;
        if let Some(previous) = slot.in_flight.take() {
            previous.abort();
        }
    }

    pub fn is_measuring(&self) -> bool {
        lock(&self.slot).in_flight.is_some()
    }
}

impl Drop for MeasurementSurface {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_pass(
    backend: &dyn LayoutBackend,
    document: &Document,
    content_width_px: f32,
    settle_delay: Duration,
) -> Result<Vec<MeasuredBlock>, MeasureError> {
    if document.is_empty() {
        return Ok(Vec::new());
    }
    if !backend.is_mounted() {
        return Err(MeasureError::NotMounted);
    }

    backend.next_frame().await;
    backend.settle(settle_delay).await;

    // The surface may have been torn down while we were waiting.
    if !backend.is_mounted() {
        return Err(MeasureError::NotMounted);
    }

    let boxes = backend.read_boxes(document, content_width_px);
    if boxes.len() != document.len() {
        return Err(MeasureError::BoxCountMismatch {
            expected: document.len(),
            actual: boxes.len(),
        });
    }

    Ok(document
        .blocks()
        .iter()
        .zip(boxes)
        .map(|(block, m)| MeasuredBlock {
            block: Arc::clone(block),
            height_px: m.height_px,
            margin_top_px: m.margin_top_px,
            margin_bottom_px: m.margin_bottom_px,
        })
        .collect())
}

fn lock(slot: &Mutex<RequestSlot>) -> MutexGuard<'_, RequestSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
