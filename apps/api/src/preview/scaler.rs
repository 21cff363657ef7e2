//! Preview Scaler: presentation-only scale and visible-page tracking.
//!
//! Scale is applied after pagination and never feeds back into it: the tracker
//! only reads the published partition's page count.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::layout::PageFrame;
use crate::preview::session::PaginationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Vertical gap between consecutive scaled pages.
    pub page_gap_px: f32,
    /// Height of the page-number separator drawn between pages.
    pub separator_px: f32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.25,
            max_scale: 1.0,
            page_gap_px: 16.0,
            separator_px: 24.0,
        }
    }
}

/// `clamp(available_width / page_width, min, max)`.
///
/// A missing or degenerate width falls back to the minimum scale.
pub fn compute_scale(available_width_px: f32, page_width_px: f32, config: &ScaleConfig) -> f32 {
    if !available_width_px.is_finite() || available_width_px <= 0.0 || page_width_px <= 0.0 {
        return config.min_scale;
    }
    (available_width_px / page_width_px)
        .max(config.min_scale)
        .min(config.max_scale)
}

/// Vertical distance from one scaled page's top to the next one's.
pub fn page_stride(scaled_page_height_px: f32, config: &ScaleConfig) -> f32 {
    scaled_page_height_px + config.page_gap_px + config.separator_px
}

/// The page whose slot contains `scroll_top`, clamped to `[1, total_pages]`.
pub fn current_page(
    scroll_top_px: f32,
    scaled_page_height_px: f32,
    config: &ScaleConfig,
    total_pages: usize,
) -> usize {
    let total = total_pages.max(1);
    let stride = page_stride(scaled_page_height_px, config);
    if !scroll_top_px.is_finite() || scroll_top_px <= 0.0 || stride <= 0.0 {
        return 1;
    }
    let page = (scroll_top_px / stride).floor() as usize + 1;
    page.clamp(1, total)
}

/// Container inputs reported by the host: width from resize, offset from scroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportInputs {
    pub available_width_px: f32,
    pub scroll_top_px: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportState {
    pub inputs: ViewportInputs,
    pub scale: f32,
    pub current_page: usize,
    pub total_pages: usize,
}

pub fn compute_viewport(
    inputs: ViewportInputs,
    page_width_px: f32,
    page_height_px: f32,
    total_pages: usize,
    config: &ScaleConfig,
) -> ViewportState {
    let scale = compute_scale(inputs.available_width_px, page_width_px, config);
    ViewportState {
        inputs,
        scale,
        current_page: current_page(inputs.scroll_top_px, page_height_px * scale, config, total_pages),
        total_pages: total_pages.max(1),
    }
}

/// Presentation size and offset of one page at the current scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledPage {
    pub index: usize,
    pub scale: f32,
    pub width_px: f32,
    pub height_px: f32,
    pub offset_top_px: f32,
}

pub fn scaled_pages(frames: &[PageFrame], scale: f32, config: &ScaleConfig) -> Vec<ScaledPage> {
    let mut offset = 0.0_f32;
    frames
        .iter()
        .map(|frame| {
            let height_px = frame.height_px * scale;
            let page = ScaledPage {
                index: frame.index,
                scale,
                width_px: frame.width_px * scale,
                height_px,
                offset_top_px: offset,
            };
            offset += page_stride(height_px, config);
            page
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tracker
// ────────────────────────────────────────────────────────────────────────────

/// Subscription to container resize/scroll and to partition updates.
///
/// The background task lives exactly as long as the tracker.
pub struct ViewportTracker {
    inputs: watch::Sender<ViewportInputs>,
    state: watch::Receiver<ViewportState>,
    task: JoinHandle<()>,
}

impl ViewportTracker {
    pub fn spawn(
        page_width_px: f32,
        page_height_px: f32,
        config: ScaleConfig,
        mut pages: watch::Receiver<PaginationSnapshot>,
    ) -> Self {
        let initial_inputs = ViewportInputs {
            available_width_px: page_width_px,
            scroll_top_px: 0.0,
        };
        let (inputs_tx, mut inputs_rx) = watch::channel(initial_inputs);
        let initial = compute_viewport(
            initial_inputs,
            page_width_px,
            page_height_px,
            pages.borrow().partition.page_count(),
            &config,
        );
        let (state_tx, state_rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                let inputs = *inputs_rx.borrow_and_update();
                let total = pages.borrow_and_update().partition.page_count();
                let next = compute_viewport(inputs, page_width_px, page_height_px, total, &config);
                state_tx.send_replace(next);

                tokio::select! {
                    changed = inputs_rx.changed() => if changed.is_err() { break },
                    changed = pages.changed() => if changed.is_err() { break },
                }
            }
            debug!("Viewport tracker stopped");
        });

        Self {
            inputs: inputs_tx,
            state: state_rx,
            task,
        }
    }

    pub fn resize(&self, available_width_px: f32) {
        self.inputs
            .send_modify(|i| i.available_width_px = available_width_px);
    }

    pub fn scroll(&self, scroll_top_px: f32) {
        self.inputs.send_modify(|i| i.scroll_top_px = scroll_top_px);
    }

    pub fn inputs(&self) -> ViewportInputs {
        *self.inputs.borrow()
    }

    pub fn state(&self) -> ViewportState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewportState> {
        self.state.clone()
    }

    /// Waits until the published state reflects `inputs`.
    pub async fn settled(&self, inputs: ViewportInputs) -> Option<ViewportState> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| s.inputs == inputs).await.ok().map(|s| *s)
    }
}

impl Drop for ViewportTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
