//! Headless layout backend built on the static font-metric tables.

use std::time::Duration;

use async_trait::async_trait;

use crate::blocks::Document;
use crate::layout::measure::{BoxMetrics, LayoutBackend};
use crate::layout::text::layout_block;

/// Lays blocks out with `layout_block`, the same routine the PDF export uses.
///
/// There is no real frame clock, so `next_frame` waits one configured frame
/// interval to keep the measurement protocol's timing observable.
#[derive(Debug, Clone)]
pub struct MetricLayoutBackend {
    frame_interval: Duration,
}

impl MetricLayoutBackend {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

#[async_trait]
impl LayoutBackend for MetricLayoutBackend {
    async fn next_frame(&self) {
        if self.frame_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.frame_interval).await;
        }
    }

    fn read_boxes(&self, document: &Document, content_width_px: f32) -> Vec<BoxMetrics> {
        document
            .blocks()
            .iter()
            .map(|block| BoxMetrics {
                height_px: layout_block(block, content_width_px).height_px,
                margin_top_px: block.margin_top_px,
                margin_bottom_px: block.margin_bottom_px,
            })
            .collect()
    }
}
