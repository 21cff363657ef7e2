//! Page Container: one fixed-size physical page with its blocks stacked in order.
//!
//! Frames are expressed in unscaled reference pixels. The preview scaler applies
//! its scale on top; the PDF export converts to points. Neither changes placement.

use std::sync::Arc;

use serde::Serialize;

use crate::blocks::{Block, BlockId};
use crate::layout::geometry::PageGeometry;
use crate::layout::paginator::{Page, PagePartition};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x_px: f32,
    pub y_px: f32,
    pub width_px: f32,
    pub height_px: f32,
}

/// A block positioned inside a page's content box.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedBlock {
    #[serde(skip)]
    pub block: Arc<Block>,
    pub id: BlockId,
    /// Top of the border box, relative to the content box.
    pub top_px: f32,
    pub height_px: f32,
    /// The block extends past the content box and is cut off there.
    pub clipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageFrame {
    pub index: usize,
    pub is_last: bool,
    pub width_px: f32,
    pub height_px: f32,
    pub margin_px: f32,
    /// Everything outside this box is clipped.
    pub content_box: Rect,
    pub blocks: Vec<PlacedBlock>,
}

impl PageFrame {
    /// Places `page` on a sheet of `geometry`.
    ///
    /// The content box is `usable_height_px` tall, the budget the page was
    /// paginated against, so overflow here matches overflow in the partition.
    pub fn layout(page: &Page, geometry: &PageGeometry, usable_height_px: f32) -> Self {
        let margin = geometry.margin_px();
        let content_box = Rect {
            x_px: margin,
            y_px: margin,
            width_px: geometry.usable_width_px(),
            height_px: usable_height_px,
        };

        let mut cursor = 0.0_f32;
        let blocks = page
            .blocks
            .iter()
            .map(|m| {
                let top_px = cursor + m.margin_top_px;
                cursor = top_px + m.height_px + m.margin_bottom_px;
                PlacedBlock {
                    block: Arc::clone(&m.block),
                    id: m.block.id,
                    top_px,
                    height_px: m.height_px,
                    clipped: top_px + m.height_px > content_box.height_px,
                }
            })
            .collect();

        Self {
            index: page.index,
            is_last: page.is_last,
            width_px: geometry.width_px(),
            height_px: geometry.height_px(),
            margin_px: margin,
            content_box,
            blocks,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// One frame per partition entry, in page order.
pub fn layout_pages(partition: &PagePartition, geometry: &PageGeometry) -> Vec<PageFrame> {
    partition
        .pages
        .iter()
        .map(|page| PageFrame::layout(page, geometry, partition.usable_height_px))
        .collect()
}
