//! Paginator: greedy, order-preserving, non-splitting assignment of blocks to pages.
//!
//! # Rules
//! - Blocks keep their document order across all pages.
//! - A block is never split. A block taller than the usable height sits alone on
//!   its own page and overflows (clipped by the page container).
//! - A page is closed only when it is non-empty and the next block would overflow it.
//! - No input → one empty placeholder page ("still laying out").
//!
//! Pure function of `(measured blocks, usable height)`; nothing here knows about
//! preview scale, so the partition is identical for preview, sidebar and export.

use crate::layout::measure::MeasuredBlock;

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub index: usize,
    pub is_last: bool,
    pub blocks: Vec<MeasuredBlock>,
}

impl Page {
    pub fn is_placeholder(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn used_height(&self) -> f32 {
        self.blocks.iter().map(MeasuredBlock::total_height).sum()
    }

    /// True when the page holds a single block taller than the usable height.
    pub fn overflows(&self, usable_height_px: f32) -> bool {
        self.used_height() > usable_height_px
    }
}

/// The full ordered list of pages for one document and one usable height.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePartition {
    pub pages: Vec<Page>,
    pub usable_height_px: f32,
}

impl PagePartition {
    pub fn new(measured: &[MeasuredBlock], usable_height_px: f32) -> Self {
        Self {
            pages: paginate(measured, usable_height_px),
            usable_height_px,
        }
    }

    pub fn placeholder(usable_height_px: f32) -> Self {
        Self::new(&[], usable_height_px)
    }

    pub fn is_placeholder(&self) -> bool {
        self.pages.len() == 1 && self.pages[0].is_placeholder()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }
}

/// Assigns measured blocks to pages.
pub fn paginate(measured: &[MeasuredBlock], usable_height_px: f32) -> Vec<Page> {
    let mut groups: Vec<Vec<MeasuredBlock>> = Vec::new();
    let mut current: Vec<MeasuredBlock> = Vec::new();
    let mut used = 0.0_f32;

    for block in measured {
        let total = block.total_height();
        if used + total > usable_height_px && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
            used = 0.0;
        }
        current.push(block.clone());
        used += total;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    if groups.is_empty() {
        groups.push(Vec::new());
    }

    let count = groups.len();
    groups
        .into_iter()
        .enumerate()
        .map(|(i, blocks)| Page {
            index: i + 1,
            is_last: i + 1 == count,
            blocks,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
