// Block Renderer
// Turns a resume snapshot into the ordered list of atomic content blocks that the
// measurement surface, the paginator and the page container all share by reference.

pub mod sections;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::FontFace;
use crate::layout::geometry::mm_to_px;

pub use sections::render_blocks;

// ────────────────────────────────────────────────────────────────────────────
// Block types
// ────────────────────────────────────────────────────────────────────────────

/// Section type of a block. Declaration order is the canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    Education,
    Experience,
    Projects,
    Skills,
    Languages,
    Awards,
    Portfolio,
    SocialLinks,
    Summary,
}

impl BlockKind {
    pub fn title(&self) -> &'static str {
        match self {
            BlockKind::Header => "",
            BlockKind::Education => "Education",
            BlockKind::Experience => "Experience",
            BlockKind::Projects => "Projects",
            BlockKind::Skills => "Skills",
            BlockKind::Languages => "Languages",
            BlockKind::Awards => "Awards",
            BlockKind::Portfolio => "Portfolio",
            BlockKind::SocialLinks => "Social Links",
            BlockKind::Summary => "Summary",
        }
    }
}

/// Stable identity of a block within one document: position plus section type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub index: usize,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub face: FontFace,
    pub size_px: f32,
    /// Multiplier applied to `size_px` to get the line box height.
    pub line_height: f32,
}

impl TextStyle {
    pub const NAME: TextStyle = TextStyle {
        face: FontFace::Bold,
        size_px: 24.0,
        line_height: 1.3,
    };
    pub const SECTION_TITLE: TextStyle = TextStyle {
        face: FontFace::Bold,
        size_px: 15.0,
        line_height: 1.4,
    };
    pub const ENTRY_HEADING: TextStyle = TextStyle {
        face: FontFace::Bold,
        size_px: 13.0,
        line_height: 1.5,
    };
    pub const BODY: TextStyle = TextStyle {
        face: FontFace::Regular,
        size_px: 12.0,
        line_height: 1.5,
    };

    pub fn line_box_px(&self) -> f32 {
        self.size_px * self.line_height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub style: TextStyle,
    /// Vertical gap above this paragraph inside the block.
    pub space_before_px: f32,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            space_before_px: 0.0,
        }
    }

    pub fn spaced(text: impl Into<String>, style: TextStyle, space_before_px: f32) -> Self {
        Self {
            text: text.into(),
            style,
            space_before_px,
        }
    }
}

/// Avatar frame reserved at the right edge of the header block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarBox {
    pub width_px: f32,
    pub height_px: f32,
}

pub const AVATAR_WIDTH_MM: f32 = 25.0;
pub const AVATAR_GAP_PX: f32 = 12.0;

impl AvatarBox {
    pub fn with_ratio(ratio: f32) -> Self {
        let width_px = mm_to_px(AVATAR_WIDTH_MM);
        Self {
            width_px,
            height_px: width_px * ratio,
        }
    }
}

/// One atomic, non-splittable unit of document content.
///
/// Blocks are handed around as `Arc<Block>`: the measurement pass and the final
/// page render hold the very same allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub paragraphs: Vec<Paragraph>,
    pub avatar: Option<AvatarBox>,
    pub margin_top_px: f32,
    pub margin_bottom_px: f32,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        self.id.kind
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        for p in &self.paragraphs {
            p.text.hash(state);
            p.style.face.hash(state);
            p.style.size_px.to_bits().hash(state);
            p.style.line_height.to_bits().hash(state);
            p.space_before_px.to_bits().hash(state);
        }
        if let Some(avatar) = &self.avatar {
            avatar.width_px.to_bits().hash(state);
            avatar.height_px.to_bits().hash(state);
        }
        self.margin_top_px.to_bits().hash(state);
        self.margin_bottom_px.to_bits().hash(state);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

/// The full ordered block sequence for one data snapshot.
///
/// `fingerprint` is a content hash: two snapshots that render to the same blocks
/// share it, which lets callers skip re-measuring after a no-op edit.
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Arc<[Arc<Block>]>,
    fingerprint: u64,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        let mut hasher = DefaultHasher::new();
        for block in &blocks {
            block.hash_into(&mut hasher);
        }
        let fingerprint = hasher.finish();
        Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            fingerprint,
        }
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
