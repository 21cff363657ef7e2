//! Line breaking and in-block line placement.
//!
//! Both the metric measurement backend and the PDF export lay blocks out through
//! `layout_block`, so a block occupies the same lines, in the same positions, in
//! preview and in export.

use serde::Serialize;

use crate::blocks::{AvatarBox, Block, TextStyle, AVATAR_GAP_PX};
use crate::layout::font_metrics::{get_metrics, FontMetricTable};

/// A single laid-out line, positioned relative to the block's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedLine {
    pub text: String,
    pub style: TextStyle,
    pub x_px: f32,
    /// Top edge of the line box.
    pub top_px: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedAvatar {
    pub x_px: f32,
    pub y_px: f32,
    pub frame: AvatarBox,
}

/// Result of laying one block out at a fixed width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockLayout {
    pub lines: Vec<PositionedLine>,
    pub avatar: Option<PlacedAvatar>,
    /// Border-box height (margins excluded).
    pub height_px: f32,
}

/// Greedy word wrap. Returns the text of each line.
///
/// Whitespace runs collapse to a single space. A word wider than the whole line
/// is broken between characters, which is also how unspaced CJK text wraps.
/// An empty or all-whitespace string returns no lines.
pub fn wrap_text(text: &str, metrics: &FontMetricTable, max_width_em: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_w = metrics.measure_str(word);

        if !current.is_empty() {
            if current_width + metrics.space_width + word_w <= max_width_em {
                current.push(' ');
                current.push_str(word);
                current_width += metrics.space_width + word_w;
                continue;
            }
            // Current line is full; push it and start the word on a fresh line.
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if word_w <= max_width_em {
            current.push_str(word);
            current_width = word_w;
        } else {
            for c in word.chars() {
                let cw = metrics.char_width(c);
                if !current.is_empty() && current_width + cw > max_width_em {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(c);
                current_width += cw;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lays a block out at the given content width.
///
/// Paragraph spacing is suppressed above the first visible line, so a block's
/// top edge is always its first line box.
pub fn layout_block(block: &Block, content_width_px: f32) -> BlockLayout {
    let text_width_px = match &block.avatar {
        Some(avatar) => (content_width_px - avatar.width_px - AVATAR_GAP_PX).max(0.0),
        None => content_width_px,
    };

    let mut lines = Vec::new();
    let mut y = 0.0_f32;

    for paragraph in &block.paragraphs {
        let style = paragraph.style;
        let wrapped = wrap_text(
            &paragraph.text,
            get_metrics(style.face),
            text_width_px / style.size_px,
        );
        if wrapped.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            y += paragraph.space_before_px;
        }
        for text in wrapped {
            lines.push(PositionedLine {
                text,
                style,
                x_px: 0.0,
                top_px: y,
            });
            y += style.line_box_px();
        }
    }

    let avatar = block.avatar.map(|frame| PlacedAvatar {
        x_px: content_width_px - frame.width_px,
        y_px: 0.0,
        frame,
    });
    let height_px = match &avatar {
        Some(a) => y.max(a.frame.height_px),
        None => y,
    };

    BlockLayout {
        lines,
        avatar,
        height_px,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
