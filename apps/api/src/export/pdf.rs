//! PDF writer for laid-out page frames.
//!
//! Lines come from `layout_block`, the same routine the metric backend measures
//! with, so every line lands where the page container put it. Coordinates are
//! converted from top-left reference pixels to bottom-left PDF points.

use pdf_writer::{Content, Name, Pdf, Rect as PdfRect, Ref, Str};
use tracing::debug;

use crate::layout::font_metrics::FontFace;
use crate::layout::geometry::px_to_pt;
use crate::layout::page::{PageFrame, Rect};
use crate::layout::text::{layout_block, PositionedLine};

/// Baseline offset from the top of the glyph's em box, as a fraction of size.
const ASCENT_RATIO: f32 = 0.8;
const AVATAR_STROKE_GRAY: f32 = 0.75;

/// Renders one PDF page per frame. All frames share the document's geometry.
pub fn render_pdf(frames: &[PageFrame]) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let regular_id = alloc();
    let bold_id = alloc();

    for (face, font_ref) in [(FontFace::Regular, regular_id), (FontFace::Bold, bold_id)] {
        pdf.type1_font(font_ref)
            .base_font(Name(face.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    let page_ids: Vec<(Ref, Ref)> = frames.iter().map(|_| (alloc(), alloc())).collect();

    for (frame, &(page_id, content_id)) in frames.iter().zip(&page_ids) {
        let raw = page_content(frame).finish();
        pdf.stream(content_id, raw.as_slice());

        let mut page = pdf.page(page_id);
        page.media_box(PdfRect::new(
            0.0,
            0.0,
            px_to_pt(frame.width_px),
            px_to_pt(frame.height_px),
        ))
        .parent(pages_id)
        .contents(content_id);
        page.resources()
            .fonts()
            .pair(Name(FontFace::Regular.resource_name().as_bytes()), regular_id)
            .pair(Name(FontFace::Bold.resource_name().as_bytes()), bold_id);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().map(|&(page_id, _)| page_id))
        .count(frames.len() as i32);

    let bytes = pdf.finish();
    debug!(pages = frames.len(), bytes = bytes.len(), "Rendered PDF");
    bytes
}

fn page_content(frame: &PageFrame) -> Content {
    let page_h_pt = px_to_pt(frame.height_px);
    let cb = frame.content_box;
    let mut content = Content::new();

    // Everything outside the content box is clipped, as on screen.
    content.save_state();
    let (x, y, w, h) = to_pdf_rect(&cb, page_h_pt);
    content.rect(x, y, w, h).clip_nonzero().end_path();

    for placed in &frame.blocks {
        let layout = layout_block(&placed.block, cb.width_px);
        let block_top = cb.y_px + placed.top_px;

        if let Some(avatar) = &layout.avatar {
            let (x, y, w, h) = to_pdf_rect(
                &Rect {
                    x_px: cb.x_px + avatar.x_px,
                    y_px: block_top + avatar.y_px,
                    width_px: avatar.frame.width_px,
                    height_px: avatar.frame.height_px,
                },
                page_h_pt,
            );
            content
                .save_state()
                .set_line_width(0.5)
                .set_stroke_gray(AVATAR_STROKE_GRAY)
                .rect(x, y, w, h)
                .stroke()
                .restore_state();
        }

        for line in &layout.lines {
            draw_line(&mut content, line, cb.x_px, block_top, page_h_pt);
        }
    }

    content.restore_state();
    content
}

fn draw_line(content: &mut Content, line: &PositionedLine, origin_x_px: f32, block_top_px: f32, page_h_pt: f32) {
    let style = line.style;
    let half_leading = (style.line_box_px() - style.size_px) / 2.0;
    let baseline_px = block_top_px + line.top_px + half_leading + ASCENT_RATIO * style.size_px;

    let bytes = to_winansi(&line.text);
    content
        .begin_text()
        .set_font(Name(style.face.resource_name().as_bytes()), px_to_pt(style.size_px))
        .next_line(px_to_pt(origin_x_px + line.x_px), page_h_pt - px_to_pt(baseline_px))
        .show(Str(&bytes))
        .end_text();
}

/// Top-left pixel rect to PDF `(x, y, width, height)` in points.
fn to_pdf_rect(rect: &Rect, page_h_pt: f32) -> (f32, f32, f32, f32) {
    let w = px_to_pt(rect.width_px);
    let h = px_to_pt(rect.height_px);
    (
        px_to_pt(rect.x_px),
        page_h_pt - px_to_pt(rect.y_px) - h,
        w,
        h,
    )
}

/// Encodes text for the WinAnsi base-14 fonts. Characters outside the code page
/// are written as `?`.
pub(crate) fn to_winansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E => c as u8,
            0xA0..=0xFF => c as u8,
            0x20AC => 0x80,
            0x2026 => 0x85,
            0x2018 => 0x91,
            0x2019 => 0x92,
            0x201C => 0x93,
            0x201D => 0x94,
            0x2022 => 0x95,
            0x2013 => 0x96,
            0x2014 => 0x97,
            0x2122 => 0x99,
            _ => b'?',
        })
        .collect()
}
