//! Physical page geometry shared by preview, sidebar and export.
//!
//! Layout works in CSS reference pixels (96 px per inch). Every consumer derives
//! its numbers from one `PageGeometry`, so page breaks cannot drift between them.

use serde::{Deserialize, Serialize};

pub const MM_PER_INCH: f32 = 25.4;
pub const PX_PER_INCH: f32 = 96.0;
pub const PT_PER_INCH: f32 = 72.0;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
pub const PAGE_MARGIN_MM: f32 = 18.0;

pub fn mm_to_px(mm: f32) -> f32 {
    mm * PX_PER_INCH / MM_PER_INCH
}

pub fn px_to_pt(px: f32) -> f32 {
    px * PT_PER_INCH / PX_PER_INCH
}

/// Page size and margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    /// Applied on all four sides.
    pub margin_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    pub const fn a4() -> Self {
        Self {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
            margin_mm: PAGE_MARGIN_MM,
        }
    }

    pub fn width_px(&self) -> f32 {
        mm_to_px(self.width_mm)
    }

    pub fn height_px(&self) -> f32 {
        mm_to_px(self.height_mm)
    }

    pub fn margin_px(&self) -> f32 {
        mm_to_px(self.margin_mm)
    }

    pub fn usable_width_mm(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn usable_height_mm(&self) -> f32 {
        self.height_mm - 2.0 * self.margin_mm
    }

    /// Width of the measurement surface and of every page's content box.
    pub fn usable_width_px(&self) -> f32 {
        mm_to_px(self.usable_width_mm())
    }

    /// Height budget handed to the paginator.
    pub fn usable_height_px(&self) -> f32 {
        mm_to_px(self.usable_height_mm())
    }
}
