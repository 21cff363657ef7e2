// Live preview: per-resume sessions that keep the newest partition published,
// plus the presentation-only scaler.

pub mod scaler;
pub mod session;

pub use scaler::{scaled_pages, ScaleConfig, ScaledPage, ViewportInputs, ViewportState};
pub use session::{PaginationSnapshot, PreviewRegistry, PreviewSession, SessionSettings};
