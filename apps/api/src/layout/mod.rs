// Layout: measurement, pagination and physical page frames.
// Everything here works in unscaled reference pixels; preview scaling lives in `preview`.

pub mod font_metrics;
pub mod geometry;
pub mod measure;
pub mod metric_backend;
pub mod page;
pub mod paginator;
pub mod text;

// Re-export the public API consumed by preview, export and routes.
pub use geometry::PageGeometry;
pub use measure::{LayoutBackend, MeasureError, MeasuredBlock, MeasurementSurface};
pub use metric_backend::MetricLayoutBackend;
pub use page::{layout_pages, PageFrame};
pub use paginator::{paginate, Page, PagePartition};
