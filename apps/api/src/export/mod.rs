// Export Adapter
// Turns the page partition of a preview session into a downloadable PDF. The
// export path reads session state but never publishes to it.

pub mod pdf;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::layout::{layout_pages, MeasureError};
use crate::preview::PreviewSession;

const DEFAULT_FILENAME: &str = "resume.pdf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: no resume content has been submitted")]
    NothingToExport,

    #[error("measurement failed: {0}")]
    Measurement(#[from] MeasureError),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Bytes,
    pub page_count: usize,
}

impl ExportArtifact {
    /// `Content-Disposition` value with an ASCII fallback and an RFC 5987 name.
    pub fn content_disposition(&self) -> String {
        let fallback: String = self
            .filename
            .chars()
            .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
            .filter(|&c| c != '"' && c != '\\')
            .collect();
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(&self.filename)
        )
    }
}

/// Renders the session's latest document to PDF.
pub async fn export_session(session: &PreviewSession) -> Result<ExportArtifact, ExportError> {
    let partition = session.partition_for_latest().await?;
    if partition.block_count() == 0 {
        return Err(ExportError::NothingToExport);
    }

    let frames = layout_pages(&partition, &session.geometry());
    let page_count = frames.len();
    let bytes = tokio::task::spawn_blocking(move || pdf::render_pdf(&frames))
        .await
        .map_err(|e| ExportError::Render(e.to_string()))?;

    let filename = artifact_filename(session.latest_title().as_deref());
    info!(
        session = %session.id(),
        pages = page_count,
        bytes = bytes.len(),
        filename = %filename,
        "Exported resume"
    );

    Ok(ExportArtifact {
        filename,
        bytes: Bytes::from(bytes),
        page_count,
    })
}

/// File name derived from the resume title.
///
/// Path separators, reserved and control characters are dropped, whitespace runs
/// collapse to one space, and `.pdf` is appended. A blank title gives `resume.pdf`.
pub fn artifact_filename(title: Option<&str>) -> String {
    let cleaned: String = title
        .unwrap_or_default()
        .chars()
        .filter(|&c| !c.is_control() && !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let stem = stem.trim_matches('.');

    if stem.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.to_string()
    } else {
        format!("{stem}.pdf")
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::tests::FakeBackend;
    use crate::layout::{LayoutBackend, MetricLayoutBackend, PageGeometry};
    use crate::models::resume::ResumeData;
    use crate::preview::{ScaleConfig, SessionSettings};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn session(backend: Arc<dyn LayoutBackend>) -> PreviewSession {
        PreviewSession::new(
            Uuid::new_v4(),
            backend,
            SessionSettings {
                geometry: PageGeometry::a4(),
                settle_delay: Duration::from_millis(200),
                scale: ScaleConfig::default(),
            },
        )
    }

    fn data() -> ResumeData {
        ResumeData {
            title: Some("Backend Engineer".to_string()),
            full_name: "Lin Wei".to_string(),
            email: "lin@example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filename_from_title() {
        assert_eq!(artifact_filename(Some("Backend Engineer")), "Backend Engineer.pdf");
        assert_eq!(artifact_filename(Some("  a/b:c  ")), "abc.pdf");
        assert_eq!(artifact_filename(Some("cv.PDF")), "cv.PDF");
        assert_eq!(artifact_filename(Some("   ")), "resume.pdf");
        assert_eq!(artifact_filename(Some("..")), "resume.pdf");
        assert_eq!(artifact_filename(None), "resume.pdf");
        assert_eq!(artifact_filename(Some("前端 简历")), "前端 简历.pdf");
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii() {
        let artifact = ExportArtifact {
            filename: "简历 v2.pdf".to_string(),
            bytes: Bytes::new(),
            page_count: 1,
        };
        let header = artifact.content_disposition();
        assert!(header.starts_with("attachment; filename=\"__ v2.pdf\""), "{header}");
        assert!(header.ends_with("filename*=UTF-8''%E7%AE%80%E5%8E%86%20v2.pdf"), "{header}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_without_content_fails() {
        let s = session(Arc::new(MetricLayoutBackend::new(Duration::from_millis(16))));
        let err = export_session(&s).await.unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport));
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_uses_published_partition_without_remeasuring() {
        let backend = Arc::new(FakeBackend::new());
        let s = session(backend.clone());
        s.update(&data());
        tokio::time::sleep(Duration::from_secs(1)).await;
        let before = s.snapshot();

        let artifact = export_session(&s).await.unwrap();
        assert_eq!(artifact.filename, "Backend Engineer.pdf");
        assert_eq!(artifact.page_count, before.partition.page_count());
        assert!(artifact.bytes.starts_with(b"%PDF-"));
        assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
        assert_eq!(s.snapshot().revision, before.revision);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_measures_when_only_placeholder_exists() {
        let backend = Arc::new(FakeBackend::new());
        let s = session(backend.clone());
        s.update(&data());

        let artifact = export_session(&s).await.unwrap();
        assert_eq!(artifact.page_count, 1);
        assert!(backend.reads.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_reports_unmounted_surface() {
        let backend = Arc::new(FakeBackend::new());
        backend.mounted.store(false, Ordering::SeqCst);
        let s = session(backend.clone());
        s.update(&data());

        let err = export_session(&s).await.unwrap_err();
        assert!(matches!(err, ExportError::Measurement(MeasureError::NotMounted)));
    }
}
