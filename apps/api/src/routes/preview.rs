use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::export_session;
use crate::layout::PageFrame;
use crate::models::resume::ResumeData;
use crate::preview::{scaled_pages, PreviewSession, ScaledPage, ViewportInputs, ViewportState};
use crate::state::AppState;

/// Upper bound on how long a viewport request waits for the tracker to catch up.
const VIEWPORT_SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Serialize)]
pub struct SubmitResponse {
    pub resume_id: Uuid,
    /// False when the snapshot rendered to the same document as before.
    pub remeasuring: bool,
    pub revision: u64,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub resume_id: Uuid,
    pub revision: u64,
    /// Only the placeholder page exists so far.
    pub laying_out: bool,
    pub measuring: bool,
    pub page_count: usize,
    pub usable_height_px: f32,
    pub pages: Vec<PageFrame>,
    pub viewport: ViewportState,
    pub scaled_pages: Vec<ScaledPage>,
}

#[derive(Debug, Deserialize)]
pub struct ViewportRequest {
    pub available_width_px: Option<f32>,
    pub scroll_top_px: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct UsableHeightRequest {
    /// Omitted or null restores the page geometry's own budget.
    pub usable_height_px: Option<f32>,
}

#[derive(Serialize)]
pub struct ViewportResponse {
    pub viewport: ViewportState,
    pub pages: Vec<ScaledPage>,
}

/// PUT /api/v1/preview/:resume_id
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(data): Json<ResumeData>,
) -> (StatusCode, Json<SubmitResponse>) {
    let session = state.open_session(resume_id);
    let remeasuring = session.update(&data);
    (
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            resume_id,
            remeasuring,
            revision: session.snapshot().revision,
        }),
    )
}

/// GET /api/v1/preview/:resume_id
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, AppError> {
    let session = state
        .session(resume_id)
        .ok_or_else(|| AppError::NotFound(format!("No preview session for resume {resume_id}")))?;

    Ok(Json(preview_response(resume_id, &session)))
}

/// PUT /api/v1/preview/:resume_id/usable-height
/// Re-paginates the last measurement against a new page height budget.
pub async fn handle_usable_height(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(req): Json<UsableHeightRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let session = state
        .session(resume_id)
        .ok_or_else(|| AppError::NotFound(format!("No preview session for resume {resume_id}")))?;

    let usable_height_px = match req.usable_height_px {
        Some(height) if !height.is_finite() || height <= 0.0 => {
            return Err(AppError::Validation(
                "usable_height_px must be a positive number".to_string(),
            ));
        }
        Some(height) => height,
        None => session.geometry().usable_height_px(),
    };
    session.set_usable_height(usable_height_px);

    Ok(Json(preview_response(resume_id, &session)))
}

fn preview_response(resume_id: Uuid, session: &PreviewSession) -> PreviewResponse {
    let snapshot = session.snapshot();
    let pages = session.frames();
    let viewport = session.viewport().state();
    PreviewResponse {
        resume_id,
        revision: snapshot.revision,
        laying_out: snapshot.is_laying_out(),
        measuring: session.is_measuring(),
        page_count: snapshot.partition.page_count(),
        usable_height_px: snapshot.partition.usable_height_px,
        scaled_pages: scaled_pages(&pages, viewport.scale, &session.scale_config()),
        pages,
        viewport,
    }
}

/// POST /api/v1/preview/:resume_id/viewport
pub async fn handle_viewport(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(req): Json<ViewportRequest>,
) -> Result<Json<ViewportResponse>, AppError> {
    let session = state
        .session(resume_id)
        .ok_or_else(|| AppError::NotFound(format!("No preview session for resume {resume_id}")))?;

    if let Some(width) = req.available_width_px {
        if !width.is_finite() || width < 0.0 {
            return Err(AppError::Validation(
                "available_width_px must be a non-negative number".to_string(),
            ));
        }
    }
    if let Some(scroll) = req.scroll_top_px {
        if !scroll.is_finite() {
            return Err(AppError::Validation(
                "scroll_top_px must be a finite number".to_string(),
            ));
        }
    }

    let tracker = session.viewport();
    if let Some(width) = req.available_width_px {
        tracker.resize(width);
    }
    if let Some(scroll) = req.scroll_top_px {
        tracker.scroll(scroll);
    }

    let inputs: ViewportInputs = tracker.inputs();
    let viewport = tokio::time::timeout(VIEWPORT_SETTLE_TIMEOUT, tracker.settled(inputs))
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| tracker.state());

    Ok(Json(ViewportResponse {
        pages: scaled_pages(&session.frames(), viewport.scale, &session.scale_config()),
        viewport,
    }))
}

/// DELETE /api/v1/preview/:resume_id
pub async fn handle_close(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.registry.remove(resume_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No preview session for resume {resume_id}")))
    }
}

/// GET /api/v1/preview/:resume_id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = state
        .session(resume_id)
        .ok_or_else(|| AppError::NotFound(format!("No preview session for resume {resume_id}")))?;

    let artifact = export_session(&session).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, artifact.content_disposition()),
        ],
        artifact.bytes,
    )
        .into_response())
}
