//! Route handlers.
//!
//! Handlers validate the request on the async side and move model work onto
//! the blocking pool, where session locks may wait.

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::metadata::WriteOutcome;
use crate::output::{BirdInfoResponse, ErrorResponse, HealthResponse, RecognizeResponse};
use crate::pipeline::{
    self, BirdInfoQuery, RecognizeRequest, WriteCaptionRequest, WriteTitleRequest, parse_json,
};
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use std::sync::Arc;

/// Shared handler state.
pub type SharedContext = Arc<AppContext>;

/// `GET /health`
pub async fn health(State(context): State<SharedContext>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        context.yolo_available(),
        context.ebird_available(),
    ))
}

/// `POST /recognize`
pub async fn recognize(
    State(context): State<SharedContext>,
    body: Bytes,
) -> Result<Json<RecognizeResponse>> {
    let request: RecognizeRequest = parse_json(&body)?;
    let response = blocking(move || pipeline::recognize(&context, &request)).await?;
    Ok(Json(response))
}

/// `GET /bird/info?cn_name=`
pub async fn bird_info(
    State(context): State<SharedContext>,
    query: std::result::Result<Query<BirdInfoQuery>, QueryRejection>,
) -> Result<Json<BirdInfoResponse>> {
    let Query(query) = query.map_err(|e| Error::InvalidRequest {
        reason: e.body_text(),
    })?;
    let info = pipeline::bird_info(&context, query.cn_name()?)?;
    Ok(Json(BirdInfoResponse {
        success: true,
        info,
    }))
}

/// `POST /exif/write-title`
pub async fn write_title(
    State(context): State<SharedContext>,
    body: Bytes,
) -> Result<Json<WriteOutcome>> {
    let request: WriteTitleRequest = parse_json(&body)?;
    let (path, title) = request.fields()?;
    let title = title.to_string();
    let outcome =
        blocking(move || Ok(context.metadata_writer().write_title(&path, &title))).await?;
    Ok(Json(outcome))
}

/// `POST /exif/write-caption`
pub async fn write_caption(
    State(context): State<SharedContext>,
    body: Bytes,
) -> Result<Json<WriteOutcome>> {
    let request: WriteCaptionRequest = parse_json(&body)?;
    let (path, caption) = request.fields()?;
    let caption = caption.to_string();
    let outcome =
        blocking(move || Ok(context.metadata_writer().write_caption(&path, &caption))).await?;
    Ok(Json(outcome))
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            error: "no such endpoint".to_string(),
            traceback: None,
        }),
    )
}

/// Run `work` on the blocking pool; a panic becomes an internal error.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal {
            message: format!("worker task failed: {e}"),
        })?
}
