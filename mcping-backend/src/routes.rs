use crate::AppState;
use crate::error::AppError;
use crate::helpers::{ClientIp, now_ms};
use crate::pipeline::StatusRequest;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_macros::debug_handler;
use mcping_motd::{
    Dialect, MAX_MOTD_LENGTH, MotdValidation, center_text, check_length, convert, decode_from_url,
    encode_for_url, gradient, strip_codes, to_html, validate_motd, visible_length,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct TextRequest {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreviewResponse {
    html: String,
    clean: String,
    visible_length: usize,
    validation: MotdValidation,
}

#[derive(Deserialize)]
pub(crate) struct ConvertRequest {
    text: String,
    format: String,
}

#[derive(Serialize)]
pub(crate) struct ConvertResponse {
    format: Dialect,
    output: String,
}

#[derive(Deserialize)]
pub(crate) struct GradientRequest {
    text: String,
    start: String,
    end: String,
}

#[derive(Serialize)]
pub(crate) struct GradientResponse {
    output: String,
    html: String,
}

#[derive(Deserialize)]
pub(crate) struct CenterRequest {
    text: String,
    width: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct OutputResponse {
    output: String,
}

#[derive(Serialize)]
pub(crate) struct ShareResponse {
    encoded: String,
}

#[derive(Deserialize)]
pub(crate) struct ShareQuery {
    data: String,
}

#[derive(Serialize)]
pub(crate) struct SharedText {
    text: String,
}

#[debug_handler]
pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(payload): Json<StatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.pipeline.check(payload, &ip, now_ms()).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[debug_handler]
pub(crate) async fn preview(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TextRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_length(&payload.text)?;

    Ok(Json(PreviewResponse {
        html: to_html(&payload.text),
        clean: strip_codes(&payload.text),
        visible_length: visible_length(&payload.text),
        validation: validate_motd(&payload.text, &state.motd_options),
    }))
}

pub(crate) async fn convert_format(
    Json(payload): Json<ConvertRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_length(&payload.text)?;
    let format: Dialect = payload.format.parse()?;

    Ok(Json(ConvertResponse {
        format,
        output: convert(&payload.text, format),
    }))
}

pub(crate) async fn gradient_text(
    Json(payload): Json<GradientRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_length(&payload.text)?;
    let output = gradient(&payload.text, &payload.start, &payload.end)?;

    Ok(Json(GradientResponse {
        html: to_html(&output),
        output,
    }))
}

#[debug_handler]
pub(crate) async fn center(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CenterRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_length(&payload.text)?;
    let width = payload.width.unwrap_or(state.motd_options.max_line_width);
    if width > MAX_MOTD_LENGTH {
        return Err(AppError::Validation(format!(
            "Line width must be at most {MAX_MOTD_LENGTH} (got {width})"
        )));
    }

    Ok(Json(OutputResponse {
        output: center_text(&payload.text, width),
    }))
}

pub(crate) async fn share(Json(payload): Json<TextRequest>) -> Result<impl IntoResponse, AppError> {
    check_length(&payload.text)?;

    Ok(Json(ShareResponse {
        encoded: encode_for_url(&payload.text),
    }))
}

pub(crate) async fn open_shared(
    Query(query): Query<ShareQuery>,
) -> Result<impl IntoResponse, AppError> {
    // Malformed links decode to an empty MOTD
    let text = decode_from_url(&query.data);
    check_length(&text)?;

    Ok(Json(SharedText { text }))
}
