use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use mcping_motd::{MotdError, UnknownDialect};
use mcping_store::{LimitReason, RateLimited};
use serde::Serialize;

use crate::lookup::LookupError;

/// API error response structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
  pub error: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remaining_time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<LimitReason>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      message: message.into(),
      remaining_time: None,
      reason: None,
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  Validation(String),
  Captcha(String),
  RateLimited(RateLimited),
  Lookup(LookupError),
  Motd(MotdError),
  Internal(String),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      AppError::Validation(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        (StatusCode::BAD_REQUEST, ErrorResponse::new("Invalid request", msg))
      }
      AppError::Captcha(msg) => {
        tracing::warn!(%msg, "Verification failed");
        (StatusCode::FORBIDDEN, ErrorResponse::new("Verification failed", msg))
      }
      AppError::RateLimited(limited) => {
        tracing::warn!(reason = %limited.reason, remaining = limited.remaining_secs, "Rate limited");
        let message = match limited.reason {
          LimitReason::Ip => format!(
            "Too many requests. Please wait {} seconds before trying again.",
            limited.remaining_secs
          ),
          LimitReason::Hostname => format!(
            "This server was checked recently. Please wait {} seconds before checking it again.",
            limited.remaining_secs
          ),
        };
        let body = ErrorResponse {
          remaining_time: Some(limited.remaining_secs),
          reason: Some(limited.reason),
          ..ErrorResponse::new("Rate limit exceeded", message)
        };
        (StatusCode::TOO_MANY_REQUESTS, body)
      }
      AppError::Lookup(err) => {
        let (status, error) = match err {
          LookupError::Dns => (StatusCode::NOT_FOUND, "Server not found"),
          LookupError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timed out"),
          LookupError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
          LookupError::Offline | LookupError::Unavailable | LookupError::CircuitOpen => {
            tracing::error!(?err, "Status lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Lookup failed")
          }
        };
        (status, ErrorResponse::new(error, err.to_string()))
      }
      AppError::Motd(err) => {
        tracing::warn!(motd_error = %err, "MOTD request rejected");
        (StatusCode::BAD_REQUEST, ErrorResponse::new("Invalid MOTD", err.to_string()))
      }
      AppError::Internal(detail) => {
        // Don't expose internal details
        tracing::error!(%detail, "Internal error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          ErrorResponse::new(
            "Internal error",
            "An internal error occurred. Please try again later.",
          ),
        )
      }
    };

    (status, Json(body)).into_response()
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::Validation(err.to_string())
  }
}

impl From<RateLimited> for AppError {
  fn from(err: RateLimited) -> Self {
    AppError::RateLimited(err)
  }
}

impl From<LookupError> for AppError {
  fn from(err: LookupError) -> Self {
    AppError::Lookup(err)
  }
}

impl From<MotdError> for AppError {
  fn from(err: MotdError) -> Self {
    AppError::Motd(err)
  }
}

impl From<UnknownDialect> for AppError {
  fn from(err: UnknownDialect) -> Self {
    AppError::Validation(err.to_string())
  }
}
