//! RFC9457-style problem responses.
//!
//! Only two documents ever leave the gate: one for a missing header and one
//! shared by every other rejection.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::constants::{PROBLEM_AUTHORIZATION_FAILURE, PROBLEM_UNAUTHORIZED};
use crate::models::ProblemDetails;

/// Structured API error with RFC9457 fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn missing_authorization() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            PROBLEM_UNAUTHORIZED,
            "authentication required",
        )
        .with_detail("authorization header required")
    }

    pub(crate) fn authorization_failure() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            PROBLEM_AUTHORIZATION_FAILURE,
            "authorization failure",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
