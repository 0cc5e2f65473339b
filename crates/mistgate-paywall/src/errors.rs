//! Error responses for the paywall routes.

use std::fmt::Display;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use base64::{Engine, prelude::BASE64_STANDARD};
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use tracing::warn;

use mistgate_core::errors::Error;
use mistgate_kit::challenge::AccessChallenge;

/// Header carrying the base64-encoded challenge alongside the 402 body.
pub const PAYMENT_REQUIRED_HEADER: &str = "payment-required";

/// JSON body of every non-2xx response that is not a challenge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub reason: String,
}

/// Typed error response from the paywall routes.
#[derive(Debug, Clone)]
pub enum ErrorResponse {
    /// 402 with the challenge as body and header.
    PaymentRequired(Box<AccessChallenge>),
    Status { status: StatusCode, body: ErrorBody },
}

impl ErrorResponse {
    pub fn payment_required(challenge: AccessChallenge) -> Self {
        ErrorResponse::PaymentRequired(Box::new(challenge))
    }

    pub fn bad_request(reason: impl Display) -> Self {
        ErrorResponse::Status {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "invalidInput".to_string(),
                reason: reason.to_string(),
            },
        }
    }

    pub fn not_found(content_id: &str) -> Self {
        ErrorResponse::Status {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error: "notFound".to_string(),
                reason: format!("content not found: {content_id}"),
            },
        }
    }
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        let (status, error) = match &err {
            Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "invalidInput"),
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "notFound"),
            Error::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Error::UpstreamQueryFailed { .. } => (StatusCode::BAD_GATEWAY, "upstreamQueryFailed"),
            Error::ExecutionFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "executionFailed")
            }
        };
        ErrorResponse::Status {
            status,
            body: ErrorBody {
                error: error.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        match self {
            ErrorResponse::PaymentRequired(challenge) => {
                let header = serde_json::to_string(challenge.as_ref())
                    .inspect_err(|err| {
                        warn!("failed to encode challenge header: {err}; skipping")
                    })
                    .ok()
                    .map(|json| BASE64_STANDARD.encode(json))
                    .and_then(|encoded| HeaderValue::from_str(&encoded).ok());

                let mut response =
                    (StatusCode::PAYMENT_REQUIRED, Json(*challenge)).into_response();
                if let Some(header) = header {
                    response.headers_mut().insert(PAYMENT_REQUIRED_HEADER, header);
                }
                response
            }
            ErrorResponse::Status { status, body } => (status, Json(body)).into_response(),
        }
    }
}
