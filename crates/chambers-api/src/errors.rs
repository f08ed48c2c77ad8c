// SPDX-License-Identifier: Apache-2.0

use chambers_model::ValidationErrors;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

pub const UNKNOWN_REQUEST_ID: &str = "req-unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidQueryParameter,
    ValidationFailed,
    NotFound,
    Conflict,
    Unauthorized,
    RateLimited,
    PayloadTooLarge,
    UnsupportedMediaType,
    NotReady,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: [Self; 10] = [
        Self::InvalidQueryParameter,
        Self::ValidationFailed,
        Self::NotFound,
        Self::Conflict,
        Self::Unauthorized,
        Self::RateLimited,
        Self::PayloadTooLarge,
        Self::UnsupportedMediaType,
        Self::NotReady,
        Self::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQueryParameter => "InvalidQueryParameter",
            Self::ValidationFailed => "ValidationFailed",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::RateLimited => "RateLimited",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::NotReady => "NotReady",
            Self::Internal => "Internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: UNKNOWN_REQUEST_ID.to_string(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidQueryParameter,
            format!("invalid query parameter: {name}"),
            json!({"parameter": name, "value": value}),
        )
    }

    #[must_use]
    pub fn validation_failed(errors: &ValidationErrors) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            "validation failed",
            json!({"field_errors": errors}),
        )
    }

    /// For failures with no field breakdown, such as unreadable bodies.
    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            "invalid request body",
            json!({"reason": reason.into()}),
        )
    }

    #[must_use]
    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{resource} not found"),
            json!({"resource": resource, "id": id}),
        )
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}))
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ApiErrorCode::Unauthorized,
            "authentication required",
            json!({}),
        )
    }

    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::new(
            ApiErrorCode::RateLimited,
            "rate limit exceeded",
            json!({"retry_after_secs": retry_after_secs}),
        )
    }

    #[must_use]
    pub fn payload_too_large(limit_bytes: u64) -> Self {
        Self::new(
            ApiErrorCode::PayloadTooLarge,
            "payload too large",
            json!({"limit_bytes": limit_bytes}),
        )
    }

    #[must_use]
    pub fn unsupported_media_type(mime: &str) -> Self {
        Self::new(
            ApiErrorCode::UnsupportedMediaType,
            format!("unsupported media type: {mime}"),
            json!({"mime_type": mime}),
        )
    }

    #[must_use]
    pub fn not_ready(reason: &str) -> Self {
        Self::new(ApiErrorCode::NotReady, "service not ready", json!({"reason": reason}))
    }

    /// Internal detail stays in the server log; clients only see a generic message.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal server error", json!({}))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(&errors)
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de> + Send + Sync>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiError>();
};
