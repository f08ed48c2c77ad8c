// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    pub schema_ref: &'static str,
}

#[must_use]
pub const fn status_for(code: ApiErrorCode) -> u16 {
    match code {
        ApiErrorCode::InvalidQueryParameter | ApiErrorCode::ValidationFailed => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict => 409,
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::UnsupportedMediaType => 415,
        ApiErrorCode::RateLimited => 429,
        ApiErrorCode::NotReady => 503,
        ApiErrorCode::Internal => 500,
    }
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    ApiErrorMapping {
        status_code: status_for(error.code),
        schema_ref: API_ERROR_SCHEMA_REF,
    }
}
