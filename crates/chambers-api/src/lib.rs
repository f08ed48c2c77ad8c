#![forbid(unsafe_code)]

pub mod error_mapping;
pub mod errors;
pub mod metadata;
pub mod openapi;
pub mod params;
pub mod responses;

pub use error_mapping::{map_error, status_for, ApiErrorMapping, API_ERROR_SCHEMA_REF};
pub use errors::{ApiError, ApiErrorCode, UNKNOWN_REQUEST_ID};
pub use metadata::{PageMetadata, SiteIdentity};
pub use openapi::openapi_v1_spec;
pub use params::{
    parse_bool_flag, parse_category, parse_contact_status_filter, parse_id, parse_pagination,
    parse_pagination_with_limit, parse_storage_target, required_email_param, Pagination,
    StorageTarget,
};
pub use responses::{ApiResponseEnvelope, ListEnvelope};

pub const CRATE_NAME: &str = "chambers-api";
pub const API_VERSION: &str = "v1";
