use crate::errors::ApiError;
use chambers_model::ContactStatus;
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
pub const MAX_PAGE_OFFSET: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Where an uploaded image is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTarget {
    Database,
    Disk,
}

impl StorageTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "db",
            Self::Disk => "disk",
        }
    }
}

pub fn parse_pagination(query: &BTreeMap<String, String>) -> Result<Pagination, ApiError> {
    parse_pagination_with_limit(query, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
}

pub fn parse_pagination_with_limit(
    query: &BTreeMap<String, String>,
    default_limit: u32,
    max_limit: u32,
) -> Result<Pagination, ApiError> {
    let limit = match query.get("limit") {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ApiError::invalid_param("limit", raw))?;
            if value == 0 || value > max_limit {
                return Err(ApiError::invalid_param("limit", raw));
            }
            value
        }
        None => default_limit,
    };
    let offset = match query.get("offset") {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ApiError::invalid_param("offset", raw))?;
            if value > MAX_PAGE_OFFSET {
                return Err(ApiError::invalid_param("offset", raw));
            }
            value
        }
        None => 0,
    };
    Ok(Pagination { limit, offset })
}

/// `1`/`true`/`yes` and `0`/`false`/`no`; absent means `false`.
pub fn parse_bool_flag(query: &BTreeMap<String, String>, name: &str) -> Result<bool, ApiError> {
    let Some(raw) = query.get(name) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ApiError::invalid_param(name, raw)),
    }
}

pub fn parse_contact_status_filter(
    query: &BTreeMap<String, String>,
) -> Result<Option<ContactStatus>, ApiError> {
    match query.get("status").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => ContactStatus::parse(raw)
            .map(Some)
            .map_err(|_| ApiError::invalid_param("status", raw)),
    }
}

pub fn parse_storage_target(query: &BTreeMap<String, String>) -> Result<StorageTarget, ApiError> {
    match query.get("storage").map(|s| s.trim()) {
        None | Some("") | Some("db") => Ok(StorageTarget::Database),
        Some("disk") => Ok(StorageTarget::Disk),
        Some(other) => Err(ApiError::invalid_param("storage", other)),
    }
}

pub fn parse_category(query: &BTreeMap<String, String>) -> Result<Option<String>, ApiError> {
    let Some(raw) = query.get("category").map(|s| s.trim()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if raw.len() > chambers_model::news::CATEGORY_MAX_LEN {
        return Err(ApiError::invalid_param("category", raw));
    }
    Ok(Some(raw.to_string()))
}

/// Numeric path ids are positive 64-bit integers.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::invalid_param("id", raw)),
    }
}

pub fn required_email_param(query: &BTreeMap<String, String>) -> Result<String, ApiError> {
    let raw = query.get("email").map(|s| s.trim()).unwrap_or_default();
    if chambers_model::is_valid_email(raw) {
        Ok(chambers_model::normalize_email(raw))
    } else {
        Err(ApiError::invalid_param("email", raw))
    }
}
