// SPDX-License-Identifier: Apache-2.0

use crate::params::Pagination;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiResponseEnvelope<T> {
    pub data: T,
}

impl<T> ApiResponseEnvelope<T> {
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> ListEnvelope<T> {
    #[must_use]
    pub fn new(data: Vec<T>, total: u64, page: Pagination) -> Self {
        Self {
            data,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }

    /// Envelope for an unpaginated listing.
    #[must_use]
    pub fn complete(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        let limit = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            data,
            total,
            limit,
            offset: 0,
        }
    }
}
