//! Page/limit windows and the pagination block of responses

use serde::Serialize;

use crate::error::{FbscopeError, Result};

/// A requested page window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Parse raw query-string values.
    ///
    /// Missing values fall back to page 1 and `default_limit`. Present values
    /// must be positive integers and `limit` may not exceed `max_limit`.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<Self> {
        let page = match page {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };
        let limit = match limit {
            Some(raw) => parse_positive("limit", raw)?,
            None => default_limit,
        };
        if limit > max_limit {
            return Err(FbscopeError::invalid_request(format!(
                "limit {} exceeds the maximum of {}",
                limit, max_limit
            )));
        }
        Ok(Self { page, limit })
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 100,
        }
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FbscopeError::invalid_request(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total_pages(total, request.limit),
        }
    }
}

/// `ceil(total / limit)`, zero when `limit` is zero.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}
