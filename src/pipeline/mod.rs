/// Aggregation query layer.
///
/// Multi-collection reads (channel profiles, watch history, video listings)
/// are expressed as ordered sequences of pipeline stages. Builders in
/// [`builders`] are pure functions from parameters to `Vec<Stage>`; the
/// interpreter in [`executor`] runs a stage sequence over JSON documents
/// fetched through the [`executor::DocumentSource`] seam.
pub mod builders;
pub mod executor;

use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use serde_json::Value;

/// Collections a pipeline can read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Videos,
    Subscriptions,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Subscriptions => "subscriptions",
        }
    }
}

/// Sort direction, `asc`/`desc` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse a wire value. Accepts exactly `asc` and `desc`, case-insensitive.
    pub fn parse(raw: &str) -> ApiResult<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            _ => Err(ApiError::Validation(format!(
                "Invalid sort type: {} (expected asc or desc)",
                raw
            ))),
        }
    }
}

/// Document predicate used by `Stage::Match`
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equality; a missing field compares as null
    Eq { field: String, value: Value },
    /// Case-insensitive substring match against any of the named fields
    Text { fields: Vec<String>, needle: String },
    /// Conjunction
    All(Vec<Filter>),
}

/// Derived-field expression used by `Stage::AddFields`
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpr {
    /// Length of an array field (0 when missing)
    Size { field: String },
    /// First element of an array field (null when empty)
    First { field: String },
    /// Whether `value` equals `sub_field` of any element of the array `field`
    Contains {
        field: String,
        sub_field: String,
        value: Value,
    },
}

/// One step of an aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Join documents from another collection into `as_field`.
    ///
    /// When the local field holds an array, the join preserves the array's
    /// order; each joined document set is then run through the nested
    /// pipeline.
    Lookup {
        from: Collection,
        local_field: String,
        foreign_field: String,
        as_field: String,
        pipeline: Vec<Stage>,
    },
    AddFields(Vec<(String, FieldExpr)>),
    /// Keep only the named top-level fields
    Project(Vec<String>),
    Sort {
        field: String,
        direction: SortDirection,
    },
    Skip(u64),
    Limit(u64),
}

/// Validated pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Both values must be positive.
    pub fn new(page: i64, page_size: i64) -> ApiResult<Self> {
        if page <= 0 || page_size <= 0 {
            return Err(ApiError::Validation(
                "page and limit must be positive".to_string(),
            ));
        }
        Ok(Self {
            page: page as u64,
            page_size: page_size as u64,
        })
    }

    /// Parse raw query-string values, defaulting to page 1 / 10 per page.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> ApiResult<Self> {
        let page = match page {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::Validation("page must be a number".to_string()))?,
            None => 1,
        };
        let page_size = match page_size {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::Validation("limit must be a number".to_string()))?,
            None => 10,
        };
        Self::new(page, page_size)
    }

    /// Saturates instead of overflowing; an astronomically large page is
    /// simply past the end of any result set.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of pipeline output plus count metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}
