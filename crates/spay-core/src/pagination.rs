//! List query parameters and the pagination block of list responses.
//!
//! Every list endpoint accepts the same four query parameters:
//!
//! - `query`: case-insensitive substring search over a fixed set of columns
//! - `limit`: page size (default 10, non-positive values fall back to 10, capped at 100)
//! - `page`: 1-indexed page number (default 1, non-positive values fall back to 1)
//! - `sorts`: comma-separated `"field asc|desc"` directives, applied in order
//!
//! Resource-specific `filter-*` parameters live next to the handlers that use
//! them and are extracted with a second `Query`.
//!
//! # Example
//!
//! ```ignore
//! async fn list_shops(Query(params): Query<ListParams>) -> Result<ApiResponse<Value>, AppError> {
//!     let sorts = params.sorts_within(&["name", "created_at"]);
//!     let rows = fetch(params.limit(), params.offset(), &sorts).await?;
//!     let total = count().await?;
//!     let pagination = Pagination::new(total, &params, sorts);
//!     // ...
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Deserializes an optional string into an optional i64.
///
/// Empty and unparseable values are treated as absent so that a bad `limit`
/// or `page` falls back to its default instead of rejecting the request.
fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.and_then(|s| s.trim().parse::<i64>().ok()))
}

/// Common query parameters of list endpoints.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Case-insensitive substring filter
    #[serde(default)]
    pub query: Option<String>,
    /// Items per page (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[param(value_type = Option<i64>)]
    pub limit: Option<i64>,
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    #[param(value_type = Option<i64>)]
    pub page: Option<i64>,
    /// Comma-separated sort directives, e.g. `name asc,created_at desc`
    #[serde(default)]
    pub sorts: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        }
    }

    #[must_use]
    pub fn page(&self) -> i64 {
        match self.page {
            Some(page) if page > 0 => page,
            _ => 1,
        }
    }

    /// Rows to skip; saturates instead of overflowing on huge pages.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.limit().saturating_mul(self.page() - 1)
    }

    /// Trimmed search term, `None` when absent or blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Parsed sort directives, without any field whitelist.
    #[must_use]
    pub fn sorts(&self) -> Vec<String> {
        self.sorts.as_deref().map(parse_sorts).unwrap_or_default()
    }

    /// Parsed sort directives restricted to `allowed` field names.
    #[must_use]
    pub fn sorts_within(&self, allowed: &[&str]) -> Vec<String> {
        self.sorts()
            .into_iter()
            .filter(|sort| {
                sort.split(' ')
                    .next()
                    .is_some_and(|field| allowed.contains(&field))
            })
            .collect()
    }
}

/// Parses a comma-separated list of `"field asc|desc"` directives.
///
/// Each token is trimmed and split on a single space. Tokens that do not have
/// exactly two parts, or whose direction is not `asc`/`desc`
/// (case-insensitive), are dropped. Order is preserved.
#[must_use]
pub fn parse_sorts(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|token| {
            let parts: Vec<&str> = token.trim().split(' ').collect();
            if parts.len() != 2 || parts[0].is_empty() {
                return None;
            }
            let direction = parts[1].to_lowercase();
            match direction.as_str() {
                "asc" | "desc" => Some(format!("{} {}", parts[0], direction)),
                _ => None,
            }
        })
        .collect()
}

/// Builds an `ORDER BY` body from already whitelisted directives.
#[must_use]
pub fn order_by(sorts: &[String], fallback: &str) -> String {
    if sorts.is_empty() {
        fallback.to_string()
    } else {
        sorts.join(", ")
    }
}

/// Pagination block returned next to every list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Total number of matching rows
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    /// Search term that was applied
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
}

impl Pagination {
    pub fn new(count: i64, params: &ListParams, sorts: Vec<String>) -> Self {
        let limit = params.limit();
        Self {
            count,
            limit,
            offset: params.offset(),
            query: params.search().unwrap_or_default().to_string(),
            sorts,
            page: Some(params.page()),
            page_count: Some((count + limit - 1) / limit),
        }
    }
}
