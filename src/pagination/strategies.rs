//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{Page, PageState, PaginationStrategy, StopCause};
use crate::decode::{extract_path, extract_records, extract_u64, Payload};
use crate::http::CallRequest;
use crate::types::OptionStringExt;
use serde_json::Value;

const DEFAULT_PAGE_SIZE: u32 = 50;

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Field and parameter names for cursor pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorConfig {
    /// Query parameter carrying the cursor
    pub cursor_param: String,
    /// Response field holding the next cursor
    pub cursor_field: String,
    /// Response field holding the page's records
    pub results_field: String,
    /// Response field holding the total count
    pub total_field: Option<String>,
    /// Query parameter carrying the page size
    pub page_size_param: Option<String>,
    pub page_size: u32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            cursor_param: "cursor".to_string(),
            cursor_field: "cursor".to_string(),
            results_field: "result".to_string(),
            total_field: Some("total".to_string()),
            page_size_param: Some("limit".to_string()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Cursor-based pagination (e.g., Moralis)
///
/// Expects `{ total, result: [...], cursor }`. A `null` or empty cursor ends
/// the fetch cleanly. A page without the cursor key is malformed: the
/// provider did not say whether more data exists.
#[derive(Debug, Clone, Default)]
pub struct CursorStrategy {
    pub config: CursorConfig,
}

impl CursorStrategy {
    pub fn new(config: CursorConfig) -> Self {
        Self { config }
    }

    /// Default field names with a custom page size
    pub fn with_page_size(page_size: u32) -> Self {
        Self::new(CursorConfig {
            page_size,
            ..CursorConfig::default()
        })
    }
}

impl PaginationStrategy for CursorStrategy {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn first_request(&self, base: &CallRequest) -> CallRequest {
        let mut request = base.clone();
        request.query.remove(&self.config.cursor_param);
        match &self.config.page_size_param {
            Some(param) => request.query(param, self.config.page_size.to_string()),
            None => request,
        }
    }

    fn extract_page(&self, payload: &Payload) -> Result<Page, StopCause> {
        let value = payload
            .as_json()
            .filter(|v| v.is_object())
            .ok_or_else(|| StopCause::malformed("expected a JSON object"))?;

        let records = extract_records(value, Some(&self.config.results_field))
            .map_err(|e| StopCause::malformed(e.to_string()))?
            .ok_or_else(|| {
                StopCause::malformed(format!(
                    "'{}' is missing or not an array",
                    self.config.results_field
                ))
            })?;

        let cursor = match extract_path(value, &self.config.cursor_field) {
            None => {
                return Err(StopCause::malformed(format!(
                    "'{}' is missing",
                    self.config.cursor_field
                )))
            }
            Some(Value::Null) => None,
            Some(Value::String(s)) => s.as_str().none_if_empty(),
            Some(other) => {
                return Err(StopCause::malformed(format!(
                    "'{}' is not a string: {}",
                    self.config.cursor_field, other
                )))
            }
        };

        let total = self
            .config
            .total_field
            .as_deref()
            .and_then(|field| extract_u64(value, field));

        Ok(Page {
            records,
            cursor,
            total,
        })
    }

    fn is_done(&self, page: &Page) -> bool {
        page.cursor.is_none()
    }

    fn next_request(&self, issued: &CallRequest, state: &PageState) -> CallRequest {
        issued
            .clone()
            .query_opt(&self.config.cursor_param, state.cursor.clone())
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Parameter names for offset pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetConfig {
    pub offset_param: String,
    pub page_size_param: String,
    pub page_size: u32,
    /// Where the records sit; `None` for a raw array
    pub results_field: Option<String>,
    /// End on a page shorter than the page size instead of waiting for an empty one
    pub stop_on_short_page: bool,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            offset_param: "offset".to_string(),
            page_size_param: "pageSize".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            results_field: None,
            stop_on_short_page: false,
        }
    }
}

/// Offset-based pagination (e.g., Tatum)
///
/// Pages are plain arrays; the first empty page ends the fetch. No total is
/// ever known.
#[derive(Debug, Clone, Default)]
pub struct OffsetStrategy {
    pub config: OffsetConfig,
}

impl OffsetStrategy {
    pub fn new(config: OffsetConfig) -> Self {
        Self { config }
    }

    /// Default parameter names with a custom page size
    pub fn with_page_size(page_size: u32) -> Self {
        Self::new(OffsetConfig {
            page_size,
            ..OffsetConfig::default()
        })
    }

    fn request_at(&self, base: &CallRequest, offset: u64) -> CallRequest {
        base.clone()
            .query(&self.config.page_size_param, self.config.page_size.to_string())
            .query(&self.config.offset_param, offset.to_string())
    }
}

impl PaginationStrategy for OffsetStrategy {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn first_request(&self, base: &CallRequest) -> CallRequest {
        self.request_at(base, 0)
    }

    fn extract_page(&self, payload: &Payload) -> Result<Page, StopCause> {
        let records = match payload {
            // An empty body is an empty page
            Payload::Empty => Vec::new(),
            Payload::Json(value) => extract_records(value, self.config.results_field.as_deref())
                .map_err(|e| StopCause::malformed(e.to_string()))?
                .ok_or_else(|| StopCause::malformed("expected an array page"))?,
            Payload::Text(_) => return Err(StopCause::malformed("expected a JSON array page")),
        };

        Ok(Page {
            records,
            cursor: None,
            total: None,
        })
    }

    fn is_done(&self, page: &Page) -> bool {
        page.records.is_empty()
            || (self.config.stop_on_short_page
                && page.records.len() < self.config.page_size as usize)
    }

    fn offset_step(&self, _page: &Page) -> u64 {
        u64::from(self.config.page_size)
    }

    fn next_request(&self, issued: &CallRequest, state: &PageState) -> CallRequest {
        self.request_at(issued, state.offset)
    }
}

// ============================================================================
// Single Page
// ============================================================================

/// One call, whatever comes back is the result
///
/// An array payload yields its elements, any other JSON value one record and
/// a text payload one string record.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePageStrategy;

impl PaginationStrategy for SinglePageStrategy {
    fn name(&self) -> &'static str {
        "single"
    }

    fn first_request(&self, base: &CallRequest) -> CallRequest {
        base.clone()
    }

    fn extract_page(&self, payload: &Payload) -> Result<Page, StopCause> {
        let records = match payload {
            Payload::Json(Value::Array(items)) => items.clone(),
            Payload::Json(Value::Null) | Payload::Empty => Vec::new(),
            Payload::Json(value) => vec![value.clone()],
            Payload::Text(text) => vec![Value::String(text.clone())],
        };
        Ok(Page {
            records,
            ..Page::default()
        })
    }

    fn is_done(&self, _page: &Page) -> bool {
        true
    }

    fn next_request(&self, issued: &CallRequest, _state: &PageState) -> CallRequest {
        issued.clone()
    }
}
