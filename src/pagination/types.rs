//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::decode::Payload;
use crate::error::{Error, Result};
use crate::http::{CallOutcome, CallRequest, CallResult};
use serde_json::Value;
use thiserror::Error;

/// Why a fetch stopped before the provider said it was finished
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopCause {
    #[error("transport failure calling {url}: {message}")]
    Transport { url: String, message: String },

    #[error("undecodable response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("malformed page: {message}")]
    MalformedPage { message: String },

    #[error("provider repeated the previous request to {url}")]
    RepeatedRequest { url: String },
}

impl StopCause {
    /// Create a malformed page cause
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPage {
            message: message.into(),
        }
    }
}

/// Decision after one page
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Issue this request next
    HasMore(CallRequest),
    /// The provider signalled the end of the data
    DoneCleanly,
    /// The fetch cannot continue
    DoneWithError(StopCause),
}

/// One page as interpreted by a strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    /// Continuation token; `None` when the provider sent none or an empty one
    pub cursor: Option<String>,
    /// Total record count, when the provider reports one
    pub total: Option<u64>,
}

/// Mutable state of one driver run
#[derive(Debug, Clone, Default)]
pub struct PageState {
    /// Cursor for the next request
    pub cursor: Option<String>,
    /// Offset for the next request
    pub offset: u64,
    /// Everything accumulated so far, in page order
    pub records: Vec<Value>,
    /// First total the provider reported
    pub known_total: Option<u64>,
    /// Pages recorded so far
    pub pages: u32,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a page into the state
    pub fn record(&mut self, page: Page, offset_step: u64) {
        if self.known_total.is_none() {
            self.known_total = page.total;
        }
        self.cursor = page.cursor;
        self.offset += offset_step;
        self.records.extend(page.records);
        self.pages += 1;
    }
}

/// How a driver run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// The provider signalled the end of the data
    Complete,
    /// Stopped early; the records are what arrived before the failure
    Partial(StopCause),
    /// The configured record limit was reached
    LimitReached,
}

/// Records plus how the fetch ended
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    pub termination: Termination,
    pub pages: u32,
    pub known_total: Option<u64>,
}

impl FetchOutcome {
    /// Whether the provider delivered everything (or the limit was reached)
    pub fn is_complete(&self) -> bool {
        !self.is_partial()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.termination, Termination::Partial(_))
    }

    /// The stop cause of a partial fetch
    pub fn stop_cause(&self) -> Option<&StopCause> {
        match &self.termination {
            Termination::Partial(cause) => Some(cause),
            _ => None,
        }
    }

    /// Records of a finished fetch; a partial fetch becomes an error
    pub fn into_complete(self) -> Result<Vec<Value>> {
        match self.termination {
            Termination::Complete | Termination::LimitReached => Ok(self.records),
            Termination::Partial(cause) => Err(Error::IncompleteFetch {
                records: self.records.len(),
                cause: cause.to_string(),
            }),
        }
    }
}

/// Trait for pagination strategies
///
/// Strategies are stateless; the driver owns the [`PageState`] and passes it
/// in, so one strategy value can serve many runs.
pub trait PaginationStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Build the first request from the adapter's base request
    fn first_request(&self, base: &CallRequest) -> CallRequest;

    /// Interpret a decoded payload
    fn extract_page(&self, payload: &Payload) -> std::result::Result<Page, StopCause>;

    /// Whether this page is the last one
    fn is_done(&self, page: &Page) -> bool;

    /// Build the request after `issued`, given the state with the last page recorded
    fn next_request(&self, issued: &CallRequest, state: &PageState) -> CallRequest;

    /// How far the offset moves for this page
    fn offset_step(&self, page: &Page) -> u64 {
        page.records.len() as u64
    }

    /// Interpret one call result and decide what happens next
    fn advance(&self, issued: &CallRequest, result: CallResult, state: &mut PageState) -> Step {
        let url = result.url.clone();
        let status = result.status;

        let payload = match result.outcome {
            CallOutcome::Success(payload) => payload,
            CallOutcome::TransportFailure(message) => {
                return Step::DoneWithError(StopCause::Transport { url, message })
            }
            CallOutcome::DecodeFailure(message) => {
                return Step::DoneWithError(StopCause::Decode { url, message })
            }
        };

        if let Some(status) = status.filter(|s| !(200..300).contains(s)) {
            return Step::DoneWithError(StopCause::HttpStatus { url, status });
        }

        let page = match self.extract_page(&payload) {
            Ok(page) => page,
            Err(cause) => return Step::DoneWithError(cause),
        };

        let done = self.is_done(&page);
        let offset_step = self.offset_step(&page);
        state.record(page, offset_step);

        if done {
            Step::DoneCleanly
        } else {
            Step::HasMore(self.next_request(issued, state))
        }
    }
}
