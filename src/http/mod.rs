//! HTTP call module
//!
//! Provides the single-call executor and the rate-limit gates it waits on.
//!
//! # Features
//!
//! - **Rate Limiting**: self-correcting minimum interval per session, or a
//!   governor token bucket shared between sessions
//! - **Content-Type Decoding**: JSON and plain text bodies, anything else is
//!   a decode failure
//! - **Failure as Data**: transport and decode problems come back as a
//!   [`CallResult`], never as a raised error

mod executor;
mod rate_limit;
mod request;
mod response;

pub use executor::{
    CallExecutor, ExecutorConfig, ExecutorConfigBuilder, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT,
};
pub use rate_limit::{interval_for_rate, CallGate, IntervalLimiter, SharedRateLimiter};
pub use request::{CallRequest, QueryParams};
pub use response::{CallOutcome, CallResult};
