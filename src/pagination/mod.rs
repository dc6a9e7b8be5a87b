//! Pagination module
//!
//! Supports: Cursor, Offset, Single page
//!
//! # Overview
//!
//! A [`PaginationDriver`] repeatedly executes requests through one
//! [`CallExecutor`](crate::http::CallExecutor), following a
//! [`PaginationStrategy`]. After every call the strategy returns a [`Step`]:
//! another request, a clean finish, or a stop with a [`StopCause`]. The
//! driver reports which of those ended the run in [`FetchOutcome`].

mod driver;
mod strategies;
mod types;

pub use driver::{DriverConfig, PaginationDriver};
pub use strategies::{
    CursorConfig, CursorStrategy, OffsetConfig, OffsetStrategy, SinglePageStrategy,
};
pub use types::{FetchOutcome, Page, PageState, PaginationStrategy, Step, StopCause, Termination};
