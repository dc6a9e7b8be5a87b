//! Response decoder module
//!
//! Supports: JSON, plain text
//!
//! # Overview
//!
//! Every call's body goes through one dispatch table keyed by the declared
//! content type. Anything the table does not know is a decode failure, never
//! a guess. Path helpers let provider adapters name the fields holding
//! results, cursors and totals.

mod decoders;
mod types;

pub use decoders::{decode_body, extract_path, extract_records, extract_u64};
pub use types::{ContentKind, Payload};
