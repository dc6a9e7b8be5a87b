//! Call results
//!
//! Every executed call yields exactly one [`CallResult`]. Failures are
//! values here; nothing below the caller raises on a bad network day.

use crate::decode::Payload;
use std::time::Duration;

/// Outcome of one call; a payload exists only on success
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The call completed and its body decoded
    Success(Payload),
    /// Connect error, timeout, DNS failure or a broken body stream
    TransportFailure(String),
    /// A body arrived but could not be decoded per its content type
    DecodeFailure(String),
}

/// Result of one executed call
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    /// URL the call went to
    pub url: String,
    /// What happened
    pub outcome: CallOutcome,
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    /// Raw `Content-Type` header, when present
    pub content_type: Option<String>,
    /// Wall time spent on the call, excluding the rate-limit wait
    pub elapsed: Duration,
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CallOutcome::Success(_))
    }

    /// Whether a response arrived with a 2xx status
    pub fn is_http_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }

    /// The decoded payload of a successful call
    pub fn payload(&self) -> Option<&Payload> {
        match &self.outcome {
            CallOutcome::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Take the payload out of a successful call
    pub fn into_payload(self) -> Option<Payload> {
        match self.outcome {
            CallOutcome::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Failure message for non-successful calls
    pub fn failure_message(&self) -> Option<&str> {
        match &self.outcome {
            CallOutcome::Success(_) => None,
            CallOutcome::TransportFailure(msg) | CallOutcome::DecodeFailure(msg) => Some(msg),
        }
    }
}
