//! Per-format conversion between the canonical model and each wire API.
//!
//! Each format gets three pieces: a request converter, a response converter
//! for complete (non-streamed) replies, and a stream accumulator that
//! rebuilds a full reply from partial events. The converters are pure; the
//! accumulator is the only mutable state and is owned by exactly one
//! in-flight stream.
pub mod anthropic;
pub mod openai;

use crate::models::response::LlmResponse;

/// Outcome of feeding one stream event through an accumulator: at most one
/// canonical response to surface, and whether the stream just finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUpdate {
    pub response: Option<LlmResponse>,
    pub is_complete: bool,
}

impl StreamUpdate {
    /// The event was absorbed into the accumulator with nothing to show.
    pub(crate) fn none() -> Self {
        StreamUpdate {
            response: None,
            is_complete: false,
        }
    }

    /// An intermediate response for incremental display.
    pub(crate) fn partial(response: LlmResponse) -> Self {
        StreamUpdate {
            response: Some(response),
            is_complete: false,
        }
    }

    /// The terminal, fully reconstructed response.
    pub(crate) fn done(response: LlmResponse) -> Self {
        StreamUpdate {
            response: Some(response),
            is_complete: true,
        }
    }
}
