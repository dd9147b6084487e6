use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::ProviderResult;
use crate::models::request::LlmRequest;
use crate::models::response::LlmResponse;

/// Base trait for chat-completion providers (OpenAI-style, Anthropic-style).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Issue a non-streamed call, returning the complete canonical
    /// response.
    async fn complete(&self, request: &LlmRequest) -> ProviderResult<LlmResponse>;

    /// Issue a streaming call.
    ///
    /// The stream yields partial responses followed by exactly one final
    /// response with `turn_complete = true`. Transport failures surface as
    /// a canonical error response and end the stream; they never escape
    /// the iterator. Dropping the stream cancels the call and discards the
    /// partially accumulated state.
    fn stream<'a>(&'a self, request: &'a LlmRequest) -> BoxStream<'a, LlmResponse>;

    /// Non-streamed call with the uniform error shape: failures are folded
    /// into a canonical response carrying `error_code`/`error_message`.
    async fn generate(&self, request: &LlmRequest) -> LlmResponse {
        match self.complete(request).await {
            Ok(response) => response,
            Err(error) => LlmResponse::from_error(error.code(), error.to_string()),
        }
    }
}
