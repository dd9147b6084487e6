use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::Provider;
use super::configs::AnthropicProviderConfig;
use super::formats::anthropic::{
    anthropic_response_to_llm_response, request_to_anthropic_spec, AnthropicStreamState,
    MessagesStreamEvent,
};
use super::utils::{IdGenerator, UuidIdGenerator};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::request::LlmRequest;
use crate::models::response::LlmResponse;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 4096;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
    ids: Box<dyn IdGenerator>,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self {
            client,
            config,
            ids: Box::new(UuidIdGenerator),
        })
    }

    /// Replace the id generator; tests use this to pin generated ids.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    fn build_payload(&self, request: &LlmRequest, streaming: bool) -> Value {
        let converted = request_to_anthropic_spec(request, self.ids.as_ref());

        let mut payload = json!({
            "model": self.config.model,
            "messages": converted.messages,
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if let Some(system) = converted.system {
            payload["system"] = json!(system);
        }
        if let Some(tools) = converted.tools {
            payload["tools"] = json!(tools);
        }
        if let Some(temperature) = self.config.temperature {
            payload["temperature"] = json!(temperature);
        }
        if streaming {
            payload["stream"] = json!(true);
        }
        payload
    }

    async fn post(&self, payload: Value) -> ProviderResult<reqwest::Response> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ProviderError::Server(status.as_u16()))
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: &LlmRequest) -> ProviderResult<LlmResponse> {
        let payload = self.build_payload(request, false);
        let response = self.post(payload).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| ProviderError::MalformedResponse(error.to_string()))?;

        Ok(anthropic_response_to_llm_response(&body))
    }

    fn stream<'a>(&'a self, request: &'a LlmRequest) -> BoxStream<'a, LlmResponse> {
        let payload = self.build_payload(request, true);

        Box::pin(stream! {
            let response = match self.post(payload).await {
                Ok(response) => response,
                Err(error) => {
                    yield LlmResponse::from_error(error.code(), error.to_string());
                    return;
                }
            };

            let mut state = AnthropicStreamState::new();
            let mut complete = false;
            let mut events = response.bytes_stream().eventsource();

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(error) => {
                        yield LlmResponse::from_error("stream_error", error.to_string());
                        return;
                    }
                };

                let decoded: MessagesStreamEvent = match serde_json::from_str(&event.data) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        tracing::warn!(%error, "skipping undecodable stream event");
                        continue;
                    }
                };

                let update = state.apply(decoded);
                complete = update.is_complete;
                if let Some(response) = update.response {
                    yield response;
                }
                if complete {
                    break;
                }
            }

            // A transport that ends without message_stop still finalizes
            // the accumulated content.
            if !complete {
                let update = state.apply(MessagesStreamEvent::MessageStop);
                if let Some(response) = update.response {
                    yield response;
                }
            }
        })
    }
}
