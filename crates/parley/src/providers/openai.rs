use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::Provider;
use super::configs::OpenAiProviderConfig;
use super::formats::openai::{
    chunk_to_events, openai_response_to_llm_response, request_to_openai_spec, ChatStreamEvent,
    OpenAiStreamState,
};
use super::utils::{IdGenerator, UuidIdGenerator};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::request::LlmRequest;
use crate::models::response::LlmResponse;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
    ids: Box<dyn IdGenerator>,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> ProviderResult<Self> {
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
        let converted = request_to_openai_spec(request, self.ids.as_ref());

        let mut payload = json!({
            "model": self.config.model,
            "messages": converted.messages,
        });
        if let Some(tools) = converted.tools {
            payload["tools"] = json!(tools);
        }
        if let Some(temperature) = self.config.temperature {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        if streaming {
            payload["stream"] = json!(true);
        }
        payload
    }

    async fn post(&self, payload: Value) -> ProviderResult<reqwest::Response> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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
impl Provider for OpenAiProvider {
    async fn complete(&self, request: &LlmRequest) -> ProviderResult<LlmResponse> {
        let payload = self.build_payload(request, false);
        let response = self.post(payload).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| ProviderError::MalformedResponse(error.to_string()))?;

        // Some gateways report errors inside a 200 body.
        if let Some(error) = body.get("error") {
            return Err(ProviderError::Api {
                status: 200,
                message: error.to_string(),
            });
        }

        Ok(openai_response_to_llm_response(&body))
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

            let mut state = OpenAiStreamState::new();
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

                if event.data == "[DONE]" {
                    break;
                }

                let chunk: Value = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        tracing::warn!(%error, "skipping undecodable stream chunk");
                        continue;
                    }
                };

                for event in chunk_to_events(&chunk) {
                    let update = state.apply(event);
                    complete = complete || update.is_complete;
                    if let Some(response) = update.response {
                        yield response;
                    }
                }
                if complete {
                    break;
                }
            }

            // An end marker without a finish reason still finalizes the
            // accumulated content.
            if !complete {
                let update = state.apply(ChatStreamEvent::Terminal { usage: None });
                if let Some(response) = update.response {
                    yield response;
                }
            }
        })
    }
}
