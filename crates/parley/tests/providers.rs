use anyhow::Result;
use futures::StreamExt;
use parley::models::content::{Content, FunctionCall, FunctionResponse};
use parley::models::request::LlmRequest;
use parley::models::tool::{FunctionDeclaration, ToolGroup};
use parley::providers::anthropic::AnthropicProvider;
use parley::providers::base::Provider;
use parley::providers::configs::{AnthropicProviderConfig, OpenAiProviderConfig};
use parley::providers::openai::OpenAiProvider;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_provider(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiProviderConfig {
        host: server.uri(),
        api_key: "test_api_key".to_string(),
        model: "gpt-4o".to_string(),
        temperature: None,
        max_tokens: None,
    })
    .unwrap()
}

fn anthropic_provider(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new(AnthropicProviderConfig {
        host: server.uri(),
        api_key: "test_api_key".to_string(),
        model: "claude-sonnet-4-20250514".to_string(),
        temperature: None,
        max_tokens: None,
    })
    .unwrap()
}

fn sse_body(chunks: &[Value], done_marker: bool) -> String {
    let mut body: String = chunks
        .iter()
        .map(|chunk| format!("data: {chunk}\n\n"))
        .collect();
    if done_marker {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

#[tokio::test]
async fn test_openai_complete_basic() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test_api_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello! How can I help?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Hello?")])
        .with_system("You are a helpful assistant.");

    let response = provider.complete(&request).await?;

    assert!(response.turn_complete);
    let content = response.content.unwrap();
    assert_eq!(content.parts[0].as_text(), Some("Hello! How can I help?"));

    let usage = response.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(12));
    assert_eq!(usage.candidates_token_count, Some(15));
    assert_eq!(usage.total_token_count, Some(27));

    Ok(())
}

#[tokio::test]
async fn test_openai_complete_tool_request() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        // The declared tool must reach the wire in chat-completions shape.
        .and(body_partial_json(json!({
            "tools": [{
                "type": "function",
                "function": {"name": "get_weather"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"San Francisco, CA\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 15}
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let request = LlmRequest::new(vec![
        Content::user().with_text("What's the weather in San Francisco?")
    ])
    .with_tools(vec![ToolGroup::new(vec![FunctionDeclaration::new(
        "get_weather",
        "Gets the current weather for a location",
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "City and state"}
            },
            "required": ["location"]
        }),
    )])]);

    let response = provider.complete(&request).await?;

    let content = response.content.unwrap();
    let call = content.parts[0].as_function_call().unwrap();
    assert_eq!(call.id.as_deref(), Some("call_123"));
    assert_eq!(call.name, "get_weather");
    assert_eq!(call.args, json!({"location": "San Francisco, CA"}));

    Ok(())
}

#[tokio::test]
async fn test_openai_generate_translates_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "bad request"}
        })))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Hi")]);

    let response = provider.generate(&request).await;

    assert!(response.turn_complete);
    assert!(response.content.is_none());
    assert_eq!(response.error_code.as_deref(), Some("api_error"));
    assert!(response.error_message.is_some());
}

#[tokio::test]
async fn test_openai_streaming_text_and_tool_calls() -> Result<()> {
    let server = MockServer::start().await;
    let body = sse_body(
        &[
            json!({"choices": [{"delta": {"content": "Hello"}, "finish_reason": null}]}),
            json!({"choices": [{"delta": {"content": ", world!"}, "finish_reason": null}]}),
            json!({"choices": [{"delta": {"tool_calls": [{
                "index": 0,
                "id": "call_1",
                "function": {"name": "get_weather", "arguments": "{\"location\":"}
            }]}, "finish_reason": null}]}),
            json!({"choices": [{"delta": {"tool_calls": [{
                "index": 0,
                "function": {"arguments": "\"SF\"}"}
            }]}, "finish_reason": null}]}),
            json!({
                "choices": [{"delta": {}, "finish_reason": "tool_calls"}],
                "usage": {"prompt_tokens": 20, "completion_tokens": 15}
            }),
        ],
        true,
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Weather in SF?")]);

    let responses: Vec<_> = provider.stream(&request).collect().await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].partial, Some(true));
    assert_eq!(
        responses[0].content.as_ref().unwrap().parts[0].as_text(),
        Some("Hello")
    );
    assert_eq!(
        responses[1].content.as_ref().unwrap().parts[0].as_text(),
        Some(", world!")
    );

    let last = &responses[2];
    assert!(last.turn_complete);
    assert!(last.error_code.is_none());
    let content = last.content.as_ref().unwrap();
    assert_eq!(content.parts[0].as_text(), Some("Hello, world!"));
    let call = content.parts[1].as_function_call().unwrap();
    assert_eq!(call.id.as_deref(), Some("call_1"));
    assert_eq!(call.args, json!({"location": "SF"}));

    let usage = last.usage_metadata.unwrap();
    assert_eq!(usage.total_token_count, Some(35));

    Ok(())
}

#[tokio::test]
async fn test_anthropic_complete_with_tool_use() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test_api_key"))
        .and(header("anthropic-version", "2023-06-01"))
        // System instruction must arrive as a sibling field, never as a
        // message, and the tool schema must be lowercased.
        .and(body_partial_json(json!({
            "system": "You are a helpful assistant.",
            "messages": [{"role": "user", "content": [{"type": "text", "text": "Weather in SF?"}]}],
            "tools": [{"name": "get_weather", "input_schema": {"type": "object"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather",
                 "input": {"location": "SF"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 30, "output_tokens": 21}
        })))
        .mount(&server)
        .await;

    let provider = anthropic_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Weather in SF?")])
        .with_system("You are a helpful assistant.")
        .with_tools(vec![ToolGroup::new(vec![FunctionDeclaration::new(
            "get_weather",
            "Gets the current weather",
            json!({"type": "OBJECT", "properties": {"location": {"type": "STRING"}}}),
        )])]);

    let response = provider.complete(&request).await?;

    let content = response.content.unwrap();
    assert_eq!(content.parts[0].as_text(), Some("Let me check."));
    let call = content.parts[1].as_function_call().unwrap();
    assert_eq!(call.id.as_deref(), Some("toolu_1"));
    assert_eq!(call.args, json!({"location": "SF"}));

    let usage = response.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(30));
    assert_eq!(usage.candidates_token_count, Some(21));
    assert_eq!(usage.total_token_count, Some(51));

    Ok(())
}

#[tokio::test]
async fn test_anthropic_tool_result_round_trip_payload() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "Weather in SF?"}]},
                {"role": "assistant", "content": [{
                    "type": "tool_use", "id": "call_123", "name": "get_weather"
                }]},
                {"role": "user", "content": [{
                    "type": "tool_result", "tool_use_id": "call_123"
                }]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "It is 18C."}],
            "usage": {"input_tokens": 40, "output_tokens": 6}
        })))
        .mount(&server)
        .await;

    let provider = anthropic_provider(&server);
    let request = LlmRequest::new(vec![
        Content::user().with_text("Weather in SF?"),
        Content::model().with_function_call(
            FunctionCall::new("get_weather", json!({"location": "SF"})).with_id("call_123"),
        ),
        Content::user().with_function_response(
            FunctionResponse::new(json!({"temp": 18})).with_id("call_123"),
        ),
    ]);

    let response = provider.complete(&request).await?;

    assert_eq!(
        response.content.unwrap().parts[0].as_text(),
        Some("It is 18C.")
    );
    Ok(())
}

#[tokio::test]
async fn test_anthropic_streaming() -> Result<()> {
    let server = MockServer::start().await;
    let body = sse_body(
        &[
            json!({"type": "message_start", "message": {
                "id": "msg_1", "role": "assistant",
                "usage": {"input_tokens": 25, "output_tokens": 1}
            }}),
            json!({"type": "content_block_start", "index": 0,
                   "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "text_delta", "text": "Hello"}}),
            json!({"type": "content_block_delta", "index": 0,
                   "delta": {"type": "text_delta", "text": ", world!"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "content_block_start", "index": 1,
                   "content_block": {"type": "tool_use", "id": "toolu_1",
                                     "name": "get_weather", "input": {}}}),
            json!({"type": "content_block_delta", "index": 1,
                   "delta": {"type": "input_json_delta", "partial_json": "{\"location\":"}}),
            json!({"type": "content_block_delta", "index": 1,
                   "delta": {"type": "input_json_delta", "partial_json": "\"SF\"}"}}),
            json!({"type": "content_block_stop", "index": 1}),
            json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"},
                   "usage": {"output_tokens": 9}}),
            json!({"type": "message_stop"}),
        ],
        false,
    );
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = anthropic_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Weather in SF?")]);

    let responses: Vec<_> = provider.stream(&request).collect().await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].partial, Some(true));
    assert_eq!(
        responses[0].content.as_ref().unwrap().parts[0].as_text(),
        Some("Hello")
    );

    let last = &responses[2];
    assert!(last.turn_complete);
    let content = last.content.as_ref().unwrap();
    assert_eq!(content.parts[0].as_text(), Some("Hello, world!"));
    let call = content.parts[1].as_function_call().unwrap();
    assert_eq!(call.id.as_deref(), Some("toolu_1"));
    assert_eq!(call.name, "get_weather");
    assert_eq!(call.args, json!({"location": "SF"}));

    let usage = last.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(25));
    assert_eq!(usage.candidates_token_count, Some(9));
    assert_eq!(usage.total_token_count, Some(34));

    Ok(())
}

#[tokio::test]
async fn test_anthropic_stream_surfaces_server_error_as_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = anthropic_provider(&server);
    let request = LlmRequest::new(vec![Content::user().with_text("Hi")]);

    let responses: Vec<_> = provider.stream(&request).collect().await;

    assert_eq!(responses.len(), 1);
    assert!(responses[0].turn_complete);
    assert_eq!(responses[0].error_code.as_deref(), Some("server_error"));
}
