//! Conversion between the canonical model and the OpenAI-style
//! chat-completions wire format.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::StreamUpdate;
use crate::models::content::{Content, FunctionCall, Part};
use crate::models::request::LlmRequest;
use crate::models::response::{LlmResponse, UsageMetadata};
use crate::providers::utils::{id_or_generated, safe_parse_json, IdGenerator};

/// Wire-level pieces of a chat-completions request. `tools` is `None`
/// (field omitted) when no function declarations exist.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRequest {
    pub messages: Vec<Value>,
    pub tools: Option<Vec<Value>>,
}

/// Convert a canonical request into chat-completions messages and tools.
///
/// The system instruction becomes a leading `system` message; each turn
/// becomes one message plus one trailing `tool` message per function
/// response it carries.
pub fn request_to_openai_spec(request: &LlmRequest, ids: &dyn IdGenerator) -> OpenAiRequest {
    let mut messages = Vec::new();

    if let Some(system) = &request.system_instruction {
        messages.push(json!({
            "role": "system",
            "content": system.text(),
        }));
    }

    for content in &request.contents {
        messages.extend(content_to_messages(content, ids));
    }

    OpenAiRequest {
        messages,
        tools: tools_to_openai_spec(request),
    }
}

/// One canonical turn can expand to several wire messages: the turn's own
/// message followed by one `tool` message per function response.
fn content_to_messages(content: &Content, ids: &dyn IdGenerator) -> Vec<Value> {
    let mut converted = json!({
        "role": content.role.as_wire_role()
    });
    let mut output = Vec::new();

    for part in &content.parts {
        match part {
            Part::Text(text) => {
                if !text.is_empty() {
                    converted["content"] = json!(text);
                }
            }
            Part::FunctionCall(call) => {
                let tool_calls = converted
                    .as_object_mut()
                    .unwrap()
                    .entry("tool_calls")
                    .or_insert(json!([]));

                tool_calls.as_array_mut().unwrap().push(json!({
                    "id": id_or_generated(call.id.as_deref(), ids),
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.args.to_string(),
                    }
                }));
            }
            Part::FunctionResponse(response) => {
                if response.id.is_none() {
                    // The host framework pairs results with calls by id, so
                    // a substituted id may break that correlation.
                    tracing::warn!("function response without an id, substituting a generated one");
                }
                output.push(json!({
                    "role": "tool",
                    "content": response.response.to_string(),
                    "tool_call_id": id_or_generated(response.id.as_deref(), ids),
                }));
            }
        }
    }

    // A turn that produced nothing is dropped, not sent as an empty message.
    if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
        output.insert(0, converted);
    }
    output
}

/// Flatten every function declaration across tool groups into the
/// chat-completions tool array. Schemas pass through unchanged. Returns
/// `None` when there is nothing to declare so the caller can omit the
/// field entirely.
pub fn tools_to_openai_spec(request: &LlmRequest) -> Option<Vec<Value>> {
    let mut specs = Vec::new();

    for declaration in request.function_declarations() {
        if declaration.name.is_empty() {
            tracing::warn!("skipping function declaration without a name");
            continue;
        }

        let mut function = json!({
            "name": declaration.name,
            "description": declaration.description,
        });
        if let Some(parameters) = &declaration.parameters {
            function["parameters"] = parameters.clone();
        }

        specs.push(json!({
            "type": "function",
            "function": function,
        }));
    }

    if specs.is_empty() {
        None
    } else {
        Some(specs)
    }
}

/// Convert one complete chat-completions response into a canonical
/// response. Non-streamed calls always finish the turn.
pub fn openai_response_to_llm_response(response: &Value) -> LlmResponse {
    let message = &response["choices"][0]["message"];
    let mut parts = Vec::new();

    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();
            parts.push(Part::FunctionCall(FunctionCall {
                id: tool_call["id"].as_str().map(String::from),
                name: tool_call["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                args: safe_parse_json(arguments),
            }));
        }
    }

    let mut converted = LlmResponse::complete(parts);
    converted.usage_metadata = usage_from_response(response.get("usage"));
    converted
}

fn usage_from_response(usage: Option<&Value>) -> Option<UsageMetadata> {
    let usage = usage?;
    let prompt = usage
        .get("prompt_tokens")
        .and_then(Value::as_i64)
        .map(|count| count as i32);
    let completion = usage
        .get("completion_tokens")
        .and_then(Value::as_i64)
        .map(|count| count as i32);
    if prompt.is_none() && completion.is_none() {
        return None;
    }
    Some(UsageMetadata::new(
        prompt,
        completion,
        Some(prompt.unwrap_or(0) + completion.unwrap_or(0)),
    ))
}

/// One decoded chat-completions stream event.
///
/// The SSE payloads are dynamic JSON; decoding into this closed set keeps
/// the accumulator an exhaustive match rather than string checks at every
/// site.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamEvent {
    /// A delta carrying assistant text.
    TextDelta { text: String },
    /// A fragment of a streamed tool call, keyed by the call's index. The
    /// id and name arrive on the first fragment; `arguments` chunks arrive
    /// across many.
    ToolCallFragment {
        index: u64,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    /// The finish marker, optionally carrying final usage counts.
    Terminal { usage: Option<UsageMetadata> },
}

/// Decode one raw stream chunk into zero or more events.
pub fn chunk_to_events(chunk: &Value) -> Vec<ChatStreamEvent> {
    let mut events = Vec::new();
    let choice = &chunk["choices"][0];
    let delta = &choice["delta"];

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            events.push(ChatStreamEvent::TextDelta {
                text: text.to_string(),
            });
        }
    }

    if let Some(fragments) = delta.get("tool_calls").and_then(Value::as_array) {
        for fragment in fragments {
            events.push(ChatStreamEvent::ToolCallFragment {
                index: fragment.get("index").and_then(Value::as_u64).unwrap_or(0),
                id: fragment.get("id").and_then(Value::as_str).map(String::from),
                name: fragment["function"]
                    .get("name")
                    .and_then(Value::as_str)
                    .map(String::from),
                arguments: fragment["function"]
                    .get("arguments")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    if choice.get("finish_reason").and_then(Value::as_str).is_some() {
        events.push(ChatStreamEvent::Terminal {
            usage: usage_from_response(chunk.get("usage")),
        });
    }

    events
}

#[derive(Debug, Default)]
struct ToolCallDraft {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates one streamed chat-completions response.
///
/// Exclusively owned by a single in-flight stream: create a fresh one per
/// call and never share it across calls. The terminal event drains and
/// resets all state.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    text: String,
    tool_calls: BTreeMap<u64, ToolCallDraft>,
}

impl OpenAiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event through the accumulator, yielding at most one
    /// canonical response and a completion flag.
    pub fn apply(&mut self, event: ChatStreamEvent) -> StreamUpdate {
        match event {
            ChatStreamEvent::TextDelta { text } => {
                self.text.push_str(&text);
                StreamUpdate::partial(LlmResponse::partial_text(text))
            }
            ChatStreamEvent::ToolCallFragment {
                index,
                id,
                name,
                arguments,
            } => {
                let draft = self.tool_calls.entry(index).or_default();
                if let Some(id) = id {
                    draft.id = id;
                }
                if let Some(name) = name {
                    draft.name = name;
                }
                draft.arguments.push_str(&arguments);
                StreamUpdate::none()
            }
            ChatStreamEvent::Terminal { usage } => {
                let mut response = LlmResponse::complete(self.take_parts());
                response.usage_metadata = usage;
                StreamUpdate::done(response)
            }
        }
    }

    /// Drain the accumulated state into final content parts, resetting the
    /// accumulator.
    fn take_parts(&mut self) -> Vec<Part> {
        let mut parts = Vec::new();

        let text = std::mem::take(&mut self.text);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        for (_, draft) in std::mem::take(&mut self.tool_calls) {
            if draft.name.is_empty() {
                tracing::warn!("dropping streamed tool call that never received a name");
                continue;
            }
            parts.push(Part::FunctionCall(FunctionCall {
                id: if draft.id.is_empty() {
                    None
                } else {
                    Some(draft.id)
                },
                name: draft.name,
                args: safe_parse_json(&draft.arguments),
            }));
        }

        parts
    }
}
