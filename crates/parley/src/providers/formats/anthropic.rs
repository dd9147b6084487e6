//! Conversion between the canonical model and the Anthropic-style
//! messages wire format.
//!
//! Unlike chat completions, the messages API carries the system
//! instruction as a top-level sibling field, requires the first message to
//! have role `user`, and only accepts lowercase schema type names.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::StreamUpdate;
use crate::models::content::{Content, FunctionCall, Part};
use crate::models::request::LlmRequest;
use crate::models::response::{LlmResponse, UsageMetadata};
use crate::providers::utils::{id_or_generated, safe_parse_json, IdGenerator};

/// Text of the placeholder user message prepended when a converted
/// conversation would otherwise start with an assistant turn, which the
/// messages API rejects.
pub const CONTINUATION_PLACEHOLDER: &str = "[System: Continue conversation]";

/// Wire-level pieces of a messages-API request. `system` and `tools` are
/// omitted from the payload when `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicRequest {
    pub messages: Vec<Value>,
    pub system: Option<String>,
    pub tools: Option<Vec<Value>>,
}

/// Convert a canonical request into messages-API messages, system field,
/// and tools.
pub fn request_to_anthropic_spec(request: &LlmRequest, ids: &dyn IdGenerator) -> AnthropicRequest {
    let mut messages = Vec::new();

    for content in &request.contents {
        let blocks = content_to_blocks(content, ids);
        // Turns that produced nothing are dropped, not sent empty.
        if blocks.is_empty() {
            continue;
        }
        messages.push(json!({
            "role": content.role.as_wire_role(),
            "content": blocks,
        }));
    }

    if messages
        .first()
        .is_some_and(|message| message["role"] == "assistant")
    {
        messages.insert(
            0,
            json!({
                "role": "user",
                "content": [{"type": "text", "text": CONTINUATION_PLACEHOLDER}],
            }),
        );
    }

    AnthropicRequest {
        messages,
        system: request
            .system_instruction
            .as_ref()
            .map(|system| system.text()),
        tools: tools_to_anthropic_spec(request),
    }
}

fn content_to_blocks(content: &Content, ids: &dyn IdGenerator) -> Vec<Value> {
    let mut blocks = Vec::new();

    for part in &content.parts {
        match part {
            Part::Text(text) => {
                blocks.push(json!({"type": "text", "text": text}));
            }
            Part::FunctionCall(call) => {
                blocks.push(json!({
                    "type": "tool_use",
                    "id": id_or_generated(call.id.as_deref(), ids),
                    "name": call.name,
                    "input": call.args,
                }));
            }
            Part::FunctionResponse(response) => {
                if response.id.is_none() {
                    // The host framework pairs results with calls by id, so
                    // a substituted id may break that correlation.
                    tracing::warn!("function response without an id, substituting a generated one");
                }
                blocks.push(json!({
                    "type": "tool_result",
                    "tool_use_id": id_or_generated(response.id.as_deref(), ids),
                    "content": response.response.to_string(),
                }));
            }
        }
    }

    blocks
}

/// Flatten every function declaration into the messages-API tool array.
/// Returns `None` when there is nothing to declare.
pub fn tools_to_anthropic_spec(request: &LlmRequest) -> Option<Vec<Value>> {
    let mut specs = Vec::new();

    for declaration in request.function_declarations() {
        if declaration.name.is_empty() {
            tracing::warn!("skipping function declaration without a name");
            continue;
        }

        let input_schema = match &declaration.parameters {
            Some(schema @ Value::Object(_)) => normalize_schema_types(schema),
            _ => json!({"type": "object", "properties": {}}),
        };

        specs.push(json!({
            "name": declaration.name,
            "description": declaration.description,
            "input_schema": input_schema,
        }));
    }

    if specs.is_empty() {
        None
    } else {
        Some(specs)
    }
}

/// Lowercase every `type` value in a parameter schema. The canonical
/// declarations allow uppercase primitive names; the messages API only
/// accepts lowercase. Nested objects are recursed, arrays pass through
/// unchanged.
fn normalize_schema_types(schema: &Value) -> Value {
    match schema {
        Value::Object(fields) => {
            let mut normalized = Map::new();
            for (key, value) in fields {
                match value {
                    Value::String(name) if key == "type" => {
                        normalized.insert(key.clone(), Value::String(name.to_lowercase()));
                    }
                    Value::Object(_) => {
                        normalized.insert(key.clone(), normalize_schema_types(value));
                    }
                    other => {
                        normalized.insert(key.clone(), other.clone());
                    }
                }
            }
            Value::Object(normalized)
        }
        other => other.clone(),
    }
}

/// Convert one complete messages-API response into a canonical response.
pub fn anthropic_response_to_llm_response(response: &Value) -> LlmResponse {
    let mut parts = Vec::new();

    if let Some(blocks) = response.get("content").and_then(Value::as_array) {
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        parts.push(Part::text(text));
                    }
                }
                Some("tool_use") => {
                    parts.push(Part::FunctionCall(FunctionCall {
                        id: block.get("id").and_then(Value::as_str).map(String::from),
                        name: block
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        // The wire already carries structured input here,
                        // no JSON text to parse.
                        args: block.get("input").cloned().unwrap_or_else(|| json!({})),
                    }));
                }
                _ => {}
            }
        }
    }

    let mut converted = LlmResponse::complete(parts);
    converted.usage_metadata = usage_from_response(response.get("usage"));
    converted
}

fn usage_from_response(usage: Option<&Value>) -> Option<UsageMetadata> {
    let usage = usage?;
    let input = usage
        .get("input_tokens")
        .and_then(Value::as_i64)
        .map(|count| count as i32);
    let output = usage
        .get("output_tokens")
        .and_then(Value::as_i64)
        .map(|count| count as i32);
    if input.is_none() && output.is_none() {
        return None;
    }
    Some(UsageMetadata::new(
        input,
        output,
        Some(input.unwrap_or(0) + output.unwrap_or(0)),
    ))
}

/// One server-sent event from the messages streaming API, dispatched by
/// its `type` tag. Unknown event types decode to `Other` and are ignored
/// by the accumulator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesStreamEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<StreamUsage>,
    },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageStart {
    #[serde(default)]
    pub usage: Option<StreamUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StreamUsage {
    #[serde(default)]
    pub input_tokens: Option<i32>,
    #[serde(default)]
    pub output_tokens: Option<i32>,
}

/// The opening of a content block. Only `tool_use` openings carry state
/// the accumulator needs; text blocks are rebuilt purely from deltas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStart {
    ToolUse { id: String, name: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default)]
struct ToolUseDraft {
    id: String,
    name: String,
    input: String,
}

/// Accumulates one streamed messages-API response.
///
/// Exclusively owned by a single in-flight stream: create a fresh one per
/// call and never share it across calls. `message_stop` drains and resets
/// all state.
#[derive(Debug)]
pub struct AnthropicStreamState {
    text: String,
    tool_uses: BTreeMap<usize, ToolUseDraft>,
    current_block_index: i64,
    input_tokens: Option<i32>,
    output_tokens: Option<i32>,
}

impl Default for AnthropicStreamState {
    fn default() -> Self {
        AnthropicStreamState {
            text: String::new(),
            tool_uses: BTreeMap::new(),
            current_block_index: -1,
            input_tokens: None,
            output_tokens: None,
        }
    }
}

impl AnthropicStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event through the accumulator, yielding at most one
    /// canonical response and a completion flag.
    pub fn apply(&mut self, event: MessagesStreamEvent) -> StreamUpdate {
        match event {
            MessagesStreamEvent::MessageStart { message } => {
                self.input_tokens = message.usage.and_then(|usage| usage.input_tokens);
                StreamUpdate::none()
            }
            MessagesStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.current_block_index = index as i64;
                if let ContentBlockStart::ToolUse { id, name } = content_block {
                    self.tool_uses.insert(
                        index,
                        ToolUseDraft {
                            id,
                            name,
                            input: String::new(),
                        },
                    );
                }
                StreamUpdate::none()
            }
            MessagesStreamEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => {
                    self.text.push_str(&text);
                    StreamUpdate::partial(LlmResponse::partial_text(text))
                }
                BlockDelta::InputJsonDelta { partial_json } => {
                    match self.tool_uses.get_mut(&index) {
                        Some(draft) => draft.input.push_str(&partial_json),
                        None => {
                            tracing::warn!(index, "input delta for an unregistered tool block")
                        }
                    }
                    StreamUpdate::none()
                }
                BlockDelta::Other => StreamUpdate::none(),
            },
            MessagesStreamEvent::MessageDelta { usage } => {
                if let Some(output) = usage.and_then(|usage| usage.output_tokens) {
                    self.output_tokens = Some(output);
                }
                StreamUpdate::none()
            }
            MessagesStreamEvent::MessageStop => StreamUpdate::done(self.finish()),
            MessagesStreamEvent::Other => StreamUpdate::none(),
        }
    }

    /// Build the final response from the accumulated state and reset it;
    /// an accumulator is scoped to exactly one stream.
    fn finish(&mut self) -> LlmResponse {
        let mut parts = Vec::new();

        let text = std::mem::take(&mut self.text);
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        for (_, draft) in std::mem::take(&mut self.tool_uses) {
            if draft.name.is_empty() {
                continue;
            }
            parts.push(Part::FunctionCall(FunctionCall {
                id: if draft.id.is_empty() {
                    None
                } else {
                    Some(draft.id)
                },
                name: draft.name,
                args: safe_parse_json(&draft.input),
            }));
        }

        let usage = if self.input_tokens.is_some() || self.output_tokens.is_some() {
            Some(UsageMetadata::new(
                Some(self.input_tokens.unwrap_or(0)),
                Some(self.output_tokens.unwrap_or(0)),
                Some(self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)),
            ))
        } else {
            None
        };

        self.current_block_index = -1;
        self.input_tokens = None;
        self.output_tokens = None;

        let mut response = LlmResponse::complete(parts);
        response.usage_metadata = usage;
        response
    }
}
