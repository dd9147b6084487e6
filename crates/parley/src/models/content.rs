use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;

/// A tool invocation emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    /// Correlation id assigned by the backing API, if it provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Structured arguments, already parsed out of the wire encoding.
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new<S: Into<String>>(name: S, args: Value) -> Self {
        FunctionCall {
            id: None,
            name: name.into(),
            args,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The result of executing a tool, sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    /// Id of the function call this result answers. The host framework
    /// correlates calls and results by this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub response: Value,
}

impl FunctionResponse {
    pub fn new(response: Value) -> Self {
        FunctionResponse {
            id: None,
            name: None,
            response,
        }
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The smallest unit of content within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Part::Text(text.into())
    }

    /// Get the text if this is a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Part::FunctionResponse(response) => Some(response),
            _ => None,
        }
    }
}

/// One message-equivalent unit of a conversation: a role plus ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Content { role, parts }
    }

    /// Create an empty user turn.
    pub fn user() -> Self {
        Content {
            role: Role::User,
            parts: Vec::new(),
        }
    }

    /// Create an empty model turn.
    pub fn model() -> Self {
        Content {
            role: Role::Model,
            parts: Vec::new(),
        }
    }

    /// Add any part to the turn.
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text part to the turn.
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_part(Part::text(text))
    }

    /// Add a function call to the turn.
    pub fn with_function_call(self, call: FunctionCall) -> Self {
        self.with_part(Part::FunctionCall(call))
    }

    /// Add a function response to the turn.
    pub fn with_function_response(self, response: FunctionResponse) -> Self {
        self.with_part(Part::FunctionResponse(response))
    }

    /// Concatenate the turn's text parts with newlines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
