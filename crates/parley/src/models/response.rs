use serde::{Deserialize, Serialize};

use super::content::{Content, Part};
use super::role::Role;

/// Token accounting reported by the backing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_token_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<i32>,
}

impl UsageMetadata {
    pub fn new(
        prompt_token_count: Option<i32>,
        candidates_token_count: Option<i32>,
        total_token_count: Option<i32>,
    ) -> Self {
        UsageMetadata {
            prompt_token_count,
            candidates_token_count,
            total_token_count,
        }
    }
}

/// A canonical model reply: either a complete turn or one partial
/// streaming update.
///
/// Failed requests use the same shape with the error fields set, so
/// downstream handling stays uniform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    pub turn_complete: bool,
    /// True for intermediate streaming updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LlmResponse {
    /// A finished reply. Zero parts collapse to absent content rather than
    /// an empty turn.
    pub fn complete(parts: Vec<Part>) -> Self {
        let content = if parts.is_empty() {
            None
        } else {
            Some(Content::new(Role::Model, parts))
        };
        LlmResponse {
            content,
            turn_complete: true,
            ..Default::default()
        }
    }

    /// One intermediate streaming text update.
    pub fn partial_text<S: Into<String>>(text: S) -> Self {
        LlmResponse {
            content: Some(Content::model().with_text(text)),
            turn_complete: false,
            partial: Some(true),
            ..Default::default()
        }
    }

    /// A failed request, folded into the canonical response shape.
    pub fn from_error<C, M>(code: C, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        LlmResponse {
            turn_complete: true,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage_metadata = Some(usage);
        self
    }
}
