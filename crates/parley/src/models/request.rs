use serde::{Deserialize, Serialize};

use super::content::Content;
use super::tool::{FunctionDeclaration, ToolGroup};

/// A system instruction, which arrives either as a bare string or as a
/// turn-shaped object whose text parts are joined with newlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemInstruction {
    Text(String),
    Content(Content),
}

impl SystemInstruction {
    /// The instruction as a single string.
    pub fn text(&self) -> String {
        match self {
            SystemInstruction::Text(text) => text.clone(),
            SystemInstruction::Content(content) => content.joined_text(),
        }
    }
}

impl From<&str> for SystemInstruction {
    fn from(text: &str) -> Self {
        SystemInstruction::Text(text.to_string())
    }
}

impl From<String> for SystemInstruction {
    fn from(text: String) -> Self {
        SystemInstruction::Text(text)
    }
}

impl From<Content> for SystemInstruction {
    fn from(content: Content) -> Self {
        SystemInstruction::Content(content)
    }
}

/// A provider-agnostic request: the ordered conversation so far plus the
/// optional system instruction and tool declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRequest {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolGroup>,
}

impl LlmRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        LlmRequest {
            contents,
            system_instruction: None,
            tools: Vec::new(),
        }
    }

    pub fn with_system<S: Into<SystemInstruction>>(mut self, system: S) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolGroup>) -> Self {
        self.tools = tools;
        self
    }

    /// All function declarations across tool groups, in order.
    pub fn function_declarations(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.tools
            .iter()
            .flat_map(|group| group.function_declarations.iter())
    }
}
