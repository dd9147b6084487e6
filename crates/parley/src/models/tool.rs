use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    /// The name of the function. Declarations with an empty name are
    /// skipped at conversion time.
    #[serde(default)]
    pub name: String,
    /// A description of what the function does
    #[serde(default)]
    pub description: String,
    /// JSON-Schema-like description of the parameters the function accepts.
    /// Primitive type names may arrive uppercase or lowercase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl FunctionDeclaration {
    /// Create a new declaration with the given name and description
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        FunctionDeclaration {
            name: name.into(),
            description: description.into(),
            parameters: Some(parameters),
        }
    }
}

/// A group of function declarations offered to the model together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolGroup {
    #[serde(default)]
    pub function_declarations: Vec<FunctionDeclaration>,
}

impl ToolGroup {
    pub fn new(function_declarations: Vec<FunctionDeclaration>) -> Self {
        ToolGroup {
            function_declarations,
        }
    }
}
