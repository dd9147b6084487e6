/// Connection settings for an OpenAI-style chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

/// Connection settings for an Anthropic-style messages endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// The messages API requires max_tokens; unset falls back to 4096.
    pub max_tokens: Option<i32>,
}
