//! The canonical data model passed around by the host framework.
//!
//! Providers speak different wire formats (OpenAI-style chat completions,
//! Anthropic-style messages) and each converts to and from these
//! internal structs at its own boundary. The rest of the framework only
//! ever sees the canonical shapes, so a conversation can move between
//! providers without translation at the call sites.
pub mod content;
pub mod request;
pub mod response;
pub mod role;
pub mod tool;
