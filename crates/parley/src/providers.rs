pub mod anthropic;
pub mod base;
pub mod configs;
pub mod formats;
pub mod openai;
pub mod utils;
