//! LLM provider implementations

pub(crate) mod http_client;
mod ollama;

pub use http_client::{HttpClient, HttpClientTrait};
pub use ollama::{OllamaConfig, OllamaProvider};
