// Embeddings module
// HTTP client for the OpenAI-compatible embedding service

pub mod openai;

pub use openai::OpenAIClient;
