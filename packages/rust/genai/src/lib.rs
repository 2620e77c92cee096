//! Generation-service client and streaming response reader.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::GenerationClient;
pub use streaming::{ResponseStream, StreamEvent, collect_text};
pub use types::{ChatMessage, ChatRequest, ChatRole};
