//! Generation-service request types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// Speaker of a chat-history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatRole {
    System,
    User,
    Chatbot,
}

/// One prior turn sent along with the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub message: String,
}

impl ChatMessage {
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            message: message.into(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            message: message.into(),
        }
    }

    pub fn chatbot(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Chatbot,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatRequest
// ---------------------------------------------------------------------------

/// A streaming chat request: the prompt, prior turns, and decoding parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub chat_history: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub top_p: f32,
    pub top_k: u32,
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Body of `POST /20231130/actions/chat`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatDetails<'a> {
    pub compartment_id: &'a str,
    pub serving_mode: ServingMode<'a>,
    pub chat_request: CohereChatRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServingMode<'a> {
    pub serving_type: &'static str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CohereChatRequest<'a> {
    pub api_format: &'static str,
    pub message: &'a str,
    pub chat_history: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub is_stream: bool,
}

impl<'a> ChatDetails<'a> {
    pub(crate) fn new(compartment_id: &'a str, model_id: &'a str, request: &'a ChatRequest) -> Self {
        Self {
            compartment_id,
            serving_mode: ServingMode {
                serving_type: "ON_DEMAND",
                model_id,
            },
            chat_request: CohereChatRequest {
                api_format: "COHERE",
                message: &request.message,
                chat_history: &request.chat_history,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                frequency_penalty: request.frequency_penalty,
                top_p: request.top_p,
                top_k: request.top_k,
                is_stream: true,
            },
        }
    }
}
