//! Per-provider HTTP wire formats: endpoint, auth, request body, reply envelope.
//!
//! Every function here matches exhaustively on `RemoteProvider`, so adding a
//! provider fails to compile until its wire format is written.

use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::llm_client::{CompletionRequest, LlmError};
use crate::matching::provider::RemoteProvider;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const MISTRAL_API_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const OPENAI_MODEL: &str = "gpt-4o-mini";
const MISTRAL_MODEL: &str = "mistral-small-latest";
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Low temperature keeps scores stable across repeated calls.
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1024;
/// Upper bound on raw error bodies copied into `LlmError::Api`.
const MAX_ERROR_BODY: usize = 500;

impl RemoteProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            RemoteProvider::OpenAi => OPENAI_MODEL,
            RemoteProvider::Mistral => MISTRAL_MODEL,
            RemoteProvider::Anthropic => ANTHROPIC_MODEL,
            RemoteProvider::Gemini => GEMINI_MODEL,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI / Mistral chat completions (same shape)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, request: &CompletionRequest<'a>) -> Self {
        Self {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic messages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini generateContent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Dispatch
// ────────────────────────────────────────────────────────────────────────────

/// Builds the outbound HTTP request for `request.provider`.
pub(crate) fn build_request(client: &Client, request: &CompletionRequest<'_>) -> RequestBuilder {
    let api_key = request.api_key.expose_secret();
    let model = request.provider.default_model();

    match request.provider {
        RemoteProvider::OpenAi => client
            .post(OPENAI_API_URL)
            .bearer_auth(api_key)
            .json(&ChatCompletionRequest::new(model, request)),
        RemoteProvider::Mistral => client
            .post(MISTRAL_API_URL)
            .bearer_auth(api_key)
            .json(&ChatCompletionRequest::new(model, request)),
        RemoteProvider::Anthropic => client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&AnthropicRequest {
                model,
                max_tokens: MAX_TOKENS,
                temperature: TEMPERATURE,
                system: request.system,
                messages: [ChatMessage {
                    role: "user",
                    content: request.prompt,
                }],
            }),
        RemoteProvider::Gemini => client
            .post(format!("{GEMINI_API_BASE}/{model}:generateContent"))
            .header("x-goog-api-key", api_key)
            .json(&GeminiRequest {
                system_instruction: GeminiContent {
                    role: None,
                    parts: [GeminiPart {
                        text: request.system,
                    }],
                },
                contents: [GeminiContent {
                    role: Some("user"),
                    parts: [GeminiPart {
                        text: request.prompt,
                    }],
                }],
                generation_config: GeminiGenerationConfig {
                    temperature: TEMPERATURE,
                    response_mime_type: "application/json",
                },
            }),
    }
}

/// Pulls the assistant's text out of a successful reply envelope.
pub(crate) fn extract_text(provider: RemoteProvider, body: &[u8]) -> Result<String, LlmError> {
    let text = match provider {
        RemoteProvider::OpenAi | RemoteProvider::Mistral => {
            let response: ChatCompletionResponse = serde_json::from_slice(body)?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        RemoteProvider::Anthropic => {
            let response: AnthropicResponse = serde_json::from_slice(body)?;
            response
                .content
                .into_iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text)
        }
        RemoteProvider::Gemini => {
            let response: GeminiResponse = serde_json::from_slice(body)?;
            response
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        }
    };

    text.filter(|t| !t.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}

/// Best-effort error message from a non-2xx body.
/// All four providers use `{"error": {"message": ...}}`; Mistral sometimes
/// sends a bare `{"message": ...}`.
pub(crate) fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .and_then(|m| m.as_str())
    });

    match message {
        Some(m) => m.to_string(),
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}
