//! Anthropic `/messages` client.

use super::http;
use super::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderConfig,
    ProviderError, Role, Usage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const API_VERSION: &str = "2023-06-01";
/// `max_tokens` is mandatory on this API.
const FALLBACK_MAX_TOKENS: usize = 4096;

pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http::client(&config)?,
            config,
        })
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::AuthenticationFailed)?;

        let body = MessagesBody::new(&request, self.default_model());
        tracing::debug!(model = body.model, messages = body.messages.len(), "messages request");

        let builder = self
            .client
            .post(format!("{}/messages", self.config.base_url_or(DEFAULT_BASE_URL)))
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let reply: MessagesReply = http::send_json(builder, &self.config).await?;
        Ok(reply.into())
    }
}

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> MessagesBody<'a> {
    /// System messages move to the top-level `system` field, joined in order.
    fn new(request: &'a CompletionRequest, default_model: &'a str) -> Self {
        let (system, messages): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
            request.messages.iter().partition(|msg| msg.role == Role::System);

        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|msg| msg.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        });

        Self {
            model: request.model.as_deref().unwrap_or(default_model),
            system,
            messages,
            max_tokens: request.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    id: String,
    model: String,
    content: Vec<Block>,
    stop_reason: Option<String>,
    usage: TokenCounts,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TokenCounts {
    input_tokens: usize,
    output_tokens: usize,
}

impl From<MessagesReply> for CompletionResponse {
    fn from(reply: MessagesReply) -> Self {
        let text: String = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text),
                Block::Other => None,
            })
            .collect();

        CompletionResponse {
            id: reply.id,
            model: reply.model,
            content: (!text.is_empty()).then_some(text),
            finish_reason: FinishReason::from_wire(reply.stop_reason.as_deref()),
            usage: Usage::new(reply.usage.input_tokens, reply.usage.output_tokens),
        }
    }
}
