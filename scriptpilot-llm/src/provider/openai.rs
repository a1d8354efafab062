//! `/chat/completions` client for OpenAI and compatible servers (Ollama, vLLM, Azure).

use super::http;
use super::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderConfig,
    ProviderError, ProviderType, Usage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http::client(&config)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url_or(DEFAULT_BASE_URL))
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        if self.config.provider_type == ProviderType::Local {
            "local"
        } else {
            "openai"
        }
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = ChatBody::new(&request, self.default_model());
        tracing::debug!(model = body.model, messages = body.messages.len(), "chat completion request");

        let mut builder = self.client.post(self.endpoint()).json(&body);
        // Local servers usually run without a key.
        if let Some(key) = self.config.api_key.as_deref().filter(|key| !key.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let reply: ChatReply = http::send_json(builder, &self.config).await?;
        reply.into_response()
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    stream: bool,
}

impl<'a> ChatBody<'a> {
    fn new(request: &'a CompletionRequest, default_model: &'a str) -> Self {
        Self {
            model: request.model.as_deref().unwrap_or(default_model),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenCounts>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenCounts {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl ChatReply {
    fn into_response(self) -> Result<CompletionResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("response has no choices".into()))?;

        Ok(CompletionResponse {
            id: self.id,
            model: self.model,
            content: choice.message.content,
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
            usage: self
                .usage
                .map(|counts| Usage::new(counts.prompt_tokens, counts.completion_tokens))
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_serialization() {
        let request = CompletionRequest::new(vec![ChatMessage::system("be brief"), ChatMessage::user("list files")])
            .with_temperature(1.0);

        let json = serde_json::to_value(ChatBody::new(&request, DEFAULT_MODEL)).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "list files");
        assert_eq!(json["temperature"], 1.0);
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["stream"], false);

        let request = request.with_model("gpt-4o-mini");
        assert_eq!(ChatBody::new(&request, DEFAULT_MODEL).model, "gpt-4o-mini");
    }

    #[test]
    fn test_reply_conversion() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "message": {"role": "assistant", "content": "```python\nprint(1)\n```"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        });

        let response = serde_json::from_value::<ChatReply>(body).unwrap().into_response().unwrap();
        assert_eq!(response.content.as_deref(), Some("```python\nprint(1)\n```"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage, Usage::new(12, 5));
    }

    #[test]
    fn test_reply_without_choices() {
        let reply: ChatReply = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(reply.into_response(), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_provider_names() {
        let provider = OpenAIProvider::new(ProviderConfig::openai("sk-test")).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), DEFAULT_MODEL);
        assert_eq!(provider.endpoint(), "https://api.openai.com/v1/chat/completions");

        let provider = OpenAIProvider::new(ProviderConfig::local("http://localhost:11434/v1/", "llama3")).unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.default_model(), "llama3");
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/chat/completions");
    }
}
