//! Provider selected by the config file

use scriptpilot_error::{Error, Result};
use scriptpilot_llm::{
    AnthropicProvider, CompletionRequest, CompletionResponse, LlmProvider, OpenAIProvider, ProviderConfig,
    ProviderError, ProviderType,
};

pub enum Provider {
    OpenAI(OpenAIProvider),
    Anthropic(AnthropicProvider),
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let provider = match config.provider_type {
            ProviderType::OpenAI | ProviderType::Local => OpenAIProvider::new(config).map(Provider::OpenAI),
            ProviderType::Anthropic => AnthropicProvider::new(config).map(Provider::Anthropic),
        };
        provider.map_err(|e| Error::from(e).with_operation("provider::new"))
    }
}

impl LlmProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::OpenAI(p) => p.name(),
            Provider::Anthropic(p) => p.name(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Provider::OpenAI(p) => p.default_model(),
            Provider::Anthropic(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        match self {
            Provider::OpenAI(p) => p.complete(request).await,
            Provider::Anthropic(p) => p.complete(request).await,
        }
    }
}
