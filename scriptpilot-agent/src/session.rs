//! # Conversation session
//!
//! A [`Session`] owns the transcript for one top-level prompt and is the only
//! thing that talks to the model. The provider is stateless: every round trip
//! sends the whole transcript, and the session appends the assistant's raw
//! reply before parsing it into a [`ScriptProposal`]. A failed round trip
//! appends nothing.

use crate::proposal::ScriptProposal;
use scriptpilot_error::Result;
use scriptpilot_llm::error::empty_response;
use scriptpilot_llm::{ChatMessage, CompletionRequest, Error, LlmProvider, Role, UsageTracker};

pub const ERROR_PREFIX: &str = "Error: ";
pub const OUTPUT_PREFIX: &str = "LAST SCRIPT OUTPUT:\n";

/// Ordered, append-only list of role-tagged messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages with the given role, in order
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(move |m| m.role == role)
    }
}

/// Per-request model parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

pub struct Session<'p, P: LlmProvider> {
    provider: &'p P,
    config: SessionConfig,
    transcript: Transcript,
    usage: UsageTracker,
}

impl<'p, P: LlmProvider> Session<'p, P> {
    /// Start an empty transcript seeded with the system prompt.
    pub fn new(provider: &'p P, system_prompt: impl Into<String>) -> Self {
        let mut transcript = Transcript::new();
        let system_prompt = system_prompt.into();
        if !system_prompt.is_empty() {
            transcript.push(ChatMessage::system(system_prompt));
        }

        Self {
            provider,
            config: SessionConfig::default(),
            transcript,
            usage: UsageTracker::new(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Model used for requests: the configured one or the provider default
    pub fn model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(self.provider.default_model())
    }

    /// Append the user's prompt and ask for the first proposal.
    pub async fn start(&mut self, initial_prompt: &str) -> Result<ScriptProposal> {
        self.transcript.push(ChatMessage::user(initial_prompt));
        self.request("session::start").await
    }

    /// Ask for the next proposal given the feedback recorded so far.
    pub async fn next(&mut self) -> Result<ScriptProposal> {
        self.request("session::next").await
    }

    /// `start` with a prompt, `next` without one.
    pub async fn get_script(&mut self, prompt: Option<&str>) -> Result<ScriptProposal> {
        match prompt {
            Some(prompt) => self.start(prompt).await,
            None => self.next().await,
        }
    }

    pub fn record_error(&mut self, text: &str) {
        self.transcript.push(ChatMessage::user(format!("{}{}", ERROR_PREFIX, text)));
    }

    pub fn record_output(&mut self, text: &str) {
        self.transcript.push(ChatMessage::user(format!("{}{}", OUTPUT_PREFIX, text)));
    }

    async fn request(&mut self, operation: &'static str) -> Result<ScriptProposal> {
        let model = self.model().to_string();
        let mut request = CompletionRequest::new(self.transcript.messages().to_vec()).with_model(&model);
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            provider = self.provider.name(),
            model = %model,
            messages = self.transcript.len(),
            "requesting script"
        );

        let response = self.provider.complete(request).await.map_err(|e| {
            Error::from(e)
                .with_operation(operation)
                .with_context("model", model.clone())
                .with_context("messages", self.transcript.len().to_string())
        })?;

        self.usage.track(&response.model, &response.usage);

        let content = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| empty_response(&model).with_operation(operation))?;

        tracing::debug!(chars = content.len(), finish = ?response.finish_reason, "model replied");

        self.transcript.push(ChatMessage::assistant(&content));
        Ok(ScriptProposal::parse(&content))
    }
}
