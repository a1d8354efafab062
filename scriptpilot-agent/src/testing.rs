//! Scripted collaborators for unit tests

use crate::console::Console;
use crate::interrupt::Interrupt;
use crate::outcome::ScriptFault;
use crate::runner::ScriptRunner;
use scriptpilot_llm::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError, Usage,
};
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

/// Replies with canned responses in order and records what it was sent.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transcript sent with each request
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().iter().map(|r| r.messages.clone()).collect()
    }

    pub fn models(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().filter_map(|r| r.model.clone()).collect()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.default_model().to_string());
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("no scripted reply left".into())))?;

        Ok(CompletionResponse {
            id: "scripted".into(),
            model,
            content: Some(reply),
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }
}

/// Returns canned results and records every script it was asked to run.
pub struct ScriptedRunner {
    results: Mutex<VecDeque<Result<String, ScriptFault>>>,
    scripts: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(results: Vec<Result<String, ScriptFault>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

impl ScriptRunner for ScriptedRunner {
    async fn run(&self, script: &str) -> Result<String, ScriptFault> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ScriptFault::Failed("no scripted result left".into())))
    }
}

/// A runner that blocks until the interrupt fires.
pub struct HangingRunner;

impl ScriptRunner for HangingRunner {
    async fn run(&self, _script: &str) -> Result<String, ScriptFault> {
        std::future::pending().await
    }
}

/// A provider that never answers.
pub struct HangingProvider;

impl LlmProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    fn default_model(&self) -> &str {
        "hanging-model"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Fires immediately.
pub struct ImmediateInterrupt;

impl Interrupt for ImmediateInterrupt {
    async fn interrupted(&self) {}
}

/// Captures printed blocks and answers prompts from a queue.
#[derive(Default)]
pub struct RecordingConsole {
    pub printed: Vec<String>,
    pub prompts: Vec<String>,
    answers: VecDeque<io::Result<String>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: Vec<io::Result<String>>) -> Self {
        Self {
            answers: answers.into(),
            ..Self::default()
        }
    }
}

impl Console for RecordingConsole {
    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF when reading a line")))
    }
}
