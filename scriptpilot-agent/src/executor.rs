//! # Execution loop
//!
//! Drives one top-level prompt to completion:
//!
//! ```text
//! AWAITING_PROPOSAL -> CONFIRM? -> EXECUTING -> RECORDING -> CONTINUE | DONE
//! ```
//!
//! Every attempt ends with either an error or an output, never both. Errors
//! are fed back as `Error: ...`, non-empty output as `LAST SCRIPT OUTPUT:`.
//! Another turn is taken only when the output ends with `CONTINUE`.
//!
//! Script faults, cancellation and interruption are recovered here. Model
//! faults are returned to the caller.

use crate::archive::ScriptArchive;
use crate::console::Console;
use crate::interrupt::Interrupt;
use crate::outcome::{ExecutionOutcome, ScriptFault};
use crate::proposal::ScriptProposal;
use crate::runner::ScriptRunner;
use crate::session::{Session, SessionConfig, Transcript, ERROR_PREFIX};
use scriptpilot_error::Result;
use scriptpilot_llm::{LlmProvider, UsageTracker};
use std::io;

const RULE: &str = "--------------------------------------------------------------------------------";
const CONFIRM_PROMPT: &str = "Proceed with execution? (Y/n):";

/// Loop settings.
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// Show each script and ask before running it (dry-run mode)
    pub verbose: bool,
    pub session: SessionConfig,
}

/// What is left of a finished cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub transcript: Transcript,
    pub usage: UsageTracker,
    /// Number of proposals requested
    pub turns: usize,
}

pub struct ScriptLoop<'a, P, R, I> {
    provider: &'a P,
    runner: &'a R,
    interrupt: &'a I,
    system_prompt: String,
    config: LoopConfig,
    archive: Option<ScriptArchive>,
}

impl<'a, P, R, I> ScriptLoop<'a, P, R, I>
where
    P: LlmProvider,
    R: ScriptRunner,
    I: Interrupt,
{
    pub fn new(provider: &'a P, runner: &'a R, interrupt: &'a I, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            runner,
            interrupt,
            system_prompt: system_prompt.into(),
            config: LoopConfig::default(),
            archive: None,
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_archive(mut self, archive: ScriptArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run one top-level prompt until the model stops asking to continue.
    pub async fn run<C: Console>(&self, console: &mut C, prompt: &str) -> Result<CycleReport> {
        let mut session =
            Session::new(self.provider, self.system_prompt.as_str()).with_config(self.config.session.clone());
        let mut pending_prompt = Some(prompt);
        let mut turns = 0;

        loop {
            turns += 1;
            let proposal = tokio::select! {
                biased;
                proposal = session.get_script(pending_prompt.take()) => Some(proposal?),
                _ = self.interrupt.interrupted() => None,
            };

            let script = proposal.as_ref().and_then(|p| p.script.clone());
            let outcome = match proposal {
                Some(proposal) => self.attempt(&session, console, proposal).await,
                None => ExecutionOutcome::fault(ScriptFault::Interrupted),
            };

            let should_continue = outcome.should_continue();
            tracing::debug!(turn = turns, error = ?outcome.error, should_continue, "attempt finished");

            match &outcome.error {
                Some(fault) => {
                    let text = fault.to_string();
                    session.record_error(&text);
                    console.print(&format!("{}{}", ERROR_PREFIX, text));
                    if let (Some(script), false) = (&script, self.config.verbose) {
                        console.print(RULE);
                        console.print(script);
                        console.print(RULE);
                    }
                }
                None if !outcome.output.is_empty() => {
                    session.record_output(&outcome.output);
                    if self.config.verbose || !should_continue {
                        console.print(outcome.output.trim_end_matches('\n'));
                    }
                }
                None => {}
            }

            if !should_continue {
                break;
            }
        }

        let usage = session.usage().clone();
        tracing::debug!(
            turns,
            calls = usage.total_calls,
            prompt_tokens = usage.total_prompt_tokens,
            completion_tokens = usage.total_completion_tokens,
            "cycle finished"
        );

        Ok(CycleReport {
            transcript: session.transcript().clone(),
            usage,
            turns,
        })
    }

    /// CONFIRM? and EXECUTING for one proposal.
    async fn attempt<C: Console>(
        &self,
        session: &Session<'_, P>,
        console: &mut C,
        proposal: ScriptProposal,
    ) -> ExecutionOutcome {
        let script = match proposal.script {
            Some(script) => script,
            None => {
                if let Some(message) = &proposal.message {
                    console.print(message);
                }
                return ExecutionOutcome::default();
            }
        };

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.save(session.transcript(), session.model(), &script) {
                tracing::warn!(error = %e, "failed to archive script");
            }
        }

        if self.config.verbose {
            if let Err(fault) = self.confirm(console, proposal.message.as_deref(), &script) {
                return ExecutionOutcome::fault(fault);
            }
        }

        let result = tokio::select! {
            biased;
            result = self.runner.run(&script) => result,
            _ = self.interrupt.interrupted() => Err(ScriptFault::Interrupted),
        };

        match result {
            Ok(output) => ExecutionOutcome::output(output),
            Err(fault) => ExecutionOutcome::fault(fault),
        }
    }

    fn confirm<C: Console>(
        &self,
        console: &mut C,
        message: Option<&str>,
        script: &str,
    ) -> std::result::Result<(), ScriptFault> {
        console.print(RULE);
        if let Some(message) = message {
            console.print(message);
        }
        console.print(script);
        console.print(RULE);

        match console.read_line(CONFIRM_PROMPT) {
            Ok(answer) if answer.trim().eq_ignore_ascii_case("n") => Err(ScriptFault::Cancelled),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(ScriptFault::Interrupted),
            Err(e) => Err(ScriptFault::Failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::NoInterrupt;
    use crate::testing::{
        HangingProvider, HangingRunner, ImmediateInterrupt, RecordingConsole, ScriptedProvider, ScriptedRunner,
    };
    use scriptpilot_llm::{ChatMessage, ErrorKind, ProviderError, Role};
    use tempfile::TempDir;
    use tokio_test::block_on;

    fn verbose() -> LoopConfig {
        LoopConfig {
            verbose: true,
            ..LoopConfig::default()
        }
    }

    fn user_messages(transcript: &Transcript) -> Vec<String> {
        transcript.with_role(Role::User).map(|m| m.content.clone()).collect()
    }

    #[test]
    fn test_single_script_success() {
        let provider = ScriptedProvider::new(vec![Ok("```python\nimport os\nprint('a.txt\\nb.txt')\n```".into())]);
        let runner = ScriptedRunner::new(vec![Ok("a.txt\nb.txt\n".into())]);
        let mut console = RecordingConsole::new();

        let report = block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "list files"))
            .unwrap();

        assert_eq!(report.turns, 1);
        assert_eq!(runner.scripts(), vec!["import os\nprint('a.txt\\nb.txt')".to_string()]);
        assert_eq!(
            user_messages(&report.transcript),
            vec!["list files".to_string(), "LAST SCRIPT OUTPUT:\na.txt\nb.txt\n".to_string()]
        );
        assert_eq!(console.printed, vec!["a.txt\nb.txt".to_string()]);
    }

    #[test]
    fn test_continuation_takes_another_turn() {
        let provider = ScriptedProvider::new(vec![
            Ok("```\nprint('step1')\nprint('CONTINUE')\n```".into()),
            Ok("```\nprint('done')\n```".into()),
        ]);
        let runner = ScriptedRunner::new(vec![Ok("step1\nCONTINUE\n".into()), Ok("done\n".into())]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "two steps")).unwrap();

        assert_eq!(report.turns, 2);
        assert_eq!(report.usage.total_calls, 2);
        // The continued output is only fed back, not shown
        assert_eq!(console.printed, vec!["done".to_string()]);

        let requests = provider.requests();
        assert_eq!(
            requests[1].last(),
            Some(&ChatMessage::user("LAST SCRIPT OUTPUT:\nstep1\nCONTINUE\n"))
        );
        assert_eq!(
            report.transcript.last(),
            Some(&ChatMessage::user("LAST SCRIPT OUTPUT:\ndone\n"))
        );
    }

    #[test]
    fn test_runtime_error_is_fed_back_once() {
        let provider = ScriptedProvider::new(vec![Ok("```python\nprint('partial')\n1/0\n```".into())]);
        let runner = ScriptedRunner::new(vec![Err(ScriptFault::Failed("division by zero".into()))]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "divide")).unwrap();

        assert_eq!(report.turns, 1);
        assert_eq!(
            user_messages(&report.transcript),
            vec!["divide".to_string(), "Error: Execution error: division by zero".to_string()]
        );
        // Error first, then the failing script between rules
        assert_eq!(
            console.printed,
            vec![
                "Error: Execution error: division by zero".to_string(),
                RULE.to_string(),
                "print('partial')\n1/0".to_string(),
                RULE.to_string(),
            ]
        );
    }

    #[test]
    fn test_message_only_reply() {
        let provider = ScriptedProvider::new(vec![Ok("Hello! How can I help?".into())]);
        let runner = ScriptedRunner::new(vec![]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "hi")).unwrap();

        assert!(runner.scripts().is_empty());
        assert_eq!(console.printed, vec!["Hello! How can I help?".to_string()]);
        assert_eq!(user_messages(&report.transcript), vec!["hi".to_string()]);
        assert_eq!(
            report.transcript.last(),
            Some(&ChatMessage::assistant("Hello! How can I help?"))
        );
    }

    #[test]
    fn test_confirmation_gate() {
        for answer in ["n", " N ", "n\n"] {
            let provider = ScriptedProvider::new(vec![Ok("Deleting.\n```python\nprint('rm')\n```".into())]);
            let runner = ScriptedRunner::new(vec![]);
            let mut console = RecordingConsole::answering(vec![Ok(answer.to_string())]);

            let report = block_on(
                ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                    .with_config(verbose())
                    .run(&mut console, "clean up"),
            )
            .unwrap();

            assert!(runner.scripts().is_empty(), "answer {:?} must cancel", answer);
            assert_eq!(console.prompts, vec![CONFIRM_PROMPT.to_string()]);
            assert_eq!(
                report.transcript.last(),
                Some(&ChatMessage::user("Error: Execution error: Execution cancelled by user"))
            );
            // Verbose mode already showed the script before asking
            assert_eq!(
                console.printed,
                vec![
                    RULE.to_string(),
                    "Deleting.".to_string(),
                    "print('rm')".to_string(),
                    RULE.to_string(),
                    "Error: Execution error: Execution cancelled by user".to_string(),
                ]
            );
        }
    }

    #[test]
    fn test_confirmation_accepts_anything_else() {
        for answer in ["", "y", "yes", "no"] {
            let provider = ScriptedProvider::new(vec![Ok("```python\nprint('ok')\n```".into())]);
            let runner = ScriptedRunner::new(vec![Ok("ok\n".into())]);
            let mut console = RecordingConsole::answering(vec![Ok(answer.to_string())]);

            block_on(
                ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                    .with_config(verbose())
                    .run(&mut console, "go"),
            )
            .unwrap();

            assert_eq!(runner.scripts().len(), 1, "answer {:?} must proceed", answer);
            assert_eq!(console.printed.last(), Some(&"ok".to_string()));
        }
    }

    #[test]
    fn test_verbose_prints_continued_output() {
        let provider = ScriptedProvider::new(vec![
            Ok("```\nprint('CONTINUE')\n```".into()),
            Ok("Finished.".into()),
        ]);
        let runner = ScriptedRunner::new(vec![Ok("CONTINUE\n".into())]);
        let mut console = RecordingConsole::answering(vec![Ok("y".into())]);

        block_on(
            ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                .with_config(verbose())
                .run(&mut console, "go"),
        )
        .unwrap();

        assert!(console.printed.contains(&"CONTINUE".to_string()));
        assert_eq!(console.printed.last(), Some(&"Finished.".to_string()));
    }

    #[test]
    fn test_eof_at_confirmation_is_execution_error() {
        let provider = ScriptedProvider::new(vec![Ok("```\nprint(1)\n```".into())]);
        let runner = ScriptedRunner::new(vec![]);
        let mut console = RecordingConsole::new();

        let report = block_on(
            ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                .with_config(verbose())
                .run(&mut console, "go"),
        )
        .unwrap();

        assert!(runner.scripts().is_empty());
        assert_eq!(
            report.transcript.last(),
            Some(&ChatMessage::user("Error: Execution error: EOF when reading a line"))
        );
    }

    #[test]
    fn test_ctrl_c_at_confirmation() {
        let provider = ScriptedProvider::new(vec![Ok("```\nprint(1)\n```".into())]);
        let runner = ScriptedRunner::new(vec![]);
        let mut console =
            RecordingConsole::answering(vec![Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))]);

        let report = block_on(
            ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                .with_config(verbose())
                .run(&mut console, "go"),
        )
        .unwrap();

        assert_eq!(
            report.transcript.last(),
            Some(&ChatMessage::user("Error: Execution interrupted by user"))
        );
    }

    #[test]
    fn test_error_and_output_are_exclusive() {
        let provider = ScriptedProvider::new(vec![
            Ok("```\nprint('CONTINUE')\n```".into()),
            Ok("```\nraise ValueError('bad')\n```".into()),
        ]);
        let runner = ScriptedRunner::new(vec![Ok("CONTINUE\n".into()), Err(ScriptFault::Failed("bad".into()))]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "go")).unwrap();

        // One feedback message per attempt, never two
        let feedback: Vec<_> = user_messages(&report.transcript).into_iter().skip(1).collect();
        assert_eq!(
            feedback,
            vec![
                "LAST SCRIPT OUTPUT:\nCONTINUE\n".to_string(),
                "Error: Execution error: bad".to_string()
            ]
        );
        // An error ends the cycle even after a continued turn
        assert_eq!(report.turns, 2);
    }

    #[test]
    fn test_empty_output_records_nothing() {
        let provider = ScriptedProvider::new(vec![Ok("```\nx = 1\n```".into())]);
        let runner = ScriptedRunner::new(vec![Ok(String::new())]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "go")).unwrap();

        assert_eq!(user_messages(&report.transcript), vec!["go".to_string()]);
        assert!(console.printed.is_empty());
    }

    #[test]
    fn test_interrupt_while_waiting_on_model() {
        let runner = ScriptedRunner::new(vec![]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&HangingProvider, &runner, &ImmediateInterrupt, "rules").run(&mut console, "go"))
                .unwrap();

        assert_eq!(
            user_messages(&report.transcript),
            vec!["go".to_string(), "Error: Execution interrupted by user".to_string()]
        );
        assert_eq!(console.printed, vec!["Error: Execution interrupted by user".to_string()]);
    }

    #[test]
    fn test_interrupt_while_script_runs() {
        let provider = ScriptedProvider::new(vec![Ok("```\nwhile True: pass\n```".into())]);
        let mut console = RecordingConsole::new();

        let report =
            block_on(ScriptLoop::new(&provider, &HangingRunner, &ImmediateInterrupt, "rules").run(&mut console, "spin"))
                .unwrap();

        assert_eq!(
            report.transcript.last(),
            Some(&ChatMessage::user("Error: Execution interrupted by user"))
        );
        assert_eq!(console.printed[0], "Error: Execution interrupted by user");
        assert_eq!(console.printed[2], "while True: pass");
    }

    #[test]
    fn test_model_fault_propagates() {
        let provider = ScriptedProvider::new(vec![
            Ok("```\nprint('CONTINUE')\n```".into()),
            Err(ProviderError::Network("connection reset".into())),
        ]);
        let runner = ScriptedRunner::new(vec![Ok("CONTINUE\n".into())]);
        let mut console = RecordingConsole::new();

        let err =
            block_on(ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules").run(&mut console, "go")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert!(err.is_model_fault());
        assert_eq!(err.operation(), "session::next");
    }

    #[test]
    fn test_archive_saves_proposed_scripts() {
        let temp_dir = TempDir::new().unwrap();
        let archive = ScriptArchive::new(temp_dir.path()).unwrap();
        let provider = ScriptedProvider::new(vec![Ok("```python\nprint('hi')\n```".into())]);
        let runner = ScriptedRunner::new(vec![Ok("hi\n".into())]);
        let mut console = RecordingConsole::new();

        block_on(
            ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules")
                .with_archive(archive)
                .run(&mut console, "say hi"),
        )
        .unwrap();

        let saved: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let contents = std::fs::read_to_string(saved[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("\"content\": \"say hi\""));
        assert!(contents.ends_with("print('hi')\n"));
    }

    #[test]
    fn test_each_cycle_starts_fresh() {
        let provider = ScriptedProvider::new(vec![Ok("first".into()), Ok("second".into())]);
        let runner = ScriptedRunner::new(vec![]);
        let script_loop = ScriptLoop::new(&provider, &runner, &NoInterrupt, "rules");
        let mut console = RecordingConsole::new();

        block_on(script_loop.run(&mut console, "one")).unwrap();
        let report = block_on(script_loop.run(&mut console, "two")).unwrap();

        assert_eq!(report.transcript.len(), 3);
        assert_eq!(provider.requests()[1], vec![ChatMessage::system("rules"), ChatMessage::user("two")]);
    }
}
