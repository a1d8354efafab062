//! # scriptpilot agent
//!
//! The loop between the model and the machine:
//! 1. User provides a request
//! 2. The model replies with prose and/or a fenced Python script
//! 3. The script runs in a child interpreter (after confirmation in dry-run mode)
//! 4. Its output or error is fed back into the conversation
//! 5. If the output ends with `CONTINUE`, the model gets another turn
//!
//! The model never sees the machine directly; it only sees what its scripts print.

mod archive;
mod console;
mod executor;
mod interrupt;
mod outcome;
mod prompt;
mod proposal;
mod runner;
mod session;

#[cfg(test)]
mod testing;

pub use archive::ScriptArchive;
pub use console::Console;
pub use executor::{CycleReport, LoopConfig, ScriptLoop};
pub use interrupt::{CtrlC, Interrupt, NoInterrupt};
pub use outcome::{continuation_signal, ExecutionOutcome, ScriptFault, CONTINUE_MARKER};
pub use prompt::{HostInfo, SystemPrompt};
pub use proposal::ScriptProposal;
pub use runner::{PythonRunner, ScriptRunner};
pub use session::{Session, SessionConfig, Transcript};
