//! Execution outcomes and the continuation rule

use scriptpilot_error::{Error, ErrorKind};
use std::fmt;

/// Sentinel a script prints last to ask for another turn.
pub const CONTINUE_MARKER: &str = "CONTINUE";

/// True iff the output, trimmed of surrounding whitespace, ends with
/// [`CONTINUE_MARKER`]. Plain suffix match: `"xCONTINUE"` counts.
pub fn continuation_signal(output: &str) -> bool {
    output.trim().ends_with(CONTINUE_MARKER)
}

/// Why an execution attempt produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFault {
    /// The user answered "n" at the confirmation prompt
    Cancelled,
    /// Ctrl-C while waiting on the model or on the script
    Interrupted,
    /// The script (or its interpreter) failed; holds the fault description
    Failed(String),
}

impl ScriptFault {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptFault::Cancelled => ErrorKind::UserCancelled,
            ScriptFault::Interrupted => ErrorKind::Interrupted,
            ScriptFault::Failed(_) => ErrorKind::ExecutionFailed,
        }
    }
}

impl fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Cancellation is raised like any other runtime error.
            ScriptFault::Cancelled => write!(f, "Execution error: Execution cancelled by user"),
            ScriptFault::Interrupted => write!(f, "Execution interrupted by user"),
            ScriptFault::Failed(description) => write!(f, "Execution error: {}", description),
        }
    }
}

impl From<ScriptFault> for Error {
    fn from(fault: ScriptFault) -> Self {
        Error::new(fault.kind(), fault.to_string()).with_operation("executor::execute")
    }
}

/// Result of one execution attempt. Output and error are exclusive: a
/// faulted attempt keeps no output, even if the script printed some.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub output: String,
    pub error: Option<ScriptFault>,
}

impl ExecutionOutcome {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn fault(fault: ScriptFault) -> Self {
        Self {
            output: String::new(),
            error: Some(fault),
        }
    }

    /// Never derived from error text.
    pub fn should_continue(&self) -> bool {
        self.error.is_none() && continuation_signal(&self.output)
    }
}
