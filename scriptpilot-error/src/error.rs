use crate::{ErrorKind, ErrorStatus};
use std::fmt;
use std::io;

/// Error returned by every fallible scriptpilot operation.
///
/// `Display` is what the user sees (`kind: message`). The alternate form
/// (`{:#}`) adds status, operation and context on one line for logs, and
/// `Debug` spells everything out, source chain included.
///
/// ```rust
/// use scriptpilot_error::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::NetworkFailed, "connection reset")
///     .with_operation("provider::complete")
///     .with_operation("session::next")
///     .with_context("model", "gpt-4o");
///
/// assert_eq!(err.to_string(), "network failed: connection reset");
/// assert_eq!(
///     format!("{:#}", err),
///     "network failed (temporary) at session::next { called: provider::complete, model: gpt-4o }: connection reset"
/// );
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Status starts as `Temporary` for retryable kinds, `Permanent` otherwise.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };

        Self {
            kind,
            message: message.into(),
            status,
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// The config file at `path` could not be used.
    pub fn config_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, reason).with_context("path", path)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// `program` could not be started.
    pub fn spawn_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SpawnFailed, reason).with_context("program", program)
    }

    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InferenceFailed, message)
    }

    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Innermost-last: the operation set most recently.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// The model provider failed, so the current prompt cannot go on.
    pub fn is_model_fault(&self) -> bool {
        self.kind.is_model_fault()
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn temporary(self) -> Self {
        self.with_status(ErrorStatus::Temporary)
    }

    pub fn permanent(self) -> Self {
        self.with_status(ErrorStatus::Permanent)
    }

    /// Give up retrying: a temporary error becomes persistent.
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    /// Record the operation that failed. An operation set earlier is kept
    /// in the context under `called`.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            let previous = std::mem::replace(&mut self.operation, operation);
            self.context.push(("called", previous.to_string()));
        } else {
            self.operation = operation;
        }
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Only one source is allowed.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source already set for {}", self.kind);
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if f.alternate() {
            write!(f, " ({})", self.status)?;
            if !self.operation.is_empty() {
                write!(f, " at {}", self.operation)?;
            }
            if !self.context.is_empty() {
                let pairs: Vec<String> = self.context.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, " {{ {} }}", pairs.join(", "))?;
            }
        }

        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "  message: {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "  {}: {}", key, value)?;
        }
        if let Some(source) = &self.source {
            for (depth, cause) in source.chain().enumerate() {
                writeln!(f, "  source[{}]: {}", depth, cause)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::Interrupted => ErrorKind::Interrupted,
            _ => ErrorKind::IoFailed,
        };
        Self::new(kind, err.to_string()).with_operation("io").set_source(err)
    }
}
