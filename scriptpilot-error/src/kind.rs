use std::fmt;

/// What went wrong.
///
/// Three families matter to the execution loop: script faults
/// (`UserCancelled`, `Interrupted`, `ExecutionFailed`) are fed back to the
/// model, model faults (see [`ErrorKind::is_model_fault`]) end the current
/// prompt, and the rest are setup problems reported before any prompt runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    Unexpected,
    ConfigInvalid,
    InvalidArgument,

    /// The user answered "n" at the confirmation prompt
    UserCancelled,
    /// Ctrl-C during a model round trip or a script run
    Interrupted,
    /// The script raised or exited non-zero
    ExecutionFailed,
    /// The interpreter could not be started
    SpawnFailed,

    /// The model answered with nothing usable
    InferenceFailed,
    /// 5xx from the provider
    ProviderUnavailable,
    RateLimited,
    /// Missing or rejected API key
    AuthenticationFailed,
    NetworkFailed,
    /// The provider's response body could not be decoded
    ParseFailed,

    FileNotFound,
    PermissionDenied,
    IoFailed,
}

impl ErrorKind {
    /// Short lowercase description, used as the `Display` form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::ConfigInvalid => "invalid config",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::UserCancelled => "cancelled",
            ErrorKind::Interrupted => "interrupted",
            ErrorKind::ExecutionFailed => "execution failed",
            ErrorKind::SpawnFailed => "cannot start interpreter",
            ErrorKind::InferenceFailed => "inference failed",
            ErrorKind::ProviderUnavailable => "provider unavailable",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::NetworkFailed => "network failed",
            ErrorKind::ParseFailed => "bad response",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::IoFailed => "io failed",
        }
    }

    /// Worth trying again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::ProviderUnavailable
                | ErrorKind::RateLimited
                | ErrorKind::NetworkFailed
        )
    }

    pub fn is_model_fault(&self) -> bool {
        self.is_retryable() || matches!(self, ErrorKind::AuthenticationFailed | ErrorKind::ParseFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
