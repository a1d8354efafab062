//! # scriptpilot-error
//!
//! One error type for the whole workspace, shaped after OpenDAL's:
//!
//! - [`ErrorKind`] says what happened and lets callers branch on it
//! - [`ErrorStatus`] says whether trying again could help
//! - operation and context pairs locate the failure
//! - the original error is kept as a source instead of leaking its type
//!
//! Errors are raised once and only gain context on the way up:
//!
//! ```rust
//! use scriptpilot_error::{Error, ErrorKind, Result};
//!
//! fn load() -> Result<String> {
//!     Err(Error::new(ErrorKind::FileNotFound, "no config").with_operation("config::load"))
//! }
//!
//! let err = load().map_err(|e| e.with_context("path", "~/.scriptpilot/config.toml")).unwrap_err();
//! assert_eq!(err.operation(), "config::load");
//! ```

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;
