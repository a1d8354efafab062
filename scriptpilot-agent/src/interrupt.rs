//! Sources of user interruption
//!
//! The loop races every blocking step (model round trip, script run) against
//! an [`Interrupt`]. Whichever finishes first wins; a lost step is dropped,
//! which kills a running child process.

/// Resolves when the user asks to stop the current step.
#[allow(async_fn_in_trait)]
pub trait Interrupt {
    async fn interrupted(&self);
}

/// Ctrl-C delivered to the process.
///
/// Once awaited, tokio keeps SIGINT registered for the rest of the process,
/// so a stray Ctrl-C between steps no longer terminates it.
#[derive(Debug, Default, Clone, Copy)]
pub struct CtrlC;

impl Interrupt for CtrlC {
    async fn interrupted(&self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    async fn interrupted(&self) {
        std::future::pending::<()>().await
    }
}
