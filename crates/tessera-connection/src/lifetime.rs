//! Connection-scoped cancellation

use std::future::Future;
use tessera_core::{Result, TesseraError};
use tokio_util::sync::CancellationToken;

/// Cancelled when its connection is disconnected or the client shuts down.
///
/// Tokens form a tree: cancelling a parent cancels every child, so the
/// manager's root token reaches all sessions at once.
#[derive(Debug, Clone, Default)]
pub struct LifetimeToken {
    token: CancellationToken,
}

impl LifetimeToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled with this one, or on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Run `fut` unless the token fires first, in which case `fut` is
    /// dropped and `Cancelled` returned.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(TesseraError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TesseraError::Cancelled),
            result = fut => result,
        }
    }
}
