//! Cancellation tied to a page's lifetime

use std::future::Future;

use tokio_util::sync::{CancellationToken, DropGuard};

use crate::DashboardError;

/// Owns a cancellation token that fires when the page is dropped.
///
/// Work started through [`PageScope::run`] resolves to
/// [`DashboardError::Cancelled`] once the scope is gone, so results never
/// land on a page that is no longer mounted.
pub struct PageScope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl std::fmt::Debug for PageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageScope")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Default for PageScope {
    fn default() -> Self {
        Self::new()
    }
}

impl PageScope {
    pub fn new() -> Self {
        Self::child_of(&CancellationToken::new())
    }

    /// A scope that is also cancelled when `parent` is
    pub fn child_of(parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive `fut` unless the scope is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> crate::Result<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(DashboardError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DashboardError::Cancelled),
            result = fut => result,
        }
    }
}
