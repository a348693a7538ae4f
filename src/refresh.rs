use tokio::sync::{Mutex, MutexGuard, watch};

use crate::types::AccessToken;

/// Token refresh state, observable through
/// [`ApiClient::subscribe_refresh_state`](crate::ApiClient::subscribe_refresh_state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshState {
    /// Requests go out with the stored access token.
    #[default]
    Normal,
    /// A refresh call is in flight; other 401 handlers wait for it.
    Refreshing,
    /// The last refresh failed and the session was cleared.
    Failed,
}

/// What a 401 handler should do once it holds the refresh gate.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RefreshPlan {
    /// Another request already renewed the token; replay with it.
    Reuse(AccessToken),
    /// A concurrent refresh already failed; report the same failure.
    Fail(String),
    /// Call the refresh endpoint.
    Refresh,
}

/// Decide how to recover from a 401 for a request that was sent with `sent_with`.
pub(crate) fn plan(
    sent_with: Option<&AccessToken>,
    stored: Option<AccessToken>,
    state: RefreshState,
    last_failure: Option<&str>,
) -> RefreshPlan {
    match stored {
        Some(stored) if Some(&stored) != sent_with => RefreshPlan::Reuse(stored),
        // only requests that queued behind the failed refresh share its outcome
        None if state == RefreshState::Failed && sent_with.is_some() => {
            RefreshPlan::Fail(last_failure.unwrap_or("session expired").to_owned())
        }
        _ => RefreshPlan::Refresh,
    }
}

/// Single-flight guard around the refresh call.
///
/// 401 handlers queue on the mutex, so at most one refresh request is in
/// flight. The mutex holds the reason of the last failed refresh.
#[derive(Debug)]
pub(crate) struct RefreshGate {
    last_failure: Mutex<Option<String>>,
    state: watch::Sender<RefreshState>,
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RefreshState::Normal);
        Self {
            last_failure: Mutex::new(None),
            state,
        }
    }

    pub(crate) async fn acquire(&self) -> MutexGuard<'_, Option<String>> {
        self.last_failure.lock().await
    }

    pub(crate) fn state(&self) -> RefreshState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    pub(crate) fn transition(&self, next: RefreshState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "Refresh state changed");
        }
    }

}
