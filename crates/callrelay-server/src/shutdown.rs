//! Relay shutdown: one `CancellationToken` fans out to the listener and to
//! every subscriber session.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::drain`] waits when no timeout is given.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How a drain ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every task finished on its own.
    Completed,
    /// The timeout elapsed; stragglers were aborted.
    Aborted,
}

/// Owns the relay-wide cancellation token.
///
/// Subscriber sessions hold child tokens, so [`shutdown`](Self::shutdown)
/// closes every open subscriber as well as the listener.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Fresh coordinator, not yet triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the root token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token cancelled together with the root but cancellable on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown was triggered.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown and wait for `tasks`, aborting whatever is still
    /// running after `timeout` (default [`DEFAULT_DRAIN_TIMEOUT`]).
    pub async fn drain(
        &self,
        mut tasks: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> DrainOutcome {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        self.shutdown();
        info!(tasks = tasks.len(), ?timeout, "draining relay tasks");

        let wait = futures::future::join_all(tasks.iter_mut());
        if tokio::time::timeout(timeout, wait).await.is_ok() {
            info!("relay tasks drained");
            return DrainOutcome::Completed;
        }

        let stragglers = tasks.iter().filter(|t| !t.is_finished()).count();
        warn!(stragglers, ?timeout, "drain timed out, aborting remaining tasks");
        for task in &tasks {
            task.abort();
        }
        DrainOutcome::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_untriggered() {
        let coord = ShutdownCoordinator::new();
        assert!(!coord.is_shutting_down());
        assert!(!coord.token().is_cancelled());
    }

    #[test]
    fn shutdown_cancels_root_and_children() {
        let coord = ShutdownCoordinator::new();
        let root = coord.token();
        let child = coord.child_token();
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(root.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn cancelling_child_leaves_root_running() {
        let coord = ShutdownCoordinator::new();
        let child = coord.child_token();
        child.cancel();
        assert!(!coord.is_shutting_down());
    }

    #[tokio::test]
    async fn drain_waits_for_cooperative_tasks() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let task = tokio::spawn(async move { token.cancelled().await });

        let outcome = coord.drain(vec![task], None).await;
        assert_eq!(outcome, DrainOutcome::Completed);
    }

    #[tokio::test]
    async fn drain_aborts_stuck_tasks() {
        let coord = ShutdownCoordinator::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });

        let outcome = coord
            .drain(vec![task], Some(Duration::from_millis(50)))
            .await;
        assert_eq!(outcome, DrainOutcome::Aborted);
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn drain_with_no_tasks_completes() {
        let coord = ShutdownCoordinator::new();
        assert_eq!(coord.drain(Vec::new(), None).await, DrainOutcome::Completed);
    }
}
