use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Collapses bursts of calls into the last one, fired after `wait` of quiet.
pub struct Debouncer {
    wait: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self { wait, pending: None }
    }

    /// Cancels any pending call and schedules `task` to run after the window.
    pub fn call<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let wait = self.wait;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
