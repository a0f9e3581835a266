use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A debounced, cancellable unit of scheduled work.
///
/// Each slot holds at most one pending task; scheduling again cancels the
/// previous one deterministically, so a burst of triggers collapses to the
/// trailing run. The generation counter identifies runs in trace logs.
#[derive(Debug, Default)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is pending with `work`, to run after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::trace!("scheduled task generation {generation} firing");
            work.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_task_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut task = ScheduledTask::new();

        let counter = fired.clone();
        task.schedule(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut task = ScheduledTask::new();

        for _ in 0..5 {
            let counter = fired.clone();
            task.schedule(Duration::from_millis(100), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1, "only the trailing schedule runs");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut task = ScheduledTask::new();

        let counter = fired.clone();
        task.schedule(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        task.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!task.is_pending());
    }
}
