use std::{future::Future, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};

/// Bounded pool for work the dispatch loop hands off without waiting for.
///
/// `spawn` waits for a free slot, so when every slot is busy the caller (the
/// dispatch loop) stalls instead of queueing unbounded tasks.
pub struct BalanceWorkers {
    slots: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl BalanceWorkers {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: JoinSet::new(),
        }
    }

    pub async fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();

        let permit = match self.slots.clone().acquire_owned().await {
            Ok(p) => p,
            // Never closed while `self` is alive.
            Err(_) => return,
        };
        self.tasks.spawn(async move {
            work.await;
            drop(permit);
        });
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every outstanding task.
    pub async fn drain(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            log_join_error(res);
        }
    }

    fn reap(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            log_join_error(res);
        }
    }
}

fn log_join_error(res: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        if e.is_panic() {
            tracing::error!(error = %e, "balance task panicked");
        }
    }
}
