//! Named execution contexts.
//!
//! All store access goes through the single `worker` context and all
//! listener/cell updates through the single `main` context. Each context is
//! one long-lived task draining a FIFO queue of jobs and awaiting each job
//! to completion, so work submitted to the same context never interleaves.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::{LedgerError, ResultLedger};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Clone, Debug)]
pub struct Context {
    name: &'static str,
    jobs: mpsc::UnboundedSender<Job>,
}

impl Context {
    fn spawn(name: &'static str) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Self { name, jobs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueues a job without waiting for its result.
    pub fn submit<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.jobs.send(Box::pin(fut)).is_err() {
            tracing::warn!("job submitted to closed {} context", self.name);
        }
    }

    /// Runs a job on this context and waits for its result.
    pub async fn run<T, F>(&self, fut: F) -> ResultLedger<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(async move {
            let _ = tx.send(fut.await);
        });
        rx.await.map_err(|_| LedgerError::ContextClosed(self.name))
    }

    /// Waits until every job submitted before this call has finished.
    pub async fn flush(&self) {
        let _ = self.run(async {}).await;
    }
}

/// The two contexts of the ledger: `worker` for store I/O, `main` for
/// listener invocations and balance-cell updates.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    pub worker: Context,
    pub main: Context,
}

impl Dispatcher {
    /// Spawns both context tasks. Must be called from within a tokio
    /// runtime.
    pub fn new() -> Self {
        Self {
            worker: Context::spawn("worker"),
            main: Context::spawn("main"),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn jobs_on_one_context_run_in_submission_order() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = order.clone();
            dispatcher.worker.submit(async move {
                order.lock().unwrap().push(i);
            });
        }
        dispatcher.worker.flush().await;

        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn run_returns_the_job_result() {
        let dispatcher = Dispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let seen = counter.clone();
        let value = dispatcher
            .worker
            .run(async move {
                seen.fetch_add(1, Ordering::SeqCst);
                41 + 1
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
