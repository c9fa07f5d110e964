use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Bounded set of spawned tasks
///
/// Submitted tasks are spawned immediately but only `max_concurrent` of them
/// run their body at once; the rest wait for a permit. A pool is drained by
/// its owner before the owner returns.
pub struct WorkerPool<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn<F>(&mut self, f: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            f.await
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every task, returning results in completion order
    pub async fn drain(mut self) -> Vec<Result<T, JoinError>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_basic_spawn() {
        let mut pool = WorkerPool::new(2);
        pool.spawn(async { 42 });

        let results = pool.drain().await;
        assert_eq!(results.len(), 1);
        assert_eq!(*results[0].as_ref().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_concurrent_limit() {
        let mut pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let max_running = Arc::clone(&max_running);
            pool.spawn(async move {
                let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_running.fetch_max(current, Ordering::SeqCst);
                sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        assert_eq!(pool.len(), 6);

        let results = pool.drain().await;
        assert_eq!(results.len(), 6);
        assert!(max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panic_is_surfaced_and_siblings_finish() {
        let mut pool = WorkerPool::new(1);
        let finished = Arc::new(AtomicUsize::new(0));

        pool.spawn(async {
            panic!("Test panic");
        });
        for _ in 0..3 {
            let finished = Arc::clone(&finished);
            pool.spawn(async move {
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        let results = pool.drain().await;
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(e) if e.is_panic())));
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_still_runs() {
        let mut pool = WorkerPool::new(0);
        pool.spawn(async { "done" });

        let results = tokio::time::timeout(Duration::from_secs(1), pool.drain())
            .await
            .unwrap();
        assert_eq!(*results[0].as_ref().unwrap(), "done");
    }
}
