//! Bounded worker pool for fetching visitors.
//!
//! Two modes:
//! - `map_join()`: run a batch in parallel and block until every item is done
//! - `spawn()`: fire-and-forget; `wait_idle()` blocks until those drain

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Outstanding background tasks.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn start(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// rayon pool with a fixed number of workers.
pub struct WorkerPool {
    pool: ThreadPool,
    pending: Arc<Pending>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("fetch-{i}"))
            .panic_handler(|_| crate::log!("error"; "background fetch task panicked"))
            .build()?;
        Ok(Self {
            pool,
            pending: Arc::new(Pending::default()),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item in parallel; results keep input order.
    pub fn map_join<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Run a task in the background. A panicking task is logged and does not
    /// take the pool down.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let pending = Arc::clone(&self.pending);
        pending.start();
        self.pool.spawn(move || {
            let guard = FinishGuard(pending);
            task();
            drop(guard);
        });
    }

    /// Block until every spawned task has finished.
    pub fn wait_idle(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.idle.wait(&mut count);
        }
    }
}

/// Marks a task finished even when it unwinds.
struct FinishGuard(Arc<Pending>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_map_join_keeps_order() {
        let pool = WorkerPool::new(4).unwrap();
        let items: Vec<u32> = (0..100).collect();
        let doubled = pool.map_join(&items, |n| n * 2);
        assert_eq!(doubled, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_spawn_and_wait_idle() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.wait_idle();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);
    }
}
