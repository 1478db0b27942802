//! Fixed-size pool of matching threads.
//!
//! Jobs are boxed closures sent over an unbounded `crossbeam-channel`; workers
//! block on `recv` until a job arrives or the pool is dropped. The pool knows
//! nothing about queries: callers that need completion signals send results
//! back over their own channel.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{Error, Result};

/// A unit of work run on one worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of OS threads draining a shared job queue.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` worker threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if the OS refuses to spawn a thread.
    pub fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = unbounded::<Job>();

        let mut workers = Vec::with_capacity(size);
        for i in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("ngramdb-worker-{i}"))
                .spawn(move || run_worker(&receiver))
                .map_err(|e| Error::WorkerPool(format!("failed to spawn worker {i}: {e}")))?;
            workers.push(handle);
        }

        tracing::debug!(workers = size, "worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queues a job for the next idle worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPool`] if every worker has exited.
    pub fn execute(&self, job: Job) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::WorkerPool("pool is shut down".to_string()))?;
        sender
            .send(job)
            .map_err(|_| Error::WorkerPool("all workers have exited".to_string()))
    }

    /// Returns the number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn run_worker(receiver: &Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        job();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue ends every worker's recv loop.
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
        tracing::debug!("worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_jobs_run_on_workers() {
        let pool = WorkerPool::new(4).expect("pool");
        let (tx, rx) = unbounded();

        for i in 0..32usize {
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                tx.send(i * 2).expect("send");
            }))
            .expect("execute");
        }

        let mut results: Vec<usize> = (0..32).map(|_| rx.recv().expect("recv")).collect();
        results.sort_unstable();
        assert_eq!(results, (0..32).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_drop_drains_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(2).expect("pool");
            for _ in 0..100 {
                let counter = Arc::clone(&counter);
                pool.execute(Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }))
                .expect("execute");
            }
        }
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_zero_size_spawns_one_worker() {
        let pool = WorkerPool::new(0).expect("pool");
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_workers_are_named() {
        let pool = WorkerPool::new(1).expect("pool");
        let (tx, rx) = unbounded();
        pool.execute(Box::new(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).expect("send");
        }))
        .expect("execute");

        assert_eq!(
            rx.recv().expect("recv").as_deref(),
            Some("ngramdb-worker-0")
        );
    }
}
