// Bounded worker pool for running benchmark jobs in parallel

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::debug;

/// Message from worker to the collecting thread
#[derive(Debug)]
pub enum WorkerMessage<R> {
    /// Item started on a worker
    Started { worker_id: usize, index: usize },

    /// Item finished (successfully or not)
    Finished { index: usize, result: R },
}

/// Fixed number of scoped worker threads pulling items in order
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    /// Create a pool; zero is treated as one
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `work` over `items` on at most `max_workers` threads.
    ///
    /// Items are handed out in order. Results come back in the position of their item;
    /// `None` marks items that never started because `should_stop` returned true for an
    /// earlier result. Items already running when that happens are allowed to finish.
    pub fn run_ordered<T, R, W, S>(&self, items: &[T], work: W, should_stop: S) -> Vec<Option<R>>
    where
        T: Sync,
        R: Send,
        W: Fn(&T) -> R + Sync,
        S: Fn(&R) -> bool + Sync,
    {
        let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
        if items.is_empty() {
            return slots;
        }

        let next = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let workers = self.max_workers.min(items.len());
        let (tx, rx) = mpsc::channel::<WorkerMessage<R>>();

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let tx = tx.clone();
                let (next, stop, work, should_stop) = (&next, &stop, &work, &should_stop);
                scope.spawn(move || {
                    loop {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(item) = items.get(index) else {
                            break;
                        };
                        let _ = tx.send(WorkerMessage::Started { worker_id, index });
                        let result = work(item);
                        if should_stop(&result) {
                            stop.store(true, Ordering::SeqCst);
                        }
                        if tx.send(WorkerMessage::Finished { index, result }).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for message in rx {
                match message {
                    WorkerMessage::Started { worker_id, index } => {
                        debug!(worker_id, index, "worker picked up job");
                    }
                    WorkerMessage::Finished { index, result } => {
                        slots[index] = Some(result);
                    }
                }
            }
        });

        slots
    }
}
