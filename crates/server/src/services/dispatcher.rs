//! Bounded background task dispatcher.
//!
//! Webhook handlers must answer Slack within three seconds, so slow work
//! (opening the form, ingestion, posting outcomes) is handed to a fixed pool
//! of worker tasks fed by a bounded queue.
//!
//! Submission never waits: when the queue is full or the workers are gone
//! the task is dropped and an error is logged. A panicking task is caught
//! at its boundary and does not take its worker down.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, error};

/// Default number of worker tasks.
pub const DEFAULT_WORKERS: usize = 4;
/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct Job {
    name: &'static str,
    future: BoxFuture<'static, ()>,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn start(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Runs fire-and-forget tasks on a fixed pool of workers.
#[derive(Clone)]
pub struct TaskDispatcher {
    sender: mpsc::Sender<Job>,
    in_flight: Arc<InFlight>,
}

impl std::fmt::Debug for TaskDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("in_flight", &self.in_flight.count.load(Ordering::Acquire))
            .field("capacity", &self.sender.max_capacity())
            .finish()
    }
}

impl TaskDispatcher {
    /// Spawn `workers` worker tasks draining a queue of `capacity` tasks.
    ///
    /// Must be called from within a Tokio runtime. Both values are raised to
    /// at least one.
    #[must_use]
    pub fn new(workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(InFlight::default());

        for worker in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let in_flight = Arc::clone(&in_flight);
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(job) = next else {
                        debug!(worker, "Dispatcher queue closed, worker exiting");
                        break;
                    };

                    if AssertUnwindSafe(job.future).catch_unwind().await.is_err() {
                        error!(task = job.name, worker, "Background task panicked");
                    }
                    in_flight.finish();
                }
            });
        }

        Self { sender, in_flight }
    }

    /// Queue a task. Returns false if it was dropped.
    pub fn dispatch<F>(&self, name: &'static str, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.start();
        let job = Job {
            name,
            future: future.boxed(),
        };

        match self.sender.try_send(job) {
            Ok(()) => {
                debug!(task = name, "Background task queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.in_flight.finish();
                error!(task = name, "Dispatcher queue full, dropping background task");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.in_flight.finish();
                error!(task = name, "Dispatcher closed, dropping background task");
                false
            }
        }
    }

    /// Number of queued or running tasks.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Wait until every queued task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a finish in between is not missed.
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}
