//! In-process job worker.
//!
//! [`spawn_worker`] starts a task that drains an unbounded channel and runs
//! each job against a store. Hand the returned [`WorkerQueue`] to
//! [`crate::SqliteStore::with_queue`] to defer topic reconciliation and
//! re-ranking off the request path.
//!
//! The worker stops once every sender is dropped, after finishing the jobs
//! already queued. Give it a store taken before `with_queue`: a worker holding
//! its own queue never sees the channel close.

use std::time::Duration;

use convus_core::{
  jobs::{Job, JobQueue},
  store::RatingStore,
};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, error, warn};

/// Attempts per job before it is dropped.
pub const MAX_ATTEMPTS: u32 = 3;

const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Sending half of the worker's channel.
#[derive(Clone)]
pub struct WorkerQueue {
  tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue for WorkerQueue {
  fn enqueue(&self, job: Job) {
    if self.tx.send(job).is_err() {
      warn!(job = job.name(), "job worker has stopped; job dropped");
    }
  }
}

/// Start a worker running jobs against `store`.
pub fn spawn_worker<S>(store: S) -> (WorkerQueue, JoinHandle<()>)
where
  S: RatingStore + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let handle = tokio::spawn(run(store, rx));
  (WorkerQueue { tx }, handle)
}

async fn run<S: RatingStore>(store: S, mut rx: mpsc::UnboundedReceiver<Job>) {
  debug!("job worker started");
  while let Some(job) = rx.recv().await {
    for attempt in 1..=MAX_ATTEMPTS {
      match store.run_job(job).await {
        Ok(()) => {
          debug!(job = job.name(), attempt, "job finished");
          break;
        }
        Err(e) if attempt < MAX_ATTEMPTS => {
          warn!(job = job.name(), attempt, error = %e, "job failed; retrying");
          sleep(RETRY_DELAY * attempt).await;
        }
        Err(e) => {
          error!(job = ?job, error = %e, "job failed; giving up");
        }
      }
    }
  }
  debug!("job worker stopped");
}
