use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{Job, Listener};

/// A job waiting for a worker, together with the listener to fire once it ends.
pub struct QueuedJob {
    job: Job,
    listener: Listener,
}

impl QueuedJob {
    pub fn new(job: Job, listener: Listener) -> Self {
        Self { job, listener }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn job_mut(&mut self) -> &mut Job {
        &mut self.job
    }

    /// Consumes the entry so the listener can only ever fire once.
    pub fn finish(self) -> Job {
        let Self { job, listener } = self;
        listener(&job);
        job
    }
}

pub struct JobQueue {
    queue: Mutex<VecDeque<QueuedJob>>,
    notify: Notify,
    closed: AtomicBool,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn push(&self, job: QueuedJob) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            bail!("engine is shutting down, job {} refused", job.job.id);
        }
        self.queue.lock().push_back(job);
        self.notify.notify_one();
        Ok(())
    }

    pub async fn pop(&self) -> QueuedJob {
        loop {
            let next = self.queue.lock().pop_front();
            if let Some(job) = next {
                return job;
            }
            self.notify.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Refuses new jobs and drops pending ones; their listeners never fire.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let dropped: Vec<QueuedJob> = self.queue.lock().drain(..).collect();
        if !dropped.is_empty() {
            log::warn!("Dropped {} pending jobs on shutdown", dropped.len());
        }
        dropped.len()
    }
}
