mod docker;
mod queue;
mod worker;

pub use docker::DockerRunner;
pub use queue::{JobQueue, QueuedJob};
pub use worker::{TaskRunner, worker};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, bail};
use tokio::sync::oneshot;

use crate::create_timestamp;
use crate::task::ExecutionTask;

pub const JOB_NAME: &str = "code execution";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one task of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub result: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub name: String,
    pub created_time: String,
    pub state: JobState,
    pub tasks: Vec<ExecutionTask>,
    pub execution: Vec<Execution>,
}

/// Acknowledgement returned once a job has been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: u64,
    pub created_time: String,
}

/// Invoked once when a job reaches a terminal state.
pub type Listener = Box<dyn FnOnce(&Job) + Send + 'static>;

/// Something that runs execution tasks out of band and reports back.
pub trait Engine: Send + Sync {
    /// Returns once the job is accepted, not when it finishes.
    fn submit(&self, name: &str, tasks: Vec<ExecutionTask>, listener: Listener)
    -> Result<JobHandle>;
}

/// The single string a finished job reports: the first step's output when
/// the job completed, its error text otherwise.
pub fn completion_text(job: &Job) -> String {
    match job.execution.first() {
        Some(execution) if job.state == JobState::Completed => execution.result.clone(),
        Some(execution) => execution.error.clone(),
        None => String::new(),
    }
}

/// Creates a listener that forwards [`completion_text`] through a one-shot
/// channel, paired with the receiving end.
pub fn result_channel() -> (Listener, oneshot::Receiver<String>) {
    let (tx, rx) = oneshot::channel::<String>();
    let listener: Listener = Box::new(move |job: &Job| {
        if tx.send(completion_text(job)).is_err() {
            log::debug!("job {} finished after its requester went away", job.id);
        }
    });
    (listener, rx)
}

/// In-process engine backed by [`JobQueue`] and a pool of workers.
pub struct LocalEngine {
    queue: Arc<JobQueue>,
    next_id: AtomicU64,
}

impl LocalEngine {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self {
            queue,
            next_id: AtomicU64::new(1),
        }
    }
}

impl Engine for LocalEngine {
    fn submit(
        &self,
        name: &str,
        tasks: Vec<ExecutionTask>,
        listener: Listener,
    ) -> Result<JobHandle> {
        if tasks.is_empty() {
            bail!("job has no tasks");
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let created_time = create_timestamp();
        let job = Job {
            id,
            name: name.to_string(),
            created_time: created_time.clone(),
            state: JobState::Pending,
            tasks,
            execution: Vec::new(),
        };

        self.queue.push(QueuedJob::new(job, listener))?;
        Ok(JobHandle { id, created_time })
    }
}
