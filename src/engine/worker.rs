use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::{Execution, Job, JobQueue, JobState, QueuedJob};
use crate::task::ExecutionTask;

/// Runs one execution task to completion.
///
/// Implementations own isolation and resource enforcement. An `Err` means
/// the task could not be run at all; a task that ran but failed reports it
/// through [`Execution::error`].
pub trait TaskRunner: Send + Sync + 'static {
    fn run(
        &self,
        job_id: u64,
        task: &ExecutionTask,
    ) -> impl Future<Output = Result<Execution>> + Send;
}

pub async fn worker<R: TaskRunner>(
    id: u8,
    runner: Arc<R>,
    queue: Arc<JobQueue>,
    token: CancellationToken,
) -> Result<()> {
    log::info!("Worker {id} initialized");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Worker {id} received shutdown signal, stopping");
                break;
            }

            queued = queue.pop() => {
                let job_id = queued.job().id;
                log::info!("Worker {id} got job {job_id} from queue");

                let job = run_job(runner.as_ref(), queued).await;
                log::info!("Job {job_id} finished on worker {id} with state {:?}", job.state);
            }
        }
    }

    log::info!("Worker {id} has shut down gracefully");
    Ok(())
}

/// Runs the tasks of a job in order, stopping at the first failure, then
/// fires its listener.
async fn run_job<R: TaskRunner>(runner: &R, mut queued: QueuedJob) -> Job {
    let job = queued.job_mut();
    job.state = JobState::Running;

    let mut state = JobState::Completed;
    for task in &job.tasks {
        let execution = match runner.run(job.id, task).await {
            Ok(execution) => execution,
            Err(e) => {
                log::error!("Task `{}` of job {} could not run: {e:#}", task.name, job.id);
                Execution {
                    result: String::new(),
                    error: format!("{e:#}"),
                }
            }
        };

        let failed = !execution.error.is_empty();
        job.execution.push(execution);
        if failed {
            state = JobState::Failed;
            break;
        }
    }
    job.state = state;

    queued.finish()
}
