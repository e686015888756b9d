use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use tokio::process::Command;
use tokio::time::timeout;

use super::{Execution, TaskRunner};
use crate::task::{ExecutionTask, OUTPUT_ENV};

/// Mount point of the per-job directory inside the container.
const CONTAINER_WORK_DIR: &str = "/workdir";
/// Name of the capture file inside the per-job directory.
const OUTPUT_FILE: &str = "output";

/// Runs tasks as throwaway containers through the docker CLI.
///
/// Each run gets a fresh host directory holding the task's files and the
/// capture file, mounted as the container's working directory.
pub struct DockerRunner {
    /// Container CLI binary, `docker` or a compatible one
    docker: String,
    /// Parent of the per-job directories
    work_dir: PathBuf,
}

impl TaskRunner for DockerRunner {
    async fn run(&self, job_id: u64, task: &ExecutionTask) -> Result<Execution> {
        let job_dir = self.prepare_job_dir(job_id, task).await?;
        let result = self.execute(job_id, task, &job_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            log::warn!("Failed to remove {}: {e}", job_dir.display());
        }

        result
    }
}

impl DockerRunner {
    pub fn build(docker: impl Into<String>, work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = std::path::absolute(work_dir.into())?;
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("Failed to create work dir {}", work_dir.display()))?;

        log::info!("DockerRunner uses work dir {}", work_dir.display());
        Ok(Self {
            docker: docker.into(),
            work_dir,
        })
    }

    /// Default parent directory for job files, under the user cache dir
    pub fn default_work_dir() -> Result<PathBuf> {
        use directories::ProjectDirs;

        let proj_dirs = ProjectDirs::from("", "", "ccexec")
            .ok_or_else(|| anyhow!("Unable to find user directory"))?;
        Ok(proj_dirs.cache_dir().join("jobs"))
    }

    fn container_name(job_id: u64) -> String {
        format!("ccexec-job-{job_id}")
    }

    /// Creates the per-job directory and materializes the task's files in it
    async fn prepare_job_dir(&self, job_id: u64, task: &ExecutionTask) -> Result<PathBuf> {
        for name in task.files.keys() {
            check_file_name(name)?;
        }

        let stamp = Local::now().format("%y%m%d-%H-%M-%S");
        let job_dir = self.work_dir.join(format!("{job_id}-{stamp}"));
        tokio::fs::create_dir_all(&job_dir)
            .await
            .with_context(|| format!("Failed to create job dir {}", job_dir.display()))?;

        for (name, content) in &task.files {
            tokio::fs::write(job_dir.join(name), content).await?;
        }
        tokio::fs::write(job_dir.join(OUTPUT_FILE), "").await?;

        Ok(job_dir)
    }

    /// Arguments for `docker run`
    fn run_args(&self, job_id: u64, task: &ExecutionTask, job_dir: &Path) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            Self::container_name(job_id),
            "--network".to_string(),
            "none".to_string(),
            "--cpus".to_string(),
            task.limits.cpus.clone(),
            "--memory".to_string(),
            task.limits.memory.clone(),
            "-v".to_string(),
            format!("{}:{CONTAINER_WORK_DIR}", job_dir.display()),
            "-w".to_string(),
            CONTAINER_WORK_DIR.to_string(),
            "-e".to_string(),
            format!("{OUTPUT_ENV}={CONTAINER_WORK_DIR}/{OUTPUT_FILE}"),
            task.image.clone(),
            "sh".to_string(),
            "-c".to_string(),
            task.run.clone(),
        ]
    }

    async fn execute(&self, job_id: u64, task: &ExecutionTask, job_dir: &Path) -> Result<Execution> {
        let child = Command::new(&self.docker)
            .args(self.run_args(job_id, task, job_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.docker))?;

        let output = match timeout(task.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                self.kill_container(job_id).await;
                return Ok(Execution {
                    result: String::new(),
                    error: format!("task timed out after {}", task.timeout_spec()),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let error = match output.status.code() {
                _ if !stderr.is_empty() => stderr,
                Some(code) => format!("exit code {code}"),
                None => "killed by signal".to_string(),
            };
            return Ok(Execution {
                result: String::new(),
                error,
            });
        }

        // Toolchain diagnostics may carry raw source bytes that are not UTF-8
        let capture = job_dir.join(OUTPUT_FILE);
        let bytes = tokio::fs::read(&capture)
            .await
            .with_context(|| format!("Failed to read capture file {}", capture.display()))?;
        Ok(Execution {
            result: String::from_utf8_lossy(&bytes).into_owned(),
            error: String::new(),
        })
    }

    async fn kill_container(&self, job_id: u64) {
        let name = Self::container_name(job_id);
        match Command::new(&self.docker).args(["kill", &name]).output().await {
            Ok(out) if out.status.success() => log::debug!("Killed container {name}"),
            Ok(out) => log::warn!(
                "Failed to kill container {name}: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
            Err(e) => log::warn!("Failed to kill container {name}: {e}"),
        }
    }
}

/// Task files must land directly inside the job directory.
fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name == OUTPUT_FILE
        || name.contains(['/', '\\', '\0'])
    {
        bail!("invalid task file name {name:?}");
    }
    Ok(())
}
