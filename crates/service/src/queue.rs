//! In-process job queue for compile and verify jobs
//!
//! Jobs are numbered from 1 and processed one at a time by a single worker
//! task. Finished jobs stay queryable until the retention limits of
//! [`QueueConfig`] push them out.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use generator_common::{Error, Result};
use generator_core::config::QueueConfig;
use generator_core::contract::{GeneratedContract, VerifyContractRequest};

/// Name of the contract queue
pub const CONTRACT_QUEUE: &str = "contract";

/// Work carried by a job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "lowercase")]
pub enum JobPayload {
    Compile(GeneratedContract),
    Verify(VerifyContractRequest),
}

impl JobPayload {
    pub fn name(&self) -> &'static str {
        match self {
            JobPayload::Compile(_) => "compile",
            JobPayload::Verify(_) => "verify",
        }
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Waiting => write!(f, "waiting"),
            JobState::Active => write!(f, "active"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// A queued job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: u64,
    pub payload: JobPayload,
    pub state: JobState,
    pub progress: u8,
    pub failed_reason: Option<String>,
    pub return_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        let is_failed = self.state == JobState::Failed;
        JobStatus {
            state: self.state,
            progress: self.progress,
            is_completed: self.state == JobState::Completed,
            is_waiting: self.state == JobState::Waiting,
            is_failed,
            is_active: self.state == JobState::Active,
            failed_reason: if is_failed { self.failed_reason.clone() } else { None },
            completed_message: self.return_value.clone(),
        }
    }
}

/// Status report of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    pub progress: u8,
    pub is_completed: bool,
    pub is_waiting: bool,
    pub is_failed: bool,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    pub completed_message: Option<String>,
}

/// Executes job payloads for the worker
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run `payload`; the returned message becomes the job's completed message
    async fn handle(&self, payload: &JobPayload, ctx: &JobContext) -> Result<String>;
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    jobs: HashMap<u64, Job>,
    waiting: VecDeque<u64>,
    completed: VecDeque<u64>,
    failed: VecDeque<u64>,
}

impl QueueState {
    fn take_next(&mut self, lifo: bool) -> Option<(u64, JobPayload)> {
        let id = if lifo {
            self.waiting.pop_back()
        } else {
            self.waiting.pop_front()
        }?;
        let job = self.jobs.get_mut(&id)?;
        job.state = JobState::Active;
        Some((id, job.payload.clone()))
    }

    fn finish(&mut self, id: u64, outcome: std::result::Result<String, String>, config: &QueueConfig) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        job.progress = 100;
        job.finished_at = Some(Utc::now());

        let (history, keep) = match outcome {
            Ok(message) => {
                job.state = JobState::Completed;
                job.return_value = Some(message);
                (&mut self.completed, config.remove_on_complete)
            }
            Err(reason) => {
                job.state = JobState::Failed;
                job.failed_reason = Some(reason);
                (&mut self.failed, config.remove_on_fail)
            }
        };

        history.push_back(id);
        while history.len() > keep {
            if let Some(expired) = history.pop_front() {
                self.jobs.remove(&expired);
            }
        }
    }
}

/// Handle a running job uses to report progress
#[derive(Clone)]
pub struct JobContext {
    id: u64,
    state: Arc<Mutex<QueueState>>,
}

impl JobContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Record progress, clamped to 0..=100
    pub async fn set_progress(&self, progress: u8) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(&self.id) {
            job.progress = progress.min(100);
        }
    }
}

/// Job queue with a single background worker
pub struct JobQueue {
    name: String,
    config: QueueConfig,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Arc::new(Mutex::new(QueueState {
                next_id: 1,
                ..Default::default()
            })),
            notify: Arc::new(Notify::new()),
            shutdown_tx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the worker; a second call while it runs is ignored
    pub async fn start<H: JobHandler + 'static>(&self, handler: Arc<H>) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            warn!(queue = %self.name, "worker is already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        *self.shutdown_tx.lock().await = Some(shutdown_tx);

        let worker_loop = Worker {
            queue: self.name.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            notify: self.notify.clone(),
            handler,
        };
        *worker = Some(tokio::spawn(worker_loop.run(shutdown_rx)));
        info!(queue = %self.name, lifo = self.config.lifo, "job worker started");
    }

    /// Stop the worker after the active job, if any, finishes
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                error!(queue = %self.name, error = %e, "job worker terminated abnormally");
            }
            info!(queue = %self.name, "job worker stopped");
        }
    }

    /// Enqueue a job and return its id
    pub async fn add(&self, payload: JobPayload) -> Result<u64> {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        debug!(queue = %self.name, job_id = id, name = payload.name(), "job added");
        state.jobs.insert(
            id,
            Job {
                id,
                payload,
                state: JobState::Waiting,
                progress: 0,
                failed_reason: None,
                return_value: None,
                created_at: Utc::now(),
                finished_at: None,
            },
        );
        state.waiting.push_back(id);
        drop(state);

        self.notify.notify_one();
        Ok(id)
    }

    pub async fn add_compile_job(&self, contract: GeneratedContract) -> Result<u64> {
        self.add(JobPayload::Compile(contract)).await
    }

    pub async fn add_verify_job(&self, request: VerifyContractRequest) -> Result<u64> {
        self.add(JobPayload::Verify(request)).await
    }

    pub async fn get_job(&self, id: u64) -> Result<Job> {
        self.state
            .lock()
            .await
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("This jobId does not exist: {}", id)))
    }

    /// Remove a job that is not currently running
    pub async fn remove_job(&self, id: u64) -> Result<Job> {
        let mut state = self.state.lock().await;
        match state.jobs.get(&id) {
            None => return Err(Error::not_found(format!("This jobId does not exist: {}", id))),
            Some(job) if job.state == JobState::Active => {
                return Err(Error::conflict(format!("Job {} is active and cannot be removed", id)))
            }
            Some(_) => {}
        }

        state.waiting.retain(|queued| *queued != id);
        state.completed.retain(|kept| *kept != id);
        state.failed.retain(|kept| *kept != id);
        let job = state
            .jobs
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("This jobId does not exist: {}", id)))?;

        debug!(queue = %self.name, job_id = id, "job removed");
        Ok(job)
    }

    pub async fn job_status(&self, id: u64) -> Result<JobStatus> {
        Ok(self.get_job(id).await?.status())
    }

    /// Number of jobs still waiting for the worker
    pub async fn waiting_count(&self) -> usize {
        self.state.lock().await.waiting.len()
    }
}

struct Worker<H> {
    queue: String,
    config: QueueConfig,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    handler: Arc<H>,
}

impl<H: JobHandler + 'static> Worker<H> {
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        loop {
            let next = self.state.lock().await.take_next(self.config.lifo);

            match next {
                Some((id, payload)) => {
                    let outcome = self.execute(id, payload).await;
                    self.state.lock().await.finish(id, outcome, &self.config);
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }
                }
                None => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = self.notify.notified() => {}
                    }
                }
            }
        }
    }

    async fn execute(&self, id: u64, payload: JobPayload) -> std::result::Result<String, String> {
        let name = payload.name();
        info!(queue = %self.queue, job_id = id, name, "processing job");

        let handler = self.handler.clone();
        let ctx = JobContext {
            id,
            state: self.state.clone(),
        };
        let mut task = tokio::spawn(async move { handler.handle(&payload, &ctx).await });

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let outcome = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(message))) => Ok(message),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(e)) => Err(format!("Job handler panicked: {}", e)),
            Err(_) => {
                task.abort();
                Err(format!("Job timed out after {} seconds", self.config.timeout_secs))
            }
        };

        match &outcome {
            Ok(_) => info!(queue = %self.queue, job_id = id, name, "job completed"),
            Err(reason) => warn!(queue = %self.queue, job_id = id, name, %reason, "job failed"),
        }
        outcome
    }
}
