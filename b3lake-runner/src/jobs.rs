//! Downstream job dispatch.
//!
//! A raw partition landing in the store is the cue to refine it. The
//! [`JobTrigger`] seam hides who actually runs the refinement: an HTTP
//! job endpoint in deployments, a recorder in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Request to start one refinement run over a single date partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_name: String,
    /// Partition date, serialized as `YYYY-MM-DD`.
    pub dt: NaiveDate,
}

/// A successfully started run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    pub job_name: String,
    pub dt: NaiveDate,
    /// Identifier assigned by the executor, when it reports one.
    pub run_id: Option<String>,
}

/// Errors from starting a job.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch request failed: {0}")]
    Request(String),
    #[error("job endpoint answered HTTP {status}")]
    Status { status: u16 },
}

/// Starts refinement jobs.
pub trait JobTrigger: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self, request: &JobRequest) -> Result<JobRun, DispatchError>;
}

/// Trigger that POSTs the request to a job endpoint as JSON.
pub struct HttpJobTrigger {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpJobTrigger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// Executor answer. Only `run_id` matters; anything else is ignored.
#[derive(Debug, Deserialize)]
struct StartResponse {
    run_id: Option<String>,
}

impl JobTrigger for HttpJobTrigger {
    fn name(&self) -> &str {
        "http"
    }

    fn start(&self, request: &JobRequest) -> Result<JobRun, DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
            });
        }

        // run_id is best effort: a 2xx with an unreadable body still
        // counts as started.
        let run_id = response
            .json::<StartResponse>()
            .ok()
            .and_then(|r| r.run_id);

        Ok(JobRun {
            job_name: request.job_name.clone(),
            dt: request.dt,
            run_id,
        })
    }
}

/// In-memory trigger that records every start request.
#[derive(Debug, Default)]
pub struct RecordingTrigger {
    starts: Mutex<Vec<JobRequest>>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<JobRequest> {
        self.starts.lock().unwrap().clone()
    }
}

impl JobTrigger for RecordingTrigger {
    fn name(&self) -> &str {
        "recording"
    }

    fn start(&self, request: &JobRequest) -> Result<JobRun, DispatchError> {
        let mut starts = self.starts.lock().unwrap();
        starts.push(request.clone());
        Ok(JobRun {
            job_name: request.job_name.clone(),
            dt: request.dt,
            run_id: Some(format!("run-{}", starts.len())),
        })
    }
}
