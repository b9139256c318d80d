//! Partition-arrival routing.
//!
//! Store notifications carry object keys. Keys under the raw prefix
//! that name a valid date partition are turned into refinement job
//! starts; everything else is logged and dropped. One bad event never
//! blocks the rest of its batch.

use crate::jobs::{DispatchError, JobRequest, JobRun, JobTrigger};
use b3lake_core::partition::{parse_partition_key, KeyParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// An object-created notification from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalEvent {
    pub bucket: String,
    pub key: String,
}

/// Why a single event could not be routed.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Parse(#[from] KeyParseError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Routes partition arrivals to a refinement job.
pub struct PartitionRouter<'a> {
    trigger: &'a dyn JobTrigger,
    job_name: String,
    prefix: String,
}

impl<'a> PartitionRouter<'a> {
    pub fn new(
        trigger: &'a dyn JobTrigger,
        job_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            trigger,
            job_name: job_name.into(),
            prefix: prefix.into(),
        }
    }

    /// Route one event: parse the partition date out of the key, then
    /// start the refinement job for that date.
    pub fn handle_event(&self, event: &ArrivalEvent) -> Result<JobRun, RouterError> {
        let dt = parse_partition_key(&event.key, &self.prefix)?;
        debug!(bucket = %event.bucket, key = %event.key, %dt, "partition arrival");

        let run = self.trigger.start(&JobRequest {
            job_name: self.job_name.clone(),
            dt,
        })?;
        info!(job = %run.job_name, %dt, trigger = %self.trigger.name(), "refinement job started");
        Ok(run)
    }

    /// Route a whole batch, isolating failures per event.
    pub fn route_batch(&self, events: &[ArrivalEvent]) -> RoutingSummary {
        let mut summary = RoutingSummary::default();
        for event in events {
            match self.handle_event(event) {
                Ok(run) => summary.dispatched.push(run),
                Err(RouterError::Parse(err)) => {
                    warn!(bucket = %event.bucket, key = %event.key, error = %err, "dropping unroutable event");
                    summary.dropped += 1;
                }
                Err(RouterError::Dispatch(err)) => {
                    warn!(key = %event.key, error = %err, "refinement dispatch failed");
                    summary.dispatch_failures.push((event.key.clone(), err));
                }
            }
        }
        summary
    }
}

/// Outcome of routing one batch of events.
#[derive(Debug, Default)]
pub struct RoutingSummary {
    pub dispatched: Vec<JobRun>,
    /// Events whose key did not name a raw date partition.
    pub dropped: usize,
    /// Well-formed arrivals whose job start failed, by object key.
    pub dispatch_failures: Vec<(String, DispatchError)>,
}

impl RoutingSummary {
    pub fn all_dispatched(&self) -> bool {
        self.dropped == 0 && self.dispatch_failures.is_empty()
    }
}
