//! B3Lake Runner — ingestion orchestration over the core data path.
//!
//! This crate builds on `b3lake-core` to provide:
//! - Daily ingestion runs targeting the previous business day
//! - Sequential historical backfill with per-day error isolation
//! - Partition-arrival routing into refinement job starts
//! - Job dispatch over HTTP, with a recording trigger for tests
//! - Layered settings: defaults, then TOML file, then environment

pub mod ingest;
pub mod jobs;
pub mod router;
pub mod settings;

pub use ingest::{
    backfill, run_ingestion, BackfillSummary, IngestionConfig, IngestionResult, RefinedTrigger,
};
pub use jobs::{DispatchError, HttpJobTrigger, JobRequest, JobRun, JobTrigger, RecordingTrigger};
pub use router::{ArrivalEvent, PartitionRouter, RouterError, RoutingSummary};
pub use settings::{sanitize_prefix, RetrySettings, Settings, SettingsError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn ingestion_types_are_send_sync() {
        assert_send::<IngestionConfig>();
        assert_sync::<IngestionConfig>();
        assert_send::<IngestionResult>();
        assert_sync::<IngestionResult>();
        assert_send::<BackfillSummary>();
        assert_sync::<BackfillSummary>();
    }

    #[test]
    fn job_types_are_send_sync() {
        assert_send::<JobRequest>();
        assert_sync::<JobRequest>();
        assert_send::<JobRun>();
        assert_sync::<JobRun>();
        assert_send::<HttpJobTrigger>();
        assert_sync::<HttpJobTrigger>();
        assert_send::<RecordingTrigger>();
        assert_sync::<RecordingTrigger>();
    }

    #[test]
    fn settings_are_send_sync() {
        assert_send::<Settings>();
        assert_sync::<Settings>();
        assert_send::<RetrySettings>();
        assert_sync::<RetrySettings>();
    }
}
