//! B3Lake Core — quote ingestion data path for the B3 daily lake.
//!
//! This crate contains the storage-agnostic pieces of the pipeline:
//! - Ticker canonicalization for the Yahoo Finance symbol space
//! - Business-day calendar helpers
//! - Canonical quote table schema and row conversions
//! - Quote providers (Yahoo Finance HTTP, scripted mock)
//! - Frame normalization (coercion, date filtering, sort, dedupe)
//! - Date-partitioned parquet layout and partition key parsing
//! - Bounded retry with exponential backoff and jitter
//! - Object store abstraction (filesystem, in-memory)

pub mod calendar;
pub mod error;
pub mod normalize;
pub mod partition;
pub mod provider;
pub mod retry;
pub mod store;
pub mod table;
pub mod ticker;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses the worker boundary is
    /// Send + Sync. Runner and CLI hold providers and stores behind shared
    /// references, so a regression here breaks the build immediately.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<ticker::Ticker>();
        require_sync::<ticker::Ticker>();
        require_send::<table::QuoteRow>();
        require_sync::<table::QuoteRow>();
        require_send::<error::IngestError>();
        require_sync::<error::IngestError>();
        require_send::<provider::FetchError>();
        require_sync::<provider::FetchError>();
        require_send::<provider::QuoteRequest>();
        require_sync::<provider::QuoteRequest>();
        require_send::<provider::YahooProvider>();
        require_sync::<provider::YahooProvider>();
        require_send::<provider::MockProvider>();
        require_sync::<provider::MockProvider>();
        require_send::<store::StoreError>();
        require_sync::<store::StoreError>();
        require_send::<store::FsStore>();
        require_sync::<store::FsStore>();
        require_send::<store::MemStore>();
        require_sync::<store::MemStore>();
        require_send::<retry::RetryPolicy>();
        require_sync::<retry::RetryPolicy>();
        require_send::<partition::KeyParseError>();
        require_sync::<partition::KeyParseError>();
    }

    /// Providers and stores are used as trait objects behind `&dyn`.
    /// This test documents that both traits stay object safe.
    #[test]
    fn provider_and_store_traits_are_object_safe() {
        fn _fetch_through_object(
            provider: &dyn provider::QuoteProvider,
            request: &provider::QuoteRequest,
        ) -> Result<polars::prelude::DataFrame, provider::FetchError> {
            provider.fetch(request)
        }

        fn _store_through_object(
            store: &dyn store::ObjectStore,
            key: &str,
        ) -> Result<bool, store::StoreError> {
            store.exists(key)
        }
    }
}
