//! Scripted in-memory provider for tests.

use super::{FetchError, QuoteProvider, QuoteRequest};
use polars::prelude::DataFrame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Provider that replays a queue of scripted responses.
///
/// Each `fetch` call pops the next scripted response; an exhausted queue
/// answers with a network error so a test that under-scripts fails loudly.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<DataFrame, FetchError>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Result<DataFrame, FetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QuoteProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, _request: &QuoteRequest) -> Result<DataFrame, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("no scripted response".into())))
    }
}
