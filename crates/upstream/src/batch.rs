//! Concurrent fan-out of independent read operations.

use crate::envelope::Envelope;
use crate::gateway::ApiGateway;
use futures::future::join_all;
use serde::Serialize;

/// Aggregate outcome of a batch, order-aligned with the input sequence.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<Envelope>,
}

impl BatchResult {
    #[must_use]
    pub fn collect(results: Vec<Envelope>) -> Self {
        let successful = results.iter().filter(|e| e.is_success()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}

/// Launch one GET per path concurrently and wait for all of them.
///
/// Results come back index-for-index with `paths` regardless of completion
/// order. Each item resolves to its own envelope, so one item's failure
/// never aborts or cancels a sibling; partial results are never returned
/// early.
pub async fn dispatch_all(gateway: &ApiGateway, paths: &[String], use_cache: bool) -> BatchResult {
    let calls = paths.iter().map(|path| gateway.get(path, use_cache));
    BatchResult::collect(join_all(calls).await)
}
