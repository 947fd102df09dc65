use std::collections::HashMap;
use std::sync::Mutex;

/// Named monotonic counters (order-number allocation).
///
/// Each key is an independent sequence starting at 1. Allocation must be
/// unique under concurrent callers; gaps are acceptable (an order creation
/// that fails after allocating simply burns a number).
pub trait SequenceProvider: Send + Sync {
    fn next(&self, key: &str) -> u64;
}

/// In-memory sequence provider for dev/test deployments.
#[derive(Debug, Default)]
pub struct InMemorySequences {
    inner: Mutex<HashMap<String, u64>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceProvider for InMemorySequences {
    fn next(&self, key: &str) -> u64 {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let counter = map.entry(key.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}
