use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{MetricStore, SampleQuery, StorageError};
use crate::{Sample, ServerId};

const DEFAULT_CAPACITY_PER_SERVER: usize = 10_000;

/// In-process store. Keeps a bounded history per server; the oldest
/// samples fall off when the cap is reached.
pub struct MemoryStore {
    capacity: usize,
    samples: RwLock<HashMap<ServerId, Vec<Sample>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_PER_SERVER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn append(&self, sample: Sample) -> Result<(), StorageError> {
        let mut samples = self.samples.write().await;
        let history = samples.entry(sample.server_id).or_default();
        if history.len() == self.capacity {
            history.remove(0);
        }
        history.push(sample);
        Ok(())
    }

    async fn query(
        &self,
        server_id: ServerId,
        query: SampleQuery,
    ) -> Result<Vec<Sample>, StorageError> {
        let samples = self.samples.read().await;
        let Some(history) = samples.get(&server_id) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Sample> = history
            .iter()
            .filter(|s| query.since.is_none_or(|since| s.timestamp >= since))
            .filter(|s| query.until.is_none_or(|until| s.timestamp <= until))
            .cloned()
            .collect();

        if let Some(limit) = query.limit {
            if matched.len() > limit {
                matched.drain(..matched.len() - limit);
            }
        }
        Ok(matched)
    }

    async fn latest(&self, server_id: ServerId) -> Result<Option<Sample>, StorageError> {
        let samples = self.samples.read().await;
        Ok(samples.get(&server_id).and_then(|h| h.last().cloned()))
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut samples = self.samples.write().await;
        let mut removed = 0u64;
        for history in samples.values_mut() {
            let before = history.len();
            history.retain(|s| s.timestamp >= cutoff);
            removed += (before - history.len()) as u64;
        }
        Ok(removed)
    }
}
