use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::StorageError;
use crate::{Sample, ServerId};

/// Filter for historical sample queries. Unset bounds are open.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SampleQuery {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Cap on returned samples, newest kept.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Backend holding the append-only sample history.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn append(&self, sample: Sample) -> Result<(), StorageError>;

    /// Samples for one server matching the query, oldest first.
    async fn query(
        &self,
        server_id: ServerId,
        query: SampleQuery,
    ) -> Result<Vec<Sample>, StorageError>;

    async fn latest(&self, server_id: ServerId) -> Result<Option<Sample>, StorageError>;

    /// Drop samples older than the cutoff. Returns how many were removed.
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError>;
}
