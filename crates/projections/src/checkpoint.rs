//! Per-partition offset checkpoints.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use event_store::Offset;
use tokio::sync::RwLock;

use crate::Result;
use crate::partition::Partition;

/// Durable record of the last offset a projection fully applied in each
/// partition.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// `Offset::NONE` when nothing was applied yet.
    async fn get_offset(&self, projection: &str, partition: Partition) -> Result<Offset>;

    async fn set_offset(&self, projection: &str, partition: Partition, offset: Offset)
    -> Result<()>;

    /// Forgets every partition of one projection.
    async fn clear(&self, projection: &str) -> Result<()>;
}

/// In-memory checkpoint store. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    offsets: Arc<RwLock<HashMap<(String, Partition), Offset>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get_offset(&self, projection: &str, partition: Partition) -> Result<Offset> {
        Ok(self
            .offsets
            .read()
            .await
            .get(&(projection.to_string(), partition))
            .copied()
            .unwrap_or(Offset::NONE))
    }

    async fn set_offset(
        &self,
        projection: &str,
        partition: Partition,
        offset: Offset,
    ) -> Result<()> {
        self.offsets
            .write()
            .await
            .insert((projection.to_string(), partition), offset);
        Ok(())
    }

    async fn clear(&self, projection: &str) -> Result<()> {
        self.offsets
            .write()
            .await
            .retain(|(name, _), _| name != projection);
        Ok(())
    }
}
