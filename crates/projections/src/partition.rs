//! Partitioning of the event log for checkpointing.

use common::AggregateId;

/// One slice of the log. All events of an item land in the same partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Partition(u32);

impl Partition {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    /// Maps an item to one of `count` partitions. `count` of zero is treated
    /// as one.
    pub fn for_aggregate(aggregate_id: AggregateId, count: u32) -> Self {
        let count = count.max(1) as u128;
        Self((aggregate_id.as_uuid().as_u128() % count) as u32)
    }

    /// All partitions for a given count.
    pub fn all(count: u32) -> impl Iterator<Item = Partition> {
        (0..count.max(1)).map(Partition)
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}
