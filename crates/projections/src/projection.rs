//! Core projection trait.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// A projection that folds committed events into a read model.
///
/// `handle` may see the same event more than once (after a crash between the
/// read-side write and the checkpoint write) and must leave the read model
/// unchanged the second time.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Stable name, used as the checkpoint key.
    fn name(&self) -> &'static str;

    /// Applies one event. Events of unknown kinds are accepted and ignored.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Clears the read model.
    async fn reset(&self) -> Result<()>;
}
