//! Item service: the command-submission boundary for items.

use std::time::{Duration, Instant};

use common::AggregateId;
use event_store::{EventEnvelope, EventStore, Offset};
use futures_util::StreamExt;

use crate::aggregate::Aggregate;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{CreateItem, FinishAuction, Item, ItemError, ItemEvent, StartAuction, UpdatePrice};

/// Service for managing items.
///
/// Wraps a [`CommandHandler`] for the [`Item`] aggregate, translating
/// commands into handler calls and recording per-command metrics.
pub struct ItemService<S: EventStore> {
    handler: CommandHandler<S, Item>,
}

impl<S: EventStore> ItemService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn with_timeout(store: S, timeout: Duration) -> Self {
        Self {
            handler: CommandHandler::new(store).with_timeout(timeout),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Item> {
        &self.handler
    }

    #[tracing::instrument(skip(self), fields(item_id = %cmd.draft.id))]
    pub async fn create_item(&self, cmd: CreateItem) -> Result<CommandResult<Item>, DomainError> {
        let draft = cmd.draft;
        self.run("create_item", draft.id, |item| item.create(draft))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_auction(
        &self,
        cmd: StartAuction,
    ) -> Result<CommandResult<Item>, DomainError> {
        let requester = cmd.requester;
        self.run("start_auction", cmd.item_id, |item| {
            item.start_auction(requester)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_price(
        &self,
        cmd: UpdatePrice,
    ) -> Result<CommandResult<Item>, DomainError> {
        let price = cmd.price;
        self.run("update_price", cmd.item_id, |item| item.update_price(price))
            .await
    }

    /// Like [`ItemService::update_price`], but drops a price strictly lower
    /// than the current one. The comparison runs under the item's command
    /// lock, so a stale redelivered bid cannot undo a newer one.
    #[tracing::instrument(skip(self))]
    pub async fn raise_price(&self, cmd: UpdatePrice) -> Result<CommandResult<Item>, DomainError> {
        let price = cmd.price;
        self.run("raise_price", cmd.item_id, |item| {
            if item.is_created() && price < item.price() {
                tracing::debug!(%price, current = %item.price(), "dropping lower price");
                return Ok(vec![]);
            }
            item.update_price(price)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn finish_auction(
        &self,
        cmd: FinishAuction,
    ) -> Result<CommandResult<Item>, DomainError> {
        let FinishAuction {
            item_id,
            winner,
            price,
        } = cmd;
        self.run("finish_auction", item_id, |item| {
            item.finish_auction(winner, price)
        })
        .await
    }

    /// Finishes the auction with no winner at whatever the current price is.
    #[tracing::instrument(skip(self))]
    pub async fn finish_auction_unsold(
        &self,
        item_id: AggregateId,
    ) -> Result<CommandResult<Item>, DomainError> {
        self.run("finish_auction", item_id, |item| {
            item.finish_auction(None, item.price())
        })
        .await
    }

    /// Returns None if the item was never created.
    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, item_id: AggregateId) -> Result<Option<Item>, DomainError> {
        self.handler.load_existing(item_id).await
    }

    /// The committed history of an item, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_item_events(
        &self,
        item_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        Ok(self.handler.store().get_events_for_aggregate(item_id).await?)
    }

    /// Item events committed after `after`, in log order, at most `limit`.
    ///
    /// Lets outside consumers follow every item by remembering the offset
    /// of the last event they read.
    #[tracing::instrument(skip(self))]
    pub async fn item_events_after(
        &self,
        after: Offset,
        limit: usize,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut stream = self.handler.store().stream_events_from(after).await?;
        let mut events = Vec::new();
        while events.len() < limit {
            let Some(event) = stream.next().await else {
                break;
            };
            let event = event?;
            if event.aggregate_type == Item::aggregate_type() {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Decodes a stored history into item events.
    pub fn decode_events(envelopes: &[EventEnvelope]) -> Result<Vec<ItemEvent>, DomainError> {
        envelopes
            .iter()
            .map(|e| serde_json::from_value(e.payload.clone()).map_err(DomainError::from))
            .collect()
    }

    async fn run<F>(
        &self,
        command: &'static str,
        item_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<Item>, DomainError>
    where
        F: FnOnce(&Item) -> Result<Vec<ItemEvent>, ItemError> + Send,
    {
        let started = Instant::now();
        let result = self
            .handler
            .execute(item_id, command_fn)
            .await
            .map_err(|e| match e {
                DomainError::Item(ItemError::NotCreated) => DomainError::ItemNotFound(item_id),
                other => other,
            });

        let outcome = match &result {
            Ok(r) if r.is_noop() => "noop",
            Ok(_) => "applied",
            Err(e) if e.is_transient() => "failed",
            Err(_) => "rejected",
        };
        metrics::counter!("item_commands_total", "command" => command, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("item_command_duration_seconds", "command" => command)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(r) => tracing::info!(
                %item_id,
                outcome,
                version = r.new_version.as_i64(),
                "command handled"
            ),
            Err(e) => tracing::warn!(%item_id, outcome, error = %e, "command failed"),
        }

        result
    }
}
