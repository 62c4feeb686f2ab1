//! Correlation of outstanding RPC replies.

use std::collections::HashMap;

use tokio::sync::oneshot;

use super::error::ClientSessionError;
use crate::command_messages::Command;

/// The outcome delivered to a command awaiter.
pub(super) type CommandOutcome = Result<Command, ClientSessionError>;

/// What a pending command waits for.
///
/// RPC-style commands are answered by a `_result`/`_error` carrying their
/// transaction id; stream lifecycle commands are answered by an `onStatus`
/// whose code starts with a known prefix (e.g. `NetStream.Publish`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AwaitKey {
    /// A `_result` / `_error` with this transaction id.
    TransactionId(u32),
    /// An `onStatus` whose code starts with this prefix.
    StatusCodePrefix(&'static str),
}

/// The map from await keys to single-shot completion slots.
///
/// Owned by the session driver, which both registers slots (before the
/// command bytes go out) and resolves them from the dispatch loop, so access
/// is naturally serialized.
#[derive(Debug, Default)]
pub(super) struct TransactionRegistry {
    slots: HashMap<AwaitKey, oneshot::Sender<CommandOutcome>>,
}

impl TransactionRegistry {
    /// Registers a slot for a key. A leftover slot under the same key is
    /// cancelled.
    pub(super) fn register(&mut self, key: AwaitKey, sender: oneshot::Sender<CommandOutcome>) {
        if let Some(stale) = self.slots.insert(key.clone(), sender) {
            tracing::warn!(?key, "replacing stale transaction slot");
            let _ = stale.send(Err(ClientSessionError::Cancelled));
        }
    }

    /// Resolves the slot of a transaction id, if one is pending.
    ///
    /// Returns false when no slot was waiting; duplicate completions land
    /// here and are left to the caller to log.
    pub(super) fn complete_transaction(&mut self, transaction_id: f64, outcome: CommandOutcome) -> bool {
        self.complete(&AwaitKey::TransactionId(transaction_id as u32), outcome)
    }

    /// Resolves the slot whose status prefix matches `code`, if one is
    /// pending.
    pub(super) fn complete_status(&mut self, code: &str, outcome: CommandOutcome) -> bool {
        let key = self.slots.keys().find_map(|key| match key {
            AwaitKey::StatusCodePrefix(prefix) if code.starts_with(prefix) => Some(key.clone()),
            _ => None,
        });

        match key {
            Some(key) => self.complete(&key, outcome),
            None => false,
        }
    }

    fn complete(&mut self, key: &AwaitKey, outcome: CommandOutcome) -> bool {
        match self.slots.remove(key) {
            Some(sender) => {
                // the awaiter may have been cancelled; that is fine
                let _ = sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Fails every outstanding slot with a cancellation error.
    pub(super) fn drain_cancelled(&mut self) {
        for (key, sender) in self.slots.drain() {
            tracing::debug!(?key, "cancelling outstanding transaction");
            let _ = sender.send(Err(ClientSessionError::Cancelled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_messages::{CommandResult, CommandType};

    fn result_command(transaction_id: f64) -> Command {
        Command {
            transaction_id,
            command_type: CommandType::Result(CommandResult {
                success: true,
                values: vec![],
            }),
        }
    }

    #[tokio::test]
    async fn transaction_completion() {
        let mut registry = TransactionRegistry::default();
        let (tx, rx) = oneshot::channel();

        registry.register(AwaitKey::TransactionId(1), tx);
        assert!(registry.complete_transaction(1.0, Ok(result_command(1.0))));

        assert!(rx.await.unwrap().is_ok());

        // first completion wins, extras report false
        assert!(!registry.complete_transaction(1.0, Ok(result_command(1.0))));
    }

    #[tokio::test]
    async fn status_prefix_matching() {
        let mut registry = TransactionRegistry::default();
        let (tx, rx) = oneshot::channel();

        registry.register(AwaitKey::StatusCodePrefix("NetStream.Publish"), tx);

        assert!(!registry.complete_status("NetStream.Play.Start", Ok(result_command(0.0))));
        assert!(registry.complete_status("NetStream.Publish.Start", Ok(result_command(0.0))));

        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn drain_cancels_everything() {
        let mut registry = TransactionRegistry::default();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();

        registry.register(AwaitKey::TransactionId(1), tx1);
        registry.register(AwaitKey::StatusCodePrefix("NetStream.Play"), tx2);

        registry.drain_cancelled();

        assert!(matches!(rx1.await.unwrap(), Err(ClientSessionError::Cancelled)));
        assert!(matches!(rx2.await.unwrap(), Err(ClientSessionError::Cancelled)));
    }
}
