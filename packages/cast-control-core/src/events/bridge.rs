//! Emitter that hands change batches to the bus forwarding task.
//!
//! The [`ChannelPropertyEmitter`] sits between the device callback thread and
//! the async bus task: sending never blocks, and the task on the other end
//! turns each batch into `PropertiesChanged` and `Seeked` signals.

use tokio::sync::mpsc;

use super::emitter::PropertyEmitter;
use super::PropertyChanges;

/// Forwards batches over an unbounded channel.
///
/// Batches are dropped once the receiving task has gone away, which happens
/// only after the publication was withdrawn.
#[derive(Clone)]
pub struct ChannelPropertyEmitter {
    tx: mpsc::UnboundedSender<PropertyChanges>,
}

impl ChannelPropertyEmitter {
    /// Creates an emitter together with the receiver the bus task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PropertyChanges>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PropertyEmitter for ChannelPropertyEmitter {
    fn emit_changes(&self, changes: PropertyChanges) {
        if changes.is_empty() {
            return;
        }
        log::trace!(
            "[Events] queueing {:?} seeked={:?}",
            changes.properties.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            changes.seeked
        );
        if self.tx.send(changes).is_err() {
            log::debug!("[Events] bus task gone, dropping property changes");
        }
    }
}
