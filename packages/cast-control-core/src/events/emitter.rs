//! Emitter abstraction decoupling the bridge from the bus transport.
//!
//! The listener bridge depends on the [`PropertyEmitter`] trait rather than on
//! a D-Bus connection, so it can be driven from the device thread without
//! touching the bus and tested with recording emitters.

use super::PropertyChanges;

/// Trait for announcing property changes without knowledge of transport.
///
/// Called from device callback threads while the bridge holds its state
/// lock. Implementations must return immediately; anything that talks to
/// the bus belongs on the receiving side of a channel.
pub trait PropertyEmitter: Send + Sync {
    fn emit_changes(&self, changes: PropertyChanges);
}
