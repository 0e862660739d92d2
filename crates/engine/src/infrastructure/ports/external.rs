//! Outbound ports to collaborators outside the evolution subsystem.

use taleweaver_domain::EvolutionEvent;

use super::error::PublishError;

/// Delivers lifecycle events to whoever broadcasts them to clients.
///
/// Delivery is fire-and-forget: a failed publish never rolls back the
/// state change that produced the event.
#[cfg_attr(test, mockall::automock)]
pub trait EvolutionEventPublisher: Send + Sync {
    fn publish(&self, event: EvolutionEvent) -> Result<(), PublishError>;
}
