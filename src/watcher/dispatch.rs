// Change handler boundary

use crate::models::{ContainerChange, ContainerState};
use std::sync::Arc;
use tracing::debug;

/// Receives every container state transition.
///
/// Called inline while the registry lock is held, so implementations should
/// return quickly (hand off to a channel for anything slow). Calls for the
/// same container are totally ordered.
pub trait ChangeHandler: Send + Sync {
    fn on_change(&self, change: ContainerChange);
}

impl<F> ChangeHandler for F
where
    F: Fn(ContainerChange) + Send + Sync,
{
    fn on_change(&self, change: ContainerChange) {
        self(change)
    }
}

/// Hand a (previous, current) pair to the handler. A pair with both sides
/// absent is not a transition and is dropped.
pub(crate) fn dispatch(
    handler: &dyn ChangeHandler,
    previous: Option<Arc<ContainerState>>,
    current: Option<Arc<ContainerState>>,
) {
    if let Some(change) = ContainerChange::from_transition(previous, current) {
        debug!(container_id = change.id(), "Dispatching container change");
        handler.on_change(change);
    }
}
