// State transitions handed to the change handler

use serde::Serialize;
use std::sync::Arc;

use super::ContainerState;

/// One container state transition. There is no variant with neither side
/// present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContainerChange {
    /// First time this container is seen.
    Discovered { current: Arc<ContainerState> },
    Updated {
        previous: Arc<ContainerState>,
        current: Arc<ContainerState>,
    },
    /// Destroyed; `previous` is the last known state.
    Removed { previous: Arc<ContainerState> },
}

impl ContainerChange {
    /// Build from a (previous, current) pair; `None` when both are absent.
    pub fn from_transition(
        previous: Option<Arc<ContainerState>>,
        current: Option<Arc<ContainerState>>,
    ) -> Option<Self> {
        match (previous, current) {
            (None, Some(current)) => Some(ContainerChange::Discovered { current }),
            (Some(previous), Some(current)) => Some(ContainerChange::Updated { previous, current }),
            (Some(previous), None) => Some(ContainerChange::Removed { previous }),
            (None, None) => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContainerChange::Discovered { current } => &current.id,
            ContainerChange::Updated { current, .. } => &current.id,
            ContainerChange::Removed { previous } => &previous.id,
        }
    }

    pub fn previous(&self) -> Option<&Arc<ContainerState>> {
        match self {
            ContainerChange::Discovered { .. } => None,
            ContainerChange::Updated { previous, .. } | ContainerChange::Removed { previous } => {
                Some(previous)
            }
        }
    }

    pub fn current(&self) -> Option<&Arc<ContainerState>> {
        match self {
            ContainerChange::Discovered { current } | ContainerChange::Updated { current, .. } => {
                Some(current)
            }
            ContainerChange::Removed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_absent_is_not_a_change() {
        assert!(ContainerChange::from_transition(None, None).is_none());
    }

    #[test]
    fn transition_maps_to_variant() {
        let a = Arc::new(ContainerState::running("a", "nginx"));
        let b = Arc::new(ContainerState::running("a", "nginx:2"));

        let c = ContainerChange::from_transition(None, Some(a.clone())).unwrap();
        assert!(matches!(c, ContainerChange::Discovered { .. }));
        assert!(c.previous().is_none());

        let c = ContainerChange::from_transition(Some(a.clone()), Some(b.clone())).unwrap();
        assert_eq!(c.previous(), Some(&a));
        assert_eq!(c.current(), Some(&b));

        let c = ContainerChange::from_transition(Some(a.clone()), None).unwrap();
        assert!(matches!(c, ContainerChange::Removed { .. }));
        assert_eq!(c.id(), "a");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let a = Arc::new(ContainerState::running("abc", "redis:7"));
        let json = serde_json::to_value(ContainerChange::Removed { previous: a }).unwrap();
        assert_eq!(json["kind"], "removed");
        assert_eq!(json["previous"]["id"], "abc");
        assert_eq!(json["previous"]["status"], "running");
    }
}
