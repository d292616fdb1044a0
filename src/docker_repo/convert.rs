// Mapping from bollard response types to our models

use crate::models::{ContainerEvent, ContainerState, ContainerStatus, EventAction};
use bollard::models::{ContainerInspectResponse, EventMessage};
use chrono::{DateTime, Utc};

/// Convert a raw inspect response. `None` when Docker omitted the ID.
pub(crate) fn state_from_inspect(resp: ContainerInspectResponse) -> Option<ContainerState> {
    let id = resp.id?;
    let name = resp
        .name
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());
    let (image, labels) = match resp.config {
        Some(config) => (config.image, config.labels),
        None => (None, None),
    };
    let image_id = resp.image.unwrap_or_default();

    let (status, pid) = resp.state.as_ref().map_or((ContainerStatus::Unknown, 0), |s| {
        // Paused containers also report running=true, so check paused first.
        let status = if s.paused.unwrap_or(false) {
            ContainerStatus::Paused
        } else if s.restarting.unwrap_or(false) {
            ContainerStatus::Restarting
        } else if s.running.unwrap_or(false) {
            ContainerStatus::Running
        } else if s.exit_code.is_some() {
            ContainerStatus::Exited
        } else {
            ContainerStatus::Unknown
        };
        (status, s.pid.unwrap_or(0))
    });

    Some(ContainerState {
        name,
        image: image.unwrap_or_else(|| image_id.clone()),
        image_id,
        status,
        pid,
        labels: labels.unwrap_or_default().into_iter().collect(),
        id,
    })
}

/// Convert a raw event. `None` for events without an actor ID or with an
/// action we do not track.
pub(crate) fn event_from_message(msg: &EventMessage) -> Option<ContainerEvent> {
    let id = msg.actor.as_ref()?.id.clone()?;
    let action = EventAction::from_docker(msg.action.as_deref()?)?;
    let timestamp = msg
        .time_nano
        .map(DateTime::from_timestamp_nanos)
        .or_else(|| msg.time.and_then(|secs| DateTime::from_timestamp(secs, 0)))
        .unwrap_or_else(Utc::now);
    Some(ContainerEvent {
        id,
        action,
        timestamp,
    })
}
