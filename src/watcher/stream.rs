// Event stream reader: subscribe, apply events to the registry, reconnect on error

use crate::models::{ContainerEvent, EventAction, Watermark};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::Shared;
use super::dispatch::dispatch;

/// Watermark plus the events already applied at exactly that instant.
///
/// `since` is inclusive, so after a resubscribe the daemon hands back events
/// stamped with the watermark. Only those we actually applied are skipped;
/// a different event that happens to share the timestamp still goes through.
#[derive(Debug)]
struct ResumeCursor {
    watermark: Watermark,
    applied_at_mark: Vec<(String, EventAction)>,
}

impl ResumeCursor {
    fn new(watermark: Watermark) -> Self {
        Self {
            watermark,
            applied_at_mark: Vec::new(),
        }
    }

    fn already_applied(&self, event: &ContainerEvent) -> bool {
        let mark = self.watermark.timestamp();
        event.timestamp < mark
            || (event.timestamp == mark
                && self
                    .applied_at_mark
                    .iter()
                    .any(|(id, action)| *id == event.id && *action == event.action))
    }

    /// Record `event` as processed, whether or not it changed anything.
    fn record(&mut self, event: &ContainerEvent) {
        if event.timestamp > self.watermark.timestamp() {
            self.watermark.advance(event.timestamp);
            self.applied_at_mark.clear();
        }
        self.applied_at_mark.push((event.id.clone(), event.action));
    }
}

/// Runs until `cancel` fires or the startup gate is aborted.
///
/// The watermark is taken before the first subscribe so nothing that happens
/// while the subscription is being set up is lost. After a stream error the
/// reader waits a fixed delay and resubscribes from the last processed event.
/// If the daemon no longer retains events back to that point there can be a
/// gap; that is not detected here.
#[instrument(skip_all, name = "event_stream")]
pub(crate) async fn run(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut cursor = ResumeCursor::new(Watermark::now());

    loop {
        if shared.gate.is_aborted() {
            return;
        }
        info!(since = %cursor.watermark, "Watching for docker events");
        let mut events = shared
            .runtime
            .subscribe_events(cursor.watermark, &EventAction::ALL);
        shared.gate.signal();

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Event stream cancelled");
                    return;
                }
                _ = shared.gate.aborted() => {
                    warn!("Initial container listing failed, ending event stream");
                    return;
                }
                item = events.next() => item,
            };

            match item {
                Some(Ok(event)) => {
                    if cursor.already_applied(&event) {
                        debug!(
                            container_id = %event.id,
                            action = %event.action,
                            "Skipping already processed event"
                        );
                        continue;
                    }
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            debug!("Event stream cancelled");
                            return;
                        }
                        _ = handle_event(&shared, &event) => {}
                    }
                    cursor.record(&event);
                }
                Some(Err(e)) => {
                    error!(error = %e, "Error watching docker container events");
                    break;
                }
                None => {
                    warn!("Docker event stream ended");
                    break;
                }
            }
        }
        drop(events);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = shared.gate.aborted() => return,
            _ = tokio::time::sleep(shared.config.reconnect_delay) => {}
        }
    }
}

/// Apply one event under the registry lock, dispatching at most once.
async fn handle_event(shared: &Shared, event: &ContainerEvent) {
    let mut registry = shared.registry.lock().await;
    match event.action {
        // Assumes every removed container eventually gets a destroy event;
        // otherwise entries would accumulate.
        EventAction::Destroy => {
            debug!(container_id = %event.id, "Docker container was destroyed");
            if let Some(previous) = registry.remove(&event.id) {
                dispatch(shared.handler.as_ref(), Some(previous), None);
            }
        }
        _ => {
            debug!(container_id = %event.id, action = %event.action, "Docker container event");
            let previous = registry.get(&event.id);
            if let Some(current) = shared.fetcher.fetch(&mut registry, &event.id).await {
                dispatch(shared.handler.as_ref(), previous, Some(current));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ev(id: &str, action: EventAction, nanos: u32) -> ContainerEvent {
        ContainerEvent::new(
            id,
            action,
            Utc.timestamp_opt(1_700_000_000, nanos).unwrap(),
        )
    }

    fn cursor() -> ResumeCursor {
        ResumeCursor::new(Watermark::at(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
    }

    #[test]
    fn events_sharing_a_timestamp_are_all_applied() {
        let mut c = cursor();
        let a = ev("a", EventAction::Start, 5);
        let b = ev("b", EventAction::Start, 5);
        assert!(!c.already_applied(&a));
        c.record(&a);
        assert!(!c.already_applied(&b));
        c.record(&b);
        assert!(c.already_applied(&a));
        assert!(c.already_applied(&b));
    }

    #[test]
    fn same_container_different_action_at_same_instant_is_new() {
        let mut c = cursor();
        c.record(&ev("a", EventAction::Die, 5));
        assert!(!c.already_applied(&ev("a", EventAction::Stop, 5)));
    }

    #[test]
    fn older_events_are_replays() {
        let mut c = cursor();
        c.record(&ev("a", EventAction::Start, 10));
        assert!(c.already_applied(&ev("z", EventAction::Start, 9)));
    }

    #[test]
    fn advancing_forgets_the_previous_instant() {
        let mut c = cursor();
        c.record(&ev("a", EventAction::Start, 5));
        c.record(&ev("b", EventAction::Start, 6));
        assert_eq!(c.applied_at_mark, vec![("b".to_string(), EventAction::Start)]);
        assert_eq!(
            c.watermark.timestamp(),
            Utc.timestamp_opt(1_700_000_000, 6).unwrap()
        );
    }

    #[test]
    fn event_at_starting_watermark_is_not_skipped() {
        let c = cursor();
        assert!(!c.already_applied(&ev("a", EventAction::Start, 0)));
    }
}
