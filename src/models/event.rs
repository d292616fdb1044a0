// Runtime lifecycle events and the stream watermark

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Lifecycle actions the watcher subscribes to. Anything else is filtered out
/// by the runtime before it reaches the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    Destroy,
    Die,
    Pause,
    Stop,
    Start,
    Unpause,
    Update,
}

impl EventAction {
    pub const ALL: [EventAction; 7] = [
        EventAction::Destroy,
        EventAction::Die,
        EventAction::Pause,
        EventAction::Stop,
        EventAction::Start,
        EventAction::Unpause,
        EventAction::Update,
    ];

    /// Docker action name, as used in the `event` filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Destroy => "destroy",
            EventAction::Die => "die",
            EventAction::Pause => "pause",
            EventAction::Stop => "stop",
            EventAction::Start => "start",
            EventAction::Unpause => "unpause",
            EventAction::Update => "update",
        }
    }

    /// Parse a Docker action string. Returns `None` for actions we do not track
    /// (e.g. "exec_start: sh", "health_status: healthy").
    pub fn from_docker(s: &str) -> Option<Self> {
        EventAction::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One container lifecycle event from the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    pub id: String,
    pub action: EventAction,
    pub timestamp: DateTime<Utc>,
}

impl ContainerEvent {
    pub fn new(id: impl Into<String>, action: EventAction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            action,
            timestamp,
        }
    }
}

/// Timestamp of the last processed event (or of the moment watching began).
/// Subscriptions resume from here after a stream error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn at(ts: DateTime<Utc>) -> Self {
        Self(ts)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Move forward to `ts`; never moves backwards.
    pub fn advance(&mut self, ts: DateTime<Utc>) {
        if ts > self.0 {
            self.0 = ts;
        }
    }

    /// Unix `<secs>.<nanos>`, the only form the daemon parses for `since`
    /// (the docker CLI converts RFC3339 client-side).
    pub fn to_since(&self) -> String {
        format!("{}.{:09}", self.0.timestamp(), self.0.timestamp_subsec_nanos())
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}
