// Shared test helpers: an in-memory runtime and a recording change handler

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use containerwatch::models::{ContainerChange, ContainerEvent, ContainerState, EventAction, Watermark};
use containerwatch::runtime::{ContainerRuntime, EventStream, RuntimeError};
use containerwatch::watcher::ChangeHandler;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<Result<ContainerEvent, RuntimeError>>;

#[derive(Clone)]
pub enum Inspect {
    Found(ContainerState),
    Fail(String),
    /// Never answers; exercises the inspect deadline.
    Hang,
}

#[derive(Default)]
struct FakeState {
    inspect: HashMap<String, Inspect>,
    running: Vec<String>,
    list_error: Option<String>,
    sessions: VecDeque<mpsc::UnboundedReceiver<Result<ContainerEvent, RuntimeError>>>,
    subscriptions: Vec<Watermark>,
    inspect_calls: Vec<String>,
    panic_on_subscribe: bool,
}

/// Scripted runtime. Each `subscribe_events` takes the next queued session;
/// with none queued the stream stays open and silent.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_container(&self, state: ContainerState) {
        let mut s = self.state.lock().unwrap();
        s.inspect.insert(state.id.clone(), Inspect::Found(state));
    }

    pub fn set_inspect(&self, id: &str, inspect: Inspect) {
        self.state
            .lock()
            .unwrap()
            .inspect
            .insert(id.to_string(), inspect);
    }

    pub fn set_running(&self, ids: &[&str]) {
        self.state.lock().unwrap().running = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail_listing(&self, msg: &str) {
        self.state.lock().unwrap().list_error = Some(msg.to_string());
    }

    /// Queue an event session; events and errors pushed on the returned
    /// sender reach the watcher on its next subscribe.
    pub fn push_session(&self) -> EventSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().sessions.push_back(rx);
        tx
    }

    /// Make the next subscribe panic, killing the event stream task.
    pub fn panic_on_subscribe(&self) {
        self.state.lock().unwrap().panic_on_subscribe = true;
    }

    pub fn subscriptions(&self) -> Vec<Watermark> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn inspect_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().inspect_calls.clone()
    }

    /// Wait until an inspect of `id` has been issued.
    pub async fn wait_for_inspect(&self, id: &str) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !self.inspect_calls().iter().any(|c| c == id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("inspect was never issued");
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn inspect_container(&self, id: &str) -> Result<ContainerState, RuntimeError> {
        let inspect = {
            let mut s = self.state.lock().unwrap();
            s.inspect_calls.push(id.to_string());
            s.inspect.get(id).cloned()
        };
        match inspect {
            Some(Inspect::Found(state)) => Ok(state),
            Some(Inspect::Fail(msg)) => Err(RuntimeError::Other(msg)),
            Some(Inspect::Hang) => std::future::pending().await,
            None => Err(RuntimeError::Other(format!("no such container: {id}"))),
        }
    }

    fn subscribe_events(&self, since: Watermark, actions: &[EventAction]) -> EventStream {
        assert_eq!(actions.len(), EventAction::ALL.len());
        let session = {
            let mut s = self.state.lock().unwrap();
            if s.panic_on_subscribe {
                drop(s);
                panic!("event subscription exploded");
            }
            s.subscriptions.push(since);
            s.sessions.pop_front()
        };
        match session {
            Some(rx) => futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => futures_util::stream::pending().boxed(),
        }
    }

    async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
        let s = self.state.lock().unwrap();
        match &s.list_error {
            Some(msg) => Err(RuntimeError::Other(msg.clone())),
            None => Ok(s.running.clone()),
        }
    }
}

/// Forwards every change into a channel the test reads from.
pub struct Recorder {
    tx: mpsc::UnboundedSender<ContainerChange>,
}

impl ChangeHandler for Recorder {
    fn on_change(&self, change: ContainerChange) {
        let _ = self.tx.send(change);
    }
}

pub fn recorder() -> (Arc<Recorder>, mpsc::UnboundedReceiver<ContainerChange>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Recorder { tx }), rx)
}

/// Next change, failing the test if none arrives within a second.
pub async fn next_change(rx: &mut mpsc::UnboundedReceiver<ContainerChange>) -> ContainerChange {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a container change")
        .expect("change channel closed")
}

/// Event timestamps well after the watcher's starting watermark.
pub fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::hours(1) + chrono::Duration::milliseconds(offset_ms)
}

pub fn event(id: &str, action: EventAction, ts: DateTime<Utc>) -> Result<ContainerEvent, RuntimeError> {
    Ok(ContainerEvent::new(id, action, ts))
}
