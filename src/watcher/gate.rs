// One-shot startup gate between the event stream and the snapshot load

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending,
    Open,
    Aborted,
}

/// Opened once the event stream is subscribed, so the snapshot never misses
/// changes that happen while it is being taken. Aborted when the snapshot
/// phase fails, which tells the stream to stop.
pub(crate) struct StartupGate {
    tx: watch::Sender<GateState>,
}

impl Default for StartupGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupGate {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(GateState::Pending);
        Self { tx }
    }

    /// Open the gate. Returns false (and does nothing) unless it was pending;
    /// reconnects call this every time they resubscribe.
    pub(crate) fn signal(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == GateState::Pending {
                *state = GateState::Open;
                true
            } else {
                false
            }
        })
    }

    /// Terminal; wakes everyone waiting in [`wait_open`] or [`aborted`].
    ///
    /// [`wait_open`]: StartupGate::wait_open
    /// [`aborted`]: StartupGate::aborted
    pub(crate) fn abort(&self) {
        self.tx.send_if_modified(|state| {
            let changed = *state != GateState::Aborted;
            *state = GateState::Aborted;
            changed
        });
    }

    pub(crate) fn is_aborted(&self) -> bool {
        *self.tx.borrow() == GateState::Aborted
    }

    /// Resolves once the gate leaves pending. `true` if it opened.
    pub(crate) async fn wait_open(&self) -> bool {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|s| *s != GateState::Pending).await {
            Ok(state) => *state == GateState::Open,
            Err(_) => false,
        }
    }

    /// Resolves only when the gate is aborted.
    pub(crate) async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|s| *s == GateState::Aborted).await.is_err() {
            // Sender lives as long as `self`; unreachable in practice.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_is_one_shot() {
        let gate = StartupGate::new();
        assert!(gate.signal());
        assert!(!gate.signal());
        assert!(gate.wait_open().await);
    }

    #[tokio::test]
    async fn waiter_wakes_on_signal() {
        let gate = Arc::new(StartupGate::new());
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_open().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.signal();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn abort_after_open_is_observed() {
        let gate = StartupGate::new();
        gate.signal();
        gate.abort();
        assert!(gate.is_aborted());
        assert!(!gate.signal());
        tokio::time::timeout(Duration::from_secs(1), gate.aborted())
            .await
            .expect("aborted() should resolve");
    }

    #[tokio::test]
    async fn abort_before_open_releases_waiter() {
        let gate = StartupGate::new();
        gate.abort();
        assert!(!gate.wait_open().await);
    }
}
