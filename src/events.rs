//! Injected key-event source.
//!
//! The task does not own an input device; whatever hosts it pushes press and
//! release notifications into the channel half returned by
//! [`KeySource::channel`]. A [`KeypressTap`] captures every press for the
//! lifetime of one trial, independently of the per-stimulus bindings, and
//! detaches itself when dropped so no exit path can leak the capture.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn press(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Press,
        }
    }

    pub fn release(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: KeyEventKind::Release,
        }
    }
}

/// One captured keypress, timed from the start of the trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeypressEntry {
    pub key: String,
    pub at_ms: u64,
}

#[derive(Debug, Default)]
struct TapInner {
    epoch: u64,
    active: bool,
    started: Option<Instant>,
    entries: Vec<KeypressEntry>,
}

/// Guard over the trial-wide keypress capture. Dropping it stops the capture.
#[derive(Debug)]
pub struct KeypressTap {
    epoch: u64,
    inner: Arc<Mutex<TapInner>>,
}

impl KeypressTap {
    /// Drain the captured presses.
    pub fn take_entries(&self) -> Vec<KeypressEntry> {
        let mut inner = self.inner.lock().expect("tap lock");
        std::mem::take(&mut inner.entries)
    }
}

impl Drop for KeypressTap {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().expect("tap lock");
        // A newer tap may already own the capture.
        if inner.epoch == self.epoch {
            inner.active = false;
            inner.started = None;
        }
    }
}

/// Receiving half of the injected key-event stream.
#[derive(Debug)]
pub struct KeySource {
    rx: mpsc::UnboundedReceiver<KeyEvent>,
    tap: Arc<Mutex<TapInner>>,
}

impl KeySource {
    /// Create the source together with the sender the host uses to inject
    /// events.
    pub fn channel() -> (mpsc::UnboundedSender<KeyEvent>, KeySource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            KeySource {
                rx,
                tap: Arc::new(Mutex::new(TapInner::default())),
            },
        )
    }

    /// Start capturing presses, timed against `started`. Replaces any
    /// previous capture.
    pub fn tap(&self, started: Instant) -> KeypressTap {
        let mut inner = self.tap.lock().expect("tap lock");
        inner.epoch += 1;
        inner.active = true;
        inner.started = Some(started);
        inner.entries.clear();
        KeypressTap {
            epoch: inner.epoch,
            inner: Arc::clone(&self.tap),
        }
    }

    /// Receive the next key event. Returns `None` once the sending half is
    /// gone.
    pub async fn next(&mut self) -> Option<KeyEvent> {
        let event = self.rx.recv().await;
        if let Some(event) = &event {
            if event.kind == KeyEventKind::Press {
                let mut inner = self.tap.lock().expect("tap lock");
                if inner.active {
                    let at_ms = inner
                        .started
                        .map(|started| started.elapsed().as_millis() as u64)
                        .unwrap_or(0);
                    let key = event.key.clone();
                    inner.entries.push(KeypressEntry { key, at_ms });
                }
            }
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tap_records_presses_not_releases() {
        let (tx, mut keys) = KeySource::channel();
        let tap = keys.tap(Instant::now());

        tx.send(KeyEvent::press("f")).unwrap();
        tx.send(KeyEvent::release("f")).unwrap();
        keys.next().await.unwrap();
        keys.next().await.unwrap();

        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        tx.send(KeyEvent::press("j")).unwrap();
        keys.next().await.unwrap();

        let entries = tap.take_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "f");
        assert_eq!(entries[0].at_ms, 0);
        assert_eq!(entries[1].key, "j");
        assert_eq!(entries[1].at_ms, 250);
    }

    #[tokio::test]
    async fn dropping_the_tap_stops_the_capture() {
        let (tx, mut keys) = KeySource::channel();
        let tap = keys.tap(Instant::now());
        drop(tap);

        tx.send(KeyEvent::press("f")).unwrap();
        keys.next().await.unwrap();

        let tap = keys.tap(Instant::now());
        assert!(tap.take_entries().is_empty());
    }

    #[tokio::test]
    async fn a_newer_tap_survives_the_old_guard() {
        let (tx, mut keys) = KeySource::channel();
        let old = keys.tap(Instant::now());
        let new = keys.tap(Instant::now());
        drop(old);

        tx.send(KeyEvent::press("f")).unwrap();
        keys.next().await.unwrap();
        assert_eq!(new.take_entries().len(), 1);
    }
}
