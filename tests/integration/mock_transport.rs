//! Mock GATT transport for integration tests.
//!
//! Records every notification so tests can assert on exactly what each
//! subscriber received, and can be told to stall (buffer full) or fail
//! permanently for one subscriber.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bleremote::events::{EventSink, GuiEvent};
use bleremote::protocol::{ClientEvent, GattTransport, GuiClient, SendError, SubscriberId};

// ── MockTransport ─────────────────────────────────────────────

pub struct MockTransport {
    budget: Mutex<Option<u16>>,
    sent: Mutex<Vec<(SubscriberId, Vec<u8>)>>,
    stall: AtomicUsize,
    /// Sends still accepted before `stall` takes effect.
    stall_delay: AtomicUsize,
    stalls_seen: AtomicUsize,
    fail: Mutex<Option<(SubscriberId, SendError)>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn connected(budget: u16) -> Arc<Self> {
        Arc::new(Self {
            budget: Mutex::new(Some(budget)),
            sent: Mutex::new(Vec::new()),
            stall: AtomicUsize::new(0),
            stall_delay: AtomicUsize::new(0),
            stalls_seen: AtomicUsize::new(0),
            fail: Mutex::new(None),
        })
    }

    pub fn disconnected() -> Arc<Self> {
        let t = Self::connected(0);
        t.set_budget(None);
        t
    }

    pub fn set_budget(&self, budget: Option<u16>) {
        *self.budget.lock().unwrap() = budget;
    }

    /// The next `n` sends report a full buffer.
    pub fn stall(&self, n: usize) {
        self.stall.store(n, Ordering::SeqCst);
    }

    /// Accept `accepted` more sends, then stall the following `n`.
    pub fn stall_after(&self, accepted: usize, n: usize) {
        self.stall_delay.store(accepted, Ordering::SeqCst);
        self.stall.store(n, Ordering::SeqCst);
    }

    pub fn stalls_seen(&self) -> usize {
        self.stalls_seen.load(Ordering::SeqCst)
    }

    /// Every send to `subscriber` fails with `error`.
    pub fn fail_for(&self, subscriber: SubscriberId, error: SendError) {
        *self.fail.lock().unwrap() = Some((subscriber, error));
    }

    pub fn sent(&self) -> Vec<(SubscriberId, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, subscriber: SubscriberId) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == subscriber)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl GattTransport for MockTransport {
    fn content_budget(&self) -> Option<u16> {
        *self.budget.lock().unwrap()
    }

    fn notify(&self, subscriber: SubscriberId, data: &[u8]) -> Result<(), SendError> {
        if let Some((s, e)) = *self.fail.lock().unwrap() {
            if s == subscriber {
                return Err(e);
            }
        }
        let delayed = self
            .stall_delay
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let stalled = !delayed
            && self
                .stall
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if stalled {
            self.stalls_seen.fetch_add(1, Ordering::SeqCst);
            return Err(SendError::BufferFull);
        }
        self.sent.lock().unwrap().push((subscriber, data.to_vec()));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GuiEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<GuiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&GuiEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GuiEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Decode everything one subscriber received, as a fresh client would.
pub fn decode_all(messages: &[Vec<u8>]) -> Vec<ClientEvent> {
    let mut client = GuiClient::default();
    messages.iter().filter_map(|m| client.feed(m)).collect()
}
