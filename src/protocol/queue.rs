//! Outbound delivery queue with a dedicated worker thread.
//!
//! Producers enqueue whole logical messages (the envelope plus its
//! continuations) without blocking. One worker dequeues them in FIFO
//! order and sends every part to every subscriber:
//!
//! ```text
//!  producers ──enqueue──▶ ┌───────────────┐  pop  ┌──────────────┐  notify  ┌───────────┐
//!  (transport ctx,        │ VecDeque      │──────▶│ gui-tx       │─────────▶│ Transport │
//!   application)          │ Mutex+Condvar │       │ worker       │◀─────────│           │
//!                         └───────────────┘       └──────────────┘ BufferFull└───────────┘
//! ```
//!
//! A transient [`SendError::BufferFull`] backs off and retries the same
//! part for the same subscriber, so a slow subscriber adds latency but
//! never loses messages. Any other error skips the message for that
//! subscriber only. The subscriber set is snapshotted when a message is
//! dequeued; a subscriber added later gets the next message.
//!
//! A subscriber receives a whole message or none of it. If the envelope
//! went out but the rest cannot, the subscriber is unsubscribed.
//!
//! States: `Idle ⇄ Draining`, and `ShuttingDown` from either. Shutdown
//! discards queued messages and interrupts a retry that has not sent an
//! envelope yet; a started message is finished first.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::transport::{GattTransport, SendError, SubscriberId};
use crate::events::{EventHub, GuiEvent};
use crate::task_pin::{self, Core, WorkerSpec};

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Full-buffer retries allowed to finish a started message after shutdown.
pub const SHUTDOWN_GRACE_RETRIES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    /// Nothing queued, worker waiting.
    Idle,
    /// Worker is delivering a message.
    Draining,
    /// Terminal.
    ShuttingDown,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub retry_backoff: Duration,
    /// Maximum concurrent subscribers; further subscriptions are refused.
    pub client_limit: usize,
    pub worker: WorkerSpec,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            client_limit: 1,
            worker: WorkerSpec {
                name: "gui-tx\0",
                core: Core::Pro,
                priority: 5,
                stack_kb: 8,
            },
        }
    }
}

/// One logical message: the transport messages to send back to back.
type Parts = Vec<Vec<u8>>;

struct State {
    queue: VecDeque<Parts>,
    subscribers: Vec<SubscriberId>,
    phase: QueuePhase,
}

struct Shared<T> {
    state: Mutex<State>,
    /// Signalled on enqueue, subscriber removal and shutdown.
    wake: Condvar,
    /// Signalled when the worker goes idle or stops.
    idle: Condvar,
    transport: Arc<T>,
    events: EventHub,
    config: QueueConfig,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct OutboundQueue<T: GattTransport + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

enum Delivery {
    Sent,
    Skipped,
    Aborted,
}

impl<T: GattTransport + 'static> OutboundQueue<T> {
    /// Create the queue and spawn its worker.
    pub fn start(transport: Arc<T>, events: EventHub, config: QueueConfig) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                subscribers: Vec::new(),
                phase: QueuePhase::Idle,
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            transport,
            events,
            config,
        });

        let worker_shared = shared.clone();
        let handle = task_pin::spawn_worker(config.worker, move || run(&worker_shared))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queue one logical message. Returns `false` once shut down.
    pub fn enqueue(&self, parts: Vec<Vec<u8>>) -> bool {
        let mut st = self.shared.lock();
        if st.phase == QueuePhase::ShuttingDown {
            return false;
        }
        st.queue.push_back(parts);
        drop(st);
        self.shared.wake.notify_all();
        true
    }

    /// Register a subscriber. Refused once `client_limit` is reached.
    pub fn add_subscriber(&self, id: SubscriberId) -> bool {
        let mut st = self.shared.lock();
        if st.subscribers.contains(&id) {
            return true;
        }
        if st.subscribers.len() >= self.shared.config.client_limit {
            info!(
                "TX: subscriber {id} refused, limit {} reached",
                self.shared.config.client_limit
            );
            return false;
        }
        st.subscribers.push(id);
        true
    }

    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut st = self.shared.lock();
        let before = st.subscribers.len();
        st.subscribers.retain(|s| *s != id);
        let removed = st.subscribers.len() != before;
        drop(st);
        // A retry loop waiting on this subscriber gives up.
        self.shared.wake.notify_all();
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    pub fn phase(&self) -> QueuePhase {
        self.shared.lock().phase
    }

    /// Messages waiting behind the one in flight.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Block until everything queued so far has been delivered.
    /// Returns `false` on timeout or shutdown.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let st = self.shared.lock();
        let (st, _) = self
            .shared
            .idle
            .wait_timeout_while(st, timeout, |st| {
                st.phase == QueuePhase::Draining || (st.phase == QueuePhase::Idle && !st.queue.is_empty())
            })
            .unwrap_or_else(PoisonError::into_inner);
        st.phase == QueuePhase::Idle && st.queue.is_empty()
    }

    /// Stop the worker, discarding anything still queued.
    pub fn shutdown(&self) {
        {
            let mut st = self.shared.lock();
            if st.phase != QueuePhase::ShuttingDown {
                let dropped = st.queue.len();
                st.queue.clear();
                st.phase = QueuePhase::ShuttingDown;
                if dropped > 0 {
                    debug!("TX: shutdown discarded {dropped} queued message(s)");
                }
            }
        }
        self.shared.wake.notify_all();
        self.shared.idle.notify_all();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // Never join from the worker itself (e.g. a sink that shuts down).
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl<T: GattTransport + 'static> Drop for OutboundQueue<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Worker ───────────────────────────────────────────────────

fn run<T: GattTransport>(shared: &Shared<T>) {
    info!("TX: delivery worker started");
    while let Some((parts, subscribers)) = next_message(shared) {
        for sub in subscribers {
            if shared.lock().phase == QueuePhase::ShuttingDown {
                break;
            }
            match deliver(shared, sub, &parts) {
                Delivery::Sent | Delivery::Skipped => {}
                Delivery::Aborted => break,
            }
        }
    }
    shared.idle.notify_all();
    shared.events.emit(GuiEvent::WorkerStopped);
}

/// Wait for the next message, or `None` on shutdown.
fn next_message<T>(shared: &Shared<T>) -> Option<(Parts, Vec<SubscriberId>)> {
    let mut st = shared.lock();
    loop {
        if st.phase == QueuePhase::ShuttingDown {
            return None;
        }
        if let Some(parts) = st.queue.pop_front() {
            st.phase = QueuePhase::Draining;
            return Some((parts, st.subscribers.clone()));
        }
        st.phase = QueuePhase::Idle;
        shared.idle.notify_all();
        st = shared.wake.wait(st).unwrap_or_else(PoisonError::into_inner);
    }
}

/// Send every part of one message to `sub`.
///
/// Before the envelope is accepted, shutdown aborts the delivery. After
/// it, the rest of the message is still sent, with at most
/// [`SHUTDOWN_GRACE_RETRIES`] full-buffer retries once shutdown is
/// requested. A subscriber left holding a partial message is dropped.
fn deliver<T: GattTransport>(shared: &Shared<T>, sub: SubscriberId, parts: &[Vec<u8>]) -> Delivery {
    let mut grace = SHUTDOWN_GRACE_RETRIES;
    for (index, part) in parts.iter().enumerate() {
        let started = index > 0;
        loop {
            match shared.transport.notify(sub, part) {
                Ok(()) => break,
                Err(SendError::BufferFull) => {
                    if started && shared.lock().phase == QueuePhase::ShuttingDown {
                        if grace == 0 {
                            drop_partial(shared, sub, SendError::BufferFull);
                            return Delivery::Aborted;
                        }
                        grace -= 1;
                    }
                    if !backoff(shared, sub, started) {
                        let shutting_down = shared.lock().phase == QueuePhase::ShuttingDown;
                        return if shutting_down {
                            Delivery::Aborted
                        } else {
                            Delivery::Skipped
                        };
                    }
                }
                Err(error) if started => {
                    drop_partial(shared, sub, error);
                    return Delivery::Skipped;
                }
                Err(error) => {
                    shared
                        .events
                        .emit(GuiEvent::DeliveryFailed { subscriber: sub, error });
                    return Delivery::Skipped;
                }
            }
        }
    }
    Delivery::Sent
}

/// `sub` received part of a message that will never be completed; it
/// must resubscribe before it is sent anything else.
fn drop_partial<T>(shared: &Shared<T>, sub: SubscriberId, error: SendError) {
    let removed = {
        let mut st = shared.lock();
        let before = st.subscribers.len();
        st.subscribers.retain(|s| *s != sub);
        st.subscribers.len() != before
    };
    warn!("TX: subscriber {sub} left with a partial message ({error}), unsubscribed");
    shared
        .events
        .emit(GuiEvent::DeliveryFailed { subscriber: sub, error });
    if removed {
        shared.events.emit(GuiEvent::SubscriberChanged {
            subscriber: sub,
            subscribed: false,
        });
    }
}

/// Wait out one full retry interval. Returns `false` if the retry should
/// be abandoned: the subscriber left, or shutdown was requested before
/// the subscriber received any part of the message.
fn backoff<T>(shared: &Shared<T>, sub: SubscriberId, started: bool) -> bool {
    let deadline = Instant::now() + shared.config.retry_backoff;
    let mut st = shared.lock();
    loop {
        if !st.subscribers.contains(&sub) {
            return false;
        }
        if st.phase == QueuePhase::ShuttingDown && !started {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        // Enqueues signal the same condvar; keep waiting until the deadline.
        st = shared
            .wake
            .wait_timeout(st, left)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}
