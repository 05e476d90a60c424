//! Data and trigger handlers: where a control's value actually lives.
//!
//! A control element never stores its own value. It holds a shared
//! [`DataHandler`] of the matching element type and reads/writes through
//! it. Three built-in handlers cover the common cases:
//!
//! | Handler          | Backing store                         |
//! |------------------|---------------------------------------|
//! | [`ValueCell`]    | in-memory value owned by the handler  |
//! | [`FnHandler`]    | computed property (getter/setter)     |
//! | [`RefHandler`]   | live `Arc<Mutex<T>>` shared with app  |
//!
//! Handlers are invoked while the GUI tree lock is held, so a change
//! callback must not call back into the same tree synchronously.

use std::sync::{Arc, Mutex, PoisonError};

use crate::value::Rgbw;

/// Typed get/set access to a control's backing value.
pub trait DataHandler<T>: Send + Sync {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

/// Stateless action invoked by a button press.
pub trait TriggerHandler: Send + Sync {
    fn on_trigger(&self);
}

impl<F> TriggerHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_trigger(&self) {
        self()
    }
}

pub type SharedHandler<T> = Arc<dyn DataHandler<T>>;
pub type SharedTrigger = Arc<dyn TriggerHandler>;

pub type BoolHandler = SharedHandler<bool>;
pub type Int32Handler = SharedHandler<i32>;
pub type IndexHandler = SharedHandler<u16>;
pub type TextHandler = SharedHandler<String>;
pub type ColorHandler = SharedHandler<Rgbw>;
pub type FloatHandler = SharedHandler<f32>;

type ChangeCallback = Box<dyn Fn() + Send + Sync>;

// ── ValueCell ────────────────────────────────────────────────

/// Handler that owns its value.
pub struct ValueCell<T> {
    value: Mutex<T>,
}

impl<T: Clone + Send> ValueCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    pub fn shared(initial: T) -> Arc<Self> {
        Arc::new(Self::new(initial))
    }
}

impl<T: Clone + Send> DataHandler<T> for ValueCell<T> {
    fn get(&self) -> T {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: T) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

// ── FnHandler ────────────────────────────────────────────────

/// Handler backed by a getter/setter pair (computed property).
pub struct FnHandler<G, S> {
    getter: G,
    setter: S,
}

impl<G, S> FnHandler<G, S> {
    pub fn new(getter: G, setter: S) -> Self {
        Self { getter, setter }
    }
}

impl<T, G, S> DataHandler<T> for FnHandler<G, S>
where
    G: Fn() -> T + Send + Sync,
    S: Fn(T) + Send + Sync,
{
    fn get(&self) -> T {
        (self.getter)()
    }

    fn set(&self, value: T) {
        (self.setter)(value);
    }
}

// ── RefHandler ───────────────────────────────────────────────

/// Handler bound to a value the application also holds.
///
/// Every `set` writes through to the shared location and then runs the
/// optional change callback. The callback may run on the transport event
/// thread; it must not block and must not re-enter the GUI tree.
pub struct RefHandler<T> {
    target: Arc<Mutex<T>>,
    on_change: Option<ChangeCallback>,
}

impl<T: Clone + Send> RefHandler<T> {
    pub fn new(target: Arc<Mutex<T>>) -> Self {
        Self {
            target,
            on_change: None,
        }
    }

    pub fn with_callback(target: Arc<Mutex<T>>, on_change: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            target,
            on_change: Some(Box::new(on_change)),
        }
    }

    pub fn shared(target: Arc<Mutex<T>>, on_change: impl Fn() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self::with_callback(target, on_change))
    }
}

impl<T: Clone + Send> DataHandler<T> for RefHandler<T> {
    fn get(&self) -> T {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: T) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = value;
        // Target lock is released here, the callback may read it.
        if let Some(cb) = &self.on_change {
            cb();
        }
    }
}
