//! Control tree: element variants, builder, structural dump and the
//! mutex-guarded handle shared by the transport and the application.

pub mod builder;
pub mod describe;
pub mod element;
pub mod path;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use builder::GuiBuilder;
pub use element::{Element, ElementKind, Group, ReadoutSource};

use crate::value::Value;

/// Thread-safe handle to one control tree.
///
/// Every read, write and dump runs under a single lock, so the transport
/// event context and application code may use the same tree concurrently.
/// Handlers run while the lock is held and must not call back into the
/// same `SharedGui`.
#[derive(Clone)]
pub struct SharedGui {
    root: Arc<Mutex<Group>>,
}

impl SharedGui {
    pub fn new(root: Group) -> Self {
        Self {
            root: Arc::new(Mutex::new(root)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Group> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value at `path`. The root is not a path segment.
    pub fn get_value<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        element::get_in_group(&self.lock(), path)
    }

    pub fn set_value<S: AsRef<str>>(&self, path: &[S], value: &Value) -> bool {
        element::set_in_group(&mut self.lock(), path, value)
    }

    /// Value at `path` as it may be shown to a client: confidential text
    /// fields read as an empty string.
    pub fn get_public_value<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        let root = self.lock();
        public_value(&root, path)
    }

    /// Write `value` and read back the authoritative (post-clamp) public
    /// value in one critical section. `None` if the write was rejected.
    pub fn set_and_read_back<S: AsRef<str>>(&self, path: &[S], value: &Value) -> Option<Value> {
        self.set_and_publish(path, value, |v| v)
    }

    /// Like [`Self::set_and_read_back`], but `publish` also runs before the
    /// lock is released, so concurrent writers publish in commit order.
    /// `publish` must not call back into this `SharedGui`.
    pub fn set_and_publish<S: AsRef<str>, R>(
        &self,
        path: &[S],
        value: &Value,
        publish: impl FnOnce(Value) -> R,
    ) -> Option<R> {
        let mut root = self.lock();
        if !element::set_in_group(&mut root, path, value) {
            return None;
        }
        public_value(&root, path).map(publish)
    }

    /// Hand the public value at `path` to `publish` under the lock.
    pub fn publish_value<S: AsRef<str>, R>(
        &self,
        path: &[S],
        publish: impl FnOnce(Value) -> R,
    ) -> Option<R> {
        let root = self.lock();
        public_value(&root, path).map(publish)
    }

    /// GUIData body for the whole tree.
    pub fn describe(&self) -> String {
        describe::describe_root(&self.lock())
    }

    /// Run `f` with exclusive access to the root, e.g. to attach handlers
    /// or toggle flags after construction.
    pub fn with_root<R>(&self, f: impl FnOnce(&mut Group) -> R) -> R {
        f(&mut self.lock())
    }
}

fn public_value<S: AsRef<str>>(root: &Group, path: &[S]) -> Option<Value> {
    let value = element::get_in_group(root, path)?;
    let discloses = element::find_in_group(root, path).is_none_or(Element::discloses_value);
    if discloses {
        Some(value)
    } else {
        Some(Value::Text(String::new()))
    }
}
