//! Reassignable handler slots.
//!
//! A handler slot is a named, mutable callback field on a component. Event
//! dispatch reads the slot at the moment the event fires, so a handler bound
//! after a connection was started still receives every later event.
//!
//! Two kinds of slot exist, and they differ in what "nothing bound" means:
//!
//! - [`HandlerSlot<Args>`] always holds something callable. Until a handler
//!   is bound it holds the no-op default, and invoking it does nothing.
//! - [`ErrorSlot<E>`] starts out *unset*. Invoking an unset error slot hands
//!   the error back to the caller as `Err`, so the event source can treat it
//!   as fatal instead of silently dropping it.
//!
//! # Example
//!
//! ```
//! use tricep_core::{ErrorSlot, HandlerSlot};
//!
//! let on_data = HandlerSlot::<Vec<u8>>::new();
//! assert!(on_data.is_noop());
//! on_data.invoke(b"ignored".to_vec());
//!
//! on_data.set(|bytes| println!("{} bytes", bytes.len()));
//! on_data.invoke(b"hello".to_vec());
//!
//! let on_error = ErrorSlot::<String>::new();
//! assert_eq!(on_error.invoke("boom".into()), Err("boom".to_string()));
//!
//! on_error.set(|err| eprintln!("handled: {err}"));
//! assert_eq!(on_error.invoke("boom".into()), Ok(()));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// A shareable callback stored in a slot.
pub type Callback<Args> = Arc<dyn Fn(Args) + Send + Sync>;

enum Binding<Args> {
    Noop,
    Bound(Callback<Args>),
}

impl<Args> Clone for Binding<Args> {
    fn clone(&self) -> Self {
        match self {
            Self::Noop => Self::Noop,
            Self::Bound(cb) => Self::Bound(cb.clone()),
        }
    }
}

/// A handler slot whose default is a no-op.
///
/// Binding a new handler replaces the previous one; there is only ever a
/// single handler per slot.
pub struct HandlerSlot<Args> {
    binding: RwLock<Binding<Args>>,
}

impl<Args> Default for HandlerSlot<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> HandlerSlot<Args> {
    /// Create a slot holding the no-op default.
    pub fn new() -> Self {
        Self {
            binding: RwLock::new(Binding::Noop),
        }
    }

    /// Create a slot with a handler already bound.
    pub fn with<F>(handler: F) -> Self
    where
        F: Fn(Args) + Send + Sync + 'static,
    {
        Self {
            binding: RwLock::new(Binding::Bound(Arc::new(handler))),
        }
    }

    /// Bind a handler, replacing whatever was there.
    pub fn set<F>(&self, handler: F)
    where
        F: Fn(Args) + Send + Sync + 'static,
    {
        *self.binding.write() = Binding::Bound(Arc::new(handler));
    }

    /// Bind an already shared handler.
    pub fn set_callback(&self, handler: Callback<Args>) {
        *self.binding.write() = Binding::Bound(handler);
    }

    /// Restore the no-op default.
    pub fn reset(&self) {
        *self.binding.write() = Binding::Noop;
    }

    /// Whether the slot holds the no-op default.
    pub fn is_noop(&self) -> bool {
        matches!(*self.binding.read(), Binding::Noop)
    }

    /// Invoke the handler currently bound.
    ///
    /// The lock is released before the handler runs, so a handler may rebind
    /// any slot (including this one) from inside the call.
    pub fn invoke(&self, args: Args) {
        let binding = self.binding.read().clone();
        if let Binding::Bound(handler) = binding {
            handler(args);
        }
    }
}

impl<Args> fmt::Debug for HandlerSlot<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_noop() { "noop" } else { "bound" };
        f.debug_tuple("HandlerSlot").field(&state).finish()
    }
}

/// An error handler slot that may be left unset.
///
/// "Unset" is a distinct state from "bound to a no-op": an unset slot refuses
/// the error and returns it, a no-op handler swallows it.
pub struct ErrorSlot<E> {
    handler: RwLock<Option<Callback<E>>>,
}

impl<E> Default for ErrorSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ErrorSlot<E> {
    /// Create an unset slot.
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(None),
        }
    }

    /// Create a slot from an optional shared handler.
    pub fn from_option(handler: Option<Callback<E>>) -> Self {
        Self {
            handler: RwLock::new(handler),
        }
    }

    /// Bind a handler.
    pub fn set<F>(&self, handler: F)
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Arc::new(handler));
    }

    /// Bind an already shared handler.
    pub fn set_callback(&self, handler: Callback<E>) {
        *self.handler.write() = Some(handler);
    }

    /// Return the slot to the unset state.
    pub fn unset(&self) {
        *self.handler.write() = None;
    }

    /// Whether a handler is bound.
    pub fn is_set(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Deliver `err` to the bound handler.
    ///
    /// Returns `Err(err)` untouched when the slot is unset.
    pub fn invoke(&self, err: E) -> Result<(), E> {
        let handler = self.handler.read().clone();
        match handler {
            Some(handler) => {
                handler(err);
                Ok(())
            }
            None => Err(err),
        }
    }
}

impl<E> fmt::Debug for ErrorSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "set" } else { "unset" };
        f.debug_tuple("ErrorSlot").field(&state).finish()
    }
}

static_assertions::assert_impl_all!(HandlerSlot<Vec<u8>>: Send, Sync);
static_assertions::assert_impl_all!(ErrorSlot<String>: Send, Sync);
