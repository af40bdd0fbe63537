//! Ordered handler registries with per-handler failure isolation.
//!
//! A registry is a list of callbacks for one kind of event. Every handler
//! registered is invoked, in registration order, for every occurrence.
//! A handler that panics is logged and skipped; the rest still run.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

/// A shared callback taking a borrowed event.
pub type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// An ordered list of handlers for events of type `A`.
pub struct HandlerRegistry<A: ?Sized> {
    name: &'static str,
    handlers: RwLock<Vec<Handler<A>>>,
}

impl<A: ?Sized> HandlerRegistry<A> {
    /// Creates an empty registry. `name` shows up in panic logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Appends a handler.
    pub fn register<F>(&self, handler: F)
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Invokes every handler with `event`, in registration order.
    ///
    /// The list is snapshotted first and the lock released, so a handler
    /// may register further handlers without deadlocking; those only see
    /// later events.
    pub fn emit(&self, event: &A) {
        let snapshot: Vec<Handler<A>> = self.handlers.read().clone();
        for (index, handler) in snapshot.iter().enumerate() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                tracing::warn!(
                    registry = self.name,
                    index,
                    panic = %panic_message(panic.as_ref()),
                    "handler panicked"
                );
            }
        }
    }
}

impl<A: ?Sized> fmt::Debug for HandlerRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic>"
    }
}
