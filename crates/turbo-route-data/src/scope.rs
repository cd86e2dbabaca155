//! Owning scopes backed by the Leptos reactive owner.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use leptos::prelude::{on_cleanup, Owner};
use send_wrapper::SendWrapper;

struct ScopeInner {
    owner: Owner,
    disposed: Cell<bool>,
    // Adopted owners belong to the component tree and are not cleaned up on drop.
    owned: bool,
}

/// The lifetime owner of route data instances, usually one per mounted route.
///
/// A scope wraps a Leptos [`Owner`]; cleanups are registered on it with
/// `on_cleanup`. They run when the scope is disposed, either explicitly or
/// when the last handle of a scope created by [`Scope::new`] is dropped.
/// Disposing twice is a no-op. Cleanups registered after disposal run
/// immediately.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Create a scope with a fresh owner, a child of the current owner if
    /// there is one.
    pub fn new() -> Self {
        Self::wrap(Owner::new(), true)
    }

    /// Adopt the owner of the component being rendered.
    ///
    /// Cleanups then run when Leptos cleans the component up. Dropping the
    /// scope does not dispose it.
    pub fn current() -> Option<Self> {
        Owner::current().map(|owner| Self::wrap(owner, false))
    }

    fn wrap(owner: Owner, owned: bool) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                owner,
                disposed: Cell::new(false),
                owned,
            }),
        }
    }

    /// The underlying reactive owner.
    pub fn owner(&self) -> &Owner {
        &self.inner.owner
    }

    /// Register work to run on disposal.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            cleanup();
            return;
        }
        // Leptos cleanups must be Send; ours stay on the thread that made them.
        let cleanup = SendWrapper::new(cleanup);
        self.inner.owner.with(|| on_cleanup(move || (cleanup.take())()));
    }

    /// Run every cleanup.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        tracing::trace!("disposing scope");
        self.owner.cleanup();
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.owned {
            self.dispose();
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("disposed", &self.inner.disposed.get())
            .field("owned", &self.inner.owned)
            .finish()
    }
}
