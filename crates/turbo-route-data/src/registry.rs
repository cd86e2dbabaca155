//! Cross-instance refetch registry.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{join_all, LocalBoxFuture};
use serde_json::Value;

/// Which instances a refetch is meant for.
#[derive(Debug, Clone, PartialEq)]
pub enum RefetchInfo {
    /// Every instance.
    All,
    /// Instances whose key partially matches the pattern.
    Matching(Value),
}

impl RefetchInfo {
    /// `None` means all instances.
    pub fn from_match_key(match_key: Option<Value>) -> Self {
        match match_key {
            Some(pattern) => Self::Matching(pattern),
            None => Self::All,
        }
    }

    /// The pattern, if any.
    pub fn pattern(&self) -> Option<&Value> {
        match self {
            Self::All => None,
            Self::Matching(pattern) => Some(pattern),
        }
    }
}

/// Something that can be asked to refetch.
pub trait Refetch {
    /// Refetch if `info` applies. The future completes when the attempt has
    /// been handled, including when it was skipped.
    fn refetch(&self, info: RefetchInfo) -> LocalBoxFuture<'static, ()>;
}

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

struct Entry {
    id: HandleId,
    handle: Rc<dyn Refetch>,
    active: Cell<bool>,
}

/// The set of refetch handles of live route data instances.
///
/// Membership is snapshotted when a refetch starts; entries removed before
/// their turn are skipped.
#[derive(Default)]
pub struct RefetchRegistry {
    entries: RefCell<Vec<Rc<Entry>>>,
    next_id: Cell<u64>,
}

thread_local! {
    static GLOBAL: Rc<RefetchRegistry> = Rc::new(RefetchRegistry::new());
}

impl RefetchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the current thread.
    pub fn global() -> Rc<RefetchRegistry> {
        GLOBAL.with(Rc::clone)
    }

    /// Add a handle.
    pub fn register(&self, handle: Rc<dyn Refetch>) -> HandleId {
        let id = HandleId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push(Rc::new(Entry {
            id,
            handle,
            active: Cell::new(true),
        }));
        tracing::trace!(handle = id.0, "registered refetch handle");
        id
    }

    /// Remove a handle. Removing an absent handle does nothing.
    pub fn unregister(&self, id: HandleId) {
        let mut entries = self.entries.borrow_mut();
        if let Some(pos) = entries.iter().position(|e| e.id == id) {
            let entry = entries.remove(pos);
            entry.active.set(false);
            tracing::trace!(handle = id.0, "unregistered refetch handle");
        }
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: HandleId) -> bool {
        self.entries.borrow().iter().any(|e| e.id == id)
    }

    /// Ask every registered handle to refetch.
    pub fn refetch(&self, info: RefetchInfo) -> impl Future<Output = ()> + 'static {
        let snapshot: Vec<Rc<Entry>> = self.entries.borrow().clone();
        tracing::debug!(
            handles = snapshot.len(),
            pattern = ?info.pattern(),
            "refetching route data"
        );

        async move {
            let pending = snapshot.into_iter().filter_map(|entry| {
                entry
                    .active
                    .get()
                    .then(|| entry.handle.refetch(info.clone()))
            });
            join_all(pending).await;
        }
    }
}

impl fmt::Debug for RefetchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefetchRegistry")
            .field("handles", &self.len())
            .finish()
    }
}

/// Refetch route data across the current thread's registry.
///
/// With `Some(pattern)` only instances whose key partially matches the
/// pattern fetch; with `None` every instance does.
pub fn refetch_route_data(match_key: Option<Value>) -> impl Future<Output = ()> + 'static {
    RefetchRegistry::global().refetch(RefetchInfo::from_match_key(match_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[derive(Default)]
    struct Counter {
        calls: RefCell<Vec<RefetchInfo>>,
    }

    impl Refetch for Counter {
        fn refetch(&self, info: RefetchInfo) -> LocalBoxFuture<'static, ()> {
            self.calls.borrow_mut().push(info);
            Box::pin(async {})
        }
    }

    struct Unregisters {
        registry: Rc<RefetchRegistry>,
        victim: Cell<Option<HandleId>>,
    }

    impl Refetch for Unregisters {
        fn refetch(&self, _info: RefetchInfo) -> LocalBoxFuture<'static, ()> {
            if let Some(id) = self.victim.get() {
                self.registry.unregister(id);
            }
            Box::pin(async {})
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = RefetchRegistry::new();
        let id = registry.register(Rc::new(Counter::default()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(id));

        registry.unregister(id);
        registry.unregister(id);
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_refetch_reaches_every_handle() {
        let registry = RefetchRegistry::new();
        let a = Rc::new(Counter::default());
        let b = Rc::new(Counter::default());
        registry.register(a.clone());
        registry.register(b.clone());

        block_on(registry.refetch(RefetchInfo::Matching(json!({"id": 1}))));

        assert_eq!(*a.calls.borrow(), vec![RefetchInfo::Matching(json!({"id": 1}))]);
        assert_eq!(b.calls.borrow().len(), 1);
    }

    #[test]
    fn test_refetch_skips_handles_removed_mid_iteration() {
        let registry = Rc::new(RefetchRegistry::new());
        let remover = Rc::new(Unregisters {
            registry: registry.clone(),
            victim: Cell::new(None),
        });
        let later = Rc::new(Counter::default());

        registry.register(remover.clone());
        let later_id = registry.register(later.clone());
        remover.victim.set(Some(later_id));

        block_on(registry.refetch(RefetchInfo::All));

        assert!(later.calls.borrow().is_empty());
        assert_eq!(registry.len(), 1);
    }

    struct Registers {
        registry: Rc<RefetchRegistry>,
        added: Rc<Counter>,
    }

    impl Refetch for Registers {
        fn refetch(&self, _info: RefetchInfo) -> LocalBoxFuture<'static, ()> {
            self.registry.register(self.added.clone());
            Box::pin(async {})
        }
    }

    #[test]
    fn test_refetch_skips_handles_added_mid_iteration() {
        let registry = Rc::new(RefetchRegistry::new());
        let added = Rc::new(Counter::default());
        let adder = Rc::new(Registers {
            registry: registry.clone(),
            added: added.clone(),
        });
        let adder_id = registry.register(adder);

        block_on(registry.refetch(RefetchInfo::All));
        assert!(added.calls.borrow().is_empty());
        assert_eq!(registry.len(), 2);

        registry.unregister(adder_id);
        block_on(registry.refetch(RefetchInfo::All));
        assert_eq!(*added.calls.borrow(), vec![RefetchInfo::All]);
    }

    #[test]
    fn test_refetch_on_empty_registry_completes() {
        block_on(RefetchRegistry::new().refetch(RefetchInfo::All));
    }

    #[test]
    fn test_global_registry_is_shared() {
        let counter = Rc::new(Counter::default());
        let id = RefetchRegistry::global().register(counter.clone());

        block_on(refetch_route_data(None));
        RefetchRegistry::global().unregister(id);

        assert_eq!(*counter.calls.borrow(), vec![RefetchInfo::All]);
        assert!(Rc::ptr_eq(&RefetchRegistry::global(), &RefetchRegistry::global()));
    }
}
