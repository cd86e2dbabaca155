//! Deep-reconciling storage cell.
//!
//! A [`ReconcilingCell`] holds one value. Every write is serialized and
//! reconciled in place against the stored tree, so only the paths that
//! actually changed are patched and only their observers are notified.
//!
//! Notification rules:
//!
//! - a node that is replaced, added or removed notifies observers of that
//!   path and of every path below it;
//! - a record or sequence that keeps its identity but gains or loses
//!   entries gets a [`ChangeKind::Shape`] change, which notifies observers of
//!   exactly that path;
//! - changes below a path never notify that path.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step into a structured value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A record field.
    Key(String),
    /// A sequence index.
    Index(usize),
}

/// Location of a node inside a stored value. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend with a record field.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    /// Extend with a sequence index.
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// The path as a JSON pointer (RFC 6901).
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.0 {
            pointer.push('/');
            match segment {
                PathSegment::Key(k) => pointer.push_str(&k.replace('~', "~0").replace('/', "~1")),
                PathSegment::Index(i) => pointer.push_str(&i.to_string()),
            }
        }
        pointer
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

/// What happened at a path during a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The node was replaced by a different value.
    Replaced,
    /// The node did not exist before.
    Added,
    /// The node no longer exists.
    Removed,
    /// The container kept its identity but its key set or length changed.
    Shape,
}

/// A patch applied by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Where the patch landed.
    pub path: Path,
    /// What kind of patch it was.
    pub kind: ChangeKind,
}

impl Change {
    /// Whether an observer of `observed` must be notified.
    pub fn affects(&self, observed: &Path) -> bool {
        match self.kind {
            ChangeKind::Shape => self.path == *observed,
            _ => self.path.is_prefix_of(observed),
        }
    }
}

/// How sequences are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Identity field for records inside sequences. Two records at the same
    /// index with different identities are replaced instead of merged.
    #[serde(default = "default_identity_key")]
    pub key: Option<String>,
    /// Merge records field by field even when their identities differ.
    #[serde(default)]
    pub merge: bool,
}

fn default_identity_key() -> Option<String> {
    Some("id".to_string())
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            key: default_identity_key(),
            merge: false,
        }
    }
}

impl ReconcileOptions {
    /// Use `key` as the identity field.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Disable identity matching.
    pub fn without_key(mut self) -> Self {
        self.key = None;
        self
    }

    /// Enable or disable merging.
    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    fn same_identity(&self, old: &Value, new: &Value) -> bool {
        if self.merge {
            return true;
        }
        let Some(key) = &self.key else {
            return true;
        };
        match (old.get(key), new.get(key)) {
            (Some(a), Some(b)) if old.is_object() && new.is_object() => a == b,
            _ => true,
        }
    }
}

/// Reconcile `target` in place so it equals `next`, recording every patch.
pub fn reconcile(target: &mut Value, next: Value, options: &ReconcileOptions) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    reconcile_node(target, next, options, &mut path, &mut changes);
    changes
}

fn push(changes: &mut Vec<Change>, path: &[PathSegment], kind: ChangeKind) {
    changes.push(Change {
        path: Path(path.to_vec()),
        kind,
    });
}

fn reconcile_node(
    target: &mut Value,
    next: Value,
    options: &ReconcileOptions,
    path: &mut Vec<PathSegment>,
    changes: &mut Vec<Change>,
) {
    match (target, next) {
        (Value::Object(current), Value::Object(incoming)) => {
            let removed: Vec<String> = current
                .keys()
                .filter(|k| !incoming.contains_key(*k))
                .cloned()
                .collect();
            let mut reshaped = !removed.is_empty();
            for key in removed {
                current.remove(&key);
                path.push(PathSegment::Key(key));
                push(changes, path, ChangeKind::Removed);
                path.pop();
            }

            for (key, value) in incoming {
                path.push(PathSegment::Key(key.clone()));
                match current.get_mut(&key) {
                    Some(existing) => reconcile_node(existing, value, options, path, changes),
                    None => {
                        current.insert(key, value);
                        push(changes, path, ChangeKind::Added);
                        reshaped = true;
                    }
                }
                path.pop();
            }

            if reshaped {
                push(changes, path, ChangeKind::Shape);
            }
        }
        (Value::Array(current), Value::Array(incoming)) => {
            let old_len = current.len();
            let new_len = incoming.len();

            for (i, value) in incoming.into_iter().enumerate() {
                path.push(PathSegment::Index(i));
                if i < old_len {
                    if options.same_identity(&current[i], &value) {
                        reconcile_node(&mut current[i], value, options, path, changes);
                    } else {
                        current[i] = value;
                        push(changes, path, ChangeKind::Replaced);
                    }
                } else {
                    current.push(value);
                    push(changes, path, ChangeKind::Added);
                }
                path.pop();
            }

            if new_len < old_len {
                for i in new_len..old_len {
                    path.push(PathSegment::Index(i));
                    push(changes, path, ChangeKind::Removed);
                    path.pop();
                }
                current.truncate(new_len);
            }

            if new_len != old_len {
                push(changes, path, ChangeKind::Shape);
            }
        }
        (target, next) => {
            if *target != next {
                *target = next;
                push(changes, path, ChangeKind::Replaced);
            }
        }
    }
}

struct Observer {
    id: u64,
    path: Path,
    callback: Rc<dyn Fn()>,
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<Observer>,
}

struct CellInner<T> {
    value: RefCell<T>,
    tree: RefCell<Value>,
    observers: Rc<RefCell<Observers>>,
    options: ReconcileOptions,
    revision: Cell<u64>,
}

/// A storage cell whose writes are reconciled structurally.
///
/// Cloning the cell clones the handle; clones share the same value and
/// observers. The cell is single-threaded.
pub struct ReconcilingCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for ReconcilingCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Serialize + Clone> ReconcilingCell<T> {
    /// Create a cell with default reconcile options.
    pub fn new(initial: T) -> Result<Self, serde_json::Error> {
        Self::with_options(initial, ReconcileOptions::default())
    }

    /// Create a cell with explicit reconcile options.
    pub fn with_options(initial: T, options: ReconcileOptions) -> Result<Self, serde_json::Error> {
        let tree = serde_json::to_value(&initial)?;
        Ok(Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(initial),
                tree: RefCell::new(tree),
                observers: Rc::new(RefCell::new(Observers::default())),
                options,
                revision: Cell::new(0),
            }),
        })
    }

    /// Current value.
    pub fn read(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// `f` must not write to this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Current value of one path, in its serialized form.
    pub fn read_path(&self, path: &Path) -> Option<Value> {
        self.inner.tree.borrow().pointer(&path.to_pointer()).cloned()
    }

    /// Number of writes that changed anything.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// Reconcile `next` into the cell and return the stored value.
    pub fn write(&self, next: T) -> Result<T, serde_json::Error> {
        self.write_reporting(next).map(|(value, _)| value)
    }

    /// Compute the next value from the current one, then write it.
    pub fn write_with(&self, update: impl FnOnce(&T) -> T) -> Result<T, serde_json::Error> {
        let next = {
            let current = self.inner.value.borrow();
            update(&current)
        };
        self.write(next)
    }

    /// Write and also return the patches that were applied.
    pub fn write_reporting(&self, next: T) -> Result<(T, Vec<Change>), serde_json::Error> {
        let incoming = serde_json::to_value(&next)?;
        let changes = {
            let mut tree = self.inner.tree.borrow_mut();
            reconcile(&mut tree, incoming, &self.inner.options)
        };
        *self.inner.value.borrow_mut() = next;

        if !changes.is_empty() {
            self.inner.revision.set(self.inner.revision.get() + 1);
            tracing::trace!(changes = changes.len(), "reconciled write");
            self.notify(&changes);
        }
        Ok((self.read(), changes))
    }

    /// Observe one path. Dropping the returned subscription stops it.
    pub fn subscribe(&self, path: Path, callback: impl Fn() + 'static) -> Subscription {
        let mut observers = self.inner.observers.borrow_mut();
        let id = observers.next_id;
        observers.next_id += 1;
        observers.entries.push(Observer {
            id,
            path,
            callback: Rc::new(callback),
        });
        let weak: Weak<RefCell<Observers>> = Rc::downgrade(&self.inner.observers);
        Subscription { id, observers: weak }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().entries.len()
    }

    fn notify(&self, changes: &[Change]) {
        // Collect first so callbacks may read, write or subscribe.
        let due: Vec<Rc<dyn Fn()>> = self
            .inner
            .observers
            .borrow()
            .entries
            .iter()
            .filter(|o| changes.iter().any(|c| c.affects(&o.path)))
            .map(|o| Rc::clone(&o.callback))
            .collect();
        for callback in due {
            callback();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReconcilingCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcilingCell")
            .field("value", &self.inner.value.borrow())
            .field("revision", &self.inner.revision.get())
            .finish()
    }
}

/// Handle for a path observer.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
    id: u64,
    observers: Weak<RefCell<Observers>>,
}

impl Subscription {
    /// Stop observing.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.borrow_mut().entries.retain(|o| o.id != self.id);
        }
    }
}
