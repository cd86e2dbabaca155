//! Route data instances.
//!
//! A [`RouteData`] owns one cached value for one route. It fetches through
//! the user fetcher, passes every outcome through the redirect interceptor
//! and stores data through a [`ReconcilingCell`] so path observers only fire
//! for paths that actually changed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture};
use serde::Serialize;
use serde_json::Value;
use turbo_data::Response;

use crate::config::RouteDataConfig;
use crate::error::RouteDataError;
use crate::event::RouteDataEvent;
use crate::key::{key_value, partial_match, KeySource};
use crate::redirect::{Outcome, RedirectInterceptor, RedirectPolicy, RouteValue};
use crate::registry::{Refetch, RefetchInfo, RefetchRegistry};
use crate::runtime::Runtime;
use crate::scope::Scope;
use crate::store::{ReconcileOptions, ReconcilingCell};

type BoxedFetcher<S, T> =
    Rc<dyn Fn(S, RouteDataEvent) -> LocalBoxFuture<'static, Result<RouteValue<T>, RouteDataError>>>;

/// Lifecycle of a route data instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing fetched and no initial value.
    Unresolved,
    /// First fetch in flight.
    Pending,
    /// A value or response is available.
    Ready,
    /// A fetch is in flight and an earlier result is still available.
    Refreshing,
    /// The latest fetch failed.
    Errored,
}

/// Options for [`create_route_data`].
pub struct RouteDataOptions<S, T> {
    key: KeySource<S>,
    initial_value: Option<T>,
    name: Option<String>,
    reconcile: ReconcileOptions,
    redirects: RedirectPolicy,
    registry: Option<Rc<RefetchRegistry>>,
}

impl<T> Default for RouteDataOptions<bool, T> {
    fn default() -> Self {
        Self::new(KeySource::fixed(true))
    }
}

impl<S, T> RouteDataOptions<S, T> {
    /// Options with the given key source.
    pub fn new(key: KeySource<S>) -> Self {
        Self {
            key,
            initial_value: None,
            name: None,
            reconcile: ReconcileOptions::default(),
            redirects: RedirectPolicy::default(),
            registry: None,
        }
    }

    /// Replace the key source, possibly changing the key type.
    pub fn key<K>(self, key: KeySource<K>) -> RouteDataOptions<K, T> {
        RouteDataOptions {
            key,
            initial_value: self.initial_value,
            name: self.name,
            reconcile: self.reconcile,
            redirects: self.redirects,
            registry: self.registry,
        }
    }

    /// Value available before the first fetch resolves.
    pub fn initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Name used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reconcile options for the value cell.
    pub fn reconcile(mut self, options: ReconcileOptions) -> Self {
        self.reconcile = options;
        self
    }

    /// Which statuses are treated as redirects.
    pub fn redirects(mut self, policy: RedirectPolicy) -> Self {
        self.redirects = policy;
        self
    }

    /// Register with `registry` instead of the thread's global registry.
    pub fn registry(mut self, registry: Rc<RefetchRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Apply configured reconcile and redirect settings.
    pub fn with_config(self, config: &RouteDataConfig) -> Self {
        let redirects = config.redirect_policy();
        self.reconcile(config.reconcile.clone()).redirects(redirects)
    }
}

impl<S: fmt::Debug, T> fmt::Debug for RouteDataOptions<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDataOptions")
            .field("key", &self.key)
            .field("initial_value", &self.initial_value.is_some())
            .field("name", &self.name)
            .field("reconcile", &self.reconcile)
            .field("redirects", &self.redirects)
            .finish()
    }
}

struct State<S> {
    phase: ResourceState,
    response: Option<Response>,
    error: Option<Rc<RouteDataError>>,
    key: Option<S>,
    key_value: Option<Value>,
    loaded: bool,
}

struct Inner<S, T> {
    key: KeySource<S>,
    fetcher: BoxedFetcher<S, T>,
    runtime: Runtime,
    interceptor: RedirectInterceptor,
    cell: ReconcilingCell<Option<T>>,
    state: RefCell<State<S>>,
    seq: Cell<u64>,
    name: String,
}

/// A cached, observable value for one route.
///
/// Cloning yields another handle to the same instance.
pub struct RouteData<S, T> {
    inner: Rc<Inner<S, T>>,
}

impl<S, T> Clone for RouteData<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Create route data owned by `scope`.
///
/// On a client runtime the instance is added to the refetch registry and
/// removed again when `scope` is disposed. Nothing is fetched until
/// [`RouteData::load`] is called.
pub fn create_route_data<S, T, F, Fut>(
    scope: &Scope,
    runtime: Runtime,
    fetcher: F,
    options: RouteDataOptions<S, T>,
) -> Result<RouteData<S, T>, RouteDataError>
where
    S: Serialize + Clone + 'static,
    T: Serialize + Clone + 'static,
    F: Fn(S, RouteDataEvent) -> Fut + 'static,
    Fut: Future<Output = Result<RouteValue<T>, RouteDataError>> + 'static,
{
    let RouteDataOptions {
        key,
        initial_value,
        name,
        reconcile,
        redirects,
        registry,
    } = options;

    let phase = if initial_value.is_some() {
        ResourceState::Ready
    } else {
        ResourceState::Unresolved
    };
    let cell = ReconcilingCell::with_options(initial_value, reconcile)?;
    let fetcher: BoxedFetcher<S, T> = Rc::new(move |key, event| fetcher(key, event).boxed_local());

    let inner = Rc::new(Inner {
        key,
        fetcher,
        interceptor: RedirectInterceptor::new(runtime.clone(), redirects),
        runtime,
        cell,
        state: RefCell::new(State {
            phase,
            response: None,
            error: None,
            key: None,
            key_value: None,
            loaded: false,
        }),
        seq: Cell::new(0),
        name: name.unwrap_or_else(|| "route_data".to_string()),
    });

    if !inner.runtime.is_server() {
        let registry = registry.unwrap_or_else(RefetchRegistry::global);
        let handle = Rc::new(RefetchHandle {
            inner: Rc::downgrade(&inner),
        });
        let id = registry.register(handle);
        scope.on_cleanup(move || registry.unregister(id));
    }

    tracing::debug!(name = %inner.name, server = inner.runtime.is_server(), "created route data");
    Ok(RouteData { inner })
}

impl<S, T> RouteData<S, T>
where
    S: Serialize + Clone + 'static,
    T: Serialize + Clone + 'static,
{
    /// Evaluate the key and fetch if this is the first load or the key
    /// changed. Keys meaning "do not fetch" leave the instance untouched.
    pub async fn load(&self) {
        let Some((key, value)) = self.inner.resolve_key() else {
            return;
        };

        let unchanged = {
            let state = self.inner.state.borrow();
            state.loaded && state.key_value.as_ref() == Some(&value)
        };
        if unchanged {
            return;
        }
        Inner::attempt(Rc::clone(&self.inner), key, value).await;
    }

    /// Fetch again with the current key.
    ///
    /// The key source is evaluated again, so a derived key that moved since
    /// the last load is fetched with its new value. Does nothing before the
    /// first load, or when the key now means "do not fetch". A `Matching`
    /// request whose pattern does not match the key is a no-op on every
    /// runtime.
    pub async fn refetch(&self, info: RefetchInfo) {
        Inner::refetch(Rc::clone(&self.inner), info).await;
    }

    /// The stored data.
    ///
    /// `None` before anything is loaded and after the latest fetch resolved
    /// to a response; [`RouteData::latest`] returns that response.
    pub fn get(&self) -> Option<T> {
        self.inner.cell.read()
    }

    /// What the latest successful fetch resolved to: the response if one was
    /// returned, otherwise the stored data.
    pub fn latest(&self) -> Option<RouteValue<T>> {
        if let Some(response) = self.inner.state.borrow().response.clone() {
            return Some(RouteValue::Response(response));
        }
        self.get().map(RouteValue::Data)
    }

    /// The response the latest fetch resolved to, if it was one.
    pub fn response(&self) -> Option<Response> {
        self.inner.state.borrow().response.clone()
    }

    /// The error of the latest fetch.
    pub fn error(&self) -> Option<Rc<RouteDataError>> {
        self.inner.state.borrow().error.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ResourceState {
        self.inner.state.borrow().phase
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> bool {
        matches!(
            self.state(),
            ResourceState::Pending | ResourceState::Refreshing
        )
    }

    /// The last requested key, in comparable form.
    pub fn key(&self) -> Option<Value> {
        self.inner.state.borrow().key_value.clone()
    }

    /// The value cell, for path subscriptions.
    pub fn store(&self) -> ReconcilingCell<Option<T>> {
        self.inner.cell.clone()
    }

    /// Write a value locally without fetching.
    pub fn mutate(&self, value: T) -> Result<Option<T>, RouteDataError> {
        {
            let mut state = self.inner.state.borrow_mut();
            state.response = None;
            state.error = None;
            if !matches!(state.phase, ResourceState::Pending | ResourceState::Refreshing) {
                state.phase = ResourceState::Ready;
            }
        }
        Ok(self.inner.cell.write(Some(value))?)
    }

    /// The name used in log events.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl<S, T> Inner<S, T>
where
    S: Serialize + Clone + 'static,
    T: Serialize + Clone + 'static,
{
    async fn refetch(this: Rc<Self>, info: RefetchInfo) {
        if !this.state.borrow().loaded {
            return;
        }
        let Some((key, value)) = this.resolve_key() else {
            return;
        };

        if let RefetchInfo::Matching(pattern) = &info {
            if !partial_match(&value, pattern) {
                tracing::trace!(
                    name = %this.name,
                    key = %value,
                    pattern = %pattern,
                    "refetch skipped"
                );
                return;
            }
        }
        Self::attempt(this, key, value).await;
    }

    fn resolve_key(&self) -> Option<(S, Value)> {
        let Some(key) = self.key.resolve() else {
            tracing::trace!(name = %self.name, "no key, not fetching");
            return None;
        };
        match key_value(&key) {
            Ok(Some(value)) => Some((key, value)),
            Ok(None) => {
                tracing::trace!(name = %self.name, "falsy key, not fetching");
                None
            }
            Err(err) => {
                self.fail(err.into());
                None
            }
        }
    }

    async fn attempt(this: Rc<Self>, key: S, value: Value) {
        let seq = this.seq.get() + 1;
        this.seq.set(seq);
        {
            let mut state = this.state.borrow_mut();
            let has_result = state.response.is_some() || this.cell.with(Option::is_some);
            state.phase = if has_result {
                ResourceState::Refreshing
            } else {
                ResourceState::Pending
            };
            state.key = Some(key.clone());
            state.key_value = Some(value.clone());
            state.loaded = true;
        }

        tracing::debug!(name = %this.name, key = %value, seq, "fetching route data");
        let result = (this.fetcher)(key, this.runtime.event()).await;
        let resolved = this.interceptor.handle(Outcome::from_result(result));

        if this.seq.get() != seq {
            tracing::debug!(
                name = %this.name,
                seq,
                latest = this.seq.get(),
                "discarding superseded result"
            );
            return;
        }

        match resolved {
            Ok(RouteValue::Data(data)) => this.store(Some(data), None),
            Ok(RouteValue::Response(response)) => this.store(None, Some(response)),
            Err(err) => this.fail(err),
        }
    }

    /// Settle the state, then write the cell. Cell observers see `Ready`.
    fn store(&self, data: Option<T>, response: Option<Response>) {
        {
            let mut state = self.state.borrow_mut();
            state.phase = ResourceState::Ready;
            state.response = response;
            state.error = None;
        }
        if let Err(err) = self.cell.write(data) {
            self.fail(err.into());
        }
    }

    fn fail(&self, err: RouteDataError) {
        tracing::warn!(name = %self.name, error = %err, "route data fetch failed");
        let mut state = self.state.borrow_mut();
        state.phase = ResourceState::Errored;
        state.error = Some(Rc::new(err));
    }
}

struct RefetchHandle<S, T> {
    inner: Weak<Inner<S, T>>,
}

impl<S, T> Refetch for RefetchHandle<S, T>
where
    S: Serialize + Clone + 'static,
    T: Serialize + Clone + 'static,
{
    fn refetch(&self, info: RefetchInfo) -> LocalBoxFuture<'static, ()> {
        match self.inner.upgrade() {
            Some(inner) => Inner::refetch(inner, info).boxed_local(),
            None => futures::future::ready(()).boxed_local(),
        }
    }
}

impl<S, T: fmt::Debug> fmt::Debug for RouteData<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("RouteData")
            .field("name", &self.inner.name)
            .field("state", &state.phase)
            .field("key", &state.key_value)
            .field("value", &self.inner.cell)
            .finish()
    }
}
