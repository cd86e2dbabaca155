//! Route-level data loading for TurboCommerce.
//!
//! A route declares its data with [`create_route_data`]: a key source and an
//! async fetcher. The resulting [`RouteData`] caches one value per route and
//!
//! - intercepts redirect responses, whether the fetcher returns or throws
//!   them, and turns them into navigation (client) or page response status
//!   and headers (server),
//! - reconciles each fetched value structurally into a [`ReconcilingCell`],
//!   so path observers only fire for paths that changed,
//! - registers itself in a [`RefetchRegistry`] so [`refetch_route_data`] can
//!   refresh every instance whose key partially matches a pattern.
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_route_data::prelude::*;
//! use serde_json::json;
//!
//! let data = create_route_data(
//!     &scope,
//!     runtime,
//!     |key: serde_json::Value, event: RouteDataEvent| async move {
//!         let Some(session) = event.env().get("SESSION") else {
//!             return Err(redirect("/login").into());
//!         };
//!         Ok(RouteValue::Data(load_cart(session, &key).await?))
//!     },
//!     RouteDataOptions::new(KeySource::fixed(json!({ "cart": 1 }))),
//! )?;
//! data.load().await;
//!
//! // Elsewhere, after adding an item:
//! refetch_route_data(Some(json!({ "cart": 1 }))).await;
//! ```

pub mod config;
mod error;
mod event;
mod key;
pub mod logging;
mod redirect;
mod registry;
mod resource;
mod runtime;
mod schedule;
mod scope;
pub mod store;

pub mod prelude;

pub use config::RouteDataConfig;
pub use error::RouteDataError;
pub use event::{ClientEvent, Env, EventKind, PageEvent, PageResponse, RouteDataEvent, ServerEvent};
pub use key::{key_value, partial_match, KeySource};
pub use logging::LogFormat;
pub use redirect::{
    redirect, redirect_with_status, Outcome, RedirectInterceptor, RedirectPolicy, RouteValue,
};
pub use registry::{refetch_route_data, HandleId, Refetch, RefetchInfo, RefetchRegistry};
pub use resource::{create_route_data, ResourceState, RouteData, RouteDataOptions};
pub use runtime::{ClientRuntime, Runtime, ServerRuntime};
pub use schedule::{LocalScheduler, Scheduler, Task, TaskQueue};
pub use scope::Scope;
pub use store::{
    Change, ChangeKind, Path, PathSegment, ReconcileOptions, ReconcilingCell, Subscription,
};
