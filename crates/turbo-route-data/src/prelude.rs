//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_route_data::prelude::*;
//! ```

pub use crate::{
    create_route_data, redirect, refetch_route_data, ClientEvent, ClientRuntime, KeySource,
    LocalScheduler, PageEvent, RefetchInfo, RouteData, RouteDataError, RouteDataEvent,
    RouteDataOptions, RouteValue, Runtime, Scheduler, Scope, TaskQueue,
};
