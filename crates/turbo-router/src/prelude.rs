//! Prelude for convenient imports.
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//! ```

pub use crate::{
    is_same_origin_path, push_options, replace_options, DocumentLocation, HistoryEntry,
    MemoryHistory, NavigateOptions, NavigationType, Navigator, RouterNavigator,
};
