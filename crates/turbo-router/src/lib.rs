//! Navigation contract for TurboCommerce.
//!
//! Route data never navigates on its own; it talks to the host through two
//! narrow traits:
//!
//! - [`Navigator`] - client-side router navigation (push or replace).
//!   [`RouterNavigator`] implements it on top of `leptos_router`'s
//!   `use_navigate`.
//! - [`DocumentLocation`] - full document navigation, the equivalent of
//!   assigning `window.location.href`
//!
//! [`MemoryHistory`] implements both in memory. It backs tests and hosts
//! without a browser.
//!
//! # Usage
//!
//! ```rust,ignore
//! use turbo_router::prelude::*;
//!
//! // Inside a component rendered under `<Router>`:
//! let navigator = RouterNavigator::use_router();
//! navigator.navigate("/login", replace_options());
//!
//! // Without a browser:
//! let history = MemoryHistory::new("/products/7");
//! history.navigate("/login", replace_options());
//! assert_eq!(history.current(), "/login");
//! ```

mod history;
mod navigate;
pub mod prelude;

pub use history::*;
pub use navigate::*;
