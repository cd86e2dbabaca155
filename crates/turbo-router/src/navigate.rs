//! Navigation traits and options.

use std::fmt;
use std::rc::Rc;

use leptos_router::hooks::use_navigate;
pub use leptos_router::NavigateOptions;

/// Options for a push navigation.
pub fn push_options() -> NavigateOptions {
    NavigateOptions::default()
}

/// Options for a replace navigation.
pub fn replace_options() -> NavigateOptions {
    NavigateOptions {
        replace: true,
        ..NavigateOptions::default()
    }
}

/// Client-side router navigation.
pub trait Navigator {
    /// Navigate to an origin-relative path.
    fn navigate(&self, to: &str, options: NavigateOptions);
}

/// Full document navigation.
pub trait DocumentLocation {
    /// Load `href` as a new document.
    fn assign(&self, href: &str);
}

/// A [`Navigator`] driving a `leptos_router` router.
#[derive(Clone)]
pub struct RouterNavigator {
    navigate: Rc<dyn Fn(&str, NavigateOptions)>,
}

impl RouterNavigator {
    /// The navigator of the enclosing `<Router>`.
    ///
    /// Call during component setup, where the router context is available.
    pub fn use_router() -> Self {
        Self::new(use_navigate())
    }

    /// Wrap a navigate function such as the one returned by `use_navigate`.
    pub fn new(navigate: impl Fn(&str, NavigateOptions) + 'static) -> Self {
        Self {
            navigate: Rc::new(navigate),
        }
    }
}

impl Navigator for RouterNavigator {
    fn navigate(&self, to: &str, options: NavigateOptions) {
        tracing::debug!(to, replace = options.replace, "router navigation");
        (self.navigate)(to, options);
    }
}

impl fmt::Debug for RouterNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterNavigator").finish_non_exhaustive()
    }
}

/// Whether `target` is a path on the current origin.
///
/// Only paths starting with a single `/` qualify; protocol-relative URLs
/// (`//host/path`) point at another origin.
pub fn is_same_origin_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}
