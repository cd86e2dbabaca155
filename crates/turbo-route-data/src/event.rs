//! Execution contexts handed to fetchers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use turbo_data::{Fetch, Headers, Request, StatusCode};

/// Environment bindings visible to fetchers (secrets, upstream URLs, flags).
pub type Env = HashMap<String, String>;

/// Distinguishes a route data event from a full page event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The full page context owned by the hosting layer.
    Page,
    /// The read-only view given to route data fetchers.
    RouteData,
}

/// Status and headers of the page response being rendered on the server.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// Status code that will be sent.
    pub status: StatusCode,
    /// Headers that will be sent.
    pub headers: Headers,
}

impl Default for PageResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Headers::new(),
        }
    }
}

/// Server-side page context, supplied by the request-handling layer.
///
/// Owns the mutable page response. Fetchers never see this type; they get
/// the [`ServerEvent`] view from [`PageEvent::route_data_event`].
pub struct PageEvent {
    request: Rc<Request>,
    env: Rc<Env>,
    fetch: Rc<dyn Fetch>,
    response: RefCell<PageResponse>,
}

impl PageEvent {
    /// Create a page event for an incoming request.
    pub fn new(request: Request, env: Env, fetch: Rc<dyn Fetch>) -> Self {
        Self {
            request: Rc::new(request),
            env: Rc::new(env),
            fetch,
            response: RefCell::new(PageResponse::default()),
        }
    }

    /// Always [`EventKind::Page`].
    pub fn kind(&self) -> EventKind {
        EventKind::Page
    }

    /// The incoming request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Snapshot of the page response.
    pub fn response(&self) -> PageResponse {
        self.response.borrow().clone()
    }

    /// Set the page response status.
    pub fn set_status(&self, status: StatusCode) {
        self.response.borrow_mut().status = status;
    }

    /// Set a page response header, replacing earlier values for that name.
    pub fn set_header(&self, name: &str, value: &str) {
        self.response.borrow_mut().headers.set(name, value);
    }

    /// Build the read-only view handed to route data fetchers.
    pub fn route_data_event(&self) -> ServerEvent {
        ServerEvent {
            request: Rc::clone(&self.request),
            env: Rc::clone(&self.env),
            fetch: Rc::clone(&self.fetch),
        }
    }
}

impl fmt::Debug for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEvent")
            .field("request", &self.request.url)
            .field("response", &self.response.borrow())
            .finish_non_exhaustive()
    }
}

/// Read-only server context: `request`, `env` and `fetch`.
///
/// There is no path from this view back to the page response.
#[derive(Clone)]
pub struct ServerEvent {
    request: Rc<Request>,
    env: Rc<Env>,
    fetch: Rc<dyn Fetch>,
}

impl ServerEvent {
    /// Always [`EventKind::RouteData`].
    pub fn kind(&self) -> EventKind {
        EventKind::RouteData
    }

    /// The incoming request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Environment bindings.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Outbound transport.
    pub fn fetch(&self) -> &dyn Fetch {
        self.fetch.as_ref()
    }
}

impl fmt::Debug for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEvent")
            .field("request", &self.request.url)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Ambient client context.
#[derive(Clone, Default)]
pub struct ClientEvent {
    env: Rc<Env>,
    fetch: Option<Rc<dyn Fetch>>,
}

impl ClientEvent {
    /// Create a client context.
    pub fn new(env: Env) -> Self {
        Self {
            env: Rc::new(env),
            fetch: None,
        }
    }

    /// Attach an outbound transport.
    pub fn with_fetch(mut self, fetch: Rc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Environment bindings.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Outbound transport, if the host provided one.
    pub fn fetch(&self) -> Option<&dyn Fetch> {
        self.fetch.as_deref()
    }
}

impl fmt::Debug for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientEvent")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("fetch", &self.fetch.is_some())
            .finish()
    }
}

/// The context a fetcher runs with.
#[derive(Debug, Clone)]
pub enum RouteDataEvent {
    /// Running during server rendering.
    Server(ServerEvent),
    /// Running in the client.
    Client(ClientEvent),
}

impl RouteDataEvent {
    /// Whether the fetcher runs on the server.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Environment bindings.
    pub fn env(&self) -> &Env {
        match self {
            Self::Server(event) => event.env(),
            Self::Client(event) => event.env(),
        }
    }

    /// Outbound transport, if any.
    pub fn fetch(&self) -> Option<&dyn Fetch> {
        match self {
            Self::Server(event) => Some(event.fetch()),
            Self::Client(event) => event.fetch(),
        }
    }

    /// The incoming request. Only present on the server.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Self::Server(event) => Some(event.request()),
            Self::Client(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use turbo_data::{FetchError, Response};

    struct Offline;

    #[async_trait(?Send)]
    impl Fetch for Offline {
        async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
            Err(FetchError::unreachable(request.url, "offline"))
        }
    }

    fn page() -> PageEvent {
        let env = Env::from([("API_URL".to_string(), "https://api.test".to_string())]);
        PageEvent::new(Request::get("https://shop.test/products/7"), env, Rc::new(Offline))
    }

    #[test]
    fn test_route_data_event_is_read_only_view() {
        let page = page();
        let event = page.route_data_event();

        assert_eq!(page.kind(), EventKind::Page);
        assert_eq!(event.kind(), EventKind::RouteData);
        assert_eq!(event.request().path(), "/products/7");
        assert_eq!(event.env().get("API_URL").map(String::as_str), Some("https://api.test"));
    }

    #[test]
    fn test_page_event_response_mutation() {
        let page = page();
        assert_eq!(page.response().status, StatusCode::OK);

        page.set_status(StatusCode::FOUND);
        page.set_header("Location", "/a");
        page.set_header("location", "/b");

        let response = page.response();
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.headers.get("Location"), Some("/b"));
        assert_eq!(response.headers.len(), 1);
    }

    #[test]
    fn test_route_data_event_accessors() {
        let server = RouteDataEvent::Server(page().route_data_event());
        assert!(server.is_server());
        assert!(server.request().is_some());
        assert!(server.fetch().is_some());

        let client = RouteDataEvent::Client(ClientEvent::new(Env::new()));
        assert!(!client.is_server());
        assert!(client.request().is_none());
        assert!(client.fetch().is_none());
    }
}
