//! Where route data runs: server rendering or the client.

use std::fmt;
use std::rc::Rc;

use turbo_router::{DocumentLocation, Navigator};

use crate::event::{ClientEvent, PageEvent, RouteDataEvent};
use crate::schedule::Scheduler;

/// Server rendering of one request.
#[derive(Clone)]
pub struct ServerRuntime {
    page: Rc<PageEvent>,
    navigator: Option<Rc<dyn Navigator>>,
}

impl ServerRuntime {
    /// Run against the page event of the current request.
    pub fn new(page: Rc<PageEvent>) -> Self {
        Self {
            page,
            navigator: None,
        }
    }

    /// Router of the server render. Same-origin redirects replace its
    /// location synchronously.
    pub fn with_navigator(mut self, navigator: Rc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// The page event.
    pub fn page(&self) -> &PageEvent {
        &self.page
    }

    /// Router of the server render, if the host supplied one.
    pub fn navigator(&self) -> Option<&dyn Navigator> {
        self.navigator.as_deref()
    }
}

/// A client session with a router, a document and a scheduler.
#[derive(Clone)]
pub struct ClientRuntime {
    event: ClientEvent,
    navigator: Rc<dyn Navigator>,
    location: Rc<dyn DocumentLocation>,
    scheduler: Rc<dyn Scheduler>,
}

impl ClientRuntime {
    /// Create a client runtime.
    pub fn new(
        navigator: Rc<dyn Navigator>,
        location: Rc<dyn DocumentLocation>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            event: ClientEvent::default(),
            navigator,
            location,
            scheduler,
        }
    }

    /// Set the ambient client context passed to fetchers.
    pub fn with_event(mut self, event: ClientEvent) -> Self {
        self.event = event;
        self
    }

    /// Client-side router.
    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// Document location for full navigations.
    pub fn location(&self) -> &dyn DocumentLocation {
        self.location.as_ref()
    }

    /// Deferral of side effects.
    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }
}

/// The context route data is created in.
#[derive(Clone)]
pub enum Runtime {
    /// Server rendering.
    Server(ServerRuntime),
    /// Client session.
    Client(ClientRuntime),
}

impl Runtime {
    /// Server runtime for a page event.
    pub fn server(page: Rc<PageEvent>) -> Self {
        Self::Server(ServerRuntime::new(page))
    }

    /// Client runtime.
    pub fn client(runtime: ClientRuntime) -> Self {
        Self::Client(runtime)
    }

    /// Whether this is server rendering.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Build the event a fetcher is called with.
    pub fn event(&self) -> RouteDataEvent {
        match self {
            Self::Server(server) => RouteDataEvent::Server(server.page.route_data_event()),
            Self::Client(client) => RouteDataEvent::Client(client.event.clone()),
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(server) => f.debug_tuple("Server").field(&server.page).finish(),
            Self::Client(client) => f.debug_tuple("Client").field(&client.event).finish(),
        }
    }
}
