//! Redirect interception.
//!
//! A fetcher can answer with a redirect instead of data, either by returning
//! it or by throwing it. Either way the redirect never becomes the route's
//! data or error: on the client it becomes a navigation, on the server it is
//! copied onto the page response (and replaces the server router's location
//! when the host supplied one).

use serde::{Deserialize, Serialize};
use turbo_data::{Response, StatusCode};
use turbo_router::{is_same_origin_path, replace_options};

use crate::error::RouteDataError;
use crate::runtime::{ClientRuntime, Runtime, ServerRuntime};

/// What a fetcher resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteValue<T> {
    /// Data for the route.
    Data(T),
    /// A response returned in place of data.
    Response(Response),
}

impl<T> RouteValue<T> {
    /// The data, if this is data.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Response(_) => None,
        }
    }

    /// The response, if this is a response.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Data(_) => None,
            Self::Response(response) => Some(response),
        }
    }
}

impl<T> From<Response> for RouteValue<T> {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// The four ways a fetch attempt can end.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Plain data.
    Value(T),
    /// A response returned as the value.
    Returned(Response),
    /// A response raised as an error.
    Thrown(Response),
    /// Any other failure.
    Failure(RouteDataError),
}

impl<T> Outcome<T> {
    /// Classify a fetcher result.
    pub fn from_result(result: Result<RouteValue<T>, RouteDataError>) -> Self {
        match result {
            Ok(RouteValue::Data(data)) => Self::Value(data),
            Ok(RouteValue::Response(response)) => Self::Returned(response),
            Err(RouteDataError::Response(response)) => Self::Thrown(response),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Which statuses count as redirects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectPolicy {
    /// Any 3xx status.
    #[default]
    AnyRedirection,
    /// Only the listed statuses.
    Statuses(Vec<u16>),
}

impl RedirectPolicy {
    /// Build a policy from configured statuses. An empty list means any 3xx.
    pub fn from_statuses(statuses: &[u16]) -> Self {
        if statuses.is_empty() {
            Self::AnyRedirection
        } else {
            Self::Statuses(statuses.to_vec())
        }
    }

    /// Whether `response` is a redirect under this policy.
    pub fn is_redirect(&self, response: &Response) -> bool {
        match self {
            Self::AnyRedirection => response.status.is_redirection(),
            Self::Statuses(statuses) => statuses.contains(&response.status.as_u16()),
        }
    }
}

/// Turns redirect outcomes into navigation or page response changes.
#[derive(Debug, Clone)]
pub struct RedirectInterceptor {
    runtime: Runtime,
    policy: RedirectPolicy,
}

impl RedirectInterceptor {
    /// Create an interceptor for a runtime.
    pub fn new(runtime: Runtime, policy: RedirectPolicy) -> Self {
        Self { runtime, policy }
    }

    /// The redirect policy in use.
    pub fn policy(&self) -> &RedirectPolicy {
        &self.policy
    }

    /// Resolve an outcome. Redirects always come back as
    /// `Ok(RouteValue::Response(..))`; client side effects run on a later
    /// turn, server side effects have run by the time this returns.
    pub fn handle<T>(&self, outcome: Outcome<T>) -> Result<RouteValue<T>, RouteDataError> {
        match outcome {
            Outcome::Value(data) => Ok(RouteValue::Data(data)),
            Outcome::Failure(err) => Err(err),
            Outcome::Returned(response) | Outcome::Thrown(response)
                if self.policy.is_redirect(&response) =>
            {
                self.intercept(&response);
                Ok(RouteValue::Response(response))
            }
            Outcome::Returned(response) => Ok(RouteValue::Response(response)),
            Outcome::Thrown(response) => Err(RouteDataError::Response(response)),
        }
    }

    fn intercept(&self, response: &Response) {
        let target = response.location().map(str::to_string);
        tracing::debug!(
            status = response.status.as_u16(),
            location = target.as_deref(),
            server = self.runtime.is_server(),
            "intercepted redirect"
        );

        if target.is_none() {
            tracing::warn!(
                status = response.status.as_u16(),
                "redirect without a Location header"
            );
        }

        match (&self.runtime, target) {
            (Runtime::Server(server), target) => {
                if let Some(target) = target {
                    navigate_on_server(server, &target);
                }
                copy_to_page(server, response);
            }
            (Runtime::Client(client), Some(target)) => schedule_navigation(client, target),
            (Runtime::Client(_), None) => {}
        }
    }
}

fn navigate_on_server(server: &ServerRuntime, target: &str) {
    match server.navigator() {
        Some(navigator) if is_same_origin_path(target) => {
            navigator.navigate(target, replace_options());
        }
        _ => {}
    }
}

fn copy_to_page(server: &ServerRuntime, response: &Response) {
    let page = server.page();
    page.set_status(response.status);
    for (name, value) in response.headers.iter() {
        page.set_header(name, value);
    }
}

fn schedule_navigation(client: &ClientRuntime, target: String) {
    let runtime = client.clone();
    client.scheduler().defer(Box::new(move || {
        if is_same_origin_path(&target) {
            let router = runtime.clone();
            runtime.scheduler().transition(Box::new(move || {
                router.navigator().navigate(&target, replace_options());
            }));
        } else {
            runtime.location().assign(&target);
        }
    }));
}

/// Build a `302 Found` redirect response for a fetcher to return or throw.
pub fn redirect(location: impl Into<String>) -> Response {
    Response::redirect(location)
}

/// Build a redirect response with an explicit status.
pub fn redirect_with_status(location: impl Into<String>, status: StatusCode) -> Response {
    Response::redirect_with_status(location, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use async_trait::async_trait;
    use turbo_data::{Fetch, FetchError, Request};
    use turbo_router::{MemoryHistory, NavigationType};

    use crate::event::{Env, PageEvent};
    use crate::schedule::TaskQueue;

    struct Offline;

    #[async_trait(?Send)]
    impl Fetch for Offline {
        async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
            Err(FetchError::unreachable(request.url, "offline"))
        }
    }

    fn client() -> (RedirectInterceptor, Rc<MemoryHistory>, Rc<TaskQueue>) {
        let history = Rc::new(MemoryHistory::new("/account"));
        let queue = Rc::new(TaskQueue::new());
        let runtime = ClientRuntime::new(history.clone(), history.clone(), queue.clone());
        let interceptor =
            RedirectInterceptor::new(Runtime::client(runtime), RedirectPolicy::default());
        (interceptor, history, queue)
    }

    fn server() -> (RedirectInterceptor, Rc<PageEvent>) {
        let page = Rc::new(PageEvent::new(
            Request::get("https://shop.test/account"),
            Env::new(),
            Rc::new(Offline),
        ));
        let interceptor =
            RedirectInterceptor::new(Runtime::server(page.clone()), RedirectPolicy::default());
        (interceptor, page)
    }

    // === Outcome Tests ===

    #[test]
    fn test_outcome_from_result() {
        assert!(matches!(Outcome::from_result(Ok(RouteValue::Data(1))), Outcome::Value(1)));
        assert!(matches!(
            Outcome::<u8>::from_result(Ok(RouteValue::Response(redirect("/a")))),
            Outcome::Returned(_)
        ));
        assert!(matches!(
            Outcome::<u8>::from_result(Err(redirect("/a").into())),
            Outcome::Thrown(_)
        ));
        assert!(matches!(
            Outcome::<u8>::from_result(Err(anyhow::anyhow!("boom").into())),
            Outcome::Failure(_)
        ));
    }

    // === Policy Tests ===

    #[test]
    fn test_policy_default_is_any_redirection() {
        let policy = RedirectPolicy::default();
        assert!(policy.is_redirect(&redirect_with_status("/a", StatusCode::MOVED_PERMANENTLY)));
        assert!(policy.is_redirect(&redirect_with_status("/a", StatusCode::PERMANENT_REDIRECT)));
        assert!(!policy.is_redirect(&Response::with_status(StatusCode::OK)));
    }

    #[test]
    fn test_policy_explicit_statuses() {
        let policy = RedirectPolicy::from_statuses(&[302, 303]);
        assert!(policy.is_redirect(&redirect("/a")));
        assert!(!policy.is_redirect(&redirect_with_status("/a", StatusCode::MOVED_PERMANENTLY)));
        assert_eq!(RedirectPolicy::from_statuses(&[]), RedirectPolicy::AnyRedirection);
    }

    // === Client Tests ===

    #[test]
    fn test_client_same_origin_redirect_is_deferred_replace() {
        let (interceptor, history, queue) = client();

        let value = interceptor
            .handle::<u8>(Outcome::Returned(redirect("/login")))
            .unwrap();
        assert_eq!(value.response().and_then(|r| r.location()), Some("/login"));
        assert!(history.log().is_empty());

        assert_eq!(queue.run_pending(), 1);
        let log = history.log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].location, "/login");
        assert_eq!(log[0].kind, NavigationType::Replace);
        assert_eq!(queue.transitions(), 1);
    }

    #[test]
    fn test_client_thrown_redirect_resolves() {
        let (interceptor, history, queue) = client();

        let value = interceptor.handle::<u8>(Outcome::Thrown(redirect("/cart")));
        assert!(matches!(value, Ok(RouteValue::Response(_))));

        queue.run_pending();
        assert_eq!(history.current(), "/cart");
    }

    #[test]
    fn test_client_cross_origin_redirect_assigns_document() {
        let (interceptor, history, queue) = client();

        interceptor
            .handle::<u8>(Outcome::Returned(redirect("https://auth.test/sso")))
            .unwrap();
        queue.run_pending();

        assert_eq!(history.documents(), vec!["https://auth.test/sso".to_string()]);
        assert_eq!(queue.transitions(), 0);
    }

    #[test]
    fn test_client_redirect_without_location_does_nothing() {
        let (interceptor, history, queue) = client();

        let value = interceptor
            .handle::<u8>(Outcome::Returned(Response::with_status(StatusCode::FOUND)))
            .unwrap();
        assert!(value.response().is_some());
        assert_eq!(queue.pending(), 0);
        assert!(history.log().is_empty());
    }

    #[test]
    fn test_non_redirect_responses() {
        let (interceptor, _, queue) = client();

        let returned = interceptor
            .handle::<u8>(Outcome::Returned(Response::with_status(StatusCode::NOT_FOUND)))
            .unwrap();
        assert_eq!(returned.response().map(|r| r.status), Some(StatusCode::NOT_FOUND));

        let thrown = interceptor.handle::<u8>(Outcome::Thrown(Response::with_status(
            StatusCode::NOT_FOUND,
        )));
        assert!(matches!(thrown, Err(RouteDataError::Response(_))));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_failure_passes_through() {
        let (interceptor, _, _) = client();
        let result = interceptor.handle::<u8>(Outcome::Failure(anyhow::anyhow!("offline").into()));
        assert_eq!(result.unwrap_err().to_string(), "offline");
    }

    // === Server Tests ===

    #[test]
    fn test_server_redirect_copies_status_and_headers() {
        let (interceptor, page) = server();
        let response = redirect("/login").header_set("Set-Cookie", "session=; Max-Age=0");

        let value = interceptor.handle::<u8>(Outcome::Thrown(response)).unwrap();
        assert!(value.response().is_some());

        let page_response = page.response();
        assert_eq!(page_response.status, StatusCode::FOUND);
        assert_eq!(page_response.headers.get("location"), Some("/login"));
        assert_eq!(page_response.headers.get("set-cookie"), Some("session=; Max-Age=0"));
    }

    #[test]
    fn test_server_same_origin_redirect_replaces_server_router() {
        let (_, page) = server();
        let history = Rc::new(MemoryHistory::new("/account"));
        let runtime = ServerRuntime::new(page.clone()).with_navigator(history.clone());
        let interceptor =
            RedirectInterceptor::new(Runtime::Server(runtime), RedirectPolicy::default());

        interceptor
            .handle::<u8>(Outcome::Returned(redirect("/login")))
            .unwrap();

        let log = history.log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].location, "/login");
        assert_eq!(log[0].kind, NavigationType::Replace);
        assert_eq!(page.response().status, StatusCode::FOUND);

        interceptor
            .handle::<u8>(Outcome::Thrown(redirect("https://auth.test/sso")))
            .unwrap();
        assert_eq!(history.log().len(), 1);
        assert!(history.documents().is_empty());
        assert_eq!(page.response().headers.get("location"), Some("https://auth.test/sso"));
    }

    #[test]
    fn test_server_redirect_without_location_copies_status() {
        let (interceptor, page) = server();
        interceptor
            .handle::<u8>(Outcome::Returned(Response::with_status(StatusCode::SEE_OTHER)))
            .unwrap();
        assert_eq!(page.response().status, StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_server_non_redirect_leaves_page_alone() {
        let (interceptor, page) = server();
        interceptor
            .handle::<u8>(Outcome::Returned(Response::with_status(StatusCode::NOT_FOUND)))
            .unwrap();
        assert_eq!(page.response().status, StatusCode::OK);
    }
}
