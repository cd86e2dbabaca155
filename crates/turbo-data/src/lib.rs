//! HTTP values and the fetch transport contract for TurboCommerce.
//!
//! Route data fetchers receive requests and return (or throw) responses.
//! This crate defines those values and the [`Fetch`] trait a host
//! implements to perform outbound calls. The transport itself lives in the
//! host (Spin, a browser, a test double).
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_data::{Fetch, Request, Response};
//!
//! async fn load_product(fetch: &dyn Fetch, id: u64) -> Result<Product, FetchError> {
//!     let response = fetch
//!         .fetch(Request::get(format!("https://api.example.com/products/{id}")))
//!         .await?
//!         .error_for_status()?;
//!     response.json()
//! }
//! ```

mod error;
mod headers;
mod request;
mod response;

use async_trait::async_trait;

pub use error::FetchError;
pub use headers::{Headers, LOCATION};
pub use http::{Method, StatusCode};
pub use request::{Request, RequestBuilder};
pub use response::Response;

/// Outbound HTTP transport.
///
/// Implementations are single-threaded; the returned future is not `Send`.
#[async_trait(?Send)]
pub trait Fetch {
    /// Send a request and wait for the response.
    async fn fetch(&self, request: Request) -> Result<Response, FetchError>;
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Fetch, FetchError, Headers, Method, Request, Response, StatusCode};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording {
        seen: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl Fetch for Recording {
        async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
            self.seen.borrow_mut().push(request.url.clone());
            if request.url.starts_with("http") {
                Ok(Response::with_status(StatusCode::OK).body_set("ok"))
            } else {
                Err(FetchError::InvalidUrl(request.url))
            }
        }
    }

    #[test]
    fn test_fetch_trait_object() {
        let transport = Recording {
            seen: RefCell::new(Vec::new()),
        };
        let fetch: &dyn Fetch = &transport;

        let ok = futures::executor::block_on(fetch.fetch(Request::get("https://a.test/x")));
        assert_eq!(ok.unwrap().text().unwrap(), "ok");

        let err = futures::executor::block_on(fetch.fetch(Request::get("nope")));
        assert!(matches!(err, Err(FetchError::InvalidUrl(_))));
        assert_eq!(transport.seen.borrow().len(), 2);
    }
}
