//! Error types for route data.

use thiserror::Error;
use turbo_data::{FetchError, Response};

/// Errors a route data fetch can end in.
///
/// A fetcher "throws" a response by returning `Err(RouteDataError::Response(..))`.
/// Thrown redirects are intercepted and never reach the error state.
#[derive(Error, Debug)]
pub enum RouteDataError {
    /// A response was thrown instead of returned.
    #[error("Thrown response: HTTP {}", .0.status)]
    Response(Response),

    /// Transport failure.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A key or value could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Any other fetcher error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Response> for RouteDataError {
    fn from(response: Response) -> Self {
        RouteDataError::Response(response)
    }
}

impl RouteDataError {
    /// The thrown response, if this error carries one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_data::StatusCode;

    #[test]
    fn test_error_display() {
        let err = RouteDataError::from(Response::with_status(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "Thrown response: HTTP 404 Not Found");

        let err = RouteDataError::from(FetchError::InvalidUrl("x".to_string()));
        assert_eq!(err.to_string(), "Fetch error: Invalid URL: x");

        let err = RouteDataError::from(anyhow::anyhow!("catalog offline"));
        assert_eq!(err.to_string(), "catalog offline");
    }

    #[test]
    fn test_error_response_accessor() {
        let err = RouteDataError::from(Response::redirect("/login"));
        assert_eq!(err.response().and_then(|r| r.location()), Some("/login"));
        assert!(RouteDataError::from(anyhow::anyhow!("x")).response().is_none());
    }
}
