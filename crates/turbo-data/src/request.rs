//! HTTP request values and builder.

use http::Method;
use serde::Serialize;

use crate::{FetchError, Headers};

/// An outbound or incoming HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute or origin-relative URL.
    pub url: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Start building a request.
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// Build a bodiless GET request.
    pub fn get(url: impl Into<String>) -> Self {
        RequestBuilder::new(Method::GET, url).build()
    }

    /// Path portion of the URL, without query or fragment.
    pub fn path(&self) -> &str {
        let without_origin = match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            None => self.url.as_str(),
        };
        without_origin
            .split(['?', '#'])
            .next()
            .unwrap_or(without_origin)
    }
}

/// A builder for constructing HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, FetchError> {
        let json = serde_json::to_vec(value).map_err(|e| FetchError::Encode(e.to_string()))?;
        self.headers.set("Content-Type", "application/json");
        self.body = Some(json);
        Ok(self)
    }

    /// Set the Accept header.
    pub fn accept(self, content_type: impl Into<String>) -> Self {
        self.header("Accept", content_type)
    }

    /// Finish the request.
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::builder(Method::POST, "https://api.example.com/cart")
            .accept("application/json")
            .json(&serde_json::json!({"sku": "A-1"}))
            .unwrap()
            .build();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.headers.get("content-type"), Some("application/json"));
        assert_eq!(req.headers.get("accept"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(br#"{"sku":"A-1"}"#.as_slice()));
    }

    #[test]
    fn test_request_path() {
        assert_eq!(Request::get("https://shop.test/products/7?tab=info").path(), "/products/7");
        assert_eq!(Request::get("https://shop.test").path(), "/");
        assert_eq!(Request::get("/cart#summary").path(), "/cart");
    }
}
