//! HTTP response values.

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::headers::LOCATION;
use crate::{FetchError, Headers};

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: Headers,
    /// The response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response.
    pub fn new(status: StatusCode, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an empty response with the given status.
    pub fn with_status(status: StatusCode) -> Self {
        Self::new(status, Headers::new(), Vec::new())
    }

    /// Create a `302 Found` redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with_status(location, StatusCode::FOUND)
    }

    /// Create a redirect to `location` with an explicit status.
    pub fn redirect_with_status(location: impl Into<String>, status: StatusCode) -> Self {
        let mut headers = Headers::new();
        headers.set(LOCATION, location);
        Self::new(status, headers, Vec::new())
    }

    /// Add a header, replacing any existing value.
    pub fn header_set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Replace the body.
    pub fn body_set(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response is in the 3xx redirection class.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Check if the response was a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if the response was a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| FetchError::Decode(format!("Invalid UTF-8: {}", e)))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Get the raw response body.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Get the redirect target from the `Location` header.
    pub fn location(&self) -> Option<&str> {
        self.header(LOCATION)
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Convert to a Result, returning an error for non-2xx status codes.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            let message = self.text().unwrap_or_else(|_| "Unknown error".to_string());
            Err(FetchError::Status {
                status: self.status.as_u16(),
                message,
            })
        }
    }
}
