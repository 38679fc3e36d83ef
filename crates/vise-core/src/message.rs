//! HTTP request and response values exchanged with the hosting server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HTTP headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Content type attached to every synthesized response.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// An incoming HTTP request, as handed over by the hosting server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request URL (path and query).
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: Headers,
    /// Request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpRequest {
    /// Create a request for a URL with no headers and no body.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert a request received through the `http` crate.
    ///
    /// Repeated headers are joined with `", "`; values that are not valid
    /// visible ASCII are skipped.
    pub fn from_http(request: &::http::Request<String>) -> Self {
        let mut headers = Headers::new();
        for (name, value) in request.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let body = request.body();
        Self {
            url: request.uri().to_string(),
            headers,
            body: (!body.is_empty()).then(|| body.clone()),
        }
    }
}

/// The terminal output of one lifecycle run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: Headers,
    /// Response body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpResponse {
    /// Create an HTML response with the fixed content type header.
    pub fn html(code: u16, body: impl Into<String>) -> Self {
        let mut headers = Headers::new();
        headers.insert(
            ::http::header::CONTENT_TYPE.as_str().to_string(),
            HTML_CONTENT_TYPE.to_string(),
        );
        Self {
            code,
            headers,
            body: Some(body.into()),
        }
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert into an `http::Response` for the hosting server.
    ///
    /// Invalid status codes fall back to 500; invalid headers are skipped.
    pub fn into_http(self) -> ::http::Response<String> {
        let status = ::http::StatusCode::from_u16(self.code)
            .unwrap_or(::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = ::http::Response::new(self.body.unwrap_or_default());
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            let (Ok(name), Ok(value)) = (
                ::http::header::HeaderName::from_bytes(name.as_bytes()),
                ::http::header::HeaderValue::from_str(value),
            ) else {
                continue;
            };
            headers.insert(name, value);
        }
        response
    }
}
