//! HTTP transport.
//!
//! The client talks to the network only through [`HttpTransport`]. The
//! transport knows nothing about line protocol or status-code policy: it
//! sends one request and hands back whatever the server answered.

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::Result;

/// A request ready to be sent.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL including the query string.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body, if any.
    pub body: Option<String>,
}

/// Unprocessed server answer.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

/// Capability to perform one HTTP exchange.
///
/// Implementations must map connection-level failures to
/// [`Error::Transport`](crate::Error::Transport) and must not retry.
pub trait HttpTransport: Send + Sync {
    /// Send `request` and wait for the full response.
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse>>;
}

/// [`HttpTransport`] backed by a `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with a custom `reqwest::Client`.
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse>> {
        async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = self.http.request(method, url).headers(headers);
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}
