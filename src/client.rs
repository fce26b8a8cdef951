//! InfluxDB client.
//!
//! This module provides the main `Client` type for writing points to and
//! querying an InfluxDB 1.x server over its HTTP API.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::config::{ClientConfig, WriteOptions};
use crate::error::{Error, Result};
use crate::parser::parse_series;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::types::{Body, Fields, Point, Response, Series, Tags};

const LINE_PROTOCOL_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// InfluxDB 1.x client.
///
/// Each call encodes at most one point and issues exactly one request.
/// Nothing is batched or retried. The configuration is shared read-only
/// between clones.
///
/// # Example
///
/// ```ignore
/// use influx_connector::{Client, ClientConfig, WriteOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new(ClientConfig::new().with_database("telemetry"))?;
///
///     client
///         .write("cpu", [("usage", 0.64)], [("host", "server01")], None, &WriteOptions::new())
///         .await?;
///
///     for series in client.query_series("SELECT * FROM cpu", None).await? {
///         for row in &series.values {
///             println!("{:?} {:?}", row.time(), row.get_double("usage"));
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    base_url: Url,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish()
    }
}

impl Client {
    /// Create a new InfluxDB client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host, scheme and port do not form
    /// a valid URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(Arc::new(ReqwestTransport::new()), config)
    }

    /// Create a new client with a custom reqwest client.
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_http_client(http: reqwest::Client, config: ClientConfig) -> Result<Self> {
        Self::with_transport(Arc::new(ReqwestTransport::with_client(http)), config)
    }

    /// Create a new client on top of any [`HttpTransport`].
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        Ok(Self {
            transport,
            config: Arc::new(config),
            base_url,
        })
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    /// Get the configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the full URL for an API endpoint.
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url
    }

    /// `Authorization: Basic` when both a user and a password are set.
    fn authorization(&self) -> Result<Option<HeaderValue>> {
        let Some(credentials) = self
            .config
            .credentials
            .as_ref()
            .filter(|c| !c.user.is_empty() && !c.password.is_empty())
        else {
            return Ok(None);
        };
        let token = STANDARD.encode(format!("{}:{}", credentials.user, credentials.password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|e| Error::Config(format!("invalid credentials: {}", e)))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    /// Send one request and apply the status-code contract.
    async fn send(&self, method: Method, url: Url, body: Option<String>) -> Result<Response> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = self.authorization()? {
            headers.insert(AUTHORIZATION, auth);
        }
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(LINE_PROTOCOL_CONTENT_TYPE));
        }

        log::debug!(">> {} {}", method, url);

        let request = HttpRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            body,
        };

        let raw = match self.transport.send(request).await {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("{} {} failed: {}", method, url.path(), e);
                return Err(e);
            }
        };

        log::debug!("<< {} {}", raw.status, url.path());

        if !raw.status.is_success() {
            let body = String::from_utf8_lossy(&raw.body).into_owned();
            log::warn!("{} {} returned {}: {}", method, url.path(), raw.status, body);
            return Err(Error::Http {
                status: raw.status.as_u16(),
                body,
            });
        }

        let body = decode_body(&raw.headers, raw.body)?;
        Ok(Response {
            status: raw.status.as_u16(),
            headers: raw.headers,
            body,
        })
    }

    /// Write an already encoded line.
    ///
    /// Sends `POST /write?db=<database>[&rp=<retention policy>]`. The
    /// database and retention policy come from `options`, falling back to
    /// the client configuration. The `rp` parameter is omitted when neither
    /// names one.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if no database is configured or given.
    /// - [`Error::Http`] on a non-2xx status, with the raw body.
    /// - [`Error::Transport`] on a connection failure.
    pub async fn write_raw(
        &self,
        line: impl Into<String>,
        options: &WriteOptions,
    ) -> Result<Response> {
        let database = options
            .database
            .as_deref()
            .or(self.config.database.as_deref())
            .ok_or_else(|| Error::validation("no database given for write"))?;
        let retention_policy = options
            .retention_policy
            .as_deref()
            .or(self.config.retention_policy.as_deref());

        let mut url = self.endpoint("/write");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", database);
            if let Some(rp) = retention_policy {
                pairs.append_pair("rp", rp);
            }
        }

        self.send(Method::POST, url, Some(line.into())).await
    }

    /// Encode and write one point.
    ///
    /// `fields` may be a field set or a bare scalar, which is written as
    /// `value=<scalar>`. `timestamp` is in epoch milliseconds.
    ///
    /// Encoding errors are returned before any request is made.
    pub async fn write(
        &self,
        measurement: &str,
        fields: impl Into<Fields>,
        tags: impl Into<Tags>,
        timestamp: Option<i64>,
        options: &WriteOptions,
    ) -> Result<Response> {
        let point = Point {
            measurement: measurement.to_string(),
            tags: tags.into(),
            fields: fields.into(),
            timestamp,
        };
        self.write_point(&point, options).await
    }

    /// Encode and write a prebuilt point.
    pub async fn write_point(&self, point: &Point, options: &WriteOptions) -> Result<Response> {
        let line = point.to_line_protocol(self.config.use_wall_clock_timestamp)?;
        log::debug!("encoded line: {}", line);
        self.write_raw(line, options).await
    }

    /// Run a query.
    ///
    /// Sends `GET /query?db=<database>&q=<query>`. The query string is
    /// passed through unchanged. `database` overrides the configured one.
    /// The `db` parameter is omitted when neither is set. A JSON response
    /// body comes back as [`Body::Json`].
    pub async fn query(&self, query: &str, database: Option<&str>) -> Result<Response> {
        let database = database.or(self.config.database.as_deref());

        let mut url = self.endpoint("/query");
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(db) = database {
                pairs.append_pair("db", db);
            }
            pairs.append_pair("q", query);
        }

        self.send(Method::GET, url, None).await
    }

    /// Run a query and flatten the result into rows.
    ///
    /// See [`parse_series`] for the shape of the output.
    pub async fn query_series(&self, query: &str, database: Option<&str>) -> Result<Vec<Series>> {
        let response = self.query(query, database).await?;
        match &response.body {
            Body::Json(body) => parse_series(body),
            Body::Empty => Ok(Vec::new()),
            Body::Text(text) => Err(Error::parse(format!(
                "expected a JSON query response, got: {}",
                text
            ))),
        }
    }

    /// Check that the server is reachable (`GET /ping`).
    pub async fn ping(&self) -> Result<Response> {
        self.send(Method::GET, self.endpoint("/ping"), None).await
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

fn decode_body(headers: &HeaderMap, body: Vec<u8>) -> Result<Body> {
    if body.is_empty() {
        return Ok(Body::Empty);
    }
    if is_json(headers) {
        return Ok(Body::Json(serde_json::from_slice(&body)?));
    }
    let text = String::from_utf8(body)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    Ok(Body::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use reqwest::StatusCode;

    use crate::test_util::setup;
    use crate::transport::RawResponse;

    /// Transport that records requests and answers with a canned response.
    struct MockTransport {
        requests: Mutex<Vec<HttpRequest>>,
        status: StatusCode,
        content_type: Option<&'static str>,
        body: Vec<u8>,
    }

    impl MockTransport {
        fn new(status: u16, content_type: Option<&'static str>, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status: StatusCode::from_u16(status).unwrap(),
                content_type,
                body: body.as_bytes().to_vec(),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpTransport for MockTransport {
        fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<RawResponse>> {
            self.requests.lock().unwrap().push(request);
            let mut headers = HeaderMap::new();
            if let Some(ct) = self.content_type {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
            }
            let response = RawResponse {
                status: self.status,
                headers,
                body: self.body.clone(),
            };
            async move { Ok(response) }.boxed()
        }
    }

    fn client(transport: Arc<MockTransport>, config: ClientConfig) -> Client {
        setup();
        Client::with_transport(transport, config).unwrap()
    }

    #[tokio::test]
    async fn test_write_builds_request() {
        let mock = MockTransport::new(204, None, "");
        let client = client(mock.clone(), ClientConfig::new().with_database("telemetry"));

        let response = client
            .write("cpu", 42i64, [("host", "a b")], Some(1), &WriteOptions::new())
            .await
            .unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url.as_str(), "http://127.0.0.1:8086/write?db=telemetry");
        assert_eq!(req.body.as_deref(), Some(r"cpu,host=a\ b value=42 1000000"));
        assert_eq!(
            req.headers.get(CONTENT_TYPE).unwrap(),
            LINE_PROTOCOL_CONTENT_TYPE
        );
        assert!(req.headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_write_options_override_config() {
        let mock = MockTransport::new(204, None, "");
        let client = client(
            mock.clone(),
            ClientConfig::new()
                .with_database("default_db")
                .with_retention_policy("default_rp"),
        );

        client
            .write_raw("cpu value=1", &WriteOptions::new())
            .await
            .unwrap();
        client
            .write_raw(
                "cpu value=1",
                &WriteOptions::new().database("other").retention_policy("week"),
            )
            .await
            .unwrap();

        let urls: Vec<_> = mock.requests().iter().map(|r| r.url.to_string()).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:8086/write?db=default_db&rp=default_rp",
                "http://127.0.0.1:8086/write?db=other&rp=week",
            ]
        );

        // The stored configuration is untouched
        assert_eq!(client.config().database.as_deref(), Some("default_db"));
    }

    #[tokio::test]
    async fn test_write_without_database_fails_before_io() {
        let mock = MockTransport::new(204, None, "");
        let client = client(mock.clone(), ClientConfig::new());

        let err = client
            .write_raw("cpu value=1", &WriteOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_write_empty_fields_fails_before_io() {
        let mock = MockTransport::new(204, None, "");
        let client = client(mock.clone(), ClientConfig::new().with_database("db"));

        let err = client
            .write("cpu", Fields::new(), Tags::new(), None, &WriteOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_write_uses_wall_clock_when_configured() {
        let mock = MockTransport::new(204, None, "");
        let client = client(
            mock.clone(),
            ClientConfig::new()
                .with_database("db")
                .with_wall_clock_timestamp(true),
        );

        client
            .write_point(&Point::new("cpu").field("v", 1i64), &WriteOptions::new())
            .await
            .unwrap();

        let body = mock.requests()[0].body.clone().unwrap();
        let segments: Vec<_> = body.split(' ').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments[2].parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let mock = MockTransport::new(204, None, "");
        let client = client(
            mock.clone(),
            ClientConfig::new()
                .with_database("db")
                .with_credentials("admin", "secret"),
        );

        client.ping().await.unwrap();

        let req = &mock.requests()[0];
        // base64("admin:secret")
        assert_eq!(
            req.headers.get(AUTHORIZATION).unwrap(),
            "Basic YWRtaW46c2VjcmV0"
        );
        assert_eq!(req.url.path(), "/ping");
    }

    #[tokio::test]
    async fn test_blank_credentials_send_no_auth_header() {
        for (user, password) in [("", ""), ("admin", ""), ("", "secret")] {
            let mock = MockTransport::new(204, None, "");
            let client = client(
                mock.clone(),
                ClientConfig::new().with_credentials(user, password),
            );

            client.ping().await.unwrap();

            let req = &mock.requests()[0];
            assert!(
                req.headers.get(AUTHORIZATION).is_none(),
                "user {:?} password {:?}",
                user,
                password
            );
        }
    }

    #[tokio::test]
    async fn test_non_success_is_http_error() {
        let mock = MockTransport::new(
            400,
            Some("application/json"),
            r#"{"error":"unable to parse 'cpu': missing fields"}"#,
        );
        let client = client(mock, ClientConfig::new().with_database("db"));

        let err = client
            .write_raw("cpu", &WriteOptions::new())
            .await
            .unwrap_err();
        match err {
            Error::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, r#"{"error":"unable to parse 'cpu': missing fields"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_builds_request() {
        let mock = MockTransport::new(200, Some("application/json"), r#"{"results":[]}"#);
        let client = client(mock.clone(), ClientConfig::new().with_database("telemetry"));

        let response = client
            .query("SELECT * FROM \"cpu\" WHERE host = 'a&b'", None)
            .await
            .unwrap();
        assert_eq!(response.body.as_json(), Some(&serde_json::json!({"results": []})));

        client.query("SHOW DATABASES", Some("other")).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].url.path(), "/query");
        let pairs: Vec<(String, String)> = requests[0].url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("db".to_string(), "telemetry".to_string()),
                ("q".to_string(), "SELECT * FROM \"cpu\" WHERE host = 'a&b'".to_string()),
            ]
        );
        assert!(requests[0].body.is_none());

        let pairs: Vec<(String, String)> = requests[1].url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("db".to_string(), "other".to_string()));
    }

    #[tokio::test]
    async fn test_query_without_database_omits_db() {
        let mock = MockTransport::new(200, Some("application/json"), r#"{"results":[]}"#);
        let client = client(mock.clone(), ClientConfig::new());

        client.query("SHOW DATABASES", None).await.unwrap();

        let url = &mock.requests()[0].url;
        assert_eq!(url.query(), Some("q=SHOW+DATABASES"));
    }

    #[tokio::test]
    async fn test_query_invalid_json_is_json_error() {
        let mock = MockTransport::new(200, Some("application/json; charset=utf-8"), "{not json");
        let client = client(mock, ClientConfig::new());

        let err = client.query("SHOW DATABASES", None).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_query_text_body() {
        let mock = MockTransport::new(200, Some("text/plain"), "a,b\n1,2\n");
        let client = client(mock, ClientConfig::new());

        let response = client.query("SELECT 1", None).await.unwrap();
        assert_eq!(response.body.as_text(), Some("a,b\n1,2\n"));

        let err = client.query_series("SELECT 1", None).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_query_series() {
        let mock = MockTransport::new(
            200,
            Some("application/json"),
            r#"{"results":[{"statement_id":0,"series":[{"name":"cpu","columns":["time","value"],"values":[["1970-01-01T00:00:01Z",3]]}]}]}"#,
        );
        let client = client(mock, ClientConfig::new().with_database("db"));

        let series = client.query_series("SELECT * FROM cpu", None).await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values[0].time(), Some(1_000));
        assert_eq!(series[0].values[0].get_long("value"), Some(3));
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=utf-8"));
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/jsonl"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = Client::new(ClientConfig::new().with_host("bad host")).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_hides_password() {
        let client = Client::new(ClientConfig::new().with_credentials("admin", "hunter2")).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("127.0.0.1"));
        assert!(!debug.contains("hunter2"));
    }
}
