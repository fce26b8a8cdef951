//! Client configuration.
//!
//! [`ClientConfig`] is fixed when a [`Client`](crate::Client) is built.
//! Per-call targets are passed separately as [`WriteOptions`] so the stored
//! configuration is never mutated.

use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Default InfluxDB host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default InfluxDB HTTP port.
pub const DEFAULT_PORT: u16 = 8086;

/// URL scheme used to reach the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(Error::Config(format!("unknown scheme '{}'", input))),
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        write!(f, "{}", s)
    }
}

/// Static basic-auth credentials.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials from a user and password.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Connection settings for an InfluxDB server.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use influx_connector::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(r#"{"database": "metrics"}"#).unwrap();
/// assert_eq!(config.host, "127.0.0.1");
/// assert_eq!(config.port, 8086);
/// assert_eq!(config.database.as_deref(), Some("metrics"));
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// `http` or `https`.
    pub scheme: Scheme,
    /// Basic-auth credentials, if any.
    pub credentials: Option<Credentials>,
    /// Database used when a call does not name one.
    pub database: Option<String>,
    /// Retention policy used when a write does not name one.
    pub retention_policy: Option<String>,
    /// Stamp writes that carry no timestamp with the local time.
    pub use_wall_clock_timestamp: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scheme: Scheme::Http,
            credentials: None,
            database: None,
            retention_policy: None,
            use_wall_clock_timestamp: false,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `http://127.0.0.1:8086` with no database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(user, password));
        self
    }

    /// Set the default database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the default retention policy.
    pub fn with_retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.retention_policy = Some(retention_policy.into());
        self
    }

    /// Enable or disable client-side timestamps.
    pub fn with_wall_clock_timestamp(mut self, enabled: bool) -> Self {
        self.use_wall_clock_timestamp = enabled;
        self
    }

    /// Build a configuration from environment variables.
    ///
    /// All variables are optional:
    ///
    /// - `INFLUX_HOST`, `INFLUX_PORT`, `INFLUX_SCHEME`
    /// - `INFLUX_DATABASE`, `INFLUX_RETENTION_POLICY`
    /// - `INFLUX_USER` and `INFLUX_PASSWORD` (used only when both are set)
    /// - `INFLUX_WALL_CLOCK_TIMESTAMP` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = env_var("INFLUX_HOST") {
            config.host = host;
        }
        if let Some(port) = env_var("INFLUX_PORT") {
            config.port = port
                .parse()
                .map_err(|e| Error::Config(format!("INFLUX_PORT '{}': {}", port, e)))?;
        }
        if let Some(scheme) = env_var("INFLUX_SCHEME") {
            config.scheme = scheme.parse()?;
        }
        config.database = env_var("INFLUX_DATABASE");
        config.retention_policy = env_var("INFLUX_RETENTION_POLICY");

        if let (Some(user), Some(password)) = (env_var("INFLUX_USER"), env_var("INFLUX_PASSWORD")) {
            config.credentials = Some(Credentials { user, password });
        }

        if let Some(flag) = env_var("INFLUX_WALL_CLOCK_TIMESTAMP") {
            config.use_wall_clock_timestamp = match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(Error::Config(format!(
                        "INFLUX_WALL_CLOCK_TIMESTAMP '{}' is not a boolean",
                        flag
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Base URL of the server, e.g. `http://127.0.0.1:8086/`.
    pub fn base_url(&self) -> Result<Url> {
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(Url::parse(&format!("{}://{}:{}/", self.scheme, host, self.port))?)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Per-call write target. Unset values fall back to the client configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Database to write to.
    pub database: Option<String>,
    /// Retention policy to write to.
    pub retention_policy: Option<String>,
}

impl WriteOptions {
    /// Options that use the configured defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write to `database` instead of the configured one.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Write to `retention_policy` instead of the configured one.
    pub fn retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.retention_policy = Some(retention_policy.into());
        self
    }
}
