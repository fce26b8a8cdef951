//! # influx-connector
//!
//! Async client for the InfluxDB 1.x HTTP API, built around a byte-exact
//! line protocol encoder.
//!
//! ## Quick Start
//!
//! ```ignore
//! use influx_connector::{Client, ClientConfig, WriteOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(
//!         ClientConfig::new()
//!             .with_host("localhost")
//!             .with_database("sensors")
//!             .with_credentials("writer", "secret"),
//!     )?;
//!
//!     // Writes `temperature,room=kitchen value=21.5 1700000000000000000`
//!     client
//!         .write(
//!             "temperature",
//!             21.5,
//!             [("room", "kitchen")],
//!             Some(1_700_000_000_000),
//!             &WriteOptions::new(),
//!         )
//!         .await?;
//!
//!     let series = client
//!         .query_series("SELECT * FROM temperature WHERE time > now() - 1h", None)
//!         .await?;
//!     for s in series {
//!         for row in s.values {
//!             println!("{:?}: {:?}", row.time(), row.get_double("value"));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Encoding without a client
//!
//! ```
//! use influx_connector::Point;
//!
//! let line = Point::new("cpu")
//!     .tag("host", "a b,c")
//!     .field("active", "true")
//!     .field("state", "idle")
//!     .to_line_protocol(false)
//!     .unwrap();
//!
//! assert_eq!(line, r#"cpu,host=a\ b\,c active=true,state="idle""#);
//! ```
//!
//! ## Features
//!
//! - **Line protocol encoding**: measurement, tag and field escaping, with
//!   numeric- and boolean-looking strings written unquoted
//! - **Millisecond timestamps**: converted to nanoseconds on the wire, or
//!   stamped from the wall clock when configured
//! - **Typed errors**: validation, HTTP status, transport and parse failures
//!   are distinct variants, and nothing is retried behind your back
//! - **Pluggable transport**: reqwest by default, any [`HttpTransport`] in tests

pub mod client;
pub mod config;
pub mod error;
pub mod line_protocol;
pub mod parser;
pub mod transport;
pub mod types;
pub mod value;

#[cfg(test)]
mod test_util;

// Re-export main types at crate root
pub use client::Client;
pub use config::{ClientConfig, Credentials, Scheme, WriteOptions};
pub use error::{Error, Result};
pub use transport::{HttpRequest, HttpTransport, RawResponse, ReqwestTransport};
pub use types::{Body, Fields, Point, Response, Row, Series, Tags};
pub use value::{FieldValue, Value};

// Re-export the encoder and reshaping helper for direct use
pub use line_protocol::encode;
pub use parser::parse_series;
