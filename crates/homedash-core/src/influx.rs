//! InfluxDB 1.x HTTP query client.
//!
//! Issues `SELECT ... ORDER BY time DESC LIMIT 1` statements against the
//! `/query` endpoint and turns the JSON result into a [`RawRow`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use homedash_core::influx::InfluxClient;
//! use homedash_core::{FieldSet, TelemetryStore};
//! use homedash_types::SensorAlias;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = InfluxClient::new("http://automation.lan:8086", "garden", Duration::from_secs(10))?;
//!
//! let alias = SensorAlias::new("workRoomTempSensor")?;
//! let row = client.fetch_latest(&alias, &FieldSet::climate("Telemetry")).await?;
//! println!("{:?}", row.values);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use homedash_types::SensorAlias;

use crate::error::{QueryError, QueryResult};
use crate::query::{FieldSet, RawRow, RawValue, TIME_COLUMN, TelemetryStore};

/// Error building an [`InfluxClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The base URL is not an http(s) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Username and password for an authenticated InfluxDB.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Query client for the InfluxDB 1.x HTTP API.
///
/// Cheap to clone; clones share the underlying connection pool, so one
/// instance can serve concurrent queries from both schedules.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    base_url: String,
    database: String,
    credentials: Option<Credentials>,
}

impl InfluxClient {
    /// Create a client for `database` on the server at `base_url`.
    ///
    /// Every request carries `timeout`; an expired request fails with
    /// [`QueryError::ConnectionError`].
    pub fn new(base_url: &str, database: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, database, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(
        base_url: &str,
        database: &str,
        client: Client,
    ) -> Result<Self, ClientBuildError> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientBuildError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            database: database.to_string(),
            credentials: None,
        })
    }

    /// Authenticate every query with these credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    async fn query(&self, statement: &str) -> QueryResult<QueryResponse> {
        let url = format!("{}/query", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("db", self.database.as_str()), ("q", statement)]);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response.json::<QueryResponse>().await.map_err(|e| {
            if e.is_decode() {
                QueryError::malformed(format!("undecodable body: {}", e))
            } else {
                transport_error(e)
            }
        })
    }
}

#[async_trait]
impl TelemetryStore for InfluxClient {
    async fn fetch_latest(&self, alias: &SensorAlias, fields: &FieldSet) -> QueryResult<RawRow> {
        let statement = build_statement(alias, fields);
        debug!("Querying {}: {}", self.database, statement);
        let response = self.query(&statement).await?;
        extract_row(response, alias, fields)
    }
}

/// Render the newest-row statement for an alias.
pub fn build_statement(alias: &SensorAlias, fields: &FieldSet) -> String {
    let selected: Vec<String> = fields.fields.iter().map(|f| quote_identifier(f)).collect();
    format!(
        "SELECT {}, {} FROM {} WHERE \"alias\" = '{}' ORDER BY time DESC LIMIT 1",
        TIME_COLUMN,
        selected.join(", "),
        quote_identifier(&fields.measurement),
        escape_literal(alias.as_str())
    )
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn transport_error(error: reqwest::Error) -> QueryError {
    if error.is_timeout() {
        QueryError::ConnectionError(format!("request timed out: {}", error))
    } else {
        QueryError::ConnectionError(error.to_string())
    }
}

/// Map a non-success status to a query error.
///
/// Server-side failures are treated as the store being unavailable; client
/// errors mean the store rejected the request.
fn status_error(status: StatusCode, body: &str) -> QueryError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| status.to_string());

    if status.is_server_error() {
        QueryError::ConnectionError(format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        QueryError::malformed(format!("HTTP {}: {}", status.as_u16(), message))
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<RawValue>>,
}

/// Pull the single newest row out of a query response.
fn extract_row(
    response: QueryResponse,
    alias: &SensorAlias,
    fields: &FieldSet,
) -> QueryResult<RawRow> {
    if let Some(error) = response.error {
        return Err(QueryError::malformed(error));
    }

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| QueryError::malformed("response has no results"))?;

    if let Some(error) = result.error {
        return Err(QueryError::malformed(error));
    }

    let Some(series) = result.series.into_iter().next() else {
        return Err(QueryError::not_found(alias.as_str()));
    };

    let expected = fields.fields.len() + 1;
    if series.columns.len() != expected || series.columns.first().map(String::as_str) != Some(TIME_COLUMN) {
        return Err(QueryError::malformed(format!(
            "expected columns {:?}, got {:?}",
            fields.columns().collect::<Vec<_>>(),
            series.columns
        )));
    }

    let Some(values) = series.values.into_iter().next() else {
        return Err(QueryError::not_found(alias.as_str()));
    };

    if values.len() != expected {
        return Err(QueryError::malformed(format!(
            "row has {} values for {} columns",
            values.len(),
            expected
        )));
    }

    Ok(RawRow::new(series.columns, values))
}
