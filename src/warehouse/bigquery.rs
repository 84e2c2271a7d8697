//! BigQuery REST client.
//!
//! Uses `jobs.query` / `jobs.getQueryResults` for reads and
//! `tabledata.insertAll` for appends. Reads poll until the job completes and
//! follow page tokens; a cancelled context cancels the running job.

use super::{AccessToken, Query, QueryParameter, Row, Warehouse};
use crate::context::RunContext;
use crate::error::{QueryErrorKind, Result, TallyError};
use crate::scorecard::TableRef;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// BigQuery client configuration.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Base URL for the BigQuery v2 API
    pub api_base: String,
    /// Project queries are billed to
    pub project_id: Option<String>,
    /// Dataset location (e.g. "US"), if not the default
    pub location: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long the server may hold a request open waiting for job completion
    pub poll_timeout: Duration,
    /// Maximum retries for transient failures
    pub max_retries: u8,
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            project_id: None,
            location: None,
            timeout: Duration::from_secs(60),
            poll_timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// HTTP client for BigQuery.
pub struct BigQueryClient {
    client: Client,
    config: BigQueryConfig,
    token: AccessToken,
}

/// Helper to convert reqwest errors to query errors
fn network_error(msg: &str, err: &reqwest::Error) -> TallyError {
    TallyError::query(msg, QueryErrorKind::NetworkError(err.to_string()))
}

/// Helper to create API errors
fn api_error(msg: impl Into<String>) -> TallyError {
    TallyError::query("API request", QueryErrorKind::ApiError(msg.into()))
}

fn invalid_response(msg: impl Into<String>) -> TallyError {
    TallyError::query("parsing response", QueryErrorKind::InvalidResponse(msg.into()))
}

/// A failed attempt, and whether trying again could help.
struct Attempt {
    error: TallyError,
    retryable: bool,
}

impl Attempt {
    const fn fatal(error: TallyError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    const fn transient(error: TallyError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: &'a [QueryParameter],
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<RawRow>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(r), Some(m)) => format!("{r}: {m}"),
            (None, Some(m)) => m.clone(),
            (Some(r), None) => r.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    index: Option<u64>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

// ============================================================================
// Client
// ============================================================================

impl BigQueryClient {
    /// Create a new BigQuery client.
    pub fn new(config: BigQueryConfig, token: AccessToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| network_error("Failed to create HTTP client", &e))?;

        Ok(Self {
            client,
            config,
            token,
        })
    }

    fn billing_project(&self) -> Result<&str> {
        self.config
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| TallyError::config("a project id is required for warehouse queries"))
    }

    /// Attach auth and clamp the timeout to whatever the run has left.
    fn prepare(&self, ctx: &RunContext, request: RequestBuilder) -> RequestBuilder {
        let timeout = ctx
            .remaining()
            .map_or(self.config.timeout, |left| left.min(self.config.timeout));
        request.bearer_auth(self.token.secret()).timeout(timeout)
    }

    fn send<T: DeserializeOwned>(
        &self,
        ctx: &RunContext,
        request: RequestBuilder,
    ) -> std::result::Result<T, Attempt> {
        let response = self
            .prepare(ctx, request)
            .send()
            .map_err(|e| Attempt::transient(network_error("Failed to send request", &e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            let error = api_error(format!(
                "BigQuery returned error status {}: {}",
                status.as_u16(),
                message
            ));
            return Err(if is_transient(status) {
                Attempt::transient(error)
            } else {
                Attempt::fatal(error)
            });
        }

        response
            .json()
            .map_err(|e| Attempt::fatal(invalid_response(e.to_string())))
    }

    /// Run `op` with exponential backoff on transient failures.
    fn with_retries<T>(
        &self,
        ctx: &RunContext,
        what: &str,
        op: impl Fn() -> std::result::Result<T, Attempt>,
    ) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            ctx.check()?;
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(1 << (attempt - 1));
                tracing::debug!("Retry attempt {} for {} after {:?}", attempt, what, delay);
                sleep_with_context(ctx, delay)?;
            }

            match op() {
                Ok(value) => return Ok(value),
                Err(failure) if failure.retryable => {
                    tracing::debug!("{} attempt {} failed: {}", what, attempt + 1, failure.error);
                    last_error = Some(failure.error);
                }
                Err(failure) => return Err(failure.error),
            }
        }

        Err(last_error.unwrap_or_else(|| api_error("Unknown error")))
    }

    fn start_query(&self, ctx: &RunContext, query: &Query) -> Result<QueryResponse> {
        let url = format!("{}/projects/{}/queries", self.config.api_base, self.billing_project()?);
        let body = QueryRequest {
            query: &query.sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: &query.parameters,
            timeout_ms: millis(self.config.poll_timeout),
            location: self.config.location.as_deref(),
        };
        self.with_retries(ctx, "query", || {
            self.send(ctx, self.client.post(&url).json(&body))
        })
    }

    fn query_results(
        &self,
        ctx: &RunContext,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.config.api_base, job.project_id, job.job_id
        );
        let mut params: Vec<(&str, String)> =
            vec![("timeoutMs", millis(self.config.poll_timeout).to_string())];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.with_retries(ctx, "getQueryResults", || {
            self.send(ctx, self.client.get(&url).query(&params))
        })
    }

    /// Best-effort job cancellation; failures are only logged.
    fn cancel_job(&self, job: &JobReference) {
        let url = format!(
            "{}/projects/{}/jobs/{}/cancel",
            self.config.api_base, job.project_id, job.job_id
        );
        let mut request = self
            .client
            .post(&url)
            .bearer_auth(self.token.secret())
            .timeout(Duration::from_secs(5));
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }
        match request.send() {
            Ok(_) => tracing::debug!("Cancelled query job {}", job.job_id),
            Err(e) => tracing::debug!("Failed to cancel query job {}: {}", job.job_id, e),
        }
    }
}

impl Warehouse for BigQueryClient {
    fn project_id(&self) -> Option<&str> {
        self.config.project_id.as_deref().filter(|p| !p.is_empty())
    }

    fn query(&self, ctx: &RunContext, query: &Query) -> Result<Vec<Row>> {
        ctx.check()?;
        let mut response = self.start_query(ctx, query)?;
        let mut schema: Option<TableSchema> = None;
        let mut rows = Vec::new();

        loop {
            if let Some(error) = response.errors.first() {
                return Err(TallyError::query(
                    "running query",
                    QueryErrorKind::JobFailed(error.describe()),
                ));
            }
            if response.schema.is_some() {
                schema = response.schema.take();
            }

            if response.job_complete {
                let fields = schema.as_ref().map_or(&[][..], |s| s.fields.as_slice());
                rows.extend(response.rows.iter().map(|r| decode_record(fields, &r.f)));
                if response.page_token.is_none() {
                    break;
                }
            }

            let job = response
                .job_reference
                .clone()
                .ok_or_else(|| invalid_response("incomplete query without a job reference"))?;
            if let Err(e) = ctx.check() {
                self.cancel_job(&job);
                return Err(e);
            }
            let page = if response.job_complete {
                response.page_token.clone()
            } else {
                None
            };
            response = self.query_results(ctx, &job, page.as_deref())?;
        }

        tracing::debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    fn insert_rows(&self, ctx: &RunContext, table: &TableRef, rows: &[Value]) -> Result<()> {
        ctx.check()?;
        if rows.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.config.api_base, table.project, table.dataset, table.table
        );
        let body = json!({
            "rows": rows.iter().map(|r| json!({ "json": r })).collect::<Vec<_>>(),
        });

        // Appends are not retried: a retry after a lost response would
        // duplicate the row.
        let response: InsertAllResponse = self
            .send(ctx, self.client.post(&url).json(&body))
            .map_err(|failure| failure.error)?;

        if let Some(failed) = response.insert_errors.first() {
            let detail = failed
                .errors
                .iter()
                .map(ErrorProto::describe)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(api_error(format!(
                "row {} rejected by {}: {}",
                failed.index.unwrap_or_default(),
                table,
                detail
            )));
        }
        Ok(())
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Sleep in short steps so cancellation is noticed promptly.
fn sleep_with_context(ctx: &RunContext, total: Duration) -> Result<()> {
    let step = Duration::from_millis(100);
    let mut slept = Duration::ZERO;
    while slept < total {
        ctx.check()?;
        let chunk = step.min(total - slept);
        std::thread::sleep(chunk);
        slept += chunk;
    }
    ctx.check()
}

// ============================================================================
// Row decoding
// ============================================================================

/// Turn a positional `{"f": [{"v": ..}]}` row into a named map.
fn decode_record(fields: &[FieldSchema], cells: &[Cell]) -> Row {
    fields
        .iter()
        .zip(cells)
        .map(|(field, cell)| (field.name.clone(), decode_value(field, &cell.v)))
        .collect()
}

fn decode_value(field: &FieldSchema, value: &Value) -> Value {
    if field.mode.as_deref() == Some("REPEATED") {
        let items = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| decode_single(field, item.get("v").unwrap_or(&Value::Null)))
                    .collect()
            })
            .unwrap_or_default();
        return Value::Array(items);
    }
    decode_single(field, value)
}

fn decode_single(field: &FieldSchema, value: &Value) -> Value {
    let is_record = matches!(field.field_type.as_str(), "RECORD" | "STRUCT");
    if !is_record {
        return value.clone();
    }
    let cells: Vec<Cell> = value
        .get("f")
        .and_then(Value::as_array)
        .map(|cells| {
            cells
                .iter()
                .map(|c| Cell {
                    v: c.get("v").cloned().unwrap_or(Value::Null),
                })
                .collect()
        })
        .unwrap_or_default();
    Value::Object(decode_record(&field.fields, &cells))
}
