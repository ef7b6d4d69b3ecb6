//! PostgREST-backed store.
//!
//! Each [`Query`] becomes one HTTP request against `{url}/rest/v1/{table}`:
//! projection and embedding go into `select=`, filters into `column=op.value`
//! pairs and ordering into `order=`.  Writes ask for the affected rows back
//! with `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::query::{order_clause, Operation, Operator};
use crate::store::{QueryStore, Row};
use crate::{DbError, Query, StoreConfig};

const REST_PATH: &str = "rest/v1/";
const RETURN_REPRESENTATION: &str = "return=representation";

/// HTTP client bound to one hosted project.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
}

/// Build a [`RestStore`] from the startup configuration.
///
/// The credential is attached to every request as both `apikey` and bearer
/// token and is marked sensitive so it never shows up in debug output.
pub fn connect(config: &StoreConfig) -> Result<RestStore, DbError> {
    info!(url = %config.url, timeout = ?config.timeout, "Connecting to store");

    let key = config.api_key.expose_secret();
    let mut apikey = HeaderValue::from_str(key)
        .map_err(|_| DbError::InvalidRequest("api key is not a valid header value".into()))?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|_| DbError::InvalidRequest("api key is not a valid header value".into()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()?;

    Ok(RestStore {
        client,
        base: rest_base(&config.url)?,
    })
}

fn rest_base(url: &Url) -> Result<Url, DbError> {
    let mut root = url.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.join(REST_PATH)
        .map_err(|e| DbError::InvalidRequest(format!("cannot derive REST endpoint: {e}")))
}

impl RestStore {
    fn table_url(&self, table: &str) -> Result<Url, DbError> {
        self.base
            .join(table)
            .map_err(|e| DbError::InvalidRequest(format!("bad table name '{table}': {e}")))
    }
}

#[async_trait]
impl QueryStore for RestStore {
    async fn execute(&self, query: Query) -> Result<Vec<Row>, DbError> {
        let url = self.table_url(&query.table)?;
        let params = query_params(&query)?;
        let kind = query.operation.kind();

        let request = match query.operation {
            Operation::Select => self.client.get(url),
            Operation::Insert(rows) => self
                .client
                .post(url)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&rows),
            Operation::Update(patch) => self
                .client
                .patch(url)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&patch),
            Operation::Delete => self
                .client
                .delete(url)
                .header("Prefer", RETURN_REPRESENTATION),
        };

        let response = request.query(&params).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(table = %query.table, op = %kind, status = status.as_u16(), "store request");

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let rows: Vec<Row> = serde_json::from_slice(&body)?;
        debug!(table = %query.table, op = %kind, rows = rows.len(), "store response");
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Query-string rendering
// ---------------------------------------------------------------------------

/// Translate a query into PostgREST query-string pairs.
pub(crate) fn query_params(query: &Query) -> Result<Vec<(String, String)>, DbError> {
    query.ensure_scoped()?;

    let mut params = vec![("select".to_owned(), query.select_clause())];

    for filter in &query.filters {
        let rendered = match (&filter.value, filter.operator) {
            (Value::Null, Operator::Eq) => "is.null".to_owned(),
            (Value::Null, Operator::Neq) => "not.is.null".to_owned(),
            (Value::Null, op) => {
                return Err(DbError::InvalidRequest(format!(
                    "cannot apply '{}' to null on column '{}'",
                    op.as_str(),
                    filter.column
                )))
            }
            (value, op) => format!("{}.{}", op.as_str(), render_value(&filter.column, value)?),
        };
        params.push((filter.column.clone(), rendered));
    }

    if !query.order.is_empty() {
        params.push(("order".to_owned(), order_clause(&query.order)));
    }

    for relation in query.relations.iter().filter(|r| !r.order.is_empty()) {
        params.push((format!("{}.order", relation.alias), order_clause(&relation.order)));
    }

    Ok(params)
}

fn render_value(column: &str, value: &Value) -> Result<String, DbError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(DbError::InvalidRequest(format!(
            "column '{column}' can only be filtered by a scalar value"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Error decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn api_error(status: StatusCode, body: &[u8]) -> DbError {
    let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed.message.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_owned();
        if text.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_owned()
        } else {
            text
        }
    });

    DbError::Api {
        status: status.as_u16(),
        code: parsed.code,
        message,
        details: parsed.details,
        hint: parsed.hint,
    }
}
