//! `MemoryStore` — an in-process [`QueryStore`].
//!
//! Keeps every table as a vector of JSON rows and evaluates queries the way
//! the hosted store does: filter, order, project, embed.  It records every
//! query it receives so tests can assert which round trips happened, and it
//! can be armed to fail the next matching request.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::query::{
    Columns, Direction, Filter, Operation, OperationKind, Operator, Order, RelationKind,
};
use crate::store::{QueryStore, Row};
use crate::{DbError, Query};

/// A query as seen by the store, kept for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedQuery {
    pub table: String,
    pub operation: OperationKind,
}

#[derive(Debug)]
struct ArmedFailure {
    table: String,
    operation: OperationKind,
    message: String,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Vec<Row>>,
    executed: Vec<ExecutedQuery>,
    failures: Vec<ArmedFailure>,
}

/// In-memory tables behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert rows directly, bypassing the query log.
    ///
    /// Column defaults (`id`, `created_at`) are filled in like a normal
    /// insert.  Values that are not JSON objects are skipped.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) -> Vec<Row> {
        let mut inner = self.lock();
        let stored = inner.tables.entry(table.to_owned()).or_default();
        let mut seeded = Vec::new();
        for value in rows {
            match value {
                Value::Object(mut row) => {
                    apply_defaults(&mut row);
                    stored.push(row.clone());
                    seeded.push(row);
                }
                other => warn!(table, value = %other, "skipping non-object seed row"),
            }
        }
        seeded
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Every query executed so far, in call order.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.lock().executed.clone()
    }

    /// Number of executed queries of `operation` against `table`.
    pub fn count(&self, table: &str, operation: OperationKind) -> usize {
        self.lock()
            .executed
            .iter()
            .filter(|q| q.table == table && q.operation == operation)
            .count()
    }

    /// Make the next `operation` against `table` fail with a store error.
    pub fn fail_next(&self, table: &str, operation: OperationKind, message: impl Into<String>) {
        self.lock().failures.push(ArmedFailure {
            table: table.to_owned(),
            operation,
            message: message.into(),
        });
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn execute(&self, query: Query) -> Result<Vec<Row>, DbError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let kind = query.operation.kind();

        inner.executed.push(ExecutedQuery {
            table: query.table.clone(),
            operation: kind,
        });

        if let Some(pos) = inner
            .failures
            .iter()
            .position(|f| f.table == query.table && f.operation == kind)
        {
            let failure = inner.failures.remove(pos);
            return Err(DbError::Api {
                status: 500,
                code: None,
                message: failure.message,
                details: None,
                hint: None,
            });
        }

        query.ensure_scoped()?;

        let table = inner.tables.entry(query.table.clone()).or_default();
        let mut affected: Vec<Row> = match &query.operation {
            Operation::Select => table
                .iter()
                .filter(|row| matches_all(row, &query.filters))
                .cloned()
                .collect(),
            Operation::Insert(rows) => {
                let mut inserted = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut row = row.clone();
                    apply_defaults(&mut row);
                    table.push(row.clone());
                    inserted.push(row);
                }
                inserted
            }
            Operation::Update(patch) => {
                let mut updated = Vec::new();
                for row in table.iter_mut().filter(|row| matches_all(row, &query.filters)) {
                    for (column, value) in patch {
                        row.insert(column.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
                updated
            }
            Operation::Delete => {
                let (removed, kept): (Vec<Row>, Vec<Row>) = table
                    .drain(..)
                    .partition(|row| matches_all(row, &query.filters));
                *table = kept;
                removed
            }
        };

        sort_rows(&mut affected, &query.order);
        let shaped: Vec<Row> = affected
            .iter()
            .map(|row| shape(&inner.tables, &query, row))
            .collect();

        debug!(table = %query.table, op = %kind, rows = shaped.len(), "memory store query");
        Ok(shaped)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn apply_defaults(row: &mut Row) {
    if row.get("id").map_or(true, Value::is_null) {
        row.insert("id".to_owned(), Value::String(Uuid::new_v4().to_string()));
    }
    if row.get("created_at").map_or(true, Value::is_null) {
        row.insert("created_at".to_owned(), Value::String(Utc::now().to_rfc3339()));
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(row, f))
}

/// Null follows SQL: only `is null` / `is not null` can match it, and a
/// comparison against a null cell is never true.
fn matches(row: &Row, filter: &Filter) -> bool {
    let cell = row.get(&filter.column).unwrap_or(&Value::Null);
    if filter.value.is_null() {
        return match filter.operator {
            Operator::Eq => cell.is_null(),
            Operator::Neq => !cell.is_null(),
            _ => false,
        };
    }
    let ordering = compare_values(cell, &filter.value);
    match filter.operator {
        Operator::Eq => ordering == Some(Ordering::Equal),
        Operator::Neq => matches!(ordering, Some(o) if o != Ordering::Equal),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Compare two cells the way the store's column types would.
///
/// Strings holding RFC 3339 timestamps compare as instants, numeric strings
/// and numbers compare numerically, other strings lexically.  `None` means
/// the values are not comparable (including any comparison with null other
/// than null = null).
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(x), Value::String(y)) => {
            if let (Some(x), Some(y)) = (parse_instant(x), parse_instant(y)) {
                return Some(x.cmp(&y));
            }
            if let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>()) {
                return x.partial_cmp(&y);
            }
            Some(x.cmp(y))
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

fn sort_rows(rows: &mut [Row], orders: &[Order]) {
    if orders.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for order in orders {
            let x = a.get(&order.column).unwrap_or(&Value::Null);
            let y = b.get(&order.column).unwrap_or(&Value::Null);
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match order.direction {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Project the base row and embed its relations.
fn shape(tables: &HashMap<String, Vec<Row>>, query: &Query, row: &Row) -> Row {
    let mut out = match &query.columns {
        Columns::All => row.clone(),
        Columns::List(columns) => columns
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect(),
    };

    for relation in &query.relations {
        let related = tables.get(&relation.table).map(Vec::as_slice).unwrap_or_default();
        let embedded = match &relation.kind {
            RelationKind::ToOne { local_column } => {
                let key = row.get(local_column).unwrap_or(&Value::Null);
                related
                    .iter()
                    .find(|r| {
                        compare_values(r.get("id").unwrap_or(&Value::Null), key)
                            == Some(Ordering::Equal)
                    })
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null)
            }
            RelationKind::ToMany { foreign_column } => {
                let id = row.get("id").unwrap_or(&Value::Null);
                let mut children: Vec<Row> = related
                    .iter()
                    .filter(|r| {
                        compare_values(r.get(foreign_column).unwrap_or(&Value::Null), id)
                            == Some(Ordering::Equal)
                    })
                    .cloned()
                    .collect();
                sort_rows(&mut children, &relation.order);
                Value::Array(children.into_iter().map(Value::Object).collect())
            }
        };
        out.insert(relation.alias.clone(), embedded);
    }

    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::Relation;

    fn object(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn insert_fills_identity_and_timestamp() {
        let store = MemoryStore::new();
        let rows = store
            .execute(Query::insert("agents", vec![object(json!({ "name": "Ada" }))]))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(Uuid::parse_str(rows[0]["id"].as_str().unwrap()).is_ok());
        assert!(parse_instant(rows[0]["created_at"].as_str().unwrap()).is_some());
        assert_eq!(store.rows("agents"), rows);
    }

    #[tokio::test]
    async fn select_filters_orders_and_projects() {
        let store = MemoryStore::new();
        store.seed(
            "agents",
            [
                json!({ "name": "Cleo", "department": "sales" }),
                json!({ "name": "Ada", "department": "sales" }),
                json!({ "name": "Bo", "department": "support" }),
            ],
        );

        let rows = store
            .execute(
                Query::select("agents")
                    .columns(&["name"])
                    .eq("department", "sales")
                    .order_by("name", Direction::Ascending),
            )
            .await
            .unwrap();

        assert_eq!(names(&rows), vec!["Ada", "Cleo"]);
        assert_eq!(rows[0].len(), 1);
    }

    #[tokio::test]
    async fn timestamps_compare_as_instants_across_offsets() {
        let store = MemoryStore::new();
        store.seed(
            "invoices",
            [
                json!({ "name": "early", "created_at": "2026-03-10T08:00:00+02:00" }),
                json!({ "name": "late", "created_at": "2026-03-10T07:00:00+00:00" }),
            ],
        );

        let rows = store
            .execute(
                Query::select("invoices")
                    .filter("created_at", Operator::Gte, "2026-03-10T06:30:00Z")
                    .order_by("created_at", Direction::Descending),
            )
            .await
            .unwrap();

        assert_eq!(names(&rows), vec!["late"]);
    }

    #[tokio::test]
    async fn embeds_to_one_and_to_many_relations() {
        let store = MemoryStore::new();
        store.seed("agents", [json!({ "id": "a1", "name": "Ada" })]);
        store.seed(
            "invoices",
            [
                json!({ "id": "i1", "agent_id": "a1" }),
                json!({ "id": "i2", "agent_id": "missing" }),
            ],
        );
        store.seed(
            "invoice_items",
            [
                json!({ "invoice_id": "i1", "description": "one" }),
                json!({ "invoice_id": "i1", "description": "two" }),
            ],
        );

        let rows = store
            .execute(
                Query::select("invoices")
                    .embed(Relation::to_one("agent", "agents", "agent_id"))
                    .embed(Relation::to_many("items", "invoice_items", "invoice_id"))
                    .order_by("id", Direction::Ascending),
            )
            .await
            .unwrap();

        assert_eq!(rows[0]["agent"]["name"], json!("Ada"));
        assert_eq!(rows[0]["items"].as_array().unwrap().len(), 2);
        assert_eq!(rows[1]["agent"], Value::Null);
        assert_eq!(rows[1]["items"], json!([]));
    }

    #[tokio::test]
    async fn embedded_rows_follow_relation_order() {
        let store = MemoryStore::new();
        store.seed("invoices", [json!({ "id": "i1" })]);
        store.seed(
            "invoice_items",
            [
                json!({ "invoice_id": "i1", "name": "late", "created_at": "2026-03-10T12:00:00Z" }),
                json!({ "invoice_id": "i1", "name": "early", "created_at": "2026-03-10T09:00:00Z" }),
                json!({ "invoice_id": "i1", "name": "middle", "created_at": "2026-03-10T10:30:00+00:00" }),
            ],
        );

        let rows = store
            .execute(Query::select("invoices").embed(
                Relation::to_many("items", "invoice_items", "invoice_id")
                    .order_by("created_at", Direction::Ascending),
            ))
            .await
            .unwrap();

        let items: Vec<&str> = rows[0]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(items, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn null_cells_never_satisfy_comparisons() {
        let store = MemoryStore::new();
        store.seed(
            "clients",
            [
                json!({ "name": "Ada", "phone": "555-0100" }),
                json!({ "name": "Bo", "phone": null }),
                json!({ "name": "Cleo" }),
            ],
        );

        let other_phone = store
            .execute(Query::select("clients").filter("phone", Operator::Neq, "555-0199"))
            .await
            .unwrap();
        assert_eq!(names(&other_phone), vec!["Ada"]);

        let no_phone = store
            .execute(
                Query::select("clients")
                    .eq("phone", Value::Null)
                    .order_by("name", Direction::Ascending),
            )
            .await
            .unwrap();
        assert_eq!(names(&no_phone), vec!["Bo", "Cleo"]);

        let with_phone = store
            .execute(Query::select("clients").filter("phone", Operator::Neq, Value::Null))
            .await
            .unwrap();
        assert_eq!(names(&with_phone), vec!["Ada"]);
    }

    #[tokio::test]
    async fn update_and_delete_touch_only_matching_rows() {
        let store = MemoryStore::new();
        store.seed(
            "invoices",
            [
                json!({ "id": "i1", "status": "sent" }),
                json!({ "id": "i2", "status": "sent" }),
            ],
        );

        let updated = store
            .execute(Query::update("invoices", object(json!({ "status": "paid" }))).eq("id", "i1"))
            .await
            .unwrap();
        assert_eq!(updated[0]["status"], json!("paid"));
        assert_eq!(store.rows("invoices")[1]["status"], json!("sent"));

        let removed = store
            .execute(Query::delete("invoices").eq("id", "i2"))
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.rows("invoices").len(), 1);

        let err = store.execute(Query::delete("invoices")).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidRequest(_)));
        assert_eq!(store.rows("invoices").len(), 1);
    }

    #[tokio::test]
    async fn fetch_one_enforces_single_row_contract() {
        let store = MemoryStore::new();
        store.seed(
            "clients",
            [
                json!({ "email": "dup@example.com" }),
                json!({ "email": "dup@example.com" }),
                json!({ "email": "solo@example.com" }),
            ],
        );

        let missing = store
            .fetch_one(Query::select("clients").eq("email", "none@example.com"))
            .await;
        assert!(matches!(missing, Err(DbError::NotFound)));

        let dup = store
            .fetch_one(Query::select("clients").eq("email", "dup@example.com"))
            .await;
        assert!(matches!(dup, Err(DbError::MultipleRows(2))));

        let solo = store
            .fetch_optional(Query::select("clients").eq("email", "solo@example.com"))
            .await
            .unwrap();
        assert!(solo.is_some());
    }

    #[tokio::test]
    async fn armed_failure_fires_once_and_is_logged() {
        let store = MemoryStore::new();
        store.fail_next("agents", OperationKind::Select, "connection reset");

        let err = store.execute(Query::select("agents")).await.unwrap_err();
        assert!(matches!(err, DbError::Api { status: 500, ref message, .. } if message == "connection reset"));
        assert!(store.execute(Query::select("agents")).await.is_ok());

        assert_eq!(store.count("agents", OperationKind::Select), 2);
        assert_eq!(store.count("agents", OperationKind::Insert), 0);
    }

    #[test]
    fn numeric_strings_compare_numerically() {
        assert_eq!(compare_values(&json!("100.00"), &json!(100)), Some(Ordering::Equal));
        assert_eq!(compare_values(&json!("9.5"), &json!("10")), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(null), &json!("x")), None);
    }
}
