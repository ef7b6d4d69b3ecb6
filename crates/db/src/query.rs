//! Store-agnostic description of a single request against one table.
//!
//! A [`Query`] names the table, what to do with it (select, insert, update,
//! delete), which rows it applies to, how the returned rows are ordered and
//! which related rows are embedded in them.  Stores translate it into their
//! own dialect; the gateway never sees a URL or an SQL string.

use std::fmt;

use serde_json::Value;

use crate::store::Row;
use crate::DbError;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// What the query does to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Select,
    /// Insert every row, returning the inserted representation.
    Insert(Vec<Row>),
    /// Apply the patch to every matching row, returning the updated rows.
    Update(Row),
    /// Remove every matching row, returning the removed rows.
    Delete,
}

/// Payload-free tag of an [`Operation`], used for logging and bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Select => OperationKind::Select,
            Self::Insert(_) => OperationKind::Insert,
            Self::Update(_) => OperationKind::Update,
            Self::Delete => OperationKind::Delete,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "select"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Columns of the base table returned by the query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    #[default]
    All,
    List(Vec<String>),
}

/// How an embedded relation joins onto the base row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// The base row holds `local_column`, pointing at the related row's `id`.
    ToOne { local_column: String },
    /// Related rows hold `foreign_column`, pointing at the base row's `id`.
    ToMany { foreign_column: String },
}

/// A related table embedded into every returned row under `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub alias: String,
    pub table: String,
    pub kind: RelationKind,
    /// Ordering of embedded to-many rows; unordered when empty.
    pub order: Vec<Order>,
}

impl Relation {
    pub fn to_one(
        alias: impl Into<String>,
        table: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
            kind: RelationKind::ToOne {
                local_column: local_column.into(),
            },
            order: Vec::new(),
        }
    }

    pub fn to_many(
        alias: impl Into<String>,
        table: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
            kind: RelationKind::ToMany {
                foreign_column: foreign_column.into(),
            },
            order: Vec::new(),
        }
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Filtering & ordering
// ---------------------------------------------------------------------------

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// PostgREST spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One request against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub operation: Operation,
    pub columns: Columns,
    pub relations: Vec<Relation>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
}

impl Query {
    fn new(table: impl Into<String>, operation: Operation) -> Self {
        Self {
            table: table.into(),
            operation,
            columns: Columns::All,
            relations: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(table, Operation::Select)
    }

    pub fn insert(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self::new(table, Operation::Insert(rows))
    }

    pub fn update(table: impl Into<String>, patch: Row) -> Self {
        Self::new(table, Operation::Update(patch))
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(table, Operation::Delete)
    }

    /// Restrict the base-table columns returned.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Columns::List(columns.iter().map(|c| (*c).to_owned()).collect());
        self
    }

    /// Embed a related table into every returned row.
    pub fn embed(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn filter(mut self, column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Updates and deletes must carry at least one filter.
    pub fn ensure_scoped(&self) -> Result<(), DbError> {
        match self.operation {
            Operation::Update(_) | Operation::Delete if self.filters.is_empty() => {
                Err(DbError::InvalidRequest(format!(
                    "refusing to {} every row of '{}'",
                    self.operation.kind(),
                    self.table
                )))
            }
            _ => Ok(()),
        }
    }

    /// Render the projection in PostgREST `select=` syntax, e.g.
    /// `*,agent:agents(*),items:invoice_items(*)`.
    pub fn select_clause(&self) -> String {
        let mut parts: Vec<String> = match &self.columns {
            Columns::All => vec!["*".to_owned()],
            Columns::List(cols) => cols.clone(),
        };
        for relation in &self.relations {
            parts.push(format!("{}:{}(*)", relation.alias, relation.table));
        }
        parts.join(",")
    }
}

/// Render an ordering in PostgREST `order=` syntax, e.g. `created_at.desc,id.asc`.
pub fn order_clause(order: &[Order]) -> String {
    order
        .iter()
        .map(|o| {
            let dir = match o.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            format!("{}.{dir}", o.column)
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_clause_lists_columns_then_relations() {
        let q = Query::select("invoices")
            .embed(Relation::to_one("agent", "agents", "agent_id"))
            .embed(Relation::to_many("items", "invoice_items", "invoice_id"));
        assert_eq!(q.select_clause(), "*,agent:agents(*),items:invoice_items(*)");

        let q = Query::select("invoices").columns(&["total", "status"]);
        assert_eq!(q.select_clause(), "total,status");
    }

    #[test]
    fn builder_accumulates_filters_and_order() {
        let q = Query::select("invoices")
            .eq("agent_id", "a-1")
            .filter("created_at", Operator::Gte, "2026-01-01T00:00:00+00:00")
            .order_by("created_at", Direction::Descending);

        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].value, json!("a-1"));
        assert_eq!(q.filters[1].operator, Operator::Gte);
        assert_eq!(q.order[0].direction, Direction::Descending);
        assert_eq!(q.operation.kind(), OperationKind::Select);
    }
}
