//! Predicate tree and select-query model
//!
//! Composable query fragments shared by the filter walk, the search/find
//! mini-languages, and the pagination engine. Rendering always produces a
//! parameterized statement; values never appear in the SQL text itself.

use crate::filter::FilterOperator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a column reference is qualified in the rendered statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Qualifier {
    /// The entity's own table (`assets.zone`).
    Own(String),
    /// A joined relation alias, rendered quoted (`"Project".name`).
    Foreign(String),
}

/// A column reference, optionally qualified and optionally drilling into a
/// jsonb column via `->>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub qualifier: Option<Qualifier>,
    pub column: String,
    pub json_key: Option<String>,
}

impl ColumnRef {
    pub fn plain(column: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
            json_key: None,
        }
    }

    pub fn own(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(Qualifier::Own(table.into())),
            column: column.into(),
            json_key: None,
        }
    }

    pub fn foreign(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(Qualifier::Foreign(relation.into())),
            column: column.into(),
            json_key: None,
        }
    }

    /// A jsonb text lookup, rendered as `column->>'key'`.
    pub fn json(column: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
            json_key: Some(key.into()),
        }
    }

    /// Render the reference as a SQL identifier expression.
    pub fn render(&self) -> String {
        let base = match &self.qualifier {
            None => self.column.clone(),
            Some(Qualifier::Own(table)) => format!("{}.{}", table, self.column),
            Some(Qualifier::Foreign(relation)) => format!("\"{}\".{}", relation, self.column),
        };
        match &self.json_key {
            Some(key) => format!("{}->>'{}'", base, key),
            None => base,
        }
    }
}

/// One comparison against a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: ColumnRef,
    pub operator: FilterOperator,
    pub value: Value,
}

/// Composable predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Cond(Condition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn cond(column: ColumnRef, operator: FilterOperator, value: Value) -> Self {
        Predicate::Cond(Condition {
            column,
            operator,
            value,
        })
    }

    /// AND this predicate with another, flattening nested ANDs.
    pub fn and_with(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// OR this predicate with another, flattening nested ORs.
    pub fn or_with(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut parts) => {
                parts.push(other);
                Predicate::Or(parts)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    /// Number of leaf conditions in the tree.
    pub fn condition_count(&self) -> usize {
        match self {
            Predicate::Cond(_) => 1,
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().map(Predicate::condition_count).sum()
            }
        }
    }

    /// Whether any leaf requires an unscoped query.
    pub fn needs_unscoped(&self) -> bool {
        match self {
            Predicate::Cond(c) => c.operator.needs_unscoped(),
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().any(Predicate::needs_unscoped)
            }
        }
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Cond(c) => {
                let column = c.column.render();
                if c.operator.is_unary() {
                    format!("{} IS NOT NULL", column)
                } else {
                    params.push(c.value.clone());
                    format!("{} {} ${}", column, c.operator.sql_fragment(), params.len())
                }
            }
            Predicate::And(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.render(params)).collect();
                format!("({})", rendered.join(" AND "))
            }
            Predicate::Or(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.render(params)).collect();
                format!("({})", rendered.join(" OR "))
            }
        }
    }
}

/// Sort direction token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction token; unknown tokens return None so callers can
    /// soft-fail (warn and skip) instead of aborting the query.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

/// A relation join: `LEFT JOIN table AS "Alias" ON "Alias".id = base.local_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub alias: String,
    pub table: String,
    pub local_key: String,
}

/// Delete semantics for the backend collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Set the soft-delete marker; the row stays recoverable.
    Soft,
    /// Remove the row, ignoring the soft-delete scope.
    Hard,
}

/// A composed select query handed to the backend collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    pub table: String,
    pub predicate: Option<Predicate>,
    pub joins: Vec<Join>,
    pub sort: Vec<SortKey>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Include soft-deleted rows.
    pub unscoped: bool,
}

impl SelectQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicate: None,
            joins: Vec::new(),
            sort: Vec::new(),
            offset: None,
            limit: None,
            unscoped: false,
        }
    }

    /// AND a predicate onto the query.
    pub fn and_where(&mut self, predicate: Predicate) {
        if predicate.needs_unscoped() {
            self.unscoped = true;
        }
        self.predicate = Some(match self.predicate.take() {
            None => predicate,
            Some(existing) => existing.and_with(predicate),
        });
    }

    /// Add a join unless the alias is already present.
    pub fn join(&mut self, join: Join) {
        if !self.joins.iter().any(|j| j.alias == join.alias) {
            self.joins.push(join);
        }
    }

    /// Render the full parameterized statement for a SQL backend.
    pub fn render_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT {}.* FROM {}", self.table, self.table);
        for join in &self.joins {
            sql.push_str(&format!(
                " LEFT JOIN {} AS \"{}\" ON \"{}\".id = {}.{}",
                join.table, join.alias, join.alias, self.table, join.local_key
            ));
        }
        let mut clauses = Vec::new();
        if let Some(predicate) = &self.predicate {
            clauses.push(predicate.render(&mut params));
        }
        if !self.unscoped {
            clauses.push(format!("{}.deleted_at IS NULL", self.table));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if !self.sort.is_empty() {
            let keys: Vec<String> = self
                .sort
                .iter()
                .map(|k| {
                    let dir = match k.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", k.column, dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        (sql, params)
    }
}

// =============================================================================
// TESTS
// =============================================================================
