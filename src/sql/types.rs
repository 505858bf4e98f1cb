//! SQL value types (spec §3 Statement/Condition/OrderKey).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Begin,
    Commit,
    Rollback,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    IsNull,
    IsNotNull,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    Unknown,
}

/// A single normalized `WHERE` condition (spec §3 Condition).
///
/// Invariant: when `operator` is `IsNull`/`IsNotNull`, `value` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Option<String>,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: Option<String>) -> Self {
        let value = match operator {
            Operator::IsNull | Operator::IsNotNull => None,
            _ => value,
        };
        Self {
            column: column.into().to_lowercase(),
            operator,
            value,
        }
    }

    /// A hashable projection used by scope analysis (spec §3 NormalizedClause).
    pub fn normalized_key(&self) -> (String, &'static str, Option<String>) {
        (self.column.clone(), operator_tag(self.operator), self.value.clone())
    }
}

fn operator_tag(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Ne => "!=",
        Operator::Lt => "<",
        Operator::Le => "<=",
        Operator::Gt => ">",
        Operator::Ge => ">=",
        Operator::IsNull => "IS_NULL",
        Operator::IsNotNull => "IS_NOT_NULL",
        Operator::Like => "LIKE",
        Operator::NotLike => "NOT_LIKE",
        Operator::In => "IN",
        Operator::NotIn => "NOT_IN",
        Operator::Between => "BETWEEN",
        Operator::Unknown => "UNKNOWN",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}

/// A parsed SQL statement (spec §3 Statement). Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub primary_table: Option<String>,
    pub columns: Vec<String>,
    pub where_conditions: Vec<Condition>,
    pub order_by: Vec<OrderKey>,
    pub has_limit: bool,
    pub limit_literal: Option<i64>,
    pub has_offset: bool,
    pub offset_literal: Option<i64>,
    pub raw: String,
}

impl Statement {
    pub fn has_where(&self) -> bool {
        !self.where_conditions.is_empty()
    }

    pub fn has_order(&self) -> bool {
        !self.order_by.is_empty()
    }
}
