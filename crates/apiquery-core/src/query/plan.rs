//! Backend-neutral query plans.
//!
//! A plan describes one SELECT: a base table, inner joins, a conjunction of
//! predicates, optional grouping, ordering and a row limit. Both storage
//! backends consume the same plan, the SQLite backend by rendering it to SQL
//! and the in-memory backend by evaluating it directly.

use apiquery_proto::{SortOrder, Value};

use crate::catalog::{ColumnRef, Join};

/// Escape character used in LIKE patterns.
pub const LIKE_ESCAPE: char = '!';

/// What a select item computes.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    /// A column value.
    Column(ColumnRef),
    /// Number of distinct non-null values of a column.
    CountDistinct(ColumnRef),
}

/// One output column of a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// Expression.
    pub expr: SelectExpr,
    /// Output column name.
    pub name: String,
}

impl SelectItem {
    /// Select a column under its own name.
    pub fn column(column: ColumnRef) -> Self {
        let name = column.column.clone();
        Self {
            expr: SelectExpr::Column(column),
            name,
        }
    }

    /// Select a column under another name.
    pub fn column_as(column: ColumnRef, name: impl Into<String>) -> Self {
        Self {
            expr: SelectExpr::Column(column),
            name: name.into(),
        }
    }

    /// Count distinct values of a column.
    pub fn count_distinct(column: ColumnRef, name: impl Into<String>) -> Self {
        Self {
            expr: SelectExpr::CountDistinct(column),
            name: name.into(),
        }
    }
}

/// A row predicate. Evaluation follows SQL three-valued logic: comparisons
/// against NULL are unknown, and only rows where the whole WHERE clause is
/// true are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Column equals one of the values. An empty list matches nothing.
    In {
        /// Tested column.
        column: ColumnRef,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// LIKE match with `!` as escape character.
    Like {
        /// Tested column.
        column: ColumnRef,
        /// LIKE pattern; upper-cased when `case_insensitive` is set.
        pattern: String,
        /// Compare upper-cased column values.
        case_insensitive: bool,
    },
    /// Negation.
    Not(Box<Predicate>),
    /// Conjunction; empty is true.
    And(Vec<Predicate>),
    /// Disjunction; empty is false.
    Or(Vec<Predicate>),
    /// A correlated semi-join: some combination of rows from `joins`
    /// satisfies the join conditions and every predicate.
    Exists {
        /// Joined tables; conditions may reference outer aliases.
        joins: Vec<Join>,
        /// Predicates over the joined rows.
        predicates: Vec<Predicate>,
    },
    /// Matches nothing.
    False,
}

impl Predicate {
    /// Column in values.
    pub fn is_in(column: ColumnRef, values: Vec<Value>) -> Self {
        Predicate::In { column, values }
    }

    /// Negate a predicate.
    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    /// Sort column.
    pub column: ColumnRef,
    /// Direction.
    pub order: SortOrder,
}

impl OrderTerm {
    /// Create an order term.
    pub fn new(column: ColumnRef, order: SortOrder) -> Self {
        Self { column, order }
    }
}

/// A complete SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Base table.
    pub table: String,
    /// Base table alias.
    pub alias: String,
    /// Inner joins.
    pub joins: Vec<Join>,
    /// Output columns.
    pub select: Vec<SelectItem>,
    /// Drop duplicate output rows.
    pub distinct: bool,
    /// WHERE clause, AND-ed.
    pub predicates: Vec<Predicate>,
    /// GROUP BY columns.
    pub group_by: Vec<ColumnRef>,
    /// ORDER BY terms.
    pub order_by: Vec<OrderTerm>,
    /// Row limit.
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// Create a plan over a base table with no output columns.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            joins: Vec::new(),
            select: Vec::new(),
            distinct: false,
            predicates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Add a join unless a join with the same alias is already present.
    pub fn add_join(&mut self, join: Join) {
        if !self.joins.iter().any(|j| j.alias == join.alias) {
            self.joins.push(join);
        }
    }

    /// Add an output column unless one with the same name is present.
    pub fn add_select(&mut self, item: SelectItem) {
        if !self.select.iter().any(|s| s.name == item.name) {
            self.select.push(item);
        }
    }

    /// True when the plan aggregates rows.
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self
                .select
                .iter()
                .any(|item| matches!(item.expr, SelectExpr::CountDistinct(_)))
    }
}

/// Escape LIKE metacharacters in a literal search string.
pub fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Match a value against a LIKE pattern using `!` as escape character.
///
/// `%` matches any sequence, `_` any single character.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            LIKE_ESCAPE => {
                if let Some(next) = chars.next() {
                    tokens.push(LikeToken::Literal(next));
                }
            }
            '%' => tokens.push(LikeToken::Any),
            '_' => tokens.push(LikeToken::One),
            c => tokens.push(LikeToken::Literal(c)),
        }
    }
    like_tokens_match(&value, &tokens)
}

#[derive(Debug, Clone, Copy)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

// Greedy matching with single-star backtracking.
fn like_tokens_match(value: &[char], tokens: &[LikeToken]) -> bool {
    let (mut v, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        match tokens.get(t) {
            Some(LikeToken::Any) => {
                backtrack = Some((t, v));
                t += 1;
            }
            Some(LikeToken::One) => {
                v += 1;
                t += 1;
            }
            Some(LikeToken::Literal(c)) if *c == value[v] => {
                v += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    t = star + 1;
                    v = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    tokens[t..].iter().all(|token| matches!(token, LikeToken::Any))
}
