//! SQL rendering of query plans.

use std::fmt::Write;

use apiquery_proto::{SortOrder, Value};

use crate::catalog::{ColumnRef, Join, JoinCondition};
use crate::query::{Predicate, QueryPlan, SelectExpr, LIKE_ESCAPE};

/// IN lists up to this length bind every value.
const MAX_BOUND_IN: usize = 500;

/// Values per IN list once a list is split.
const IN_CHUNK: usize = 900;

/// A rendered statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameter values in placeholder order.
    pub params: Vec<Value>,
}

/// Render a plan to SQL.
pub fn render(plan: &QueryPlan) -> SqlStatement {
    let mut renderer = SqlRenderer::default();
    renderer.plan(plan);
    SqlStatement {
        sql: renderer.sql,
        params: renderer.params,
    }
}

#[derive(Default)]
struct SqlRenderer {
    sql: String,
    params: Vec<Value>,
}

impl SqlRenderer {
    fn plan(&mut self, plan: &QueryPlan) {
        self.sql.push_str("SELECT ");
        if plan.distinct {
            self.sql.push_str("DISTINCT ");
        }
        for (i, item) in plan.select.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            match &item.expr {
                SelectExpr::Column(column) => self.column(column),
                SelectExpr::CountDistinct(column) => {
                    self.sql.push_str("COUNT(DISTINCT ");
                    self.column(column);
                    self.sql.push(')');
                }
            }
            self.sql.push_str(" AS ");
            self.ident(&item.name);
        }

        self.sql.push_str(" FROM ");
        self.table(&plan.table, &plan.alias);
        for join in &plan.joins {
            self.sql.push_str(" INNER JOIN ");
            self.table(&join.table, &join.alias);
            self.sql.push_str(" ON ");
            self.join_conditions(join);
        }

        if !plan.predicates.is_empty() {
            self.sql.push_str(" WHERE ");
            self.conjunction(&plan.predicates);
        }

        if !plan.group_by.is_empty() {
            self.sql.push_str(" GROUP BY ");
            for (i, column) in plan.group_by.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.column(column);
            }
        }

        if !plan.order_by.is_empty() {
            self.sql.push_str(" ORDER BY ");
            for (i, term) in plan.order_by.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.column(&term.column);
                self.sql.push_str(match term.order {
                    SortOrder::Asc => " ASC",
                    SortOrder::Desc => " DESC",
                });
            }
        }

        if let Some(limit) = plan.limit {
            let _ = write!(self.sql, " LIMIT {limit}");
        }
    }

    fn ident(&mut self, name: &str) {
        self.sql.push('"');
        self.sql.push_str(&name.replace('"', "\"\""));
        self.sql.push('"');
    }

    fn table(&mut self, table: &str, alias: &str) {
        self.ident(table);
        self.sql.push(' ');
        self.ident(alias);
    }

    fn column(&mut self, column: &ColumnRef) {
        self.ident(&column.alias);
        self.sql.push('.');
        self.ident(&column.column);
    }

    fn param(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }

    /// Integer lists are written inline in chunks so batched key sets never
    /// run into the host parameter limit.
    fn long_in(&mut self, column: &ColumnRef, values: &[Value]) {
        self.sql.push('(');
        for (i, chunk) in values.chunks(IN_CHUNK).enumerate() {
            if i > 0 {
                self.sql.push_str(" OR ");
            }
            self.column(column);
            self.sql.push_str(" IN (");
            for (j, value) in chunk.iter().enumerate() {
                if j > 0 {
                    self.sql.push_str(", ");
                }
                match value {
                    Value::Int(n) => {
                        let _ = write!(self.sql, "{n}");
                    }
                    other => self.param(other.clone()),
                }
            }
            self.sql.push(')');
        }
        self.sql.push(')');
    }

    fn join_conditions(&mut self, join: &Join) {
        if join.on.is_empty() {
            self.sql.push_str("1=1");
            return;
        }
        for (i, condition) in join.on.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" AND ");
            }
            self.join_condition(condition);
        }
    }

    fn join_condition(&mut self, condition: &JoinCondition) {
        match condition {
            JoinCondition::Eq(left, right) => {
                self.column(left);
                self.sql.push_str(" = ");
                self.column(right);
            }
            JoinCondition::NullSafeEq(left, right) => {
                self.sql.push('(');
                self.column(left);
                self.sql.push_str(" = ");
                self.column(right);
                self.sql.push_str(" OR (");
                self.column(left);
                self.sql.push_str(" IS NULL AND ");
                self.column(right);
                self.sql.push_str(" IS NULL))");
            }
        }
    }

    fn conjunction(&mut self, predicates: &[Predicate]) {
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(" AND ");
            }
            self.predicate(predicate);
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::In { values, .. } if values.is_empty() => self.sql.push_str("1=0"),
            Predicate::In { column, values } if values.len() == 1 => {
                self.column(column);
                self.sql.push_str(" = ");
                self.param(values[0].clone());
            }
            Predicate::In { column, values } if values.len() <= MAX_BOUND_IN => {
                self.column(column);
                self.sql.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.param(value.clone());
                }
                self.sql.push(')');
            }
            Predicate::In { column, values } => self.long_in(column, values),
            Predicate::Like {
                column,
                pattern,
                case_insensitive,
            } => {
                if *case_insensitive {
                    self.sql.push_str("UPPER(");
                    self.column(column);
                    self.sql.push(')');
                } else {
                    self.column(column);
                }
                self.sql.push_str(" LIKE ");
                self.param(Value::String(pattern.clone()));
                let _ = write!(self.sql, " ESCAPE '{LIKE_ESCAPE}'");
            }
            Predicate::Not(inner) => {
                self.sql.push_str("NOT (");
                self.predicate(inner);
                self.sql.push(')');
            }
            Predicate::And(items) if items.is_empty() => self.sql.push_str("1=1"),
            Predicate::And(items) => {
                self.sql.push('(');
                self.conjunction(items);
                self.sql.push(')');
            }
            Predicate::Or(items) if items.is_empty() => self.sql.push_str("1=0"),
            Predicate::Or(items) => {
                self.sql.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(" OR ");
                    }
                    self.predicate(item);
                }
                self.sql.push(')');
            }
            Predicate::Exists { joins, predicates } => {
                self.sql.push_str("EXISTS (SELECT 1 FROM ");
                for (i, join) in joins.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.table(&join.table, &join.alias);
                }
                let conditions: Vec<&JoinCondition> =
                    joins.iter().flat_map(|join| join.on.iter()).collect();
                if !conditions.is_empty() || !predicates.is_empty() {
                    self.sql.push_str(" WHERE ");
                    for (i, condition) in conditions.iter().enumerate() {
                        if i > 0 {
                            self.sql.push_str(" AND ");
                        }
                        self.join_condition(condition);
                    }
                    if !conditions.is_empty() && !predicates.is_empty() {
                        self.sql.push_str(" AND ");
                    }
                    self.conjunction(predicates);
                }
                self.sql.push(')');
            }
            Predicate::False => self.sql.push_str("1=0"),
        }
    }
}
