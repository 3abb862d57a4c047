//! Query plan construction.

use apiquery_proto::{SortOrder, Value, ROWS_COUNT};

use super::normalizer::{NormalizedQuery, ResultMode, SearchSpec};
use super::plan::{escape_like, OrderTerm, Predicate, QueryPlan, SelectItem};
use crate::catalog::{ColumnRef, EntityDescriptor, IdFilterDef, Join};

/// Link query column holding the parent key.
pub const LINK_PARENT: &str = "parent_key";
/// Link query column holding the related key.
pub const LINK_CHILD: &str = "child_key";

/// Builds query plans from normalized queries.
pub struct QueryPlanner;

impl QueryPlanner {
    /// Plan the primary query of a normalized request.
    ///
    /// Filter joins are only added to the FROM clause when every hop is
    /// to-one; otherwise the filter becomes an EXISTS semi-join so primary
    /// rows are never multiplied.
    pub fn plan(query: &NormalizedQuery<'_>) -> QueryPlan {
        let entity = query.entity;
        let mut plan = QueryPlan::new(&entity.table, &entity.alias);
        Self::add_predicates(&mut plan, query);

        let pk = entity.primary_key_column();
        match &query.mode {
            ResultMode::Count => {
                plan.add_select(SelectItem::count_distinct(pk, ROWS_COUNT));
            }
            ResultMode::GroupCount(columns) => {
                for group in columns {
                    for join in group.via {
                        plan.add_join(join.clone());
                    }
                    plan.add_select(SelectItem::column_as(group.column.clone(), &group.name));
                    plan.group_by.push(group.column.clone());
                    plan.order_by
                        .push(OrderTerm::new(group.column.clone(), SortOrder::Asc));
                }
                plan.add_select(SelectItem::count_distinct(pk, ROWS_COUNT));
            }
            ResultMode::Rows => {
                plan.add_select(SelectItem::column(pk.clone()));
                for field in entity.field_names() {
                    if query.output.includes(field) || query.retain.contains(field) {
                        plan.add_select(SelectItem::column(entity.column(field)));
                    }
                }
                // Foreign keys the resolver reads before projection.
                for request in &query.relations {
                    if let Some(column) = request.relation.parent_key_column() {
                        plan.add_select(SelectItem::column(entity.column(column)));
                    }
                }

                for spec in &query.sort {
                    plan.order_by
                        .push(OrderTerm::new(entity.column(&spec.field), spec.order));
                }
                if !query.sort.iter().any(|spec| spec.field == entity.primary_key) {
                    plan.order_by.push(OrderTerm::new(pk, SortOrder::Asc));
                }
                plan.limit = query.limit;
            }
        }
        plan
    }

    /// Plan the query that maps parent keys to related keys along a join
    /// chain.
    pub fn link_plan(
        parent: &EntityDescriptor,
        joins: &[Join],
        target: &ColumnRef,
        parent_keys: Vec<Value>,
    ) -> QueryPlan {
        let pk = parent.primary_key_column();
        let mut plan = QueryPlan::new(&parent.table, &parent.alias);
        for join in joins {
            plan.add_join(join.clone());
        }
        plan.add_select(SelectItem::column_as(pk.clone(), LINK_PARENT));
        plan.add_select(SelectItem::column_as(target.clone(), LINK_CHILD));
        plan.distinct = true;
        plan.predicates.push(Predicate::is_in(pk.clone(), parent_keys));
        plan.order_by.push(OrderTerm::new(pk, SortOrder::Asc));
        plan.order_by
            .push(OrderTerm::new(target.clone(), SortOrder::Asc));
        plan
    }

    fn add_predicates(plan: &mut QueryPlan, query: &NormalizedQuery<'_>) {
        let entity = query.entity;
        for (def, values) in &query.id_filters {
            let predicate = Self::id_filter(plan, def, values);
            plan.predicates.push(predicate);
        }
        for (column, values) in &query.constraints {
            plan.predicates
                .push(Predicate::is_in(entity.column(column), values.clone()));
        }
        for (field, values) in &query.filter {
            plan.predicates
                .push(Predicate::is_in(entity.column(field), values.clone()));
        }
        if let Some(predicate) = Self::search(entity, &query.search) {
            plan.predicates.push(predicate);
        }
    }

    fn id_filter(plan: &mut QueryPlan, def: &IdFilterDef, values: &[Value]) -> Predicate {
        let membership = Predicate::is_in(def.column.clone(), values.to_vec());
        if def.is_to_one() {
            for join in &def.via {
                plan.add_join(join.clone());
            }
            return membership;
        }
        Predicate::Exists {
            joins: def.via.clone(),
            predicates: vec![membership],
        }
    }

    /// Patterns of one field are OR-ed; fields are AND-ed, or OR-ed with
    /// `by_any`. `exclude` negates each field's disjunction.
    fn search(entity: &EntityDescriptor, search: &SearchSpec) -> Option<Predicate> {
        if search.terms.is_empty() {
            return None;
        }
        let fields: Vec<Predicate> = search
            .terms
            .iter()
            .map(|(field, patterns)| {
                let likes = patterns
                    .iter()
                    .map(|pattern| Predicate::Like {
                        column: entity.column(field),
                        pattern: like_pattern(pattern, search),
                        case_insensitive: !search.case_sensitive,
                    })
                    .collect();
                let any = Predicate::Or(likes);
                if search.exclude {
                    Predicate::negate(any)
                } else {
                    any
                }
            })
            .collect();

        Some(if search.by_any {
            Predicate::Or(fields)
        } else {
            Predicate::And(fields)
        })
    }
}

/// Build a LIKE pattern from a caller search string.
///
/// With wildcards enabled the pattern must match the whole value and `*`
/// stands for any sequence; otherwise it matches anywhere, or at the start
/// with `start`.
pub fn like_pattern(pattern: &str, search: &SearchSpec) -> String {
    let escaped = escape_like(pattern);
    let escaped = if search.case_sensitive {
        escaped
    } else {
        escaped.to_ascii_uppercase()
    };
    if search.wildcards {
        escaped.replace('*', "%")
    } else if search.start {
        format!("{escaped}%")
    } else {
        format!("%{escaped}%")
    }
}
