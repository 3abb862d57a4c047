//! Option normalization.
//!
//! Validates [`GetOptions`] against an entity descriptor, coerces filter
//! values to column types, resolves related-object selects into nested
//! queries and applies the permission gate. The output is a
//! [`NormalizedQuery`] that the planner can turn into a plan without further
//! checks.

use std::collections::BTreeSet;

use apiquery_proto::{GetOptions, Output, Select, SortSpec, Value};
use tracing::warn;

use crate::catalog::{
    Catalog, ColumnRef, ColumnType, EntityDescriptor, FieldDef, IdFilterDef, Join, RelationSpec,
};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::security::{CallerContext, PermissionProvider};

/// Largest limit a SQL backend accepts.
const MAX_LIMIT: u64 = i64::MAX as u64;

/// Search settings with the case rule resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchSpec {
    /// Field to patterns.
    pub terms: Vec<(String, Vec<String>)>,
    /// OR across fields.
    pub by_any: bool,
    /// Anchor at start.
    pub start: bool,
    /// Negate.
    pub exclude: bool,
    /// `*` wildcards.
    pub wildcards: bool,
    /// Case-sensitive matching.
    pub case_sensitive: bool,
}

/// A grouped-count column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupColumn<'a> {
    /// Output name.
    pub name: String,
    /// Grouped column.
    pub column: ColumnRef,
    /// Joins needed to reach the column.
    pub via: &'a [Join],
}

/// What the executor produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMode<'a> {
    /// Entities keyed by primary key.
    Rows,
    /// A single row count.
    Count,
    /// Row counts per group.
    GroupCount(Vec<GroupColumn<'a>>),
}

/// A related-object output to resolve after the primary query.
#[derive(Debug, Clone)]
pub struct RelationRequest<'a> {
    /// The relation.
    pub relation: &'a RelationSpec,
    /// Query over the related entity; the resolver adds the key constraint.
    pub query: NormalizedQuery<'a>,
    /// Attach a count instead of entities.
    pub count: bool,
}

/// Validated options for one entity.
#[derive(Debug, Clone)]
pub struct NormalizedQuery<'a> {
    /// Queried entity.
    pub entity: &'a EntityDescriptor,
    /// The caller is below the read role; the result is empty.
    pub denied: bool,
    /// Id filters with coerced values.
    pub id_filters: Vec<(&'a IdFilterDef, Vec<Value>)>,
    /// Restrictions of local columns to value sets, from the editable scope
    /// or from the relation resolver.
    pub constraints: Vec<(String, Vec<Value>)>,
    /// Exact-match filters with coerced values.
    pub filter: Vec<(String, Vec<Value>)>,
    /// Search.
    pub search: SearchSpec,
    /// Requested projection.
    pub output: Output,
    /// Relations to resolve, in declaration order.
    pub relations: Vec<RelationRequest<'a>>,
    /// Output mode.
    pub mode: ResultMode<'a>,
    /// ORDER BY terms.
    pub sort: Vec<SortSpec>,
    /// Row limit.
    pub limit: Option<u64>,
    /// Per-parent limit for related collections.
    pub limit_per_relation: Option<usize>,
    /// Return a keyed map.
    pub preserve_keys: bool,
    /// Fields an outer stage needs even if not requested.
    pub retain: BTreeSet<String>,
}

impl<'a> NormalizedQuery<'a> {
    /// Check if the rows should carry a field after projection.
    pub fn keeps_field(&self, field: &str) -> bool {
        field == self.entity.primary_key
            || self.output.includes(field)
            || self.retain.contains(field)
    }
}

/// Normalizes options for one caller.
pub struct Normalizer<'a> {
    catalog: &'a Catalog,
    config: &'a EngineConfig,
    permissions: &'a dyn PermissionProvider,
    caller: CallerContext,
}

impl<'a> Normalizer<'a> {
    /// Create a normalizer.
    pub fn new(
        catalog: &'a Catalog,
        config: &'a EngineConfig,
        permissions: &'a dyn PermissionProvider,
        caller: CallerContext,
    ) -> Self {
        Self {
            catalog,
            config,
            permissions,
            caller,
        }
    }

    /// Normalize top-level options.
    pub fn normalize(
        &self,
        entity: &'a EntityDescriptor,
        options: &GetOptions,
    ) -> Result<NormalizedQuery<'a>> {
        self.normalize_at(entity, options, 0, options.no_permissions)
    }

    fn normalize_at(
        &self,
        entity: &'a EntityDescriptor,
        options: &GetOptions,
        depth: usize,
        no_permissions: bool,
    ) -> Result<NormalizedQuery<'a>> {
        let nested = depth > 0;
        if nested {
            check_nested(options)?;
        }

        let mut id_filters = Vec::with_capacity(options.ids.len());
        for (option, values) in &options.ids {
            let def = entity.id_filter(option).ok_or_else(|| {
                Error::invalid_option(
                    option,
                    format!("unknown id filter for entity '{}'", entity.name),
                )
            })?;
            id_filters.push((def, coerce_all(option, def.column_type, values)?));
        }

        let mut filter = Vec::with_capacity(options.filter.len());
        for (field, values) in &options.filter {
            let def = known_field(entity, field, "filter")?;
            filter.push((field.clone(), coerce_all(field, def.column_type, values)?));
        }

        let search = self.search(entity, options)?;

        if let Output::Fields(fields) = &options.output {
            for field in fields {
                known_field(entity, field, "output")?;
            }
        }

        let relations = self.relations(entity, options, depth, no_permissions)?;
        let mode = group_mode(entity, options)?;

        for spec in &options.sort {
            if !entity.is_sortable(&spec.field) {
                return Err(Error::invalid_option(
                    &spec.field,
                    format!("not a sortable field of entity '{}'", entity.name),
                ));
            }
        }

        let limit = if nested {
            None
        } else {
            if let Some(limit) = options.limit.filter(|limit| *limit > MAX_LIMIT) {
                return Err(Error::invalid_option(
                    "limit",
                    format!("{limit} exceeds the maximum of {MAX_LIMIT}"),
                ));
            }
            options
                .limit
                .filter(|limit| *limit > 0)
                .or(self.config.row_ceiling)
                .map(|limit| limit.min(MAX_LIMIT))
        };

        let mut denied = false;
        let mut constraints = Vec::new();
        if !no_permissions {
            if !self
                .permissions
                .has_min_role(entity, &self.caller, entity.access.read)
            {
                warn!(
                    entity = %entity.name,
                    role = %self.caller.role,
                    user_id = self.caller.user_id,
                    "caller below minimum read role, returning empty result"
                );
                denied = true;
            }
            if options.editable {
                let scope = self.permissions.editable_scope(entity, &self.caller);
                if let Some(keys) = scope.key_values() {
                    constraints.push((entity.primary_key.clone(), keys));
                }
            }
        }

        Ok(NormalizedQuery {
            entity,
            denied,
            id_filters,
            constraints,
            filter,
            search,
            output: options.output.clone(),
            relations,
            mode,
            sort: options.sort.clone(),
            limit,
            limit_per_relation: options.limit_per_relation,
            preserve_keys: options.preserve_keys,
            retain: BTreeSet::new(),
        })
    }

    fn search(&self, entity: &EntityDescriptor, options: &GetOptions) -> Result<SearchSpec> {
        let mut terms = Vec::with_capacity(options.search.fields.len());
        for (field, patterns) in &options.search.fields {
            let def = known_field(entity, field, "search")?;
            if def.column_type != ColumnType::String {
                return Err(Error::invalid_option(
                    field,
                    "search is only supported on text fields",
                ));
            }
            let patterns: Vec<String> =
                patterns.iter().filter(|p| !p.is_empty()).cloned().collect();
            if !patterns.is_empty() {
                terms.push((field.clone(), patterns));
            }
        }
        Ok(SearchSpec {
            terms,
            by_any: options.search.by_any,
            start: options.search.start,
            exclude: options.search.exclude,
            wildcards: options.search.wildcards,
            case_sensitive: options
                .search
                .case_sensitive
                .unwrap_or(self.config.search_case_sensitive),
        })
    }

    fn relations(
        &self,
        entity: &'a EntityDescriptor,
        options: &GetOptions,
        depth: usize,
        no_permissions: bool,
    ) -> Result<Vec<RelationRequest<'a>>> {
        for name in options.related.keys() {
            if entity.relation(name).is_none() {
                return Err(Error::invalid_option(
                    name,
                    format!("unknown relation for entity '{}'", entity.name),
                ));
            }
        }

        let mut requests = Vec::new();
        for relation in &entity.relations {
            let Some(select) = options.related.get(&relation.name) else {
                continue;
            };
            if depth + 1 > self.config.max_relation_depth {
                return Err(Error::invalid_option(
                    &relation.option,
                    format!(
                        "related objects nested deeper than {} levels",
                        self.config.max_relation_depth
                    ),
                ));
            }

            let target = self.catalog.get(&relation.target)?;
            let (sub_options, count) = match select {
                Select::Output(output) => (GetOptions::new().with_output(output.clone()), false),
                Select::Count => (GetOptions::new().with_output(Output::Fields(Vec::new())), true),
                Select::Nested(nested) => ((**nested).clone(), false),
            };

            let mut query = self.normalize_at(target, &sub_options, depth + 1, no_permissions)?;
            if query.sort.is_empty() {
                query.sort.push(SortSpec::asc(target.natural_sort_field()));
            }
            requests.push(RelationRequest {
                relation,
                query,
                count,
            });
        }
        Ok(requests)
    }
}

fn check_nested(options: &GetOptions) -> Result<()> {
    let forbidden = [
        ("ids", !options.ids.is_empty()),
        ("countOutput", options.count_output),
        ("groupCount", options.group_count || !options.group_count_by.is_empty()),
        ("limit", options.limit.is_some()),
        ("preservekeys", options.preserve_keys),
        ("editable", options.editable),
    ];
    match forbidden.iter().find(|(_, set)| *set) {
        Some((option, _)) => Err(Error::invalid_option(
            *option,
            "not allowed in a related-object select",
        )),
        None => Ok(()),
    }
}

fn group_mode<'a>(entity: &'a EntityDescriptor, options: &GetOptions) -> Result<ResultMode<'a>> {
    if !options.count_output {
        return Ok(ResultMode::Rows);
    }
    if !options.group_count && options.group_count_by.is_empty() {
        return Ok(ResultMode::Count);
    }

    let mut columns: Vec<GroupColumn<'a>> = Vec::new();
    let mut push = |column: GroupColumn<'a>| {
        if !columns.iter().any(|c| c.column == column.column) {
            columns.push(column);
        }
    };

    for name in &options.group_count_by {
        if let Some(def) = entity.id_filter(name).filter(|def| def.groupable) {
            push(group_column(def));
        } else if entity.has_field(name) {
            push(GroupColumn {
                name: name.clone(),
                column: entity.column(name),
                via: &[],
            });
        } else {
            return Err(Error::invalid_option(
                name,
                format!("cannot group entity '{}' by this column", entity.name),
            ));
        }
    }

    if options.group_count {
        for def in entity.id_filters.iter().filter(|def| def.groupable) {
            if options.ids.contains_key(&def.option) {
                push(group_column(def));
            }
        }
    }

    if columns.is_empty() {
        return Err(Error::invalid_option(
            "groupCount",
            "requires a groupable id filter or groupCountBy",
        ));
    }
    Ok(ResultMode::GroupCount(columns))
}

fn group_column(def: &IdFilterDef) -> GroupColumn<'_> {
    GroupColumn {
        name: def.column.column.clone(),
        column: def.column.clone(),
        via: &def.via,
    }
}

fn known_field<'e>(
    entity: &'e EntityDescriptor,
    field: &str,
    context: &str,
) -> Result<&'e FieldDef> {
    entity.field(field).ok_or_else(|| {
        Error::invalid_option(
            field,
            format!("{context}: not a field of entity '{}'", entity.name),
        )
    })
}

fn coerce_all(option: &str, column_type: ColumnType, values: &[Value]) -> Result<Vec<Value>> {
    values
        .iter()
        .map(|value| {
            column_type
                .coerce(value)
                .map_err(|err| Error::invalid_option(option, err.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery;
    use crate::security::RolePermissions;
    use apiquery_proto::SortOrder;

    struct Fixture {
        catalog: Catalog,
        config: EngineConfig,
        permissions: RolePermissions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: discovery::catalog().unwrap(),
                config: EngineConfig::default(),
                permissions: RolePermissions::new(),
            }
        }

        fn normalize(
            &self,
            entity: &str,
            caller: &CallerContext,
            options: &GetOptions,
        ) -> Result<NormalizedQuery<'_>> {
            let normalizer =
                Normalizer::new(&self.catalog, &self.config, &self.permissions, *caller);
            normalizer.normalize(self.catalog.get(entity)?, options)
        }
    }

    #[test]
    fn test_coerces_ids_and_filters() {
        let fixture = Fixture::new();
        let options = GetOptions::new()
            .with_ids("dserviceids", ["1", "2"])
            .with_filter("status", ["0"]);
        let query = fixture
            .normalize("dservice", &CallerContext::admin(1), &options)
            .unwrap();

        assert_eq!(query.id_filters[0].1, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(query.filter[0].1, vec![Value::Int(0)]);
        assert!(!query.denied);
        assert_eq!(query.mode, ResultMode::Rows);
    }

    #[test]
    fn test_rejects_unknown_names() {
        let fixture = Fixture::new();
        let caller = CallerContext::admin(1);

        let err = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_filter("colour", [1]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "colour"));

        let err = fixture
            .normalize("dservice", &caller, &GetOptions::new().sort_by(SortSpec::asc("dns")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "dns"));

        let err = fixture
            .normalize(
                "dservice",
                &caller,
                &GetOptions::new().with_output(Output::fields(["nope"])),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "nope"));

        let err = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_search("port", "80"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "port"));

        let err = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_ids("itemids", [1]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "itemids"));
    }

    #[test]
    fn test_denied_below_read_role() {
        let fixture = Fixture::new();
        let query = fixture
            .normalize("dservice", &CallerContext::user(3), &GetOptions::new())
            .unwrap();
        assert!(query.denied);

        let query = fixture
            .normalize("dservice", &CallerContext::user(3), &GetOptions::new().no_permissions())
            .unwrap();
        assert!(!query.denied);
    }

    #[test]
    fn test_relations_in_declaration_order_with_natural_sort() {
        let fixture = Fixture::new();
        let options = GetOptions::new()
            .with_select("hosts", Select::Count)
            .with_select("drules", Select::fields(["name"]));
        let query = fixture
            .normalize("dservice", &CallerContext::admin(1), &options)
            .unwrap();

        let names: Vec<_> = query.relations.iter().map(|r| r.relation.name.as_str()).collect();
        assert_eq!(names, vec!["drules", "hosts"]);
        assert_eq!(query.relations[0].query.sort, vec![SortSpec::asc("name")]);
        assert!(query.relations[1].count);
        assert_eq!(query.relations[1].query.output, Output::Fields(vec![]));
    }

    #[test]
    fn test_group_count_columns() {
        let fixture = Fixture::new();
        let options = GetOptions::new()
            .with_ids("druleids", [1])
            .with_ids("dhostids", [1, 2])
            .group_count();
        let query = fixture
            .normalize("dservice", &CallerContext::admin(1), &options)
            .unwrap();

        match &query.mode {
            ResultMode::GroupCount(columns) => {
                let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["dhostid", "druleid"]);
                assert_eq!(columns[1].via.len(), 1);
            }
            other => panic!("Expected group count, got {other:?}"),
        }

        let err = fixture
            .normalize("dservice", &CallerContext::admin(1), &GetOptions::new().group_count())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "groupCount"));
    }

    #[test]
    fn test_depth_limit() {
        let mut fixture = Fixture::new();
        fixture.config = EngineConfig::new().with_max_relation_depth(1);

        let inner = GetOptions::new().with_select("dchecks", Select::Count);
        let options = GetOptions::new().with_select("drules", Select::Nested(Box::new(inner)));
        let err = fixture
            .normalize("dservice", &CallerContext::admin(1), &options)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "selectDChecks"));
    }

    #[test]
    fn test_limit_and_ceiling() {
        let mut fixture = Fixture::new();
        fixture.config = EngineConfig::new().with_row_ceiling(100);
        let caller = CallerContext::admin(1);

        let query = fixture.normalize("dservice", &caller, &GetOptions::new()).unwrap();
        assert_eq!(query.limit, Some(100));

        let query = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_limit(5))
            .unwrap();
        assert_eq!(query.limit, Some(5));

        let options = GetOptions::new()
            .with_select("dhosts", Select::extend())
            .sort_by(SortSpec {
                field: "ip".into(),
                order: SortOrder::Desc,
            });
        let query = fixture.normalize("dservice", &caller, &options).unwrap();
        assert_eq!(query.relations[0].query.limit, None);
    }

    #[test]
    fn test_limit_must_fit_signed_integer() {
        let fixture = Fixture::new();
        let caller = CallerContext::admin(1);

        let query = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_limit(MAX_LIMIT))
            .unwrap();
        assert_eq!(query.limit, Some(MAX_LIMIT));

        let err = fixture
            .normalize("dservice", &caller, &GetOptions::new().with_limit(u64::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "limit"));
    }

    #[test]
    fn test_empty_search_on_unknown_field_is_rejected() {
        let fixture = Fixture::new();
        let options = GetOptions::new().with_search("bogus", "");
        let err = fixture
            .normalize("dservice", &CallerContext::admin(1), &options)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { option, .. } if option == "bogus"));
    }

    #[test]
    fn test_editable_scope_constraint() {
        let mut fixture = Fixture::new();
        fixture.permissions = RolePermissions::new().grant_editable("drule", 4, [1i64]);
        let query = fixture
            .normalize("drule", &CallerContext::admin(4), &GetOptions::new().editable())
            .unwrap();
        assert_eq!(
            query.constraints,
            vec![("druleid".to_string(), vec![Value::Int(1)])]
        );
    }
}
