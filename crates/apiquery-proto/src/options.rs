//! Typed `get` options.
//!
//! `GetOptions` is the normalized form of the option dictionary a caller
//! passes to an entity accessor. It can be built directly with the builder
//! methods below or decoded from a raw JSON dictionary by the core
//! normalizer, which also validates it against the entity descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Output projection for an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Output {
    /// Every column of the entity.
    #[default]
    Extend,
    /// Only the listed columns.
    Fields(Vec<String>),
}

impl Output {
    /// Create a field-list projection.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Output::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Check whether the projection requests a field.
    pub fn includes(&self, field: &str) -> bool {
        match self {
            Output::Extend => true,
            Output::Fields(fields) => fields.iter().any(|f| f == field),
        }
    }
}

/// What to attach for a related-object output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Select {
    /// Attach the related entities with the given projection.
    Output(Output),
    /// Attach only the number of related entities.
    Count,
    /// Attach related entities produced by a nested option tree.
    Nested(Box<GetOptions>),
}

impl Select {
    /// Attach every column of the related entities.
    pub fn extend() -> Self {
        Select::Output(Output::Extend)
    }

    /// Attach the listed columns of the related entities.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Select::Output(Output::fields(fields))
    }

    /// Check whether this select only counts.
    pub fn is_count(&self) -> bool {
        matches!(self, Select::Count)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column to order by.
    pub field: String,
    /// Sort direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Create an ascending sort spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Create a descending sort spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Pattern search over string columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Search {
    /// Field to patterns; patterns for one field are OR-ed.
    pub fields: BTreeMap<String, Vec<String>>,
    /// OR across fields instead of AND.
    pub by_any: bool,
    /// Anchor patterns at the start of the value instead of matching anywhere.
    pub start: bool,
    /// Negate every search predicate.
    pub exclude: bool,
    /// Treat `*` in a pattern as "any sequence of characters".
    pub wildcards: bool,
    /// Case rule; `None` falls back to the engine default.
    pub case_sensitive: Option<bool>,
}

impl Search {
    /// Check if no field is searched.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Options for one `get` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetOptions {
    /// Id filters keyed by the option name declared on the entity (e.g. `dhostids`).
    pub ids: BTreeMap<String, Vec<Value>>,
    /// Exact-match filters: OR within a field, AND across fields.
    pub filter: BTreeMap<String, Vec<Value>>,
    /// Pattern search.
    pub search: Search,
    /// Projection of the entity's own columns.
    pub output: Output,
    /// Related-object outputs keyed by relation name.
    pub related: BTreeMap<String, Select>,
    /// Return a count instead of entities.
    pub count_output: bool,
    /// With `count_output`, group by the foreign-key id filters present.
    pub group_count: bool,
    /// With `count_output`, group by these columns or id filters.
    pub group_count_by: Vec<String>,
    /// ORDER BY terms.
    pub sort: Vec<SortSpec>,
    /// Maximum number of primary rows.
    pub limit: Option<u64>,
    /// Maximum number of related entities attached per parent and relation.
    pub limit_per_relation: Option<usize>,
    /// Return a map keyed by primary key instead of a dense list.
    pub preserve_keys: bool,
    /// Only rows the caller may modify.
    pub editable: bool,
    /// Skip the permission gate (internal callers only).
    pub no_permissions: bool,
}

impl GetOptions {
    /// Create options with the defaults of a plain `get`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id filter.
    pub fn with_ids<I, V>(mut self, option: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.ids
            .insert(option.into(), ids.into_iter().map(Into::into).collect());
        self
    }

    /// Add an exact-match filter.
    pub fn with_filter<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Add a search pattern for a field.
    pub fn with_search(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.search
            .fields
            .entry(field.into())
            .or_default()
            .push(pattern.into());
        self
    }

    /// Set the output projection.
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Request a related-object output.
    pub fn with_select(mut self, relation: impl Into<String>, select: Select) -> Self {
        self.related.insert(relation.into(), select);
        self
    }

    /// Return a row count.
    pub fn count(mut self) -> Self {
        self.count_output = true;
        self
    }

    /// Return row counts grouped by the filtered foreign keys.
    pub fn group_count(mut self) -> Self {
        self.count_output = true;
        self.group_count = true;
        self
    }

    /// Add an ORDER BY term.
    pub fn sort_by(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    /// Limit the number of primary rows.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Limit the number of related entities per parent.
    pub fn with_limit_per_relation(mut self, limit: usize) -> Self {
        self.limit_per_relation = Some(limit);
        self
    }

    /// Return results keyed by primary key.
    pub fn preserve_keys(mut self) -> Self {
        self.preserve_keys = true;
        self
    }

    /// Only return rows the caller may modify.
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Skip the permission gate.
    pub fn no_permissions(mut self) -> Self {
        self.no_permissions = true;
        self
    }
}
