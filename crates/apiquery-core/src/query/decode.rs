//! Decoding of raw option dictionaries.
//!
//! API callers pass options as a loosely typed JSON object: scalars where
//! lists are expected, ids as strings, `"extend"`/`"count"` keywords. This
//! module turns such an object into [`GetOptions`]. Names are only checked
//! against the option vocabulary here; field-level validation happens in the
//! normalizer.

use std::collections::BTreeMap;

use apiquery_proto::{
    GetOptions, Output, Select, SortOrder, SortSpec, Value, OUTPUT_COUNT, OUTPUT_EXTEND,
};
use serde_json::{Map, Value as Json};

use crate::catalog::{Catalog, EntityDescriptor};
use crate::error::{Error, Result};

/// Options only the top-level call may set.
const TOP_LEVEL_ONLY: [&str; 7] = [
    "countOutput",
    "groupCount",
    "groupCountBy",
    "limit",
    "preservekeys",
    "editable",
    "nopermissions",
];

/// Decode a raw option dictionary for an entity.
///
/// `null` decodes to the defaults.
pub fn decode_options(
    catalog: &Catalog,
    entity: &EntityDescriptor,
    raw: &Json,
) -> Result<GetOptions> {
    match raw {
        Json::Null => Ok(GetOptions::new()),
        Json::Object(object) => decode_object(catalog, entity, object, false),
        _ => Err(Error::invalid_option("options", "expected an object")),
    }
}

fn decode_object(
    catalog: &Catalog,
    entity: &EntityDescriptor,
    object: &Map<String, Json>,
    nested: bool,
) -> Result<GetOptions> {
    let mut options = GetOptions::new();
    let mut sort_fields = Vec::new();
    let mut sort_orders = SortOrders::Default;

    for (key, value) in object {
        // Null means "use the default".
        if value.is_null() {
            continue;
        }
        if nested && TOP_LEVEL_ONLY.contains(&key.as_str()) {
            return Err(Error::invalid_option(
                key,
                "not allowed in a related-object select",
            ));
        }

        match key.as_str() {
            "output" => options.output = decode_output(key, value)?,
            "filter" => options.filter = decode_filter(key, value)?,
            "search" => options.search.fields = decode_search(key, value)?,
            "searchByAny" => options.search.by_any = decode_bool(key, value)?,
            "startSearch" => options.search.start = decode_bool(key, value)?,
            "excludeSearch" => options.search.exclude = decode_bool(key, value)?,
            "searchWildcardsEnabled" => options.search.wildcards = decode_bool(key, value)?,
            "searchCaseSensitive" => {
                options.search.case_sensitive = Some(decode_bool(key, value)?)
            }
            "sortfield" => sort_fields = decode_strings(key, value)?,
            "sortorder" => sort_orders = decode_sort_orders(key, value)?,
            "limitSelects" => {
                options.limit_per_relation = decode_limit(key, value)?
                    .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            }
            "countOutput" => options.count_output = decode_bool(key, value)?,
            "groupCount" => options.group_count = decode_bool(key, value)?,
            "groupCountBy" => options.group_count_by = decode_strings(key, value)?,
            "limit" => options.limit = decode_limit(key, value)?,
            "preservekeys" => options.preserve_keys = decode_bool(key, value)?,
            "editable" => options.editable = decode_bool(key, value)?,
            "nopermissions" => options.no_permissions = decode_bool(key, value)?,
            _ => {
                if let Some(filter) = entity.id_filter(key) {
                    if nested {
                        return Err(Error::invalid_option(
                            key,
                            "id filters are not allowed in a related-object select",
                        ));
                    }
                    options
                        .ids
                        .insert(filter.option.clone(), decode_list(key, value)?);
                } else if let Some(relation) = entity.relation_by_option(key) {
                    let target = catalog.get(&relation.target)?;
                    options.related.insert(
                        relation.name.clone(),
                        decode_select(catalog, target, key, value)?,
                    );
                } else {
                    return Err(Error::invalid_option(
                        key,
                        format!("unknown option for entity '{}'", entity.name),
                    ));
                }
            }
        }
    }

    options.sort = sort_fields
        .into_iter()
        .enumerate()
        .map(|(i, field)| SortSpec {
            field,
            order: sort_orders.at(i),
        })
        .collect();

    Ok(options)
}

/// `sortorder` is either one direction for every sort field or a list
/// paired with `sortfield` by position.
enum SortOrders {
    Default,
    All(SortOrder),
    Each(Vec<SortOrder>),
}

impl SortOrders {
    fn at(&self, index: usize) -> SortOrder {
        match self {
            SortOrders::Default => SortOrder::Asc,
            SortOrders::All(order) => *order,
            SortOrders::Each(orders) => orders.get(index).copied().unwrap_or_default(),
        }
    }
}

fn decode_sort_orders(key: &str, value: &Json) -> Result<SortOrders> {
    match value {
        Json::String(s) => Ok(SortOrders::All(parse_sort_order(key, s)?)),
        Json::Array(items) => items
            .iter()
            .map(|item| match item {
                Json::String(s) => parse_sort_order(key, s),
                other => Err(Error::invalid_option(
                    key,
                    format!("expected ASC or DESC, got {other}"),
                )),
            })
            .collect::<Result<Vec<_>>>()
            .map(SortOrders::Each),
        other => Err(Error::invalid_option(
            key,
            format!("expected a string or a list, got {other}"),
        )),
    }
}

fn parse_sort_order(key: &str, s: &str) -> Result<SortOrder> {
    if s.is_empty() || s.eq_ignore_ascii_case("ASC") {
        Ok(SortOrder::Asc)
    } else if s.eq_ignore_ascii_case("DESC") {
        Ok(SortOrder::Desc)
    } else {
        Err(Error::invalid_option(
            key,
            format!("expected ASC or DESC, got '{s}'"),
        ))
    }
}

fn decode_output(key: &str, value: &Json) -> Result<Output> {
    match value {
        Json::String(s) if s == OUTPUT_EXTEND => Ok(Output::Extend),
        Json::String(_) | Json::Array(_) => Ok(Output::Fields(decode_strings(key, value)?)),
        other => Err(Error::invalid_option(
            key,
            format!("expected \"extend\" or a list of fields, got {other}"),
        )),
    }
}

fn decode_select(
    catalog: &Catalog,
    target: &EntityDescriptor,
    key: &str,
    value: &Json,
) -> Result<Select> {
    match value {
        Json::String(s) if s == OUTPUT_COUNT => Ok(Select::Count),
        Json::Object(object) => Ok(Select::Nested(Box::new(decode_object(
            catalog, target, object, true,
        )?))),
        _ => decode_output(key, value).map(Select::Output),
    }
}

fn decode_filter(key: &str, value: &Json) -> Result<BTreeMap<String, Vec<Value>>> {
    let Json::Object(object) = value else {
        return Err(Error::invalid_option(key, "expected an object"));
    };
    object
        .iter()
        .map(|(field, values)| Ok::<_, Error>((field.clone(), decode_list(field, values)?)))
        .collect()
}

fn decode_search(key: &str, value: &Json) -> Result<BTreeMap<String, Vec<String>>> {
    let Json::Object(object) = value else {
        return Err(Error::invalid_option(key, "expected an object"));
    };
    let mut search = BTreeMap::new();
    for (field, patterns) in object {
        // Empty entries are kept so the field name is still validated.
        let patterns = if patterns.is_null() {
            Vec::new()
        } else {
            decode_strings(field, patterns)?
                .into_iter()
                .filter(|pattern| !pattern.is_empty())
                .collect()
        };
        search.insert(field.clone(), patterns);
    }
    Ok(search)
}

/// A scalar becomes a one-element list.
fn decode_list(key: &str, value: &Json) -> Result<Vec<Value>> {
    let decode = |json: &Json| {
        Value::from_json(json).map_err(|err| Error::invalid_option(key, err.to_string()))
    };
    match value {
        Json::Array(items) => items.iter().map(decode).collect(),
        scalar => Ok(vec![decode(scalar)?]),
    }
}

fn decode_strings(key: &str, value: &Json) -> Result<Vec<String>> {
    let decode = |json: &Json| match json {
        Json::String(s) => Ok(s.clone()),
        other => Err(Error::invalid_option(
            key,
            format!("expected a string, got {other}"),
        )),
    };
    match value {
        Json::Array(items) => items.iter().map(decode).collect(),
        scalar => Ok(vec![decode(scalar)?]),
    }
}

fn decode_bool(key: &str, value: &Json) -> Result<bool> {
    match value {
        Json::Bool(b) => Ok(*b),
        Json::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Json::Number(n) if n.as_i64() == Some(1) => Ok(true),
        other => Err(Error::invalid_option(
            key,
            format!("expected a boolean, got {other}"),
        )),
    }
}

/// Zero means no limit.
fn decode_limit(key: &str, value: &Json) -> Result<Option<u64>> {
    let limit = match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match limit {
        Some(0) => Ok(None),
        Some(limit) => Ok(Some(limit)),
        None => Err(Error::invalid_option(
            key,
            format!("expected a non-negative integer, got {value}"),
        )),
    }
}
