//! Output projection.

use apiquery_proto::EntityMap;

use super::normalizer::NormalizedQuery;

/// Drop fields that were fetched only for internal use.
///
/// Runs after relation resolution, so foreign keys read by the resolver are
/// gone from the output only once nothing needs them. The primary key,
/// requested fields, attached relations and fields retained for an outer
/// stage are kept.
pub fn project(map: &mut EntityMap, query: &NormalizedQuery<'_>) {
    let relations: Vec<&str> = query
        .relations
        .iter()
        .map(|request| request.relation.name.as_str())
        .collect();

    map.for_each_mut(|_, entity| {
        entity.retain(|field| query.keeps_field(field) || relations.contains(&field));
    });
}
