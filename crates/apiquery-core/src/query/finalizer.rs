//! Key-preservation finalizer.

use apiquery_proto::GetResult;

use super::executor::Fetched;

/// Produce the caller-facing result. Entity maps become dense lists in
/// query order unless keys are preserved.
pub fn finalize(fetched: Fetched, preserve_keys: bool) -> GetResult {
    match fetched {
        Fetched::Count(count) => GetResult::Count(count),
        Fetched::Groups(groups) => GetResult::GroupCounts(groups),
        Fetched::Rows(map) if preserve_keys => GetResult::Map(map),
        Fetched::Rows(map) => GetResult::List(map.into_values()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiquery_proto::{Entity, EntityMap, Key, Value};

    fn map() -> EntityMap {
        [3, 1]
            .into_iter()
            .map(|id| (Key::Int(id), Entity::from_values([("id", Value::Int(id))])))
            .collect()
    }

    #[test]
    fn test_preserve_keys() {
        let result = finalize(Fetched::Rows(map()), true);
        let keys: Vec<_> = result.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec![Key::Int(3), Key::Int(1)]);
    }

    #[test]
    fn test_list_keeps_order() {
        let result = finalize(Fetched::Rows(map()), false);
        let ids: Vec<_> = result
            .as_list()
            .unwrap()
            .iter()
            .map(|e| e.value("id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![Value::Int(3), Value::Int(1)]);
        assert_eq!(finalize(Fetched::Count(4), false), GetResult::Count(4));
    }
}
