//! Integration tests for `get` over the discovery schema.
//!
//! Every scenario runs against both storage backends, loaded with the same
//! sample data.

use apiquery_core::discovery::{self, fixture};
use apiquery_core::{
    CallerContext, Engine, EngineConfig, Error, Loader, MemoryStore, RolePermissions, SqliteStore,
    Storage, TableSchema,
};
use apiquery_proto::{Entity, FieldValue, GetOptions, GetResult, Key, Select, SortSpec, Value};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

struct TestContext {
    backend: &'static str,
    engine: Engine<Box<dyn Storage>>,
    _db_dir: Option<tempfile::TempDir>,
}

impl TestContext {
    fn memory() -> Self {
        let store = MemoryStore::new();
        fixture::load(&store).unwrap();
        let storage: Box<dyn Storage> = Box::new(store);
        Self {
            backend: "memory",
            engine: Engine::new(discovery::catalog().unwrap(), storage),
            _db_dir: None,
        }
    }

    fn sqlite() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("discovery.db")).unwrap();
        fixture::load(&store).unwrap();
        let storage: Box<dyn Storage> = Box::new(store);
        Self {
            backend: "sqlite",
            engine: Engine::new(discovery::catalog().unwrap(), storage),
            _db_dir: Some(dir),
        }
    }

    fn all() -> Vec<Self> {
        vec![Self::memory(), Self::sqlite()]
    }

    fn get(&self, entity: &str, raw: Json) -> GetResult {
        self.get_as(entity, raw, &CallerContext::admin(1))
    }

    fn get_as(&self, entity: &str, raw: Json, caller: &CallerContext) -> GetResult {
        self.engine
            .get_json(entity, &raw, caller)
            .unwrap_or_else(|err| panic!("[{}] get {entity} failed: {err}", self.backend))
    }
}

fn int(entity: &Entity, field: &str) -> i64 {
    entity
        .value(field)
        .and_then(Value::as_i64)
        .unwrap_or_else(|| panic!("missing integer field {field} in {entity:?}"))
}

fn list(result: &GetResult) -> &[Entity] {
    result
        .as_list()
        .unwrap_or_else(|| panic!("expected a list, got {result:?}"))
}

fn ids(result: &GetResult, pk: &str) -> Vec<i64> {
    list(result).iter().map(|e| int(e, pk)).collect()
}

fn related<'a>(entity: &'a Entity, name: &str) -> &'a [Entity] {
    entity
        .get(name)
        .and_then(FieldValue::as_list)
        .unwrap_or_else(|| panic!("missing related list {name} in {entity:?}"))
}

fn related_ids(entity: &Entity, name: &str, pk: &str) -> Vec<i64> {
    related(entity, name).iter().map(|e| int(e, pk)).collect()
}

#[test]
fn test_ids_and_status_filter() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({"dserviceids": ["1", "2", "3", "4"], "filter": {"status": 0}}),
        );
        assert_eq!(ids(&result, "dserviceid"), vec![1, 2, 3], "{}", ctx.backend);
    }
}

#[test]
fn test_default_output_extends_and_orders_by_key() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", Json::Null);
        assert_eq!(ids(&result, "dserviceid"), vec![1, 2, 3, 4, 5, 6, 7], "{}", ctx.backend);

        let first = &list(&result)[0];
        assert_eq!(first.len(), 12, "{}", ctx.backend);
        assert_eq!(first.value("ip"), Some(&Value::from("192.168.1.10")));
        assert_eq!(first.value("dns"), Some(&Value::from("web01.local")));
    }
}

#[test]
fn test_output_fields_keep_primary_key() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", json!({"output": ["ip"], "dserviceids": 5}));
        let entity = &list(&result)[0];
        assert_eq!(
            entity.field_names().collect::<Vec<_>>(),
            vec!["dserviceid", "ip"],
            "{}",
            ctx.backend
        );
        assert_eq!(entity.value("ip"), Some(&Value::from("10.0.0.5")));
    }
}

#[test]
fn test_count_matches_filtered_rows() {
    for ctx in TestContext::all() {
        for raw in [
            json!({"filter": {"status": 0}}),
            json!({"druleids": [1]}),
            json!({"search": {"dns": "local"}}),
            json!({}),
        ] {
            let rows = ctx.get("dservice", raw.clone());
            let mut counted = raw.clone();
            counted["countOutput"] = json!(true);
            let count = ctx.get("dservice", counted);
            assert_eq!(
                count.as_count(),
                Some(list(&rows).len() as u64),
                "[{}] {raw}",
                ctx.backend
            );
        }
    }
}

#[test]
fn test_count_ignores_limit_and_selects() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({"countOutput": true, "limit": 2, "selectHosts": "extend"}),
        );
        assert_eq!(result, GetResult::Count(7), "{}", ctx.backend);
    }
}

#[test]
fn test_druleids_semi_join() {
    for ctx in TestContext::all() {
        let local = ctx.get("dservice", json!({"druleids": 1}));
        assert_eq!(ids(&local, "dserviceid"), vec![1, 2, 3, 4], "{}", ctx.backend);

        let dmz = ctx.get("dservice", json!({"druleids": [2]}));
        assert_eq!(ids(&dmz, "dserviceid"), vec![5, 6], "{}", ctx.backend);

        let rules = ctx.get("drule", json!({"dserviceids": [1, 2, 5], "output": ["name"]}));
        assert_eq!(ids(&rules, "druleid"), vec![1, 2], "{}", ctx.backend);
    }
}

#[test]
fn test_group_count_by_filtered_key() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({"druleids": [1, 2], "countOutput": true, "groupCount": true}),
        );
        let groups: Vec<(Value, u64)> = result
            .as_group_counts()
            .unwrap()
            .iter()
            .map(|g| (g.group["druleid"].clone(), g.count))
            .collect();
        assert_eq!(
            groups,
            vec![(Value::Int(1), 4), (Value::Int(2), 2)],
            "{}",
            ctx.backend
        );

        let result = ctx.get(
            "dservice",
            json!({"dhostids": [1, 2, 3], "countOutput": true, "groupCount": true}),
        );
        let groups: Vec<(Value, u64)> = result
            .as_group_counts()
            .unwrap()
            .iter()
            .map(|g| (g.group["dhostid"].clone(), g.count))
            .collect();
        assert_eq!(
            groups,
            vec![(Value::Int(1), 2), (Value::Int(2), 2), (Value::Int(3), 1)],
            "{}",
            ctx.backend
        );
    }
}

#[test]
fn test_group_count_without_groupable_filter_is_rejected() {
    let ctx = TestContext::memory();
    let err = ctx
        .engine
        .get_json(
            "dservice",
            &json!({"countOutput": true, "groupCount": true}),
            &CallerContext::admin(1),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOption { .. }), "{err}");
}

#[test]
fn test_preserve_keys_maps_primary_key() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", json!({"preservekeys": true, "dhostids": [1, 3]}));
        let map = result.as_map().unwrap();
        let keys: Vec<Key> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Key::Int(1), Key::Int(2), Key::Int(5)], "{}", ctx.backend);
        for (key, entity) in map.iter() {
            assert_eq!(entity.value("dserviceid").and_then(Value::as_key).as_ref(), Some(key));
        }
    }
}

#[test]
fn test_sort_and_limit() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({"sortfield": "ip", "sortorder": "DESC", "limit": 3, "output": ["ip"]}),
        );
        // Equal IPs fall back to ascending primary key.
        assert_eq!(ids(&result, "dserviceid"), vec![4, 3, 1], "{}", ctx.backend);

        let unlimited = ctx.get("dservice", json!({"limit": 0}));
        assert_eq!(list(&unlimited).len(), 7, "{}", ctx.backend);
    }
}

#[test]
fn test_filters_or_within_field_and_across_fields() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", json!({"filter": {"port": [22, 25]}}));
        assert_eq!(ids(&result, "dserviceid"), vec![1, 3, 5, 6], "{}", ctx.backend);

        let result = ctx.get("dservice", json!({"filter": {"port": [22, 25], "status": 0}}));
        assert_eq!(ids(&result, "dserviceid"), vec![1, 3, 5], "{}", ctx.backend);

        let result = ctx.get("dservice", json!({"filter": {"port": "80"}}));
        assert_eq!(ids(&result, "dserviceid"), vec![2, 4], "{}", ctx.backend);
    }
}

#[test]
fn test_search_modes() {
    for ctx in TestContext::all() {
        let search = |raw: Json| ids(&ctx.get("dservice", raw), "dserviceid");

        assert_eq!(search(json!({"search": {"ip": "1.1"}})), vec![1, 2, 3, 4]);
        assert_eq!(
            search(json!({"search": {"ip": "10."}, "startSearch": true})),
            vec![5, 6]
        );
        assert_eq!(
            search(json!({"search": {"dns": "*.local"}, "searchWildcardsEnabled": true})),
            vec![1, 2, 3, 4]
        );
        assert_eq!(search(json!({"search": {"dns": "*.local"}})), Vec::<i64>::new());
        assert_eq!(search(json!({"search": {"dns": "WEB01"}})), vec![1, 2]);
        assert_eq!(
            search(json!({"search": {"dns": "WEB01"}, "searchCaseSensitive": true})),
            Vec::<i64>::new()
        );
        assert_eq!(
            search(json!({"search": {"dns": "local"}, "excludeSearch": true})),
            vec![5, 6, 7]
        );
        assert_eq!(
            search(json!({"search": {"dns": "web01", "ip": "10.0.0"}, "searchByAny": true})),
            vec![1, 2, 5, 6]
        );
        assert_eq!(
            search(json!({"search": {"dns": "db01", "ip": "1.12"}})),
            vec![4]
        );
        assert_eq!(search(json!({"search": {"dns": ["web", "mail"]}})), vec![1, 2, 5]);
        // Empty patterns are ignored.
        assert_eq!(search(json!({"search": {"dns": ""}})).len(), 7);
    }
}

#[test]
fn test_search_escapes_like_metacharacters() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", json!({"search": {"dns": "web0_"}}));
        assert!(list(&result).is_empty(), "{}", ctx.backend);

        let result = ctx.get("dcheck", json!({"search": {"key_": "sysName.0"}}));
        assert_eq!(ids(&result, "dcheckid"), vec![4], "{}", ctx.backend);
    }
}

#[test]
fn test_select_hosts_count_covers_every_service() {
    for ctx in TestContext::all() {
        let result = ctx.get("dservice", json!({"output": ["ip"], "selectHosts": "count"}));
        let counts: Vec<(i64, u64)> = list(&result)
            .iter()
            .map(|e| {
                let count = e.get("hosts").and_then(FieldValue::as_count);
                (int(e, "dserviceid"), count.expect("every service carries a host count"))
            })
            .collect();
        assert_eq!(
            counts,
            vec![(1, 2), (2, 2), (3, 1), (4, 1), (5, 2), (6, 0), (7, 0)],
            "{}",
            ctx.backend
        );
    }
}

#[test]
fn test_select_hosts_follows_proxy_and_ip() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({"dserviceids": [1, 5, 6], "selectHosts": ["host"]}),
        );
        let services = list(&result);
        assert_eq!(related_ids(&services[0], "hosts", "hostid"), vec![10, 14], "{}", ctx.backend);
        assert_eq!(related_ids(&services[1], "hosts", "hostid"), vec![12, 13], "{}", ctx.backend);
        assert!(related(&services[2], "hosts").is_empty(), "{}", ctx.backend);

        let host = &related(&services[0], "hosts")[0];
        assert_eq!(host.value("host"), Some(&Value::from("web01")));
    }
}

#[test]
fn test_limit_selects_returns_first_related() {
    for ctx in TestContext::all() {
        let rules = ctx.get(
            "drule",
            json!({"output": ["name"], "selectDChecks": ["type"], "limitSelects": 1}),
        );
        let first = &list(&rules)[0];
        assert_eq!(int(first, "druleid"), 1, "{}", ctx.backend);
        assert_eq!(related_ids(first, "dchecks", "dcheckid"), vec![1], "{}", ctx.backend);

        let services = ctx.get(
            "dservice",
            json!({"dserviceids": 1, "selectHosts": "extend", "limitSelects": 1}),
        );
        assert_eq!(
            related_ids(&list(&services)[0], "hosts", "hostid"),
            vec![10],
            "{}",
            ctx.backend
        );
    }
}

#[test]
fn test_limit_selects_follows_natural_sort() {
    for ctx in TestContext::all() {
        let full = ctx.get(
            "host",
            json!({"hostids": 100, "output": ["host"], "selectDRules": ["name"]}),
        );
        let proxy = &list(&full)[0];
        assert_eq!(related_ids(proxy, "drules", "druleid"), vec![4, 2, 5], "{}", ctx.backend);

        let limited = ctx.get(
            "host",
            json!({
                "hostids": 100,
                "output": ["host"],
                "selectDRules": ["name"],
                "limitSelects": 2
            }),
        );
        let rules = related(&list(&limited)[0], "drules");
        assert_eq!(
            rules.iter().map(|r| int(r, "druleid")).collect::<Vec<_>>(),
            vec![4, 2],
            "{}",
            ctx.backend
        );
        assert_eq!(rules[0].value("name"), Some(&Value::from("Alpha segment")));
    }
}

#[test]
fn test_batched_relations_over_many_parents() {
    const PARENTS: i64 = 40_000;

    let store = SqliteStore::open_in_memory().unwrap();
    for descriptor in discovery::descriptors() {
        store.create_table(&TableSchema::for_entity(&descriptor)).unwrap();
    }
    store
        .execute_batch(&format!(
            "INSERT INTO drules (druleid, name, status) VALUES (1, 'Bulk', 0);
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < {PARENTS})
             INSERT INTO dhosts (dhostid, druleid, status) SELECT n, 1, 0 FROM seq;
             INSERT INTO dservices (dserviceid, dhostid, ip) SELECT dhostid, dhostid, '10.9.0.1' FROM dhosts;"
        ))
        .unwrap();
    let engine = Engine::new(discovery::catalog().unwrap(), store);
    let admin = CallerContext::admin(1);

    let result = engine
        .get_json(
            "dservice",
            &json!({"output": ["dserviceid"], "selectDHosts": ["dhostid"]}),
            &admin,
        )
        .unwrap();
    let services = list(&result);
    assert_eq!(services.len(), PARENTS as usize);
    assert_eq!(related_ids(&services[0], "dhosts", "dhostid"), vec![1]);
    assert_eq!(related_ids(&services[39_999], "dhosts", "dhostid"), vec![PARENTS]);

    let result = engine
        .get_json(
            "dservice",
            &json!({"output": ["dserviceid"], "selectDRules": ["name"]}),
            &admin,
        )
        .unwrap();
    let services = list(&result);
    assert_eq!(related_ids(&services[0], "drules", "druleid"), vec![1]);
    assert_eq!(related_ids(&services[39_999], "drules", "druleid"), vec![1]);

    let dhostids: Vec<i64> = (1..=PARENTS).collect();
    let result = engine
        .get_json("dhost", &json!({"dhostids": dhostids, "countOutput": true}), &admin)
        .unwrap();
    assert_eq!(result, GetResult::Count(PARENTS as u64));
}

#[test]
fn test_child_relation_strips_unrequested_foreign_key() {
    for ctx in TestContext::all() {
        let result = ctx.get("drule", json!({"druleids": 1, "selectDChecks": ["type"]}));
        let checks = related(&list(&result)[0], "dchecks");
        assert_eq!(checks.len(), 2, "{}", ctx.backend);
        assert_eq!(
            checks[0].field_names().collect::<Vec<_>>(),
            vec!["dcheckid", "type"],
            "{}",
            ctx.backend
        );

        let result = ctx.get("drule", json!({"druleids": 1, "selectDChecks": "extend"}));
        let checks = related(&list(&result)[0], "dchecks");
        assert_eq!(checks[0].value("druleid"), Some(&Value::Int(1)), "{}", ctx.backend);
    }
}

#[test]
fn test_nested_relations() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "drule",
            json!({
                "druleids": [1, 3],
                "output": ["name"],
                "selectDHosts": {
                    "output": ["status"],
                    "selectDServices": ["ip"]
                }
            }),
        );
        let rules = list(&result);
        assert_eq!(ids(&result, "druleid"), vec![1, 3], "{}", ctx.backend);

        let dhosts = related(&rules[0], "dhosts");
        assert_eq!(
            dhosts.iter().map(|d| int(d, "dhostid")).collect::<Vec<_>>(),
            vec![1, 2],
            "{}",
            ctx.backend
        );
        assert_eq!(related_ids(&dhosts[0], "dservices", "dserviceid"), vec![1, 2]);
        assert_eq!(related_ids(&dhosts[1], "dservices", "dserviceid"), vec![3, 4]);
        assert_eq!(
            related(&dhosts[1], "dservices")[1].value("ip"),
            Some(&Value::from("192.168.1.12"))
        );

        let backup = related(&rules[1], "dhosts");
        assert_eq!(related_ids(&backup[0], "dservices", "dserviceid"), vec![7]);
    }
}

#[test]
fn test_select_drules_and_dhosts_from_service() {
    for ctx in TestContext::all() {
        let result = ctx.get(
            "dservice",
            json!({
                "dserviceids": [3, 5],
                "output": ["ip"],
                "selectDRules": ["name"],
                "selectDHosts": "count"
            }),
        );
        let services = list(&result);
        let rule = &related(&services[0], "drules")[0];
        assert_eq!(rule.value("name"), Some(&Value::from("Local network")), "{}", ctx.backend);
        assert_eq!(
            related(&services[1], "drules")[0].value("name"),
            Some(&Value::from("DMZ scan"))
        );
        assert_eq!(services[0].get("dhosts"), Some(&FieldValue::Count(1)));
        // The join column is not part of the requested output.
        assert!(!services[0].contains("dhostid"), "{}", ctx.backend);
    }
}

#[test]
fn test_repeated_calls_are_identical() {
    for ctx in TestContext::all() {
        let raw = json!({
            "output": "extend",
            "selectHosts": "extend",
            "selectDRules": "count",
            "sortfield": ["ip"],
            "preservekeys": true
        });
        let first = ctx.get("dservice", raw.clone());
        let second = ctx.get("dservice", raw);
        assert_eq!(first, second, "{}", ctx.backend);
    }
}

#[test]
fn test_backends_agree() {
    let memory = TestContext::memory();
    let sqlite = TestContext::sqlite();
    for raw in [
        json!({"selectHosts": "extend", "selectDHosts": "extend"}),
        json!({"search": {"dns": "local"}, "excludeSearch": true, "sortfield": "ip"}),
        json!({"dcheckids": [1, 3], "countOutput": true, "groupCount": true}),
    ] {
        let a = memory.get("dservice", raw.clone()).to_json().unwrap();
        let b = sqlite.get("dservice", raw.clone()).to_json().unwrap();
        assert_eq!(a, b, "{raw}");
    }
}

#[test]
fn test_user_below_read_role_gets_empty_result() {
    for ctx in TestContext::all() {
        let user = CallerContext::user(7);

        let result = ctx.get_as("dservice", json!({}), &user);
        assert_eq!(result, GetResult::List(vec![]), "{}", ctx.backend);

        let result = ctx.get_as("dservice", json!({"countOutput": true}), &user);
        assert_eq!(result, GetResult::Count(0), "{}", ctx.backend);

        let result = ctx.get_as("dservice", json!({"preservekeys": true}), &user);
        assert!(result.as_map().unwrap().is_empty(), "{}", ctx.backend);

        // Hosts are readable by users.
        let hosts = ctx.get_as("host", json!({"hostids": [10, 11]}), &user);
        assert_eq!(ids(&hosts, "hostid"), vec![10, 11], "{}", ctx.backend);
    }
}

#[test]
fn test_user_related_objects_are_filtered_by_their_own_role() {
    let ctx = TestContext::memory();
    let result = ctx.get_as(
        "hostinterface",
        json!({"hostids": 11, "selectHosts": ["host"]}),
        &CallerContext::user(7),
    );
    let interfaces = list(&result);
    assert_eq!(interfaces.len(), 2);
    assert_eq!(
        related(&interfaces[0], "hosts")[0].value("host"),
        Some(&Value::from("db01"))
    );
}

#[test]
fn test_unknown_options_are_rejected() {
    let ctx = TestContext::memory();
    let admin = CallerContext::admin(1);
    for raw in [
        json!({"bogus": 1}),
        json!({"output": ["nonexistent"]}),
        json!({"filter": {"nonexistent": 1}}),
        json!({"sortfield": "port"}),
        json!({"search": {"port": "22"}}),
        json!({"search": {"bogus": ""}}),
        json!({"search": {"bogus": null}}),
        json!({"limit": 18446744073709551615u64}),
        json!({"dserviceids": ["abc"]}),
        json!({"selectHosts": {"limit": 1}}),
        json!({"selectDRules": {"druleids": [1]}}),
    ] {
        let err = ctx.engine.get_json("dservice", &raw, &admin).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }), "{raw}: {err}");
    }

    let err = ctx.engine.get_json("nope", &json!({}), &admin).unwrap_err();
    assert!(matches!(err, Error::UnknownEntity(_)));
}

#[test]
fn test_relation_depth_limit() {
    let store = MemoryStore::new();
    fixture::load(&store).unwrap();
    let engine = Engine::new(discovery::catalog().unwrap(), store)
        .with_config(EngineConfig::new().with_max_relation_depth(1));

    let nested = GetOptions::new().with_select("dservices", Select::Count);
    let options = GetOptions::new().with_select("dhosts", Select::Nested(Box::new(nested)));
    let err = engine
        .get("drule", &options, &CallerContext::admin(1))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOption { .. }), "{err}");

    let shallow = GetOptions::new().with_select("dhosts", Select::Count);
    assert!(engine.get("drule", &shallow, &CallerContext::admin(1)).is_ok());
}

#[test]
fn test_row_ceiling_applies_without_caller_limit() {
    let store = MemoryStore::new();
    fixture::load(&store).unwrap();
    let engine = Engine::new(discovery::catalog().unwrap(), store)
        .with_config(EngineConfig::new().with_row_ceiling(2));
    let admin = CallerContext::admin(1);

    let result = engine.get("dservice", &GetOptions::new(), &admin).unwrap();
    assert_eq!(ids(&result, "dserviceid"), vec![1, 2]);

    let result = engine
        .get("dservice", &GetOptions::new().with_limit(4), &admin)
        .unwrap();
    assert_eq!(ids(&result, "dserviceid"), vec![1, 2, 3, 4]);
}

#[test]
fn test_typed_options() {
    for ctx in TestContext::all() {
        let options = GetOptions::new()
            .with_ids("dcheckids", [1])
            .with_select("hosts", Select::Count)
            .sort_by(SortSpec::desc("dserviceid"));
        let result = ctx
            .engine
            .get("dservice", &options, &CallerContext::super_admin(1))
            .unwrap();
        assert_eq!(ids(&result, "dserviceid"), vec![3, 1], "{}", ctx.backend);
        assert_eq!(list(&result)[0].get("hosts"), Some(&FieldValue::Count(1)));
    }
}

#[test]
fn test_check_editable() {
    for ctx in TestContext::all() {
        let engine = &ctx.engine;
        let admin = CallerContext::admin(1);
        let ids = [Value::Int(1), Value::from("2")];

        engine.check_editable("dservice", &ids, &admin).unwrap();
        engine.check_editable("dservice", &[], &admin).unwrap();

        let err = engine
            .check_editable("dservice", &[Value::Int(1), Value::Int(99)], &admin)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)), "{err}");

        let err = engine
            .check_editable("dservice", &ids, &CallerContext::user(7))
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)), "{err}");
    }
}

#[test]
fn test_editable_grants_narrow_rows() {
    let store = MemoryStore::new();
    fixture::load(&store).unwrap();
    let engine = Engine::new(discovery::catalog().unwrap(), store)
        .with_permissions(RolePermissions::new().grant_editable("dservice", 5, [1i64, 3]));
    let granted = CallerContext::admin(5);

    let result = engine
        .get_json("dservice", &json!({"editable": true}), &granted)
        .unwrap();
    assert_eq!(ids(&result, "dserviceid"), vec![1, 3]);

    // Reads without `editable` are not narrowed.
    let result = engine.get_json("dservice", &json!({}), &granted).unwrap();
    assert_eq!(list(&result).len(), 7);

    engine
        .check_editable("dservice", &[Value::Int(3)], &granted)
        .unwrap();
    assert!(engine
        .check_editable("dservice", &[Value::Int(2)], &granted)
        .is_err());
    engine
        .check_editable("dservice", &[Value::Int(2)], &CallerContext::super_admin(5))
        .unwrap();
}
