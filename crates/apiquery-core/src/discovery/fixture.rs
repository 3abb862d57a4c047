//! Sample discovery data.
//!
//! One local rule, three rules run by proxy 100 and one disabled rule, with
//! the monitored hosts their services resolve to. Used by the tests and
//! by the CLI `--demo` mode.

use apiquery_proto::Value;
use tracing::info;

use super::descriptors;
use crate::storage::{Loader, Row, StorageError, TableSchema};

const NULL: Value = Value::Null;

fn v(value: impl Into<Value>) -> Value {
    value.into()
}

fn insert_all<const N: usize>(
    loader: &impl Loader,
    table: &str,
    columns: [&str; N],
    rows: Vec<[Value; N]>,
) -> Result<usize, StorageError> {
    let count = rows.len();
    for values in rows {
        let row = Row::from_pairs(columns.iter().copied().zip(values));
        loader.insert(table, &row)?;
    }
    Ok(count)
}

/// Create the discovery tables and load the sample rows.
pub fn load(loader: &impl Loader) -> Result<(), StorageError> {
    for descriptor in descriptors() {
        loader.create_table(&TableSchema::for_entity(&descriptor))?;
    }

    let mut rows = 0;

    rows += insert_all(
        loader,
        "drules",
        ["druleid", "proxy_hostid", "name", "iprange", "delay", "nextcheck", "status"],
        vec![
            [v(1), NULL, v("Local network"), v("192.168.1.1-254"), v("1h"), v(0), v(0)],
            [v(2), v(100), v("DMZ scan"), v("10.0.0.1-254"), v("30m"), v(0), v(0)],
            [v(3), NULL, v("Backup net"), v("172.16.0.1-254"), v("1d"), v(0), v(1)],
            [v(4), v(100), v("Alpha segment"), v("10.1.0.1-254"), v("1h"), v(0), v(0)],
            [v(5), v(100), v("Mail relays"), v("10.2.0.1-254"), v("1h"), v(0), v(0)],
        ],
    )?;

    rows += insert_all(
        loader,
        "dchecks",
        [
            "dcheckid",
            "druleid",
            "type",
            "key_",
            "snmp_community",
            "ports",
            "uniq",
            "host_source",
            "name_source",
        ],
        vec![
            [v(1), v(1), v(0), v(""), v(""), v("22"), v(0), v(1), v(0)],
            [v(2), v(1), v(4), v(""), v(""), v("80"), v(0), v(1), v(0)],
            [v(3), v(2), v(3), v(""), v(""), v("25"), v(0), v(1), v(0)],
            [v(4), v(3), v(11), v("sysName.0"), v("public"), v("161"), v(0), v(1), v(0)],
        ],
    )?;

    rows += insert_all(
        loader,
        "hosts",
        ["hostid", "proxy_hostid", "host", "name", "status"],
        vec![
            [v(100), NULL, v("dmz-proxy"), v("dmz-proxy"), v(5)],
            [v(10), NULL, v("web01"), v("Web server 01"), v(0)],
            [v(11), NULL, v("db01"), v("Database 01"), v(0)],
            [v(12), v(100), v("dmz-gw"), v("DMZ gateway"), v(0)],
            [v(13), v(100), v("dmz-mail"), v("DMZ mail"), v(0)],
            [v(14), NULL, v("web02"), v("Web server 02"), v(0)],
        ],
    )?;

    rows += insert_all(
        loader,
        "interface",
        ["interfaceid", "hostid", "ip", "dns", "port", "type", "main", "useip"],
        vec![
            [v(1), v(10), v("192.168.1.10"), v(""), v("10050"), v(1), v(1), v(1)],
            [v(2), v(11), v("192.168.1.11"), v(""), v("10050"), v(1), v(1), v(1)],
            [v(3), v(14), v("192.168.1.10"), v(""), v("10050"), v(1), v(1), v(1)],
            [v(4), v(12), v("10.0.0.5"), v(""), v("161"), v(2), v(1), v(1)],
            [v(5), v(13), v("10.0.0.5"), v(""), v("10050"), v(1), v(1), v(1)],
            [v(6), v(11), v("192.168.1.12"), v(""), v("10050"), v(1), v(0), v(1)],
        ],
    )?;

    rows += insert_all(
        loader,
        "dhosts",
        ["dhostid", "druleid", "status", "lastup", "lastdown"],
        vec![
            [v(1), v(1), v(0), v(1_700_000_000), v(0)],
            [v(2), v(1), v(0), v(1_700_000_100), v(0)],
            [v(3), v(2), v(0), v(1_700_000_200), v(0)],
            [v(4), v(2), v(1), v(0), v(1_700_000_500)],
            [v(5), v(3), v(0), v(1_600_000_000), v(0)],
        ],
    )?;

    #[rustfmt::skip]
    let services = vec![
        [v(1), v(1), v(1), v(0), v(""), v(""), v(22), v(0), v(1_700_000_000), v(0), v("192.168.1.10"), v("web01.local")],
        [v(2), v(1), v(2), v(4), v(""), v(""), v(80), v(0), v(1_700_000_000), v(0), v("192.168.1.10"), v("web01.local")],
        [v(3), v(2), v(1), v(0), v(""), v(""), v(22), v(0), v(1_700_000_100), v(0), v("192.168.1.11"), v("db01.local")],
        [v(4), v(2), v(2), v(4), v(""), v(""), v(80), v(1), v(0), v(1_700_000_100), v("192.168.1.12"), v("db01.local")],
        [v(5), v(3), v(3), v(3), v(""), v(""), v(25), v(0), v(1_700_000_200), v(0), v("10.0.0.5"), v("mail.dmz.example")],
        [v(6), v(4), v(3), v(3), v(""), v(""), v(25), v(1), v(0), v(1_700_000_500), v("10.0.0.9"), v("")],
        [v(7), v(5), v(4), v(11), v("sysName.0"), v("backup-sw"), v(161), v(0), v(1_600_000_000), v(0), v("172.16.0.1"), v("")],
    ];

    rows += insert_all(
        loader,
        "dservices",
        [
            "dserviceid",
            "dhostid",
            "dcheckid",
            "type",
            "key_",
            "value",
            "port",
            "status",
            "lastup",
            "lastdown",
            "ip",
            "dns",
        ],
        services,
    )?;

    info!(rows, "loaded discovery sample data");
    Ok(())
}
