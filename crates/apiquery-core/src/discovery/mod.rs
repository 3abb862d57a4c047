//! Network discovery entities.
//!
//! Descriptors for discovered services, discovered hosts, discovery rules
//! and checks, and the monitored hosts and interfaces a discovered service
//! maps to. Multi-hop paths are spelled out per entity:
//!
//! - a service's rule is reached through its discovered host,
//! - a service's hosts are the hosts monitored by the rule's proxy (NULL
//!   meaning "no proxy") that have an interface on the service's IP.

pub mod fixture;

use crate::catalog::{
    AccessRules, Catalog, ColumnRef, EntityDescriptor, FieldDef, IdFilterDef, Join, RelationSpec,
};
use crate::error::Result;
use crate::security::UserRole;

fn col(alias: &str, column: &str) -> ColumnRef {
    ColumnRef::new(alias, column)
}

/// Discovered services.
pub fn dservice() -> EntityDescriptor {
    let via_dhost = Join::to_one("dhosts", "dh").on_eq(col("dh", "dhostid"), col("ds", "dhostid"));

    EntityDescriptor::new("dservice", "dservices", "ds", "dserviceid")
        .with_fields([
            FieldDef::int("dserviceid"),
            FieldDef::int("dhostid"),
            FieldDef::int("dcheckid"),
            FieldDef::int("type"),
            FieldDef::string("key_"),
            FieldDef::string("value"),
            FieldDef::int("port"),
            FieldDef::int("status"),
            FieldDef::int("lastup"),
            FieldDef::int("lastdown"),
            FieldDef::string("ip"),
            FieldDef::string("dns"),
        ])
        .with_sortable(["dserviceid", "dhostid", "ip"])
        .with_id_filter(IdFilterDef::local("dserviceids", col("ds", "dserviceid")))
        .with_id_filter(IdFilterDef::local("dhostids", col("ds", "dhostid")).groupable())
        .with_id_filter(IdFilterDef::local("dcheckids", col("ds", "dcheckid")).groupable())
        .with_id_filter(
            IdFilterDef::via("druleids", [via_dhost.clone()], col("dh", "druleid")).groupable(),
        )
        .with_relation(RelationSpec::joined(
            "drules",
            "selectDRules",
            "drule",
            [via_dhost],
            col("dh", "druleid"),
        ))
        .with_relation(RelationSpec::parent_column(
            "dhosts",
            "selectDHosts",
            "dhost",
            "dhostid",
        ))
        .with_relation(RelationSpec::joined(
            "hosts",
            "selectHosts",
            "host",
            [
                Join::to_one("dchecks", "dc").on_eq(col("dc", "dcheckid"), col("ds", "dcheckid")),
                Join::to_one("drules", "dr").on_eq(col("dr", "druleid"), col("dc", "druleid")),
                Join::to_many("hosts", "h")
                    .on_null_safe_eq(col("h", "proxy_hostid"), col("dr", "proxy_hostid")),
                Join::to_many("interface", "i")
                    .on_eq(col("i", "hostid"), col("h", "hostid"))
                    .on_eq(col("i", "ip"), col("ds", "ip")),
            ],
            col("h", "hostid"),
        ))
        .with_access(AccessRules::new(UserRole::Admin, UserRole::Admin))
}

/// Discovered hosts.
pub fn dhost() -> EntityDescriptor {
    EntityDescriptor::new("dhost", "dhosts", "dh", "dhostid")
        .with_fields([
            FieldDef::int("dhostid"),
            FieldDef::int("druleid"),
            FieldDef::int("status"),
            FieldDef::int("lastup"),
            FieldDef::int("lastdown"),
        ])
        .with_sortable(["dhostid", "druleid"])
        .with_natural_sort("dhostid")
        .with_id_filter(IdFilterDef::local("dhostids", col("dh", "dhostid")))
        .with_id_filter(IdFilterDef::local("druleids", col("dh", "druleid")).groupable())
        .with_id_filter(IdFilterDef::via(
            "dserviceids",
            [Join::to_many("dservices", "ds").on_eq(col("ds", "dhostid"), col("dh", "dhostid"))],
            col("ds", "dserviceid"),
        ))
        .with_relation(RelationSpec::parent_column(
            "drules",
            "selectDRules",
            "drule",
            "druleid",
        ))
        .with_relation(RelationSpec::child_column(
            "dservices",
            "selectDServices",
            "dservice",
            "dhostid",
        ))
        .with_access(AccessRules::new(UserRole::Admin, UserRole::Admin))
}

/// Discovery rules.
pub fn drule() -> EntityDescriptor {
    let to_dhosts = Join::to_many("dhosts", "dh").on_eq(col("dh", "druleid"), col("dr", "druleid"));

    EntityDescriptor::new("drule", "drules", "dr", "druleid")
        .with_fields([
            FieldDef::int("druleid"),
            FieldDef::int("proxy_hostid"),
            FieldDef::string("name"),
            FieldDef::string("iprange"),
            FieldDef::string("delay"),
            FieldDef::int("nextcheck"),
            FieldDef::int("status"),
        ])
        .with_sortable(["druleid", "name"])
        .with_natural_sort("name")
        .with_id_filter(IdFilterDef::local("druleids", col("dr", "druleid")))
        .with_id_filter(IdFilterDef::via(
            "dhostids",
            [to_dhosts.clone()],
            col("dh", "dhostid"),
        ))
        .with_id_filter(IdFilterDef::via(
            "dcheckids",
            [Join::to_many("dchecks", "dc").on_eq(col("dc", "druleid"), col("dr", "druleid"))],
            col("dc", "dcheckid"),
        ))
        .with_id_filter(IdFilterDef::via(
            "dserviceids",
            [
                to_dhosts,
                Join::to_many("dservices", "ds").on_eq(col("ds", "dhostid"), col("dh", "dhostid")),
            ],
            col("ds", "dserviceid"),
        ))
        .with_relation(RelationSpec::child_column(
            "dchecks",
            "selectDChecks",
            "dcheck",
            "druleid",
        ))
        .with_relation(RelationSpec::child_column(
            "dhosts",
            "selectDHosts",
            "dhost",
            "druleid",
        ))
        .with_access(AccessRules::new(UserRole::Admin, UserRole::Admin))
}

/// Discovery checks.
pub fn dcheck() -> EntityDescriptor {
    EntityDescriptor::new("dcheck", "dchecks", "dc", "dcheckid")
        .with_fields([
            FieldDef::int("dcheckid"),
            FieldDef::int("druleid"),
            FieldDef::int("type"),
            FieldDef::string("key_"),
            FieldDef::string("snmp_community"),
            FieldDef::string("ports"),
            FieldDef::int("uniq"),
            FieldDef::int("host_source"),
            FieldDef::int("name_source"),
        ])
        .with_sortable(["dcheckid", "druleid"])
        .with_id_filter(IdFilterDef::local("dcheckids", col("dc", "dcheckid")))
        .with_id_filter(IdFilterDef::local("druleids", col("dc", "druleid")).groupable())
        .with_relation(RelationSpec::parent_column(
            "drules",
            "selectDRules",
            "drule",
            "druleid",
        ))
        .with_access(AccessRules::new(UserRole::Admin, UserRole::Admin))
}

/// Monitored hosts.
pub fn host() -> EntityDescriptor {
    EntityDescriptor::new("host", "hosts", "h", "hostid")
        .with_fields([
            FieldDef::int("hostid"),
            FieldDef::int("proxy_hostid"),
            FieldDef::string("host"),
            FieldDef::string("name"),
            FieldDef::int("status"),
        ])
        .with_sortable(["hostid", "host", "name", "status"])
        .with_natural_sort("hostid")
        .with_id_filter(IdFilterDef::local("hostids", col("h", "hostid")))
        .with_id_filter(IdFilterDef::local("proxyids", col("h", "proxy_hostid")).groupable())
        .with_relation(RelationSpec::child_column(
            "interfaces",
            "selectInterfaces",
            "hostinterface",
            "hostid",
        ))
        .with_relation(RelationSpec::child_column(
            "drules",
            "selectDRules",
            "drule",
            "proxy_hostid",
        ))
        .with_access(AccessRules::new(UserRole::User, UserRole::Admin))
}

/// Host interfaces.
pub fn hostinterface() -> EntityDescriptor {
    EntityDescriptor::new("hostinterface", "interface", "i", "interfaceid")
        .with_fields([
            FieldDef::int("interfaceid"),
            FieldDef::int("hostid"),
            FieldDef::string("ip"),
            FieldDef::string("dns"),
            FieldDef::string("port"),
            FieldDef::int("type"),
            FieldDef::int("main"),
            FieldDef::int("useip"),
        ])
        .with_sortable(["interfaceid", "hostid"])
        .with_id_filter(IdFilterDef::local("interfaceids", col("i", "interfaceid")))
        .with_id_filter(IdFilterDef::local("hostids", col("i", "hostid")).groupable())
        .with_relation(RelationSpec::parent_column(
            "hosts",
            "selectHosts",
            "host",
            "hostid",
        ))
        .with_access(AccessRules::new(UserRole::User, UserRole::Admin))
}

/// All discovery descriptors, in dependency order.
pub fn descriptors() -> Vec<EntityDescriptor> {
    vec![drule(), dcheck(), dhost(), dservice(), host(), hostinterface()]
}

/// A validated catalog of the discovery entities.
pub fn catalog() -> Result<Catalog> {
    let mut catalog = Catalog::new();
    for descriptor in descriptors() {
        catalog.register(descriptor)?;
    }
    catalog.validate()?;
    Ok(catalog)
}
