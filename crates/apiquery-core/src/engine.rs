//! The engine entry point.

use std::collections::BTreeSet;

use apiquery_proto::{GetOptions, GetResult, Key, Output, Value};
use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::query::{
    decode_options, finalize, materialize, project, Fetched, NormalizedQuery, Normalizer,
    QueryPlanner, RelationResolver,
};
use crate::security::{CallerContext, PermissionProvider, RolePermissions};
use crate::storage::Storage;

/// Message of the write-path permission failure.
pub const NO_PERMISSIONS: &str = "No permissions to referred object or it does not exist!";

/// Runs `get` requests against a catalog and a storage backend.
///
/// The engine holds no per-request state; every call builds its plans and
/// result structures afresh.
pub struct Engine<S> {
    catalog: Catalog,
    storage: S,
    permissions: Box<dyn PermissionProvider>,
    config: EngineConfig,
}

impl<S: Storage> Engine<S> {
    /// Create an engine with role-based permissions and default settings.
    pub fn new(catalog: Catalog, storage: S) -> Self {
        Self {
            catalog,
            storage,
            permissions: Box::new(RolePermissions::new()),
            config: EngineConfig::default(),
        }
    }

    /// Use a different permission provider.
    pub fn with_permissions(mut self, permissions: impl PermissionProvider + 'static) -> Self {
        self.permissions = Box::new(permissions);
        self
    }

    /// Use a different configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a `get` with typed options.
    ///
    /// Callers below the entity's read role get an empty result of the
    /// requested shape, not an error.
    #[instrument(skip(self, options, caller), fields(role = %caller.role))]
    pub fn get(
        &self,
        entity: &str,
        options: &GetOptions,
        caller: &CallerContext,
    ) -> Result<GetResult> {
        let descriptor = self.catalog.get(entity)?;
        let query = self.normalizer(caller).normalize(descriptor, options)?;
        let fetched = self.fetch(&query)?;
        Ok(finalize(fetched, query.preserve_keys))
    }

    /// Run a `get` with a raw option dictionary.
    #[instrument(skip(self, raw, caller), fields(role = %caller.role))]
    pub fn get_json(
        &self,
        entity: &str,
        raw: &serde_json::Value,
        caller: &CallerContext,
    ) -> Result<GetResult> {
        let descriptor = self.catalog.get(entity)?;
        let options = decode_options(&self.catalog, descriptor, raw)?;
        self.get(entity, &options, caller)
    }

    /// Check that the caller may modify every listed object.
    ///
    /// Unlike reads, a missing role is a hard failure. Objects that do not
    /// exist or are outside the caller's editable scope fail the check as
    /// well.
    #[instrument(skip(self, ids, caller), fields(role = %caller.role, ids = ids.len()))]
    pub fn check_editable(
        &self,
        entity: &str,
        ids: &[Value],
        caller: &CallerContext,
    ) -> Result<()> {
        let descriptor = self.catalog.get(entity)?;
        if !self
            .permissions
            .has_min_role(descriptor, caller, descriptor.access.write)
        {
            return Err(Error::PermissionDenied(format!(
                "role {} may not modify {} objects",
                caller.role, descriptor.name
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }

        let pk = &descriptor.primary_key;
        let column_type = descriptor
            .field(pk)
            .map(|field| field.column_type)
            .ok_or_else(|| Error::UnknownEntity(descriptor.name.clone()))?;
        let mut keys = BTreeSet::new();
        for id in ids {
            let value = column_type
                .coerce(id)
                .map_err(|err| Error::invalid_option(pk, err.to_string()))?;
            match value.as_key() {
                Some(key) => keys.insert(key),
                None => return Err(Error::invalid_option(pk, format!("'{id}' is not a key"))),
            };
        }

        let options = GetOptions::new()
            .with_output(Output::Fields(Vec::new()))
            .editable();
        let mut query = self.normalizer(caller).normalize(descriptor, &options)?;
        query.constraints.push((
            pk.clone(),
            keys.iter().map(Key::to_value).collect(),
        ));

        let found = self.fetch(&query)?.into_rows();
        if keys.iter().all(|key| found.contains_key(key)) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(NO_PERMISSIONS.to_string()))
        }
    }

    fn normalizer(&self, caller: &CallerContext) -> Normalizer<'_> {
        Normalizer::new(&self.catalog, &self.config, self.permissions.as_ref(), *caller)
    }

    /// Run a normalized query through planning, execution, relation
    /// resolution and projection.
    pub(crate) fn fetch(&self, query: &NormalizedQuery<'_>) -> Result<Fetched> {
        if query.denied {
            return Ok(Fetched::empty(&query.mode));
        }

        let plan = QueryPlanner::plan(query);
        debug!(
            entity = %query.entity.name,
            joins = plan.joins.len(),
            predicates = plan.predicates.len(),
            limit = ?plan.limit,
            "planned query"
        );
        let rows = self.storage.select(&plan)?;
        let mut fetched = materialize(query, rows)?;

        if let Fetched::Rows(map) = &mut fetched {
            if !map.is_empty() && !query.relations.is_empty() {
                RelationResolver::new(self).resolve(map, query)?;
            }
            project(map, query);
        }
        Ok(fetched)
    }
}
