//! Persistence adapters
//!
//! [`Store`] is the narrow CRUD contract the builders and reports consume.
//! [`FileStore`] implements it over the workspace's YAML record files and
//! scopes every operation to one owner: records of other users are invisible
//! to reads and cannot be overwritten or deleted.

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::loader;
use crate::core::session::Session;
use crate::core::workspace::Workspace;
use crate::entities::component::Component;
use crate::yaml::YamlError;

/// Errors from a persistence adapter
#[derive(Debug, Error, miette::Diagnostic)]
pub enum StoreError {
    #[error("{noun} '{id}' not found")]
    #[diagnostic(code(dce::store::not_found), help("List available ids with `dce <type> list`."))]
    NotFound { noun: &'static str, id: String },

    #[error("'{id}' matches {count} {noun} records; use a longer id")]
    #[diagnostic(code(dce::store::ambiguous))]
    Ambiguous {
        noun: &'static str,
        id: String,
        count: usize,
    },

    #[error("{noun} '{id}' belongs to another user")]
    #[diagnostic(code(dce::store::forbidden))]
    Forbidden { noun: &'static str, id: String },

    #[error("'{id}' is not a {noun} id")]
    #[diagnostic(code(dce::store::wrong_type))]
    WrongType { noun: &'static str, id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] YamlError),

    #[error("failed to serialize {0}: {1}")]
    #[diagnostic(code(dce::store::serialize))]
    Serialize(String, String),

    #[error("IO error on {path}: {message}")]
    #[diagnostic(code(dce::store::io))]
    Io { path: PathBuf, message: String },
}

/// CRUD contract for every stored entity type
pub trait Store {
    /// Insert or fully overwrite a record, returning its id
    fn save<E: Entity>(&self, entity: &E) -> Result<EntityId, StoreError>;

    /// Fetch a record by full id or unique id prefix
    fn get<E: Entity>(&self, id: &str) -> Result<E, StoreError>;

    /// All records of a type, oldest first
    fn list<E: Entity>(&self) -> Result<Vec<E>, StoreError>;

    /// Remove a record by full id or unique id prefix
    fn delete<E: Entity>(&self, id: &str) -> Result<EntityId, StoreError>;
}

/// Source of component pricing for assembly expansion
pub trait Catalog {
    /// Resolve every requested component in one call; unknown ids are absent
    fn resolve_components(
        &self,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, Component>, StoreError>;
}

impl Catalog for [Component] {
    fn resolve_components(
        &self,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, Component>, StoreError> {
        Ok(self
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| (c.id.clone(), c.clone()))
            .collect())
    }
}

impl Catalog for Vec<Component> {
    fn resolve_components(
        &self,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, Component>, StoreError> {
        self.as_slice().resolve_components(ids)
    }
}

/// Workspace-backed store scoped to a single owner
#[derive(Debug, Clone)]
pub struct FileStore {
    workspace: Workspace,
    owner: String,
}

impl FileStore {
    pub fn new(workspace: Workspace, owner: impl Into<String>) -> Self {
        Self {
            workspace,
            owner: owner.into(),
        }
    }

    /// Store for the user of an active session
    pub fn for_session(workspace: &Workspace, session: &Session) -> Self {
        Self::new(workspace.clone(), session.user())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Resolve a (partial) id to the single matching file of this type
    fn locate<E: Entity>(&self, id: &str) -> Result<PathBuf, StoreError> {
        let noun = E::PREFIX.noun();
        let id = id.trim();

        if let Some(prefix) = EntityPrefix::from_filename(id) {
            if prefix != E::PREFIX {
                return Err(StoreError::WrongType {
                    noun,
                    id: id.to_string(),
                });
            }
        }

        let dir = self.workspace.entity_dir(E::PREFIX);
        let mut matches = loader::find_entity_files(&dir, id).map_err(|e| StoreError::Io {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        match matches.len() {
            0 => Err(StoreError::NotFound {
                noun,
                id: id.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(StoreError::Ambiguous {
                noun,
                id: id.to_string(),
                count,
            }),
        }
    }

    /// Read a record, hiding it if it belongs to someone else
    fn read_owned<E: Entity>(&self, id: &str) -> Result<(PathBuf, E), StoreError> {
        let path = self.locate::<E>(id)?;
        let entity: E = loader::load_entity(&path)?;
        if entity.owner() != self.owner {
            return Err(StoreError::NotFound {
                noun: E::PREFIX.noun(),
                id: id.to_string(),
            });
        }
        Ok((path, entity))
    }
}

impl Store for FileStore {
    fn save<E: Entity>(&self, entity: &E) -> Result<EntityId, StoreError> {
        let noun = E::PREFIX.noun();
        let id = entity.id().clone();

        if entity.owner() != self.owner {
            return Err(StoreError::Forbidden {
                noun,
                id: id.to_string(),
            });
        }

        let path = self.workspace.entity_path(&id);
        if path.exists() {
            let existing: E = loader::load_entity(&path)?;
            if existing.owner() != self.owner {
                return Err(StoreError::Forbidden {
                    noun,
                    id: id.to_string(),
                });
            }
        }

        let yaml = serde_yml::to_string(entity)
            .map_err(|e| StoreError::Serialize(id.to_string(), e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(&path, yaml).map_err(|e| StoreError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!(%id, path = %path.display(), "saved {}", noun);
        Ok(id)
    }

    fn get<E: Entity>(&self, id: &str) -> Result<E, StoreError> {
        let (path, entity) = self.read_owned::<E>(id)?;
        tracing::debug!(id = %entity.id(), path = %path.display(), "loaded {}", E::PREFIX.noun());
        Ok(entity)
    }

    fn list<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        let dir = self.workspace.entity_dir(E::PREFIX);
        let records = loader::load_all::<E>(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        Ok(records
            .into_iter()
            .map(|(_, entity)| entity)
            .filter(|e| e.owner() == self.owner)
            .collect())
    }

    fn delete<E: Entity>(&self, id: &str) -> Result<EntityId, StoreError> {
        let path = self.locate::<E>(id)?;
        let entity: E = loader::load_entity(&path)?;
        if entity.owner() != self.owner {
            return Err(StoreError::Forbidden {
                noun: E::PREFIX.noun(),
                id: id.to_string(),
            });
        }

        std::fs::remove_file(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!(id = %entity.id(), "deleted {}", E::PREFIX.noun());
        Ok(entity.id().clone())
    }
}

impl Catalog for FileStore {
    /// One scan of the component directory serves the whole request
    fn resolve_components(
        &self,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, Component>, StoreError> {
        let components = self.list::<Component>()?;
        let resolved: HashMap<EntityId, Component> = components
            .into_iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| (c.id.clone(), c))
            .collect();

        tracing::debug!(
            requested = ids.len(),
            resolved = resolved.len(),
            "resolved component tiers in one batch"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::component::{ComponentCategory, QualityTier};
    use crate::cost::builder::EstimateBuilder;
    use crate::cost::rollup::round_cents;
    use crate::entities::assembly::Assembly;
    use crate::entities::estimate::Estimate;
    use crate::entities::project::Project;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Workspace) {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path()).unwrap();
        (tmp, ws)
    }

    fn component(owner: &str, name: &str) -> Component {
        let mut cmp = Component::new(name, ComponentCategory::Power, owner);
        cmp.add_tier(QualityTier::new("Standard", 100.0, None).unwrap())
            .unwrap();
        cmp
    }

    #[test]
    fn test_save_get_list_delete() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");

        let cmp = component("alice", "PDU");
        let id = store.save(&cmp).unwrap();
        assert_eq!(id, cmp.id);

        let loaded: Component = store.get(&id.to_string()).unwrap();
        assert_eq!(loaded.name, "PDU");
        assert_eq!(loaded.tiers, cmp.tiers);

        assert_eq!(store.list::<Component>().unwrap().len(), 1);

        store.delete::<Component>(&id.to_string()).unwrap();
        assert!(store.list::<Component>().unwrap().is_empty());
        assert!(matches!(
            store.get::<Component>(&id.to_string()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_get_by_unique_prefix() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let cmp = component("alice", "ATS");
        store.save(&cmp).unwrap();

        let full = cmp.id.to_string();
        let partial = &full[..full.len() - 4];
        let loaded: Component = store.get(&partial.to_lowercase()).unwrap();
        assert_eq!(loaded.id, cmp.id);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        store.save(&component("alice", "A")).unwrap();
        store.save(&component("alice", "B")).unwrap();

        assert!(matches!(
            store.get::<Component>("CMP-"),
            Err(StoreError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_wrong_type_prefix() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let prj = Project::new("DAL-1", "alice");
        store.save(&prj).unwrap();

        assert!(matches!(
            store.get::<Component>(&prj.id.to_string()),
            Err(StoreError::WrongType { .. })
        ));
    }

    #[test]
    fn test_records_are_scoped_to_owner() {
        let (_tmp, ws) = setup();
        let alice = FileStore::new(ws.clone(), "alice");
        let bob = FileStore::new(ws, "bob");

        let cmp = component("alice", "Generator");
        alice.save(&cmp).unwrap();

        assert!(bob.list::<Component>().unwrap().is_empty());
        assert!(matches!(
            bob.get::<Component>(&cmp.id.to_string()),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            bob.delete::<Component>(&cmp.id.to_string()),
            Err(StoreError::Forbidden { .. })
        ));

        // bob cannot save a record stamped with another owner
        assert!(matches!(bob.save(&cmp), Err(StoreError::Forbidden { .. })));

        // nor take over alice's record by re-stamping it
        let mut hijack = cmp.clone();
        hijack.owner = "bob".to_string();
        assert!(matches!(bob.save(&hijack), Err(StoreError::Forbidden { .. })));
    }

    #[test]
    fn test_save_overwrites_whole_record() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let mut cmp = component("alice", "Chiller");
        store.save(&cmp).unwrap();

        cmp.tiers.clear();
        cmp.name = "Chiller 500T".to_string();
        store.save(&cmp).unwrap();

        let loaded: Component = store.get(&cmp.id.to_string()).unwrap();
        assert_eq!(loaded.name, "Chiller 500T");
        assert!(loaded.tiers.is_empty());
        assert_eq!(store.list::<Component>().unwrap().len(), 1);
    }

    #[test]
    fn test_catalog_resolves_batch_and_omits_unknown() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let a = component("alice", "A");
        let b = component("alice", "B");
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let missing = EntityId::new(EntityPrefix::Cmp);
        let resolved = store
            .resolve_components(&[a.id.clone(), missing.clone()])
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key(&a.id));
        assert!(!resolved.contains_key(&missing));
    }

    fn ups(owner: &str) -> Component {
        let mut cmp = component(owner, "UPS Module");
        cmp.labor_hours = Some(1.0);
        cmp
    }

    #[test]
    fn test_flat_estimate_reloads_to_the_cent() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let cmp = ups("alice");

        let mut builder = EstimateBuilder::new("Hall A").labor_rate(Some(85.0)).unwrap();
        builder.add_units(&cmp, None, 3.0).unwrap();
        let estimate = builder.build("alice").unwrap();
        assert_eq!(estimate.total_cost, 555.0);

        let id = store.save(&estimate).unwrap();
        let loaded: Estimate = store.get(&id.to_string()).unwrap();

        assert_eq!(round_cents(loaded.total_cost), round_cents(estimate.total_cost));
        assert_eq!(loaded.total_labor_hours, estimate.total_labor_hours);
        assert_eq!(loaded.items().len(), 1);
        assert_eq!(
            round_cents(loaded.items()[0].total_cost),
            round_cents(estimate.items()[0].total_cost)
        );
    }

    #[test]
    fn test_hierarchical_estimate_reloads_to_the_cent() {
        let (_tmp, ws) = setup();
        let store = FileStore::new(ws, "alice");
        let cmp = ups("alice");
        store.save(&cmp).unwrap();

        let mut skid = Assembly::new("Power Skid", ComponentCategory::Power, "alice");
        skid.add_member(cmp.id.clone(), 3.0);

        let mut builder = EstimateBuilder::new("Hall B").labor_rate(Some(85.0)).unwrap();
        let added = builder.add_assembly(&skid, 2, &store).unwrap();
        assert!(added.skipped.is_empty());
        let estimate = builder.build("alice").unwrap();
        assert_eq!(estimate.total_cost, 1110.0);

        let id = store.save(&estimate).unwrap();
        let loaded: Estimate = store.get(&id.to_string()).unwrap();

        assert_eq!(round_cents(loaded.total_cost), 1110.0);
        assert_eq!(loaded.total_labor_hours, estimate.total_labor_hours);

        let (before, after) = (&estimate.assemblies()[0], &loaded.assemblies()[0]);
        assert_eq!(after.total_material_cost, 300.0);
        assert_eq!(after.total_labor_cost, 255.0);
        assert_eq!(round_cents(after.display_total()), round_cents(before.display_total()));
        for (b, a) in before.components.iter().zip(&after.components) {
            assert_eq!(round_cents(a.total_cost), round_cents(b.total_cost));
        }
    }
}
