//! Identifier resolution registry
//!
//! Per entity kind, a map from source record id to the target id generated
//! (or reused) for it during this run. Entries are write-once; the registry
//! lives only as long as one run and is never persisted.

use crate::models::EntityKind;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Registry invariant violation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("{kind} source id {source_id} already maps to {existing}, refusing to remap to {attempted}")]
    Conflict {
        kind: EntityKind,
        source_id: String,
        existing: Uuid,
        attempted: Uuid,
    },
}

/// Source id → target id maps, one per entity kind
#[derive(Debug, Default, Clone)]
pub struct IdRegistry {
    maps: HashMap<EntityKind, HashMap<String, Uuid>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the target id for a source id
    ///
    /// Setting the same pair twice is a no-op; setting a different target id
    /// for an already-mapped source id is rejected.
    pub fn set(&mut self, kind: EntityKind, source_id: &str, target_id: Uuid) -> Result<(), RegistryError> {
        let map = self.maps.entry(kind).or_default();
        match map.get(source_id) {
            Some(existing) if *existing == target_id => Ok(()),
            Some(existing) => Err(RegistryError::Conflict {
                kind,
                source_id: source_id.to_string(),
                existing: *existing,
                attempted: target_id,
            }),
            None => {
                map.insert(source_id.to_string(), target_id);
                Ok(())
            }
        }
    }

    /// Target id for a source id, or `None` if it was never migrated
    pub fn resolve(&self, kind: EntityKind, source_id: &str) -> Option<Uuid> {
        self.maps.get(&kind)?.get(source_id).copied()
    }

    /// Resolve an optional reference; `None` in, `None` out
    pub fn resolve_opt(&self, kind: EntityKind, source_id: Option<&str>) -> Option<Uuid> {
        source_id.and_then(|id| self.resolve(kind, id))
    }

    /// Number of entries recorded for a kind
    pub fn len(&self, kind: EntityKind) -> usize {
        self.maps.get(&kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_resolve() {
        let mut registry = IdRegistry::new();
        let id = Uuid::new_v4();

        registry.set(EntityKind::Organization, "recOrg1", id).unwrap();

        assert_eq!(registry.resolve(EntityKind::Organization, "recOrg1"), Some(id));
        assert_eq!(registry.len(EntityKind::Organization), 1);
    }

    #[test]
    fn test_unresolved_reference_is_none() {
        let registry = IdRegistry::new();
        assert_eq!(registry.resolve(EntityKind::Organization, "recMissing"), None);
        assert_eq!(registry.resolve_opt(EntityKind::Organization, None), None);
    }

    #[test]
    fn test_kinds_are_isolated() {
        let mut registry = IdRegistry::new();
        registry.set(EntityKind::Organization, "rec1", Uuid::new_v4()).unwrap();

        assert_eq!(registry.resolve(EntityKind::Community, "rec1"), None);
        assert!(registry.is_empty(EntityKind::Community));
    }

    #[test]
    fn test_repeated_identical_set_is_noop() {
        let mut registry = IdRegistry::new();
        let id = Uuid::new_v4();

        registry.set(EntityKind::Profile, "a@example.com", id).unwrap();
        registry.set(EntityKind::Profile, "a@example.com", id).unwrap();

        assert_eq!(registry.len(EntityKind::Profile), 1);
    }

    #[test]
    fn test_conflicting_set_is_rejected() {
        let mut registry = IdRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        registry.set(EntityKind::Story, "recStory1", first).unwrap();
        let err = registry.set(EntityKind::Story, "recStory1", second).unwrap_err();

        assert!(matches!(err, RegistryError::Conflict { existing, .. } if existing == first));
        assert_eq!(registry.resolve(EntityKind::Story, "recStory1"), Some(first));
    }
}
