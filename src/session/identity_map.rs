// src/session/identity_map.rs
//
// First-level cache: at most one cached instance per (table, id)

use std::any::Any;
use std::collections::HashMap;

use crate::domain::Entity;

#[derive(Default)]
pub(crate) struct IdentityMap {
    entries: HashMap<(&'static str, i64), Box<dyn Any + Send>>,
}

impl IdentityMap {
    pub fn get<E: Entity>(&self, id: i64) -> Option<&E> {
        self.entries
            .get(&(E::TABLE, id))
            .and_then(|entry| entry.downcast_ref::<E>())
    }

    pub fn contains<E: Entity>(&self, id: i64) -> bool {
        self.get::<E>(id).is_some()
    }

    /// Cache a copy of `entity`; unsaved entities are ignored
    pub fn put<E: Entity>(&mut self, entity: &E) {
        if let Some(id) = entity.id() {
            self.entries.insert((E::TABLE, id), Box::new(entity.clone()));
        }
    }

    /// The cached instance wins over a freshly loaded row
    pub fn register<E: Entity>(&mut self, loaded: E) -> E {
        let Some(id) = loaded.id() else {
            return loaded;
        };
        if let Some(cached) = self.get::<E>(id) {
            return cached.clone();
        }
        self.put(&loaded);
        loaded
    }

    pub fn evict<E: Entity>(&mut self, id: i64) {
        self.entries.remove(&(E::TABLE, id));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("IdentityMap").field("entries", &keys).finish()
    }
}
