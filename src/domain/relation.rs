// src/domain/relation.rs
//
// Relations to other entities
//
// A relation is either fully loaded or a handle (target id + the session
// that produced it). Handles are resolved explicitly through that session;
// once it has ended they fail with StaleSession instead of returning
// partial data.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::domain::model::Entity;
use crate::session::SessionToken;

#[derive(Debug, Clone)]
pub struct LazyRef {
    id: i64,
    token: SessionToken,
}

impl LazyRef {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}

#[derive(Debug, Clone)]
pub enum Relation<T: Entity> {
    Loaded(Box<T>),
    Lazy(LazyRef),
}

impl<T: Entity> Relation<T> {
    pub fn loaded(target: T) -> Self {
        Relation::Loaded(Box::new(target))
    }

    pub fn lazy(id: i64, token: SessionToken) -> Self {
        Relation::Lazy(LazyRef { id, token })
    }

    /// Target identifier; `None` only for a loaded target that was never saved
    pub fn id(&self) -> Option<i64> {
        match self {
            Relation::Loaded(target) => target.id(),
            Relation::Lazy(handle) => Some(handle.id),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }

    /// The target, if it has been loaded
    pub fn get(&self) -> Option<&T> {
        match self {
            Relation::Loaded(target) => Some(&**target),
            Relation::Lazy(_) => None,
        }
    }
}

impl<T: Entity + Serialize> Serialize for Relation<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Relation::Loaded(target) => target.serialize(serializer),
            Relation::Lazy(handle) => {
                let mut state = serializer.serialize_struct("LazyRef", 2)?;
                state.serialize_field("id", &handle.id)?;
                state.serialize_field("loaded", &false)?;
                state.end()
            }
        }
    }
}
