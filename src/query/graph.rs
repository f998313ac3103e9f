// src/query/graph.rs
//
// Fetch graphs: relations to load eagerly with their owners

use crate::domain::Entity;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityGraph {
    attribute_paths: Vec<String>,
}

impl EntityGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declare a graph for `E`; every path must name one of its relations
    pub fn of<E: Entity>(attribute_paths: &[&str]) -> AppResult<Self> {
        for path in attribute_paths {
            if !E::relations().iter().any(|relation| relation.name == *path) {
                return Err(AppError::query_syntax(format!(
                    "entity graph path '{}' is not a relation of {}",
                    path,
                    E::TABLE
                )));
            }
        }

        let mut paths: Vec<String> = attribute_paths.iter().map(|p| p.to_string()).collect();
        paths.dedup();
        Ok(Self {
            attribute_paths: paths,
        })
    }

    pub fn includes(&self, path: &str) -> bool {
        self.attribute_paths.iter().any(|p| p == path)
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_paths.is_empty()
    }
}
