// src/repositories/team_repository.rs
//
// Team persistence

use crate::db::{get_connection, ConnectionPool};
use crate::domain::Team;
use crate::error::AppResult;
use crate::query::{DerivedFinder, EntityGraph, FinderSpec, Operator, QueryCatalog};
use crate::repositories::crud_repository::CrudRepository;
use crate::session::Session;

pub trait TeamRepository: CrudRepository<Team> {
    fn find_by_name(&self, session: &mut Session, name: &str) -> AppResult<Vec<Team>>;
}

pub struct SqliteTeamRepository {
    graph: EntityGraph,
    find_by_name: DerivedFinder<Team>,
}

impl SqliteTeamRepository {
    pub fn new(pool: &ConnectionPool) -> AppResult<Self> {
        let conn = get_connection(pool)?;
        let mut catalog = QueryCatalog::new(&conn, "TeamRepository");

        Ok(Self {
            graph: EntityGraph::empty(),
            find_by_name: catalog.finder(FinderSpec::new("findByName").by("name", Operator::Eq))?,
        })
    }
}

impl CrudRepository<Team> for SqliteTeamRepository {
    fn fetch_graph(&self) -> &EntityGraph {
        &self.graph
    }
}

impl TeamRepository for SqliteTeamRepository {
    fn find_by_name(&self, session: &mut Session, name: &str) -> AppResult<Vec<Team>> {
        self.find_by_name.find(session, vec![name.into()])
    }
}
