// src/repositories/member_repository.rs
//
// Member persistence
//
// All finders, named queries and the bulk update are declared in `new` and
// validated against the live schema there. A repository that constructs
// cannot fail later on a bad declaration.

use crate::db::{get_connection, ConnectionPool};
use crate::domain::{Member, MemberDto, Team};
use crate::error::AppResult;
use crate::query::{
    BulkUpdate, BulkUpdateSpec, DerivedFinder, EntityGraph, FinderSpec, NamedParams, NamedQuery,
    Operator, Page, PageRequest, ParamKind, QueryCatalog, QueryHints, SqlStatement, UpdateOp, Value,
};
use crate::repositories::crud_repository::CrudRepository;
use crate::session::Session;

pub trait MemberRepository: CrudRepository<Member> {
    /// Exact match on username and age
    fn find_user(&self, session: &mut Session, username: &str, age: i32) -> AppResult<Vec<Member>>;
    fn find_by_username_and_age_greater_than(&self, session: &mut Session, username: &str, age: i32) -> AppResult<Vec<Member>>;
    fn find_username_list(&self, session: &mut Session) -> AppResult<Vec<String>>;
    /// Members that have a team, projected with the team name
    fn find_member_dto(&self, session: &mut Session) -> AppResult<Vec<MemberDto>>;
    fn find_by_names(&self, session: &mut Session, names: &[&str]) -> AppResult<Vec<Member>>;
    fn find_list_by_username(&self, session: &mut Session, username: &str) -> AppResult<Vec<Member>>;
    /// `None` when absent; NonUniqueResult when several members share the name
    fn find_member_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>>;
    fn find_optional_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>>;
    fn find_by_age(&self, session: &mut Session, age: i32, request: &PageRequest) -> AppResult<Page<Member>>;
    /// Read-only page; content is not cached in the session
    fn find_by_username_paged(&self, session: &mut Session, username: &str, request: &PageRequest) -> AppResult<Page<Member>>;
    /// `age = age + 1` for every member at least `age` old. Clears the
    /// session afterwards.
    fn bulk_age_plus(&self, session: &mut Session, age: i32) -> AppResult<usize>;
    /// Members with their teams, read by one LEFT JOIN
    fn find_member_fetch_join(&self, session: &mut Session) -> AppResult<Vec<Member>>;
    fn find_member_entity_graph(&self, session: &mut Session) -> AppResult<Vec<Member>>;
    fn find_member_named_entity_graph(&self, session: &mut Session) -> AppResult<Vec<Member>>;
    /// Members by username with their teams loaded
    fn find_by_username(&self, session: &mut Session, username: &str) -> AppResult<Vec<Member>>;
    fn find_read_only_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>>;
    /// Hand-written query outside the declared catalog
    fn find_member_custom(&self, session: &mut Session) -> AppResult<Vec<Member>>;
}

/// Graph applied by the `Member.all` named graph
const MEMBER_ALL_GRAPH: &[&str] = &["team"];

const FETCH_JOIN_SQL: &str = "SELECT m.*, t.id AS t_id, t.name AS t_name, \
     t.created_at AS t_created_at, t.updated_at AS t_updated_at \
     FROM member m LEFT JOIN team t ON t.id = m.team_id ORDER BY m.id";

pub struct SqliteMemberRepository {
    team_graph: EntityGraph,
    named_all_graph: EntityGraph,

    find_by_username_and_age_greater_than: DerivedFinder<Member>,
    find_list_by_username: DerivedFinder<Member>,
    find_member_by_username: DerivedFinder<Member>,
    find_optional_by_username: DerivedFinder<Member>,
    find_by_age: DerivedFinder<Member>,
    find_by_username: DerivedFinder<Member>,
    find_by_username_paged: DerivedFinder<Member>,
    find_read_only_by_username: DerivedFinder<Member>,

    bulk_age_plus: BulkUpdate<Member>,

    find_user: NamedQuery,
    find_username_list: NamedQuery,
    find_member_dto: NamedQuery,
    find_by_names: NamedQuery,
    find_member_fetch_join: NamedQuery,
    find_member_entity_graph: NamedQuery,
    find_member_named_entity_graph: NamedQuery,
}

impl SqliteMemberRepository {
    /// Declare and verify every query; any bad declaration fails here
    pub fn new(pool: &ConnectionPool) -> AppResult<Self> {
        let conn = get_connection(pool)?;
        let mut catalog = QueryCatalog::new(&conn, "MemberRepository");

        let username_eq = |name: &str| FinderSpec::new(name).by("username", Operator::Eq);

        let repo = Self {
            team_graph: EntityGraph::of::<Member>(&["team"])?,
            named_all_graph: EntityGraph::of::<Member>(MEMBER_ALL_GRAPH)?,

            find_by_username_and_age_greater_than: catalog.finder(
                FinderSpec::new("findByUsernameAndAgeGreaterThan")
                    .by("username", Operator::Eq)
                    .by("age", Operator::Gt),
            )?,
            find_list_by_username: catalog.finder(username_eq("findListByUsername"))?,
            find_member_by_username: catalog.finder(username_eq("findMemberByUsername"))?,
            find_optional_by_username: catalog.finder(username_eq("findOptionalByUsername"))?,
            find_by_age: catalog.finder(FinderSpec::new("findByAge").by("age", Operator::Eq))?,
            find_by_username: catalog.finder(username_eq("findByUsername").fetch(&["team"]))?,
            find_by_username_paged: catalog
                .finder(username_eq("findByUsernamePaged").hints(QueryHints::read_only()))?,
            find_read_only_by_username: catalog
                .finder(username_eq("findReadOnlyByUsername").hints(QueryHints::read_only()))?,

            bulk_age_plus: catalog.bulk_update(
                BulkUpdateSpec::new("bulkAgePlus")
                    .set("age", UpdateOp::Increment(1))
                    .by("age", Operator::Ge)
                    .clear_automatically(),
            )?,

            find_user: catalog.named(
                "findUser",
                "SELECT m.* FROM member m WHERE m.username = :username AND m.age = :age ORDER BY m.id",
                &[("username", ParamKind::Scalar), ("age", ParamKind::Scalar)],
            )?,
            find_username_list: catalog.named(
                "findUsernameList",
                "SELECT m.username FROM member m ORDER BY m.id",
                &[],
            )?,
            find_member_dto: catalog.named(
                "findMemberDto",
                "SELECT m.id AS id, m.username AS username, t.name AS team_name \
                 FROM member m JOIN team t ON t.id = m.team_id ORDER BY m.id",
                &[],
            )?,
            find_by_names: catalog.named(
                "findByNames",
                "SELECT m.* FROM member m WHERE m.username IN :names ORDER BY m.id",
                &[("names", ParamKind::List)],
            )?,
            find_member_fetch_join: catalog.named("findMemberFetchJoin", FETCH_JOIN_SQL, &[])?,
            find_member_entity_graph: catalog.named(
                "findMemberEntityGraph",
                "SELECT m.* FROM member m ORDER BY m.id",
                &[],
            )?,
            find_member_named_entity_graph: catalog.named(
                "findMemberNamedEntityGraph",
                "SELECT m.* FROM member m ORDER BY m.id",
                &[],
            )?,
        };

        log::info!("MemberRepository ready: {} queries declared", catalog.declared());
        Ok(repo)
    }
}

impl CrudRepository<Member> for SqliteMemberRepository {
    /// `find_all` loads teams along with their members
    fn fetch_graph(&self) -> &EntityGraph {
        &self.team_graph
    }
}

impl MemberRepository for SqliteMemberRepository {
    fn find_user(&self, session: &mut Session, username: &str, age: i32) -> AppResult<Vec<Member>> {
        let params = NamedParams::new().set("username", username).set("age", age);
        self.find_user.fetch(session, &params)
    }

    fn find_by_username_and_age_greater_than(&self, session: &mut Session, username: &str, age: i32) -> AppResult<Vec<Member>> {
        self.find_by_username_and_age_greater_than
            .find(session, vec![username.into(), age.into()])
    }

    fn find_username_list(&self, session: &mut Session) -> AppResult<Vec<String>> {
        self.find_username_list.fetch_column(session, &NamedParams::new())
    }

    fn find_member_dto(&self, session: &mut Session) -> AppResult<Vec<MemberDto>> {
        self.find_member_dto
            .fetch_mapped(session, &NamedParams::new(), |row, _| MemberDto::from_row(row))
    }

    fn find_by_names(&self, session: &mut Session, names: &[&str]) -> AppResult<Vec<Member>> {
        let names: Vec<Value> = names.iter().map(|name| Value::from(*name)).collect();
        let params = NamedParams::new().set("names", names);
        self.find_by_names.fetch(session, &params)
    }

    fn find_list_by_username(&self, session: &mut Session, username: &str) -> AppResult<Vec<Member>> {
        self.find_list_by_username.find(session, vec![username.into()])
    }

    fn find_member_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>> {
        self.find_member_by_username.find_one(session, vec![username.into()])
    }

    fn find_optional_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>> {
        self.find_optional_by_username.find_one(session, vec![username.into()])
    }

    fn find_by_age(&self, session: &mut Session, age: i32, request: &PageRequest) -> AppResult<Page<Member>> {
        self.find_by_age.find_page(session, vec![age.into()], request)
    }

    fn find_by_username_paged(&self, session: &mut Session, username: &str, request: &PageRequest) -> AppResult<Page<Member>> {
        self.find_by_username_paged
            .find_page(session, vec![username.into()], request)
    }

    fn bulk_age_plus(&self, session: &mut Session, age: i32) -> AppResult<usize> {
        self.bulk_age_plus.execute(session, vec![age.into()])
    }

    fn find_member_fetch_join(&self, session: &mut Session) -> AppResult<Vec<Member>> {
        self.find_member_fetch_join
            .fetch_mapped(session, &NamedParams::new(), |row, _| {
                let team = Team::from_prefixed_row(row, "t_")?;
                Member::from_row_with_team(row, team)
            })
    }

    fn find_member_entity_graph(&self, session: &mut Session) -> AppResult<Vec<Member>> {
        self.find_member_entity_graph
            .fetch_with_graph(session, &NamedParams::new(), &self.team_graph)
    }

    fn find_member_named_entity_graph(&self, session: &mut Session) -> AppResult<Vec<Member>> {
        self.find_member_named_entity_graph
            .fetch_with_graph(session, &NamedParams::new(), &self.named_all_graph)
    }

    fn find_by_username(&self, session: &mut Session, username: &str) -> AppResult<Vec<Member>> {
        self.find_by_username.find(session, vec![username.into()])
    }

    fn find_read_only_by_username(&self, session: &mut Session, username: &str) -> AppResult<Option<Member>> {
        self.find_read_only_by_username
            .find_one(session, vec![username.into()])
    }

    fn find_member_custom(&self, session: &mut Session) -> AppResult<Vec<Member>> {
        let statement = SqlStatement::new("SELECT * FROM member ORDER BY id");
        session.fetch(&statement, QueryHints::default())
    }
}
