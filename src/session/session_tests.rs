use super::*;
use crate::config::StoreConfig;
use crate::db::connection::{create_connection_pool, create_test_pool};
use crate::db::initialize_database;
use crate::domain::audit::MockClock;
use crate::domain::{Member, Team};
use crate::query::{PageRequest, Value};
use chrono::Duration;

fn saved_team(session: &mut Session, name: &str) -> Team {
    let mut team = Team::new(name);
    session.persist(&mut team).unwrap();
    team
}

#[test]
fn test_commit_is_visible_to_later_sessions() {
    let (_dir, pool) = create_test_pool();

    let mut session = Session::begin(&pool).unwrap();
    let team = saved_team(&mut session, "teamA");
    session.commit().unwrap();

    let mut reader = Session::begin(&pool).unwrap();
    let found = reader.find::<Team>(team.id().unwrap()).unwrap().unwrap();
    assert_eq!(found, team);
    assert_eq!(found.name(), "teamA");
}

#[test]
fn test_drop_without_commit_rolls_back() {
    let (_dir, pool) = create_test_pool();

    let id = {
        let mut session = Session::begin(&pool).unwrap();
        saved_team(&mut session, "teamA").id().unwrap()
    };

    let mut reader = Session::begin(&pool).unwrap();
    assert!(reader.find::<Team>(id).unwrap().is_none());
}

#[test]
fn test_explicit_rollback() {
    let (_dir, pool) = create_test_pool();

    let mut session = Session::begin(&pool).unwrap();
    let id = saved_team(&mut session, "teamA").id().unwrap();
    session.rollback().unwrap();

    let mut reader = Session::begin(&pool).unwrap();
    assert!(reader.find::<Team>(id).unwrap().is_none());
}

#[test]
fn test_ids_are_not_reused() {
    let (_dir, pool) = create_test_pool();

    let mut session = Session::begin(&pool).unwrap();
    let first = saved_team(&mut session, "teamA");
    session.remove(&first).unwrap();
    let second = saved_team(&mut session, "teamB");

    assert!(second.id().unwrap() > first.id().unwrap());
    session.commit().unwrap();
}

#[test]
fn test_persist_stamps_audit_from_clock() {
    let (_dir, pool) = create_test_pool();
    let created = Utc::now();
    let updated = created + Duration::seconds(10);

    let mut clock = MockClock::new();
    let mut calls = 0;
    clock.expect_now().times(2).returning(move || {
        calls += 1;
        if calls == 1 {
            created
        } else {
            updated
        }
    });

    let mut session = Session::begin_with_clock(&pool, Arc::new(clock)).unwrap();
    let mut member = Member::with_age("member1", 10);
    session.persist(&mut member).unwrap();
    assert_eq!(member.created_at(), Some(created));
    assert_eq!(member.updated_at(), Some(created));

    member.age = 11;
    session.merge(&mut member).unwrap();
    assert_eq!(member.created_at(), Some(created));
    assert_eq!(member.updated_at(), Some(updated));

    session.clear();
    let reloaded = session.find::<Member>(member.id().unwrap()).unwrap().unwrap();
    assert_eq!(reloaded.created_at(), Some(created));
    assert_eq!(reloaded.updated_at(), Some(updated));
    assert_eq!(reloaded.age(), 11);
}

#[test]
fn test_persist_rejects_invalid_entity() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();

    let mut member = Member::with_age("", 10);
    assert!(matches!(session.persist(&mut member), Err(AppError::Domain(_))));
    assert_eq!(member.id(), None);
}

#[test]
fn test_transient_team_reference_is_a_constraint_violation() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();

    let mut member = Member::with_team("member1", 10, &Team::new("unsaved"));
    assert!(matches!(
        session.persist(&mut member),
        Err(AppError::ConstraintViolation(_))
    ));
}

#[test]
fn test_merge_of_deleted_row_is_not_found() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();

    let mut team = saved_team(&mut session, "teamA");
    session.remove(&team).unwrap();

    team.rename("teamB");
    assert!(matches!(session.merge(&mut team), Err(AppError::NotFound)));
}

#[test]
fn test_identity_map_serves_cached_state() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let team = saved_team(&mut session, "teamA");
    let id = team.id().unwrap();

    session
        .execute(&SqlStatement::positional(
            "UPDATE team SET name = ?1 WHERE id = ?2",
            vec!["changed".into(), id.into()],
        ))
        .unwrap();

    assert!(session.contains::<Team>(id));
    assert_eq!(session.find::<Team>(id).unwrap().unwrap().name(), "teamA");

    session.clear();
    assert!(!session.contains::<Team>(id));
    assert_eq!(session.find::<Team>(id).unwrap().unwrap().name(), "changed");
}

#[test]
fn test_refresh_reloads_from_store() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let mut team = saved_team(&mut session, "teamA");

    session
        .execute(&SqlStatement::positional(
            "UPDATE team SET name = 'changed' WHERE id = ?1",
            vec![team.id().into()],
        ))
        .unwrap();

    session.refresh(&mut team).unwrap();
    assert_eq!(team.name(), "changed");
    assert_eq!(
        session.find::<Team>(team.id().unwrap()).unwrap().unwrap().name(),
        "changed"
    );
}

#[test]
fn test_read_only_fetch_bypasses_identity_map() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let id = saved_team(&mut session, "teamA").id().unwrap();
    session.clear();

    let statement = SqlStatement::positional(
        "SELECT id, name, created_at, updated_at FROM team WHERE id = ?1",
        vec![id.into()],
    );
    let teams: Vec<Team> = session.fetch(&statement, QueryHints::read_only()).unwrap();
    assert_eq!(teams.len(), 1);
    assert!(!session.contains::<Team>(id));
}

#[test]
fn test_lazy_relation_resolves_inside_session() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let team = saved_team(&mut session, "teamA");
    let mut member = Member::with_team("member1", 10, &team);
    session.persist(&mut member).unwrap();
    session.clear();

    let mut loaded = session.find::<Member>(member.id().unwrap()).unwrap().unwrap();
    let relation = loaded.team().unwrap().clone();
    assert!(!relation.is_loaded());
    assert_eq!(session.resolve(&relation).unwrap(), team);

    session.initialize(loaded.team_mut().unwrap()).unwrap();
    assert_eq!(loaded.team().unwrap().get().unwrap().name(), "teamA");
}

#[test]
fn test_lazy_relation_is_stale_after_session_ends() {
    let (_dir, pool) = create_test_pool();

    let mut session = Session::begin(&pool).unwrap();
    let team = saved_team(&mut session, "teamA");
    let mut member = Member::with_team("member1", 10, &team);
    session.persist(&mut member).unwrap();
    session.clear();
    let loaded = session.find::<Member>(member.id().unwrap()).unwrap().unwrap();
    session.commit().unwrap();

    let relation = loaded.team().unwrap();
    assert_eq!(relation.id(), team.id());

    let mut other = Session::begin(&pool).unwrap();
    assert!(matches!(other.resolve(relation), Err(AppError::StaleSession)));
}

#[test]
fn test_lazy_relation_is_stale_in_another_open_session() {
    let (_dir, pool) = create_test_pool();

    let mut setup = Session::begin(&pool).unwrap();
    let team = saved_team(&mut setup, "teamA");
    let mut member = Member::with_team("member1", 10, &team);
    setup.persist(&mut member).unwrap();
    setup.commit().unwrap();

    let mut first = Session::begin(&pool).unwrap();
    let loaded = first.find::<Member>(member.id().unwrap()).unwrap().unwrap();
    let mut second = Session::begin(&pool).unwrap();

    assert!(matches!(
        second.resolve(loaded.team().unwrap()),
        Err(AppError::StaleSession)
    ));
    assert!(first.resolve(loaded.team().unwrap()).is_ok());
}

#[test]
fn test_find_all_by_ids_skips_missing_and_orders_by_id() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let a = saved_team(&mut session, "teamA");
    let b = saved_team(&mut session, "teamB");
    session.clear();

    let ids = [b.id().unwrap(), 9999, a.id().unwrap()];
    let teams = session.find_all_by_ids::<Team>(&ids).unwrap();
    assert_eq!(teams, vec![a, b]);
    assert!(session.find_all_by_ids::<Team>(&[]).unwrap().is_empty());
}

#[test]
fn test_query_page_requires_page_request() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();

    let result = session.query_page::<Member>(&QueryDescriptor::all(), &EntityGraph::empty());
    assert!(matches!(result, Err(AppError::QuerySyntax(_))));
}

#[test]
fn test_query_page_beyond_representable_offset_is_rejected() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    for name in ["member1", "member2", "member3"] {
        session.persist(&mut Member::new(name)).unwrap();
    }

    for request in [PageRequest::of(1 << 62, 4), PageRequest::of(u64::MAX, 1)] {
        let descriptor = QueryDescriptor::all().paged(request);
        let result = session.query_page::<Member>(&descriptor, &EntityGraph::empty());
        assert!(matches!(result, Err(AppError::QuerySyntax(_))));
    }

    let far = QueryDescriptor::all().paged(PageRequest::of(1 << 40, 4));
    let page = session.query_page::<Member>(&far, &EntityGraph::empty()).unwrap();
    assert!(page.content().is_empty());
    assert_eq!(page.total_elements(), 3);
    assert!(!page.has_next());
}

fn small_pool(dir: &tempfile::TempDir, max_connections: u32) -> crate::db::ConnectionPool {
    let config = StoreConfig {
        max_connections,
        connection_timeout_ms: 100,
        busy_timeout_ms: 50,
        ..StoreConfig::at_path(dir.path().join("small.db"))
    };
    let pool = create_connection_pool(&config).unwrap();
    initialize_database(&pool.get().unwrap()).unwrap();
    pool
}

#[test]
fn test_exhausted_pool_is_a_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let pool = small_pool(&dir, 1);

    let held = Session::begin(&pool).unwrap();
    let result = Session::begin(&pool);
    assert!(matches!(result, Err(AppError::Timeout(_))));

    drop(held);
    assert!(Session::begin(&pool).is_ok());
}

#[test]
fn test_concurrent_writer_is_a_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let pool = small_pool(&dir, 2);

    let mut first = Session::begin(&pool).unwrap();
    saved_team(&mut first, "teamA");

    let mut second = Session::begin(&pool).unwrap();
    let result = second.persist(&mut Team::new("teamB"));
    assert!(matches!(result, Err(AppError::Timeout(_))), "got {:?}", result);

    first.commit().unwrap();
}

#[test]
fn test_null_equality_matches_rows_without_team() {
    let (_dir, pool) = create_test_pool();
    let mut session = Session::begin(&pool).unwrap();
    let team = saved_team(&mut session, "teamA");

    let mut alone = Member::new("member1");
    session.persist(&mut alone).unwrap();
    session.persist(&mut Member::with_team("member2", 20, &team)).unwrap();

    let without = QueryDescriptor::filtered(Filter::all().and(Condition::new("team_id", Operator::Eq, Value::Null)));
    let found = session.query::<Member>(&without, &EntityGraph::empty()).unwrap();
    assert_eq!(found, vec![alone]);

    let with = QueryDescriptor::filtered(Filter::all().and(Condition::new("team_id", Operator::Ne, Value::Null)));
    let found = session.query::<Member>(&with, &EntityGraph::empty()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username(), "member2");
}
