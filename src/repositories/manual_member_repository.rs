// src/repositories/manual_member_repository.rs
//
// Hand-written Member repository
//
// Explicit SQL run straight through the session, with no declared finders.
// Unlike the declared repository its bulk update leaves the session alone;
// callers must clear or refresh afterwards.

use crate::domain::audit::format_timestamp;
use crate::domain::Member;
use crate::error::{AppError, AppResult};
use crate::query::sql::render_bulk_touch;
use crate::query::{QueryHints, SqlStatement, Value};
use crate::session::Session;

const SELECT_MEMBER: &str = "SELECT id, username, age, team_id, created_at, updated_at FROM member";

#[derive(Debug, Clone, Copy, Default)]
pub struct ManualMemberRepository;

impl ManualMemberRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn save(&self, session: &mut Session, member: Member) -> AppResult<Member> {
        let mut member = member;
        session.persist(&mut member)?;
        Ok(member)
    }

    pub fn delete(&self, session: &mut Session, member: &Member) -> AppResult<()> {
        session.remove(member)
    }

    pub fn find_all(&self, session: &mut Session) -> AppResult<Vec<Member>> {
        let statement = SqlStatement::new(format!("{} ORDER BY id", SELECT_MEMBER));
        session.fetch(&statement, QueryHints::default())
    }

    pub fn find_by_id(&self, session: &mut Session, id: i64) -> AppResult<Option<Member>> {
        session.find::<Member>(id)
    }

    /// Mandatory lookup
    pub fn find(&self, session: &mut Session, id: i64) -> AppResult<Member> {
        self.find_by_id(session, id)?.ok_or(AppError::NotFound)
    }

    pub fn count(&self, session: &mut Session) -> AppResult<u64> {
        session.fetch_count(&SqlStatement::new("SELECT COUNT(*) FROM member"))
    }

    pub fn find_by_username(&self, session: &mut Session, username: &str) -> AppResult<Vec<Member>> {
        let statement = SqlStatement::named(
            format!("{} WHERE username = :username ORDER BY id", SELECT_MEMBER),
            vec![(":username".to_string(), username.into())],
        );
        session.fetch(&statement, QueryHints::default())
    }

    pub fn find_by_username_and_age_greater_than(
        &self,
        session: &mut Session,
        username: &str,
        age: i32,
    ) -> AppResult<Vec<Member>> {
        let statement = SqlStatement::named(
            format!(
                "{} WHERE username = :username AND age > :age ORDER BY id",
                SELECT_MEMBER
            ),
            vec![
                (":username".to_string(), username.into()),
                (":age".to_string(), age.into()),
            ],
        );
        session.fetch(&statement, QueryHints::default())
    }

    /// Members of exactly `age`, newest username first
    pub fn find_by_page(&self, session: &mut Session, age: i32, offset: u64, limit: u64) -> AppResult<Vec<Member>> {
        let as_sql = |n: u64| {
            i64::try_from(n).map_err(|_| AppError::query_syntax(format!("limit/offset {} is out of range", n)))
        };
        let statement = SqlStatement::positional(
            format!(
                "{} WHERE age = ?1 ORDER BY username DESC, id ASC LIMIT ?2 OFFSET ?3",
                SELECT_MEMBER
            ),
            vec![age.into(), Value::Integer(as_sql(limit)?), Value::Integer(as_sql(offset)?)],
        );
        session.fetch(&statement, QueryHints::default())
    }

    pub fn total_count(&self, session: &mut Session, age: i32) -> AppResult<u64> {
        session.fetch_count(&SqlStatement::positional(
            "SELECT COUNT(*) FROM member WHERE age = ?1",
            vec![age.into()],
        ))
    }

    /// Bypasses the identity map and does not clear it
    pub fn bulk_age_plus(&self, session: &mut Session, age: i32) -> AppResult<usize> {
        let statement = SqlStatement::positional(
            format!("UPDATE member SET age = age + 1, {} WHERE age >= ?2", render_bulk_touch(1)),
            vec![format_timestamp(session.now()).into(), age.into()],
        );
        session.execute(&statement)
    }
}
