// src/error/types.rs
use crate::domain::DomainError;
use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Expected at most one result, found {0}")]
    NonUniqueResult(usize),

    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Session has ended; relation can no longer be resolved")]
    StaleSession,

    #[error("Store timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl AppError {
    pub fn query_syntax(message: impl Into<String>) -> Self {
        AppError::QuerySyntax(message.into())
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => AppError::ConstraintViolation(err.to_string()),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                AppError::Timeout(err.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

// r2d2 only fails a checkout once its connection timeout has elapsed
impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Timeout(format!("connection pool checkout: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::time::Duration;

    #[test]
    fn test_constraint_errors_are_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (name) VALUES ('a')", []).unwrap();

        let err: AppError = conn
            .execute("INSERT INTO t (name) VALUES ('a')", [])
            .unwrap_err()
            .into();

        assert!(matches!(err, AppError::ConstraintViolation(_)), "got {:?}", err);
    }

    #[test]
    fn test_lock_contention_is_a_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.db");

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);").unwrap();
        holder.execute_batch("BEGIN IMMEDIATE; INSERT INTO t (name) VALUES ('a');").unwrap();

        let writer = Connection::open(&path).unwrap();
        writer.busy_timeout(Duration::from_millis(20)).unwrap();
        let err: AppError = writer
            .execute("INSERT INTO t (name) VALUES ('b')", [])
            .unwrap_err()
            .into();

        assert!(matches!(err, AppError::Timeout(_)), "got {:?}", err);
        holder.execute_batch("ROLLBACK").unwrap();
    }

    #[test]
    fn test_other_sqlite_errors_stay_database_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err: AppError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_errors_serialize_as_messages() {
        let json = serde_json::to_string(&AppError::NotFound).unwrap();
        assert_eq!(json, "\"Resource not found\"");
    }
}
