// src/domain/audit.rs
//
// Audit timestamps and the clock that feeds them
//
// INVARIANTS:
// 1. created_at is set exactly once, on first save
// 2. updated_at is refreshed on every successful mutation
// 3. created_at <= updated_at

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Source of "now" for audit stamping
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Audit {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Pre-insert hook
    pub fn stamped_for_insert(now: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Pre-update hook; never moves updated_at before created_at
    pub fn stamped_for_update(&self, now: DateTime<Utc>) -> Self {
        let updated_at = match self.created_at {
            Some(created) if now < created => created,
            _ => now,
        };
        Self {
            created_at: self.created_at,
            updated_at: Some(updated_at),
        }
    }

    /// Pre-commit hook called by save: insert stamping for a record that was
    /// never stamped, update stamping otherwise
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        *self = match self.created_at {
            None => Self::stamped_for_insert(now),
            Some(_) => self.stamped_for_update(now),
        };
    }

    /// Timestamps read back from the store
    pub fn restored(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(created_at),
            updated_at: Some(updated_at),
        }
    }

    /// Read `created_at` / `updated_at` columns (RFC 3339 text)
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self::restored(
            parse_timestamp(row, "created_at")?,
            parse_timestamp(row, "updated_at")?,
        ))
    }
}

/// Fixed-width UTC text (nanoseconds, `Z`), so stored timestamps order as strings
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    let index = row.as_ref().column_index(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid {} timestamp '{}': {}", column, raw, e),
                )),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_insert_sets_both() {
        let now = Utc::now();
        let audit = Audit::stamped_for_insert(now);
        assert_eq!(audit.created_at(), Some(now));
        assert_eq!(audit.updated_at(), Some(now));
    }

    #[test]
    fn test_update_keeps_created_at() {
        let created = Utc::now();
        let later = created + Duration::seconds(5);

        let updated = Audit::stamped_for_insert(created).stamped_for_update(later);
        assert_eq!(updated.created_at(), Some(created));
        assert_eq!(updated.updated_at(), Some(later));
    }

    #[test]
    fn test_update_clamped_to_created_at() {
        let created = Utc::now();
        let skewed = created - Duration::seconds(30);

        let updated = Audit::stamped_for_insert(created).stamped_for_update(skewed);
        assert_eq!(updated.updated_at(), Some(created));
    }

    #[test]
    fn test_stamp_dispatches_on_created_at() {
        let first = Utc::now();
        let second = first + Duration::seconds(1);

        let mut audit = Audit::default();
        audit.stamp(first);
        assert_eq!(audit, Audit::stamped_for_insert(first));

        audit.stamp(second);
        assert_eq!(audit.created_at(), Some(first));
        assert_eq!(audit.updated_at(), Some(second));
    }

    #[test]
    fn test_stored_text_orders_like_timestamps() {
        let whole = DateTime::parse_from_rfc3339("2026-01-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let fraction = whole + Duration::milliseconds(500);

        let (a, b) = (format_timestamp(whole), format_timestamp(fraction));
        assert_eq!(a, "2026-01-01T10:00:00.000000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_mock_clock() {
        let fixed = Utc::now();
        let mut clock = MockClock::new();
        clock.expect_now().times(1).return_const(fixed);
        assert_eq!(clock.now(), fixed);
    }
}
