// src/session/token.rs
//
// Identity of a session, shared with the lazy handles it hands out

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cloned into every lazy relation handle a session produces. The open
/// flag is shared, so handles observe the session ending.
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: Uuid,
    open: Arc<AtomicBool>,
}

impl SessionToken {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl PartialEq for SessionToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionToken {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_observe_close() {
        let token = SessionToken::new();
        let handle = token.clone();
        assert!(handle.is_open());

        token.close();
        assert!(!handle.is_open());
        assert_eq!(token, handle);
    }

    #[test]
    fn test_distinct_sessions_differ() {
        assert_ne!(SessionToken::new(), SessionToken::new());
    }
}
