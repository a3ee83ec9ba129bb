//! Caller identity threaded through every store call.

use serde::{Deserialize, Serialize};

/// Opaque identity of the user an operation runs for.
///
/// The core never interprets it; stores use it for namespace access checks
/// and audit columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: i64,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}
