//! Audit trail types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::{AuditLogId, AuditSeverity, UserId};

/// An entry waiting to be written by the audit logger.
///
/// Built by route handlers after a mutation succeeded:
///
/// ```rust,ignore
/// state.audit().record(
///     NewAuditEntry::new("PRODUCT_DELETE", AuditSeverity::Medium)
///         .actor(user.id)
///         .target("product", id.as_i32())
///         .old_values(&product)
///         .client(&client),
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub action: String,
    pub user_id: Option<UserId>,
    pub target_type: Option<String>,
    pub target_id: Option<i32>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub severity: AuditSeverity,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    #[must_use]
    pub fn new(action: &str, severity: AuditSeverity) -> Self {
        Self {
            action: action.to_owned(),
            user_id: None,
            target_type: None,
            target_id: None,
            old_values: None,
            new_values: None,
            severity,
            ip_address: None,
            user_agent: None,
        }
    }

    #[must_use]
    pub const fn actor(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn target(mut self, target_type: &str, target_id: i32) -> Self {
        self.target_type = Some(target_type.to_owned());
        self.target_id = Some(target_id);
        self
    }

    /// Snapshot before the change. Values that fail to serialize are skipped.
    #[must_use]
    pub fn old_values(mut self, values: &impl Serialize) -> Self {
        self.old_values = serde_json::to_value(values).ok();
        self
    }

    /// Snapshot after the change. Values that fail to serialize are skipped.
    #[must_use]
    pub fn new_values(mut self, values: &impl Serialize) -> Self {
        self.new_values = serde_json::to_value(values).ok();
        self
    }

    #[must_use]
    pub fn client(mut self, client: &crate::middleware::ClientInfo) -> Self {
        self.ip_address.clone_from(&client.ip);
        self.user_agent.clone_from(&client.user_agent);
        self
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub action: String,
    pub user_id: Option<UserId>,
    pub user_email: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<i32>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub severity: AuditSeverity,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Delivery counters of the audit logger since process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    /// Entries written to the database.
    pub recorded: u64,
    /// Entries discarded because the queue was full or closed.
    pub dropped: u64,
    /// Entries whose insert failed.
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let entry = NewAuditEntry::new("ORDER_CREATE", AuditSeverity::Medium)
            .actor(UserId::new(3))
            .target("order", 42)
            .new_values(&serde_json::json!({"items": 2}));

        assert_eq!(entry.action, "ORDER_CREATE");
        assert_eq!(entry.user_id, Some(UserId::new(3)));
        assert_eq!(entry.target_type.as_deref(), Some("order"));
        assert_eq!(entry.target_id, Some(42));
        assert_eq!(entry.new_values, Some(serde_json::json!({"items": 2})));
        assert_eq!(entry.old_values, None);
    }
}
