//! Audit stamping shared by every persisted entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity recorded for writes made by start-up tasks
pub const SYSTEM_ACTOR: &str = "system";

/// createdAt / updatedAt plus the identities that made those writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl AuditFields {
    /// Stamp a new record
    pub fn created(actor: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor.map(str::to_string),
            updated_by: actor.map(str::to_string),
        }
    }

    /// Stamp a modification; creation fields are left untouched
    pub fn touch(&mut self, actor: &str, now: DateTime<Utc>) {
        self.updated_at = now;
        self.updated_by = Some(actor.to_string());
    }
}
