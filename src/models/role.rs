//! Role model

use serde::{Deserialize, Serialize};

use crate::models::AuditFields;

/// Role granting the ADMIN capability
pub const ADMIN_ROLE: &str = "ADMIN";
/// Role every registered employee receives
pub const EMPLOYEE_ROLE: &str = "EMPLOYEE";

/// Named permission group held by employees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deleted: bool,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        self.name.eq_ignore_ascii_case(ADMIN_ROLE)
    }

    /// Seeded roles the capability model depends on
    pub fn is_builtin(&self) -> bool {
        self.is_admin() || self.name.eq_ignore_ascii_case(EMPLOYEE_ROLE)
    }
}

/// Create or update role request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
