//! Filter criteria for employee and ticket listings
//!
//! Every field is optional; present fields are AND-combined. Text fields
//! match case-insensitive substrings, date bounds are inclusive.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::models::Employee;

/// Audit predicates shared by every filter
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditCriteria<'a> {
    pub created_by: Option<&'a str>,
    pub updated_by: Option<&'a str>,
    pub created_date_start: Option<NaiveDateTime>,
    pub created_date_end: Option<NaiveDateTime>,
    pub updated_date_start: Option<NaiveDateTime>,
    pub updated_date_end: Option<NaiveDateTime>,
}

/// Employee listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub employment_status: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_date_start: Option<NaiveDateTime>,
    pub created_date_end: Option<NaiveDateTime>,
    pub updated_date_start: Option<NaiveDateTime>,
    pub updated_date_end: Option<NaiveDateTime>,
}

impl EmployeeFilter {
    pub fn audit(&self) -> AuditCriteria<'_> {
        AuditCriteria {
            created_by: self.created_by.as_deref(),
            updated_by: self.updated_by.as_deref(),
            created_date_start: self.created_date_start,
            created_date_end: self.created_date_end,
            updated_date_start: self.updated_date_start,
            updated_date_end: self.updated_date_end,
        }
    }

    /// Whether any predicate targets an encrypted column
    pub fn has_encrypted_predicates(&self) -> bool {
        non_blank(self.first_name.as_deref()).is_some()
            || non_blank(self.last_name.as_deref()).is_some()
    }

    /// Evaluate the encrypted-column predicates against decrypted values
    pub fn matches_decrypted(&self, employee: &Employee) -> bool {
        contains_ignore_case(&employee.first_name, self.first_name.as_deref())
            && contains_ignore_case(&employee.last_name, self.last_name.as_deref())
    }
}

/// Ticket listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketFilter {
    pub ticket_no: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Exact match after case-insensitive parse
    pub status: Option<String>,
    /// Substring of the assignee's full name or email
    pub assignee: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_date_start: Option<NaiveDateTime>,
    pub created_date_end: Option<NaiveDateTime>,
    pub updated_date_start: Option<NaiveDateTime>,
    pub updated_date_end: Option<NaiveDateTime>,
}

impl TicketFilter {
    pub fn audit(&self) -> AuditCriteria<'_> {
        AuditCriteria {
            created_by: self.created_by.as_deref(),
            updated_by: self.updated_by.as_deref(),
            created_date_start: self.created_date_start,
            created_date_end: self.created_date_end,
            updated_date_start: self.updated_date_start,
            updated_date_end: self.updated_date_end,
        }
    }
}

/// Which tickets a listing may return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketScope {
    All,
    /// Created by `identity` or assigned to `employee_id`
    Relevant { identity: String, employee_id: i64 },
}

/// Whether an employee matches a ticket `assignee` filter term
pub fn assignee_matches(employee: &Employee, term: &str) -> bool {
    contains_ignore_case(&employee.full_name(), Some(term))
        || contains_ignore_case(&employee.email, Some(term))
}

/// Trimmed value, `None` when blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Case-insensitive substring test; an absent or blank needle always matches
pub fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match non_blank(needle) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}
