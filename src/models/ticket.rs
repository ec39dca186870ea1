//! Helpdesk ticket model

use serde::{Deserialize, Serialize};

use crate::models::AuditFields;
use crate::utils::error::AppError;

/// Ticket workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    /// Created, not yet assigned
    Draft,
    /// Assigned and queued
    Filed,
    /// Being worked on
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Draft,
        TicketStatus::Filed,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Draft => "DRAFT",
            TicketStatus::Filed => "FILED",
            TicketStatus::InProgress => "INPROGRESS",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
        }
    }

    /// Parse a client-supplied token, failing with `InvalidStatus`
    pub fn parse(token: &str) -> Result<Self, AppError> {
        token.parse().map_err(AppError::InvalidStatus)
    }

    fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| {
                format!(
                    "Invalid status: '{}'. Valid statuses are: {}",
                    s,
                    Self::valid_values()
                )
            })
    }
}

/// Ticket entity
#[derive(Debug, Clone, PartialEq)]
pub struct HelpdeskTicket {
    pub id: i64,
    /// Assigned once at creation, never rewritten
    pub ticket_no: String,
    pub title: String,
    pub body: String,
    pub status: TicketStatus,
    pub assignee_id: Option<i64>,
    pub remarks: Option<String>,
    pub deleted: bool,
    pub audit: AuditFields,
}

/// Values for a new ticket row
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub ticket_no: String,
    pub title: String,
    pub body: String,
    pub status: TicketStatus,
    pub audit: AuditFields,
}

/// Assignee as embedded in a ticket view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Ticket as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: i64,
    pub ticket_no: String,
    pub title: String,
    pub body: String,
    pub status: TicketStatus,
    pub assignee: Option<AssigneeSummary>,
    pub remarks: Option<String>,
    pub deleted: bool,
    #[serde(flatten)]
    pub audit: AuditFields,
}

/// Create ticket request; any supplied status is ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTicketRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<String>,
}

/// Update ticket request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub status: Option<String>,
    /// Replaces the remarks only when present
    pub remarks: Option<String>,
}

/// Remark and status change request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemarkRequest {
    pub remarks: Option<String>,
    pub status: Option<String>,
}
