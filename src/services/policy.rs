//! Authorization policy
//!
//! Maps a principal to the operations it may perform and to the tickets it
//! may see. Every decision reads the principal resolved from the store and
//! ticket rows read from the store, never cached views.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::middleware::AuthUser;
use crate::models::{HelpdeskTicket, TicketScope, TicketStatus};
use crate::utils::error::{AppError, AppResult};

/// Capability held by a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Capability {
    Admin,
    Employee,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Admin => "ADMIN",
            Capability::Employee => "EMPLOYEE",
        }
    }
}

/// Operations gated by a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Employee CRUD, role assignment, employee listing
    ManageEmployees,
    ManageRoles,
    /// Own profile and own filed/assigned tickets
    SelfService,
    ListEmployeeReferences,
    CreateTicket,
    ViewTicket,
    UpdateTicket,
    RemarkAssignedTicket,
    /// List/filter all tickets, assign, delete, admin remark
    ManageTickets,
    ViewTicketCounts,
}

impl Operation {
    /// Capabilities of which at least one is required
    pub fn required(self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Operation::ManageEmployees | Operation::ManageRoles | Operation::ManageTickets => {
                &[Admin]
            }
            Operation::SelfService
            | Operation::ListEmployeeReferences
            | Operation::CreateTicket
            | Operation::ViewTicket
            | Operation::UpdateTicket
            | Operation::RemarkAssignedTicket
            | Operation::ViewTicketCounts => &[Admin, Employee],
        }
    }
}

/// Every authenticated principal is an employee; ADMIN is granted on top
pub fn capabilities(user: &AuthUser) -> BTreeSet<Capability> {
    let mut caps = BTreeSet::from([Capability::Employee]);
    if user.is_admin() {
        caps.insert(Capability::Admin);
    }
    caps
}

pub fn authorize(user: &AuthUser, operation: Operation) -> AppResult<()> {
    let caps = capabilities(user);
    if operation.required().iter().any(|c| caps.contains(c)) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "You do not have permission to perform this operation",
        ))
    }
}

/// "Relevant tickets" scope bound to the principal's own identity
pub fn relevant_scope(user: &AuthUser) -> TicketScope {
    TicketScope::Relevant {
        identity: user.identity().to_string(),
        employee_id: user.employee_id,
    }
}

pub fn is_creator(user: &AuthUser, ticket: &HelpdeskTicket) -> bool {
    ticket.audit.created_by.as_deref() == Some(user.identity())
}

pub fn is_assignee(user: &AuthUser, ticket: &HelpdeskTicket) -> bool {
    ticket.assignee_id == Some(user.employee_id)
}

/// Admins see every active ticket; employees only those they created or hold
pub fn check_can_view(user: &AuthUser, ticket: &HelpdeskTicket) -> AppResult<()> {
    if user.is_admin() || is_creator(user, ticket) || is_assignee(user, ticket) {
        Ok(())
    } else {
        Err(AppError::not_authorized(
            "You are not authorized to view this ticket.",
        ))
    }
}

/// Admins update freely; employees only their own tickets still in DRAFT
pub fn check_can_update(user: &AuthUser, ticket: &HelpdeskTicket) -> AppResult<()> {
    if user.is_admin() || (is_creator(user, ticket) && ticket.status == TicketStatus::Draft) {
        Ok(())
    } else {
        Err(AppError::not_authorized(
            "You are not authorized to update this ticket.",
        ))
    }
}
