//! Ticket lifecycle transitions
//!
//! Pure functions over [`HelpdeskTicket`]. Each one validates everything it
//! needs before touching the ticket, so a failed transition leaves the
//! ticket unchanged.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AuditFields, HelpdeskTicket, NewTicket, TicketStatus};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::require_text;

/// A new ticket: always DRAFT, unassigned, with a fresh ticket number
pub fn draft(
    title: Option<&str>,
    body: Option<&str>,
    actor: &str,
    now: DateTime<Utc>,
) -> AppResult<NewTicket> {
    let title = require_text("Title", title)?;
    let body = require_text("Body", body)?;

    Ok(NewTicket {
        ticket_no: Uuid::new_v4().to_string(),
        title: title.to_string(),
        body: body.to_string(),
        status: TicketStatus::Draft,
        audit: AuditFields::created(Some(actor), now),
    })
}

/// Bind an assignee; the ticket is re-filed whatever its prior status
pub fn assign(ticket: &mut HelpdeskTicket, employee_id: i64, actor: &str, now: DateTime<Utc>) {
    ticket.assignee_id = Some(employee_id);
    ticket.status = TicketStatus::Filed;
    ticket.audit.touch(actor, now);
}

/// Who is remarking a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkActor {
    /// No ownership check
    Admin,
    /// Must be the ticket's current assignee
    Employee { employee_id: i64 },
}

/// Replace the remarks and move to `status`
pub fn remark(
    ticket: &mut HelpdeskTicket,
    remarks: Option<&str>,
    status: Option<&str>,
    actor: RemarkActor,
    identity: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if let RemarkActor::Employee { employee_id } = actor {
        if ticket.assignee_id != Some(employee_id) {
            return Err(AppError::not_authorized(
                "You are not authorized to update this ticket.",
            ));
        }
    }

    let remarks = remarks.ok_or_else(|| AppError::validation("Remarks is required"))?;
    let status = TicketStatus::parse(require_text("Status", status)?)?;

    ticket.remarks = Some(remarks.to_string());
    ticket.status = status;
    ticket.audit.touch(identity, now);
    Ok(())
}

/// Field values for [`update`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketChanges<'a> {
    pub title: Option<&'a str>,
    pub body: Option<&'a str>,
    /// Absent keeps the current status
    pub status: Option<&'a str>,
    /// Absent keeps the current remarks
    pub remarks: Option<&'a str>,
}

/// Replace title, body and status; assignee and ticket number never change
pub fn update(
    ticket: &mut HelpdeskTicket,
    changes: TicketChanges<'_>,
    identity: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let title = require_text("Title", changes.title)?;
    let body = require_text("Body", changes.body)?;
    let status = changes.status.map(TicketStatus::parse).transpose()?;

    ticket.title = title.to_string();
    ticket.body = body.to_string();
    if let Some(status) = status {
        ticket.status = status;
    }
    if let Some(remarks) = changes.remarks {
        ticket.remarks = Some(remarks.to_string());
    }
    ticket.audit.touch(identity, now);
    Ok(())
}
