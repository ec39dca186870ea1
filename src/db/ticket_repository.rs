//! Helpdesk ticket repository
//!
//! Every read joins the assignee so views carry a decrypted assignee
//! summary. The `assignee` filter term cannot be matched in SQL against
//! encrypted names; it is resolved to a set of employee ids first.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db::employee_repository::EmployeeRepository;
use crate::db::query::Predicates;
use crate::db::{format_timestamp, parse_db_timestamp, FieldCipher};
use crate::models::{
    assignee_matches, non_blank, AssigneeSummary, AuditFields, HelpdeskTicket, NewTicket, Page,
    PageRequest, TicketFilter, TicketScope, TicketStatus, TicketView,
};

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i64,
    ticket_no: String,
    title: String,
    body: String,
    status: String,
    assignee_id: Option<i64>,
    remarks: Option<String>,
    deleted: bool,
    created_at: String,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
    assignee_first_name: Option<String>,
    assignee_last_name: Option<String>,
    assignee_email: Option<String>,
}

const TICKET_SELECT: &str = "SELECT t.id, t.ticket_no, t.title, t.body, t.status, t.assignee_id, \
     t.remarks, t.deleted, t.created_at, t.updated_at, t.created_by, t.updated_by, \
     a.first_name AS assignee_first_name, a.last_name AS assignee_last_name, \
     a.email AS assignee_email \
     FROM helpdesk_tickets t LEFT JOIN employees a ON a.id = t.assignee_id";

/// What a ticket listing should return
#[derive(Debug, Clone)]
pub struct TicketCriteria<'a> {
    pub filter: &'a TicketFilter,
    /// Already parsed from `filter.status` or a path segment
    pub status: Option<TicketStatus>,
    pub assignee_id: Option<i64>,
    pub scope: &'a TicketScope,
}

impl<'a> TicketCriteria<'a> {
    pub fn new(filter: &'a TicketFilter, scope: &'a TicketScope) -> Self {
        Self {
            filter,
            status: None,
            assignee_id: None,
            scope,
        }
    }

    pub fn with_status(mut self, status: Option<TicketStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, employee_id: i64) -> Self {
        self.assignee_id = Some(employee_id);
        self
    }

    /// Compose the SQL predicates; `assignee_ids` is the resolved `assignee` term
    pub fn predicates(&self, assignee_ids: Option<&[i64]>) -> Predicates {
        let mut predicates = Predicates::active("t");
        predicates
            .contains("t.ticket_no", self.filter.ticket_no.as_deref())
            .contains("t.title", self.filter.title.as_deref())
            .contains("t.body", self.filter.body.as_deref())
            .equals("t.status", self.status.map(|s| s.as_str()))
            .equals_id("t.assignee_id", self.assignee_id)
            .audit("t", &self.filter.audit());

        if let Some(ids) = assignee_ids {
            predicates.id_in("t.assignee_id", ids);
        }
        if let TicketScope::Relevant {
            identity,
            employee_id,
        } = self.scope
        {
            predicates.text_or_id("t.created_by", identity, "t.assignee_id", *employee_id);
        }
        predicates
    }
}

pub struct TicketRepository<'c> {
    conn: &'c mut SqliteConnection,
    cipher: &'c FieldCipher,
}

impl<'c> TicketRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection, cipher: &'c FieldCipher) -> Self {
        Self { conn, cipher }
    }

    pub async fn insert(&mut self, ticket: &NewTicket) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO helpdesk_tickets (
                ticket_no, title, body, status, assignee_id, remarks, deleted,
                created_at, updated_at, created_by, updated_by
            )
            VALUES (?, ?, ?, ?, NULL, NULL, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.ticket_no)
        .bind(&ticket.title)
        .bind(&ticket.body)
        .bind(ticket.status.as_str())
        .bind(format_timestamp(ticket.audit.created_at))
        .bind(format_timestamp(ticket.audit.updated_at))
        .bind(&ticket.audit.created_by)
        .bind(&ticket.audit.updated_by)
        .execute(&mut *self.conn)
        .await
        .context("Failed to create ticket")?;

        Ok(result.last_insert_rowid())
    }

    /// Active ticket entity
    pub async fn find_active(&mut self, id: i64) -> Result<Option<HelpdeskTicket>> {
        self.find_row(id).await?.map(|row| row_to_ticket(&row)).transpose()
    }

    /// Active ticket with its assignee summary
    pub async fn find_view(&mut self, id: i64) -> Result<Option<TicketView>> {
        let Some(row) = self.find_row(id).await? else {
            return Ok(None);
        };
        Ok(Some(self.row_to_view(row)?))
    }

    /// Persist the mutable columns; the ticket number is never written
    pub async fn save(&mut self, ticket: &HelpdeskTicket) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE helpdesk_tickets
            SET title = ?, body = ?, status = ?, assignee_id = ?, remarks = ?,
                updated_at = ?, updated_by = ?
            WHERE id = ?
            "#,
        )
        .bind(&ticket.title)
        .bind(&ticket.body)
        .bind(ticket.status.as_str())
        .bind(ticket.assignee_id)
        .bind(&ticket.remarks)
        .bind(format_timestamp(ticket.audit.updated_at))
        .bind(&ticket.audit.updated_by)
        .bind(ticket.id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to update ticket")?;

        Ok(())
    }

    pub async fn soft_delete(&mut self, ticket: &HelpdeskTicket) -> Result<()> {
        sqlx::query(
            "UPDATE helpdesk_tickets SET deleted = 1, updated_at = ?, updated_by = ? WHERE id = ?",
        )
        .bind(format_timestamp(ticket.audit.updated_at))
        .bind(&ticket.audit.updated_by)
        .bind(ticket.id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to delete ticket")?;

        Ok(())
    }

    /// Unassign `employee_id` from every ticket; returns tickets touched
    pub async fn clear_assignee(
        &mut self,
        employee_id: i64,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE helpdesk_tickets SET assignee_id = NULL, updated_at = ?, updated_by = ? \
             WHERE assignee_id = ?",
        )
        .bind(format_timestamp(now))
        .bind(actor)
        .bind(employee_id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to clear ticket assignee")?;

        Ok(result.rows_affected())
    }

    /// Rewrite `created_by` after the creator's identity changed
    pub async fn restamp_creator(&mut self, old_identity: &str, new_identity: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE helpdesk_tickets SET created_by = ? WHERE created_by = ?")
            .bind(new_identity)
            .bind(old_identity)
            .execute(&mut *self.conn)
            .await
            .context("Failed to restamp ticket creator")?;

        Ok(result.rows_affected())
    }

    /// Filtered page of active tickets, id ascending
    pub async fn search(
        &mut self,
        criteria: &TicketCriteria<'_>,
        page: PageRequest,
    ) -> Result<Page<TicketView>> {
        let predicates = self.resolve(criteria).await?;
        let total = self.count(&predicates).await?;
        let content = self.fetch(&predicates, Some(page)).await?;
        Ok(Page::new(content, page, total))
    }

    /// Every active ticket matching `criteria`, id ascending
    pub async fn list(&mut self, criteria: &TicketCriteria<'_>) -> Result<Vec<TicketView>> {
        let predicates = self.resolve(criteria).await?;
        self.fetch(&predicates, None).await
    }

    /// Active ticket counts per status; every status is present
    pub async fn count_by_status(
        &mut self,
        created_by: Option<&str>,
        assignee_id: Option<i64>,
    ) -> Result<BTreeMap<TicketStatus, u64>> {
        let mut predicates = Predicates::active("t");
        predicates
            .equals("t.created_by", created_by)
            .equals_id("t.assignee_id", assignee_id);

        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT t.status, COUNT(*) FROM helpdesk_tickets t");
        predicates.push_where(&mut qb);
        qb.push(" GROUP BY t.status");

        let rows: Vec<(String, i64)> = qb
            .build_query_as()
            .fetch_all(&mut *self.conn)
            .await
            .context("Failed to count tickets by status")?;

        let mut counts: BTreeMap<TicketStatus, u64> =
            TicketStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for (status, count) in rows {
            let status = parse_stored_status(&status)?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    async fn find_row(&mut self, id: i64) -> Result<Option<TicketRow>> {
        let sql = format!("{} WHERE t.id = ? AND t.deleted = 0", TICKET_SELECT);
        sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .context("Failed to fetch ticket")
    }

    /// Turn the criteria into SQL predicates, resolving the assignee term
    async fn resolve(&mut self, criteria: &TicketCriteria<'_>) -> Result<Predicates> {
        let assignee_ids = match non_blank(criteria.filter.assignee.as_deref()) {
            Some(term) => Some(self.matching_assignee_ids(term).await?),
            None => None,
        };
        Ok(criteria.predicates(assignee_ids.as_deref()))
    }

    async fn matching_assignee_ids(&mut self, term: &str) -> Result<Vec<i64>> {
        let employees = EmployeeRepository::new(&mut *self.conn, self.cipher)
            .list_active()
            .await?;
        Ok(employees
            .iter()
            .filter(|e| assignee_matches(e, term))
            .map(|e| e.id)
            .collect())
    }

    async fn count(&mut self, predicates: &Predicates) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM helpdesk_tickets t");
        predicates.push_where(&mut qb);

        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.conn)
            .await
            .context("Failed to count tickets")?;

        Ok(total as u64)
    }

    async fn fetch(
        &mut self,
        predicates: &Predicates,
        page: Option<PageRequest>,
    ) -> Result<Vec<TicketView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(TICKET_SELECT);
        predicates.push_where(&mut qb);
        qb.push(" ORDER BY t.id ASC");
        if let Some(page) = page {
            qb.push(" LIMIT ").push_bind(page.limit());
            qb.push(" OFFSET ").push_bind(page.offset());
        }

        let rows = qb
            .build_query_as::<TicketRow>()
            .fetch_all(&mut *self.conn)
            .await
            .context("Failed to list tickets")?;

        rows.into_iter().map(|row| self.row_to_view(row)).collect()
    }

    fn row_to_view(&self, row: TicketRow) -> Result<TicketView> {
        let assignee = match (row.assignee_id, &row.assignee_first_name, &row.assignee_last_name) {
            (Some(id), Some(first), Some(last)) => Some(AssigneeSummary {
                id,
                first_name: self
                    .cipher
                    .decrypt(first)
                    .with_context(|| format!("Failed to decrypt first name of employee {}", id))?,
                last_name: self
                    .cipher
                    .decrypt(last)
                    .with_context(|| format!("Failed to decrypt last name of employee {}", id))?,
                email: row.assignee_email.clone().unwrap_or_default(),
            }),
            _ => None,
        };

        let ticket = row_to_ticket(&row)?;
        Ok(TicketView {
            id: ticket.id,
            ticket_no: ticket.ticket_no,
            title: ticket.title,
            body: ticket.body,
            status: ticket.status,
            assignee,
            remarks: ticket.remarks,
            deleted: ticket.deleted,
            audit: ticket.audit,
        })
    }
}

fn parse_stored_status(value: &str) -> Result<TicketStatus> {
    value
        .parse::<TicketStatus>()
        .map_err(|e| anyhow::anyhow!("Invalid status in database: {}", e))
}

fn row_to_ticket(row: &TicketRow) -> Result<HelpdeskTicket> {
    Ok(HelpdeskTicket {
        id: row.id,
        ticket_no: row.ticket_no.clone(),
        title: row.title.clone(),
        body: row.body.clone(),
        status: parse_stored_status(&row.status)?,
        assignee_id: row.assignee_id,
        remarks: row.remarks.clone(),
        deleted: row.deleted,
        audit: AuditFields {
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
            created_by: row.created_by.clone(),
            updated_by: row.updated_by.clone(),
        },
    })
}
