//! Ticket service
//!
//! Orchestrates the lifecycle transitions, the authorization policy and the
//! ticket repository. Ownership checks always read the ticket row from the
//! store; the view cache only serves the response body.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::ticket_repository::TicketCriteria;
use crate::db::{DbPool, EmployeeRepository, FieldCipher, TicketRepository};
use crate::middleware::AuthUser;
use crate::models::{
    non_blank, CreateTicketRequest, HelpdeskTicket, Page, PageRequest, RemarkRequest,
    TicketFilter, TicketScope, TicketStatus, TicketView, UpdateTicketRequest,
};
use crate::services::cache::ViewCache;
use crate::services::employee::employee_not_found;
use crate::services::lifecycle::{self, RemarkActor, TicketChanges};
use crate::services::policy::{self, authorize, Operation};
use crate::utils::error::{AppError, AppResult};

/// Which remark endpoint was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkPath {
    /// `PUT /tickets/{id}/remark`
    Admin,
    /// `PUT /employees/profile/assigned/{id}/remark`
    Assignee,
}

pub struct TicketService {
    pool: DbPool,
    cipher: Arc<FieldCipher>,
    cache: Arc<ViewCache>,
}

impl TicketService {
    pub fn new(pool: DbPool, cipher: Arc<FieldCipher>, cache: Arc<ViewCache>) -> Self {
        Self {
            pool,
            cipher,
            cache,
        }
    }

    fn repo<'c>(&'c self, conn: &'c mut SqliteConnection) -> TicketRepository<'c> {
        TicketRepository::new(conn, &self.cipher)
    }

    pub async fn create(&self, user: &AuthUser, request: CreateTicketRequest) -> AppResult<TicketView> {
        authorize(user, Operation::CreateTicket)?;
        let new_ticket = lifecycle::draft(
            request.title.as_deref(),
            request.body.as_deref(),
            user.identity(),
            Utc::now(),
        )?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let id = self.repo(&mut tx).insert(&new_ticket).await?;
        let view = self
            .repo(&mut tx)
            .find_view(id)
            .await?
            .ok_or_else(|| AppError::internal("Created ticket could not be read back"))?;
        tx.commit().await.context("Failed to commit ticket")?;

        info!(ticket_id = id, ticket_no = %view.ticket_no, actor = %user.identity(), "Ticket created");
        Ok(view)
    }

    /// Admins read any active ticket; employees only their own or assigned
    pub async fn get(&self, user: &AuthUser, id: i64) -> AppResult<TicketView> {
        authorize(user, Operation::ViewTicket)?;

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let ticket = self.load(&mut conn, id).await?;
        policy::check_can_view(user, &ticket)?;

        if let Some(view) = self.cache.ticket(id).await {
            return Ok(view);
        }
        let seen = self.cache.ticket_generation(id).await;
        let view = self
            .repo(&mut conn)
            .find_view(id)
            .await?
            .ok_or_else(|| ticket_not_found(id))?;
        self.cache.put_ticket(&view, seen).await;
        Ok(view)
    }

    /// Every active ticket matching the filter
    pub async fn list(
        &self,
        user: &AuthUser,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> AppResult<Page<TicketView>> {
        authorize(user, Operation::ManageTickets)?;
        self.search(filter, &TicketScope::All, page).await
    }

    /// Tickets the principal created or is assigned, AND the filter
    pub async fn relevant(
        &self,
        user: &AuthUser,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> AppResult<Page<TicketView>> {
        authorize(user, Operation::SelfService)?;
        self.search(filter, &policy::relevant_scope(user), page).await
    }

    async fn search(
        &self,
        filter: &TicketFilter,
        scope: &TicketScope,
        page: PageRequest,
    ) -> AppResult<Page<TicketView>> {
        page.validate()?;
        let status = non_blank(filter.status.as_deref())
            .map(TicketStatus::parse)
            .transpose()?;
        let criteria = TicketCriteria::new(filter, scope).with_status(status);

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Ok(self.repo(&mut conn).search(&criteria, page).await?)
    }

    /// Active tickets assigned to the principal
    pub async fn assigned(&self, user: &AuthUser) -> AppResult<Vec<TicketView>> {
        authorize(user, Operation::SelfService)?;
        let (filter, scope) = (TicketFilter::default(), TicketScope::All);
        let criteria = TicketCriteria::new(&filter, &scope).with_assignee(user.employee_id);

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Ok(self.repo(&mut conn).list(&criteria).await?)
    }

    pub async fn by_status(&self, user: &AuthUser, status: &str) -> AppResult<Vec<TicketView>> {
        authorize(user, Operation::ManageTickets)?;
        let status = TicketStatus::parse(status)?;
        let (filter, scope) = (TicketFilter::default(), TicketScope::All);
        let criteria = TicketCriteria::new(&filter, &scope).with_status(Some(status));

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Ok(self.repo(&mut conn).list(&criteria).await?)
    }

    pub async fn by_assignee(&self, user: &AuthUser, employee_id: i64) -> AppResult<Vec<TicketView>> {
        authorize(user, Operation::ManageTickets)?;

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        EmployeeRepository::new(&mut conn, &self.cipher)
            .find_active(employee_id)
            .await?
            .ok_or_else(|| employee_not_found(employee_id))?;

        let (filter, scope) = (TicketFilter::default(), TicketScope::All);
        let criteria = TicketCriteria::new(&filter, &scope).with_assignee(employee_id);
        Ok(self.repo(&mut conn).list(&criteria).await?)
    }

    /// Admins update any ticket; creators only while it is still DRAFT
    pub async fn update(
        &self,
        user: &AuthUser,
        id: i64,
        request: UpdateTicketRequest,
    ) -> AppResult<TicketView> {
        authorize(user, Operation::UpdateTicket)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut ticket = self.load(&mut tx, id).await?;
        policy::check_can_update(user, &ticket)?;
        lifecycle::update(
            &mut ticket,
            TicketChanges {
                title: request.title.as_deref(),
                body: request.body.as_deref(),
                status: non_blank(request.status.as_deref()),
                remarks: request.remarks.as_deref(),
            },
            user.identity(),
            Utc::now(),
        )?;
        let view = self.save_and_view(&mut tx, &ticket).await?;
        tx.commit().await.context("Failed to commit ticket")?;

        self.cache.invalidate_ticket(id).await;
        info!(ticket_id = id, actor = %user.identity(), "Ticket updated");
        Ok(view)
    }

    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        authorize(user, Operation::ManageTickets)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut ticket = self.load(&mut tx, id).await?;
        ticket.audit.touch(user.identity(), Utc::now());
        self.repo(&mut tx).soft_delete(&ticket).await?;
        tx.commit().await.context("Failed to commit ticket deletion")?;

        self.cache.invalidate_ticket(id).await;
        info!(ticket_id = id, actor = %user.identity(), "Ticket deleted");
        Ok(())
    }

    /// Bind an assignee and re-file the ticket
    pub async fn assign(&self, user: &AuthUser, id: i64, employee_id: i64) -> AppResult<TicketView> {
        authorize(user, Operation::ManageTickets)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut ticket = self.load(&mut tx, id).await?;
        EmployeeRepository::new(&mut tx, &self.cipher)
            .find_active(employee_id)
            .await?
            .ok_or_else(|| employee_not_found(employee_id))?;

        lifecycle::assign(&mut ticket, employee_id, user.identity(), Utc::now());
        let view = self.save_and_view(&mut tx, &ticket).await?;
        tx.commit().await.context("Failed to commit ticket assignment")?;

        self.cache.invalidate_ticket(id).await;
        info!(ticket_id = id, employee_id, actor = %user.identity(), "Ticket assigned");
        Ok(view)
    }

    /// Replace remarks and change status
    ///
    /// On the assignee path the principal must be the ticket's current
    /// assignee; that check precedes any validation of the request.
    pub async fn remark(
        &self,
        user: &AuthUser,
        id: i64,
        request: RemarkRequest,
        path: RemarkPath,
    ) -> AppResult<TicketView> {
        let actor = match path {
            RemarkPath::Admin => {
                authorize(user, Operation::ManageTickets)?;
                RemarkActor::Admin
            }
            RemarkPath::Assignee => {
                authorize(user, Operation::RemarkAssignedTicket)?;
                RemarkActor::Employee {
                    employee_id: user.employee_id,
                }
            }
        };

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut ticket = self.load(&mut tx, id).await?;
        lifecycle::remark(
            &mut ticket,
            request.remarks.as_deref(),
            request.status.as_deref(),
            actor,
            user.identity(),
            Utc::now(),
        )?;
        let view = self.save_and_view(&mut tx, &ticket).await?;
        tx.commit().await.context("Failed to commit ticket remark")?;

        self.cache.invalidate_ticket(id).await;
        info!(ticket_id = id, status = %ticket.status, actor = %user.identity(), "Ticket remarked");
        Ok(view)
    }

    /// Active tickets per status, every status present
    pub async fn counts_by_status(&self, user: &AuthUser) -> AppResult<BTreeMap<TicketStatus, u64>> {
        authorize(user, Operation::ViewTicketCounts)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Ok(self.repo(&mut conn).count_by_status(None, None).await?)
    }

    /// `CREATED_<STATUS>` and `ASSIGNED_<STATUS>` counts for the principal
    pub async fn personal_counts(&self, user: &AuthUser) -> AppResult<BTreeMap<String, u64>> {
        authorize(user, Operation::SelfService)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;

        let created = self
            .repo(&mut conn)
            .count_by_status(Some(user.identity()), None)
            .await?;
        let assigned = self
            .repo(&mut conn)
            .count_by_status(None, Some(user.employee_id))
            .await?;

        Ok(personal_count_keys(&created, &assigned))
    }

    async fn load(&self, conn: &mut SqliteConnection, id: i64) -> AppResult<HelpdeskTicket> {
        self.repo(conn)
            .find_active(id)
            .await?
            .ok_or_else(|| ticket_not_found(id))
    }

    async fn save_and_view(
        &self,
        conn: &mut SqliteConnection,
        ticket: &HelpdeskTicket,
    ) -> AppResult<TicketView> {
        self.repo(&mut *conn).save(ticket).await?;
        self.repo(conn)
            .find_view(ticket.id)
            .await?
            .ok_or_else(|| ticket_not_found(ticket.id))
    }
}

fn personal_count_keys(
    created: &BTreeMap<TicketStatus, u64>,
    assigned: &BTreeMap<TicketStatus, u64>,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for status in TicketStatus::ALL {
        counts.insert(
            format!("CREATED_{}", status),
            created.get(&status).copied().unwrap_or(0),
        );
        counts.insert(
            format!("ASSIGNED_{}", status),
            assigned.get(&status).copied().unwrap_or(0),
        );
    }
    counts
}

fn ticket_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Ticket not found with id: {}", id))
}
