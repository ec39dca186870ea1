//! Role service

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use crate::db::{DbPool, RoleRepository};
use crate::middleware::AuthUser;
use crate::models::{AuditFields, Page, PageRequest, Role, RoleRequest};
use crate::services::cache::ViewCache;
use crate::services::policy::{authorize, Operation};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{optional_text, require_text};

pub struct RoleService {
    pool: DbPool,
    cache: Arc<ViewCache>,
}

impl RoleService {
    pub fn new(pool: DbPool, cache: Arc<ViewCache>) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, user: &AuthUser, request: RoleRequest) -> AppResult<Role> {
        authorize(user, Operation::ManageRoles)?;
        let name = require_text("Role name", request.name.as_deref())?;
        let description = optional_text(request.description.as_deref());

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        if RoleRepository::new(&mut *tx)
            .exists_active_name(name, None)
            .await?
        {
            return Err(AppError::duplicate("Role name already exists"));
        }

        let audit = AuditFields::created(Some(user.identity()), Utc::now());
        let id = RoleRepository::new(&mut *tx)
            .insert(name, description.as_deref(), &audit)
            .await?;
        let role = RoleRepository::new(&mut *tx)
            .find_active(id)
            .await?
            .ok_or_else(|| AppError::internal("Created role could not be read back"))?;
        tx.commit().await.context("Failed to commit role")?;

        info!(role_id = id, actor = %user.identity(), "Role created");
        Ok(role)
    }

    pub async fn get(&self, user: &AuthUser, id: i64) -> AppResult<Role> {
        authorize(user, Operation::ManageRoles)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        RoleRepository::new(&mut *conn)
            .find_active(id)
            .await?
            .ok_or_else(|| role_not_found(id))
    }

    pub async fn list(&self, user: &AuthUser, page: PageRequest) -> AppResult<Page<Role>> {
        authorize(user, Operation::ManageRoles)?;
        page.validate()?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let (roles, total) = RoleRepository::new(&mut *conn).list_active(page).await?;
        Ok(Page::new(roles, page, total))
    }

    pub async fn update(&self, user: &AuthUser, id: i64, request: RoleRequest) -> AppResult<Role> {
        authorize(user, Operation::ManageRoles)?;
        let name = require_text("Role name", request.name.as_deref())?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut role = RoleRepository::new(&mut *tx)
            .find_active(id)
            .await?
            .ok_or_else(|| role_not_found(id))?;
        if role.is_builtin() && !role.name.eq_ignore_ascii_case(name) {
            return Err(builtin_role(&role.name, "renamed"));
        }

        if !role.name.eq_ignore_ascii_case(name)
            && RoleRepository::new(&mut *tx)
                .exists_active_name(name, Some(id))
                .await?
        {
            return Err(AppError::duplicate("Role name already exists"));
        }

        if !role.is_builtin() {
            role.name = name.to_string();
        }
        role.description = optional_text(request.description.as_deref());
        role.audit.touch(user.identity(), Utc::now());
        RoleRepository::new(&mut *tx).save(&role).await?;
        tx.commit().await.context("Failed to commit role")?;

        self.cache.invalidate_all_employees().await;
        info!(role_id = id, actor = %user.identity(), "Role updated");
        Ok(role)
    }

    /// Detach from every employee, then soft-delete, in one transaction
    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        authorize(user, Operation::ManageRoles)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut role = RoleRepository::new(&mut *tx)
            .find_active(id)
            .await?
            .ok_or_else(|| role_not_found(id))?;
        if role.is_builtin() {
            return Err(builtin_role(&role.name, "deleted"));
        }

        let detached = RoleRepository::new(&mut *tx)
            .detach_from_all_employees(id)
            .await?;
        role.audit.touch(user.identity(), Utc::now());
        RoleRepository::new(&mut *tx).soft_delete(&role).await?;
        tx.commit().await.context("Failed to commit role deletion")?;

        self.cache.invalidate_all_employees().await;
        info!(role_id = id, detached, actor = %user.identity(), "Role deleted");
        Ok(())
    }
}

fn builtin_role(name: &str, action: &str) -> AppError {
    AppError::validation(format!("Built-in role {} cannot be {}", name, action))
}

pub(crate) fn role_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Role not found with id: {}", id))
}
