//! Employee service
//!
//! Admin employee management, self-registration, start-up bootstrap and the
//! self-scoped profile operations. Every mutation runs in one transaction
//! and invalidates cached views only after commit.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;
use validator::Validate;

use crate::config::BootstrapAdminConfig;
use crate::db::{DbPool, EmployeeRepository, FieldCipher, RoleRepository, TicketRepository};
use crate::middleware::AuthUser;
use crate::models::{
    AuditFields, CreateEmployeeRequest, Employee, EmployeeFilter, EmployeePublic,
    EmployeeReference, NewEmployee, Page, PageRequest, ProfileUpdateResponse,
    UpdateEmployeeRequest, UpdateProfileRequest, ADMIN_ROLE, EMPLOYEE_ROLE, SYSTEM_ACTOR,
};
use crate::services::cache::ViewCache;
use crate::services::policy::{authorize, Operation};
use crate::services::role::role_not_found;
use crate::services::AuthService;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{normalize_email, optional_text, validate_contact_number};

const EMAIL_CHANGED_MESSAGE: &str =
    "Email address updated. Please log in with your new email address.";

/// Which roles a new employee starts with
enum InitialRoles<'a> {
    Ids(&'a [i64]),
    Names(&'a [&'a str]),
}

pub struct EmployeeService {
    pool: DbPool,
    cipher: Arc<FieldCipher>,
    cache: Arc<ViewCache>,
}

impl EmployeeService {
    pub fn new(pool: DbPool, cipher: Arc<FieldCipher>, cache: Arc<ViewCache>) -> Self {
        Self {
            pool,
            cipher,
            cache,
        }
    }

    fn repo<'c>(&'c self, conn: &'c mut SqliteConnection) -> EmployeeRepository<'c> {
        EmployeeRepository::new(conn, &self.cipher)
    }

    /// Admin create; roles default to EMPLOYEE
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateEmployeeRequest,
    ) -> AppResult<EmployeePublic> {
        authorize(user, Operation::ManageEmployees)?;
        let roles = request.role_ids.clone();
        let initial = match roles.as_deref() {
            Some(ids) => InitialRoles::Ids(ids),
            None => InitialRoles::Names(&[EMPLOYEE_ROLE]),
        };

        let employee = self.insert(request, user.identity(), initial).await?;
        info!(employee_id = employee.id, actor = %user.identity(), "Employee created");
        Ok(employee.into())
    }

    /// Self-registration; the new employee is its own creator
    pub async fn register(&self, request: CreateEmployeeRequest) -> AppResult<EmployeePublic> {
        let identity = normalize_email(&request.email);
        let employee = self
            .insert(request, &identity, InitialRoles::Names(&[EMPLOYEE_ROLE]))
            .await?;
        info!(employee_id = employee.id, "Employee registered");
        Ok(employee.into())
    }

    /// Create the configured administrator unless an active employee already
    /// holds its email; returns the new id
    pub async fn ensure_admin(&self, admin: &BootstrapAdminConfig) -> AppResult<Option<i64>> {
        {
            let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
            if self
                .repo(&mut conn)
                .exists_active_email(&admin.email, None)
                .await?
            {
                return Ok(None);
            }
        }

        let request = CreateEmployeeRequest {
            first_name: admin.first_name.clone(),
            last_name: admin.last_name.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            ..Default::default()
        };
        let employee = self
            .insert(
                request,
                SYSTEM_ACTOR,
                InitialRoles::Names(&[ADMIN_ROLE, EMPLOYEE_ROLE]),
            )
            .await?;
        info!(employee_id = employee.id, "Bootstrap administrator created");
        Ok(Some(employee.id))
    }

    async fn insert(
        &self,
        request: CreateEmployeeRequest,
        actor: &str,
        roles: InitialRoles<'_>,
    ) -> AppResult<Employee> {
        request.validate()?;
        check_contact_number(request.contact_number.as_deref())?;
        let email = normalize_email(&request.email);
        let password_hash = AuthService::hash_password(&request.password)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        if self.repo(&mut tx).exists_active_email(&email, None).await? {
            return Err(AppError::duplicate("Email already exists"));
        }

        let role_ids = match roles {
            InitialRoles::Ids(ids) => {
                for id in ids {
                    RoleRepository::new(&mut *tx)
                        .find_active(*id)
                        .await?
                        .ok_or_else(|| role_not_found(*id))?;
                }
                ids.to_vec()
            }
            InitialRoles::Names(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    let role = RoleRepository::new(&mut *tx)
                        .find_active_by_name(name)
                        .await?
                        .ok_or_else(|| {
                            AppError::internal(format!("Built-in role {} is missing", name))
                        })?;
                    ids.push(role.id);
                }
                ids
            }
        };

        let new_employee = NewEmployee {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email,
            birthday: request.birthday,
            address: optional_text(request.address.as_deref()),
            contact_number: optional_text(request.contact_number.as_deref()),
            employment_status: optional_text(request.employment_status.as_deref()),
            password_hash,
            audit: AuditFields::created(Some(actor), Utc::now()),
        };

        let id = self.repo(&mut tx).insert(&new_employee).await?;
        self.repo(&mut tx).replace_roles(id, &role_ids).await?;
        let employee = self
            .repo(&mut tx)
            .find_active(id)
            .await?
            .ok_or_else(|| AppError::internal("Created employee could not be read back"))?;
        tx.commit().await.context("Failed to commit employee")?;

        Ok(employee)
    }

    pub async fn get(&self, user: &AuthUser, id: i64) -> AppResult<EmployeePublic> {
        authorize(user, Operation::ManageEmployees)?;
        if let Some(view) = self.cache.employee(id).await {
            return Ok(view);
        }

        let seen = self.cache.employee_generation(id).await;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let view: EmployeePublic = self
            .repo(&mut conn)
            .find_active(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?
            .into();
        self.cache.put_employee(&view, seen).await;
        Ok(view)
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> AppResult<Page<EmployeePublic>> {
        authorize(user, Operation::ManageEmployees)?;
        page.validate()?;

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let result = self.repo(&mut conn).search(filter, page).await?;
        Ok(result.map(EmployeePublic::from))
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        id: i64,
        request: UpdateEmployeeRequest,
    ) -> AppResult<EmployeePublic> {
        authorize(user, Operation::ManageEmployees)?;
        request.validate()?;
        check_contact_number(request.contact_number.as_deref())?;
        let password_hash = request
            .password
            .as_deref()
            .map(AuthService::hash_password)
            .transpose()?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut employee = self
            .repo(&mut tx)
            .find_active(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

        let old_email = employee.email.clone();
        let email = normalize_email(&request.email);
        if email != old_email && self.repo(&mut tx).exists_active_email(&email, Some(id)).await? {
            return Err(AppError::duplicate("Email already exists"));
        }

        if let Some(role_ids) = &request.role_ids {
            for role_id in role_ids {
                RoleRepository::new(&mut *tx)
                    .find_active(*role_id)
                    .await?
                    .ok_or_else(|| role_not_found(*role_id))?;
            }
        }

        employee.first_name = request.first_name.trim().to_string();
        employee.last_name = request.last_name.trim().to_string();
        employee.email = email;
        employee.birthday = request.birthday;
        employee.address = optional_text(request.address.as_deref());
        employee.contact_number = optional_text(request.contact_number.as_deref());
        employee.employment_status = optional_text(request.employment_status.as_deref());
        if let Some(hash) = password_hash {
            employee.password_hash = hash;
        }
        employee.audit.touch(user.identity(), Utc::now());
        self.repo(&mut tx).save(&employee).await?;

        if let Some(role_ids) = &request.role_ids {
            self.repo(&mut tx).replace_roles(id, role_ids).await?;
        }
        if employee.email != old_email {
            TicketRepository::new(&mut tx, &self.cipher)
                .restamp_creator(&old_email, &employee.email)
                .await?;
        }

        let employee = self
            .repo(&mut tx)
            .find_active(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;
        tx.commit().await.context("Failed to commit employee")?;

        self.cache.invalidate_employee(id).await;
        info!(employee_id = id, actor = %user.identity(), "Employee updated");
        Ok(employee.into())
    }

    /// Unassign the employee from its tickets, then soft-delete it
    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        authorize(user, Operation::ManageEmployees)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut employee = self
            .repo(&mut tx)
            .find_active(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

        let unassigned = TicketRepository::new(&mut tx, &self.cipher)
            .clear_assignee(id, user.identity(), now)
            .await?;
        employee.audit.touch(user.identity(), now);
        self.repo(&mut tx).soft_delete(&employee).await?;
        tx.commit().await.context("Failed to commit employee deletion")?;

        self.cache.invalidate_employee(id).await;
        info!(employee_id = id, unassigned, actor = %user.identity(), "Employee deleted");
        Ok(())
    }

    /// Grant a role; granting a held role changes nothing
    pub async fn assign_role(
        &self,
        user: &AuthUser,
        employee_id: i64,
        role_id: i64,
    ) -> AppResult<EmployeePublic> {
        authorize(user, Operation::ManageEmployees)?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut employee = self
            .repo(&mut tx)
            .find_active(employee_id)
            .await?
            .ok_or_else(|| employee_not_found(employee_id))?;
        RoleRepository::new(&mut *tx)
            .find_active(role_id)
            .await?
            .ok_or_else(|| role_not_found(role_id))?;

        if employee.has_role(role_id) {
            return Ok(employee.into());
        }

        self.repo(&mut tx).add_role(employee_id, role_id).await?;
        employee.audit.touch(user.identity(), Utc::now());
        self.repo(&mut tx).save(&employee).await?;
        let employee = self
            .repo(&mut tx)
            .find_active(employee_id)
            .await?
            .ok_or_else(|| employee_not_found(employee_id))?;
        tx.commit().await.context("Failed to commit role assignment")?;

        self.cache.invalidate_employee(employee_id).await;
        info!(employee_id, role_id, actor = %user.identity(), "Role assigned");
        Ok(employee.into())
    }

    /// Every active employee as a picker entry, id ascending
    pub async fn references(&self, user: &AuthUser) -> AppResult<Vec<EmployeeReference>> {
        authorize(user, Operation::ListEmployeeReferences)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let employees = self.repo(&mut conn).list_active().await?;
        Ok(employees.iter().map(EmployeeReference::from).collect())
    }

    pub async fn profile(&self, user: &AuthUser) -> AppResult<EmployeePublic> {
        authorize(user, Operation::SelfService)?;
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let employee = self
            .repo(&mut conn)
            .find_active(user.employee_id)
            .await?
            .ok_or_else(|| employee_not_found(user.employee_id))?;
        Ok(employee.into())
    }

    /// Self-service update; employment status and roles are not editable here
    pub async fn update_profile(
        &self,
        user: &AuthUser,
        request: UpdateProfileRequest,
    ) -> AppResult<ProfileUpdateResponse> {
        authorize(user, Operation::SelfService)?;
        request.validate()?;
        check_contact_number(request.contact_number.as_deref())?;
        let password_hash = request
            .password
            .as_deref()
            .map(AuthService::hash_password)
            .transpose()?;
        let id = user.employee_id;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut employee = self
            .repo(&mut tx)
            .find_active(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?;

        let old_email = employee.email.clone();
        let email = request
            .email
            .as_deref()
            .map(normalize_email)
            .unwrap_or_else(|| old_email.clone());
        let email_changed = email != old_email;
        if email_changed && self.repo(&mut tx).exists_active_email(&email, Some(id)).await? {
            return Err(AppError::duplicate("Email already exists"));
        }

        employee.first_name = request.first_name.trim().to_string();
        employee.last_name = request.last_name.trim().to_string();
        employee.email = email;
        employee.birthday = request.birthday;
        employee.address = optional_text(request.address.as_deref());
        employee.contact_number = optional_text(request.contact_number.as_deref());
        if let Some(hash) = password_hash {
            employee.password_hash = hash;
        }
        employee.audit.touch(user.identity(), Utc::now());
        self.repo(&mut tx).save(&employee).await?;

        if email_changed {
            TicketRepository::new(&mut tx, &self.cipher)
                .restamp_creator(&old_email, &employee.email)
                .await?;
        }
        tx.commit().await.context("Failed to commit profile")?;

        self.cache.invalidate_employee(id).await;
        info!(employee_id = id, email_changed, "Profile updated");
        Ok(ProfileUpdateResponse {
            employee: employee.into(),
            email_changed,
            message: email_changed.then(|| EMAIL_CHANGED_MESSAGE.to_string()),
        })
    }
}

pub(crate) fn employee_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Employee not found with id: {}", id))
}

fn check_contact_number(value: Option<&str>) -> AppResult<()> {
    match optional_text(value) {
        Some(number) if !validate_contact_number(&number) => {
            Err(AppError::validation("Invalid contact number"))
        }
        _ => Ok(()),
    }
}
