//! Role repository

use anyhow::{Context, Result};
use sqlx::SqliteConnection;

use crate::db::{format_timestamp, parse_db_timestamp};
use crate::models::{AuditFields, PageRequest, Role};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RoleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

const ROLE_COLUMNS: &str =
    "id, name, description, deleted, created_at, updated_at, created_by, updated_by";

pub struct RoleRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> RoleRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Active role by id
    pub async fn find_active(&mut self, id: i64) -> Result<Option<Role>> {
        let sql = format!(
            "SELECT {} FROM roles WHERE id = ? AND deleted = 0",
            ROLE_COLUMNS
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .context("Failed to fetch role")?;

        row.map(row_to_role).transpose()
    }

    pub async fn find_active_by_name(&mut self, name: &str) -> Result<Option<Role>> {
        let sql = format!(
            "SELECT {} FROM roles WHERE lower(name) = lower(?) AND deleted = 0",
            ROLE_COLUMNS
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name)
            .fetch_optional(&mut *self.conn)
            .await
            .context("Failed to fetch role by name")?;

        row.map(row_to_role).transpose()
    }

    /// Whether an active role other than `excluding` already uses `name`
    pub async fn exists_active_name(&mut self, name: &str, excluding: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE lower(name) = lower(?) AND deleted = 0 AND id != ?",
        )
        .bind(name)
        .bind(excluding.unwrap_or(-1))
        .fetch_one(&mut *self.conn)
        .await
        .context("Failed to check role name")?;

        Ok(count > 0)
    }

    /// One page of active roles, id ascending, plus the active total
    pub async fn list_active(&mut self, page: PageRequest) -> Result<(Vec<Role>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE deleted = 0")
            .fetch_one(&mut *self.conn)
            .await
            .context("Failed to count roles")?;

        let sql = format!(
            "SELECT {} FROM roles WHERE deleted = 0 ORDER BY id ASC LIMIT ? OFFSET ?",
            ROLE_COLUMNS
        );
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *self.conn)
            .await
            .context("Failed to list roles")?;

        let roles = rows.into_iter().map(row_to_role).collect::<Result<Vec<_>>>()?;
        Ok((roles, total as u64))
    }

    pub async fn insert(
        &mut self,
        name: &str,
        description: Option<&str>,
        audit: &AuditFields,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO roles (name, description, deleted, created_at, updated_at, created_by, updated_by)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(format_timestamp(audit.created_at))
        .bind(format_timestamp(audit.updated_at))
        .bind(&audit.created_by)
        .bind(&audit.updated_by)
        .execute(&mut *self.conn)
        .await
        .context("Failed to create role")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn save(&mut self, role: &Role) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE roles
            SET name = ?, description = ?, updated_at = ?, updated_by = ?
            WHERE id = ?
            "#,
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(format_timestamp(role.audit.updated_at))
        .bind(&role.audit.updated_by)
        .bind(role.id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to update role")?;

        Ok(())
    }

    /// Remove the role from every employee holding it; returns links removed
    pub async fn detach_from_all_employees(&mut self, role_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM employee_roles WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *self.conn)
            .await
            .context("Failed to detach role from employees")?;

        Ok(result.rows_affected())
    }

    pub async fn soft_delete(&mut self, role: &Role) -> Result<()> {
        sqlx::query("UPDATE roles SET deleted = 1, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(format_timestamp(role.audit.updated_at))
            .bind(&role.audit.updated_by)
            .bind(role.id)
            .execute(&mut *self.conn)
            .await
            .context("Failed to delete role")?;

        Ok(())
    }

    /// Active roles held by each of `employee_ids`, as (employee_id, role)
    pub async fn roles_for_employees(&mut self, employee_ids: &[i64]) -> Result<Vec<(i64, Role)>> {
        if employee_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; employee_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT er.employee_id AS employee_id,
                   r.id, r.name, r.description, r.deleted,
                   r.created_at, r.updated_at, r.created_by, r.updated_by
            FROM employee_roles er
            INNER JOIN roles r ON r.id = er.role_id
            WHERE er.employee_id IN ({}) AND r.deleted = 0
            ORDER BY er.employee_id, r.id
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, EmployeeRoleRow>(&sql);
        for id in employee_ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&mut *self.conn)
            .await
            .context("Failed to fetch employee roles")?;

        rows.into_iter()
            .map(|row| {
                let employee_id = row.employee_id;
                row_to_role(row.role).map(|role| (employee_id, role))
            })
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRoleRow {
    employee_id: i64,
    #[sqlx(flatten)]
    role: RoleRow,
}

pub(crate) fn row_to_role(row: RoleRow) -> Result<Role> {
    Ok(Role {
        id: row.id,
        name: row.name,
        description: row.description,
        deleted: row.deleted,
        audit: AuditFields {
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
            created_by: row.created_by,
            updated_by: row.updated_by,
        },
    })
}
