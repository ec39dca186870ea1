//! Employee repository
//!
//! Names and contact numbers pass through [`FieldCipher`] here and nowhere
//! else; callers only ever see plaintext [`Employee`] values.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db::query::Predicates;
use crate::db::role_repository::RoleRepository;
use crate::db::{
    format_date, format_timestamp, parse_db_date, parse_db_timestamp, FieldCipher,
};
use crate::models::{AuditFields, Employee, EmployeeFilter, NewEmployee, Page, PageRequest};

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    birthday: Option<String>,
    address: Option<String>,
    contact_number: Option<String>,
    employment_status: Option<String>,
    password_hash: String,
    deleted: bool,
    created_at: String,
    updated_at: String,
    created_by: Option<String>,
    updated_by: Option<String>,
}

const EMPLOYEE_COLUMNS: &str = "e.id, e.first_name, e.last_name, e.email, e.birthday, e.address, \
     e.contact_number, e.employment_status, e.password_hash, e.deleted, \
     e.created_at, e.updated_at, e.created_by, e.updated_by";

pub struct EmployeeRepository<'c> {
    conn: &'c mut SqliteConnection,
    cipher: &'c FieldCipher,
}

impl<'c> EmployeeRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection, cipher: &'c FieldCipher) -> Self {
        Self { conn, cipher }
    }

    /// Active employee with its roles
    pub async fn find_active(&mut self, id: i64) -> Result<Option<Employee>> {
        let mut predicates = Predicates::active("e");
        predicates.equals_id("e.id", Some(id));
        self.find_one(&predicates).await
    }

    /// Active employee by email (case-insensitive) with its roles
    pub async fn find_active_by_email(&mut self, email: &str) -> Result<Option<Employee>> {
        let email = email.trim().to_lowercase();
        let mut predicates = Predicates::active("e");
        predicates.equals("lower(e.email)", Some(email.as_str()));
        self.find_one(&predicates).await
    }

    /// Whether an active employee other than `excluding` already uses `email`
    pub async fn exists_active_email(&mut self, email: &str, excluding: Option<i64>) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM employees WHERE lower(email) = lower(?) AND deleted = 0 AND id != ?",
        )
        .bind(email.trim())
        .bind(excluding.unwrap_or(-1))
        .fetch_one(&mut *self.conn)
        .await
        .context("Failed to check employee email")?;

        Ok(count > 0)
    }

    pub async fn insert(&mut self, employee: &NewEmployee) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (
                first_name, last_name, email, birthday, address, contact_number,
                employment_status, password_hash, deleted,
                created_at, updated_at, created_by, updated_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(self.cipher.encrypt(&employee.first_name)?)
        .bind(self.cipher.encrypt(&employee.last_name)?)
        .bind(&employee.email)
        .bind(employee.birthday.map(format_date))
        .bind(&employee.address)
        .bind(self.cipher.encrypt_opt(employee.contact_number.as_deref())?)
        .bind(&employee.employment_status)
        .bind(&employee.password_hash)
        .bind(format_timestamp(employee.audit.created_at))
        .bind(format_timestamp(employee.audit.updated_at))
        .bind(&employee.audit.created_by)
        .bind(&employee.audit.updated_by)
        .execute(&mut *self.conn)
        .await
        .context("Failed to create employee")?;

        Ok(result.last_insert_rowid())
    }

    /// Persist every mutable column; roles are handled separately
    pub async fn save(&mut self, employee: &Employee) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE employees
            SET first_name = ?, last_name = ?, email = ?, birthday = ?, address = ?,
                contact_number = ?, employment_status = ?, password_hash = ?,
                updated_at = ?, updated_by = ?
            WHERE id = ?
            "#,
        )
        .bind(self.cipher.encrypt(&employee.first_name)?)
        .bind(self.cipher.encrypt(&employee.last_name)?)
        .bind(&employee.email)
        .bind(employee.birthday.map(format_date))
        .bind(&employee.address)
        .bind(self.cipher.encrypt_opt(employee.contact_number.as_deref())?)
        .bind(&employee.employment_status)
        .bind(&employee.password_hash)
        .bind(format_timestamp(employee.audit.updated_at))
        .bind(&employee.audit.updated_by)
        .bind(employee.id)
        .execute(&mut *self.conn)
        .await
        .context("Failed to update employee")?;

        Ok(())
    }

    pub async fn soft_delete(&mut self, employee: &Employee) -> Result<()> {
        sqlx::query("UPDATE employees SET deleted = 1, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(format_timestamp(employee.audit.updated_at))
            .bind(&employee.audit.updated_by)
            .bind(employee.id)
            .execute(&mut *self.conn)
            .await
            .context("Failed to delete employee")?;

        Ok(())
    }

    /// Grant a role; returns false when the employee already held it
    pub async fn add_role(&mut self, employee_id: i64, role_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO employee_roles (employee_id, role_id) VALUES (?, ?)")
                .bind(employee_id)
                .bind(role_id)
                .execute(&mut *self.conn)
                .await
                .context("Failed to assign role")?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the employee's role set
    pub async fn replace_roles(&mut self, employee_id: i64, role_ids: &[i64]) -> Result<()> {
        sqlx::query("DELETE FROM employee_roles WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *self.conn)
            .await
            .context("Failed to clear employee roles")?;

        for role_id in role_ids {
            self.add_role(employee_id, *role_id).await?;
        }
        Ok(())
    }

    /// Every active employee, id ascending, without roles
    pub async fn list_active(&mut self) -> Result<Vec<Employee>> {
        self.fetch(&Predicates::active("e"), None).await
    }

    /// Filtered page of active employees with their roles
    ///
    /// Plain-column predicates run in SQL. When the filter targets an
    /// encrypted column, every row matching the plain predicates is
    /// decrypted and matched here before paginating, so totals stay exact.
    pub async fn search(&mut self, filter: &EmployeeFilter, page: PageRequest) -> Result<Page<Employee>> {
        let mut predicates = Predicates::active("e");
        predicates
            .contains("e.email", filter.email.as_deref())
            .contains("e.employment_status", filter.employment_status.as_deref())
            .audit("e", &filter.audit());

        let mut result = if filter.has_encrypted_predicates() {
            let matching = self
                .fetch(&predicates, None)
                .await?
                .into_iter()
                .filter(|e| filter.matches_decrypted(e))
                .collect();
            Page::from_all(matching, page)
        } else {
            let total = self.count(&predicates).await?;
            let content = self.fetch(&predicates, Some(page)).await?;
            Page::new(content, page, total)
        };

        self.attach_roles(&mut result.content).await?;
        Ok(result)
    }

    async fn find_one(&mut self, predicates: &Predicates) -> Result<Option<Employee>> {
        let mut employees = self.fetch(predicates, Some(PageRequest::new(0, 1))).await?;
        self.attach_roles(&mut employees).await?;
        Ok(employees.pop())
    }

    async fn count(&mut self, predicates: &Predicates) -> Result<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM employees e");
        predicates.push_where(&mut qb);

        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.conn)
            .await
            .context("Failed to count employees")?;

        Ok(total as u64)
    }

    async fn fetch(&mut self, predicates: &Predicates, page: Option<PageRequest>) -> Result<Vec<Employee>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM employees e", EMPLOYEE_COLUMNS));
        predicates.push_where(&mut qb);
        qb.push(" ORDER BY e.id ASC");
        if let Some(page) = page {
            qb.push(" LIMIT ").push_bind(page.limit());
            qb.push(" OFFSET ").push_bind(page.offset());
        }

        let rows = qb
            .build_query_as::<EmployeeRow>()
            .fetch_all(&mut *self.conn)
            .await
            .context("Failed to list employees")?;

        rows.into_iter().map(|row| self.row_to_employee(row)).collect()
    }

    async fn attach_roles(&mut self, employees: &mut [Employee]) -> Result<()> {
        let ids: Vec<i64> = employees.iter().map(|e| e.id).collect();
        let mut by_employee: HashMap<i64, Vec<_>> = HashMap::new();
        for (employee_id, role) in RoleRepository::new(&mut *self.conn)
            .roles_for_employees(&ids)
            .await?
        {
            by_employee.entry(employee_id).or_default().push(role);
        }

        for employee in employees.iter_mut() {
            employee.roles = by_employee.remove(&employee.id).unwrap_or_default();
        }
        Ok(())
    }

    fn row_to_employee(&self, row: EmployeeRow) -> Result<Employee> {
        Ok(Employee {
            id: row.id,
            first_name: self
                .cipher
                .decrypt(&row.first_name)
                .with_context(|| format!("Failed to decrypt first name of employee {}", row.id))?,
            last_name: self
                .cipher
                .decrypt(&row.last_name)
                .with_context(|| format!("Failed to decrypt last name of employee {}", row.id))?,
            email: row.email,
            birthday: row.birthday.as_deref().map(parse_db_date).transpose()?,
            address: row.address,
            contact_number: self
                .cipher
                .decrypt_opt(row.contact_number.as_deref())
                .with_context(|| format!("Failed to decrypt contact number of employee {}", row.id))?,
            employment_status: row.employment_status,
            password_hash: row.password_hash,
            roles: Vec::new(),
            deleted: row.deleted,
            audit: AuditFields {
                created_at: parse_db_timestamp(&row.created_at)?,
                updated_at: parse_db_timestamp(&row.updated_at)?,
                created_by: row.created_by,
                updated_by: row.updated_by,
            },
        })
    }
}
