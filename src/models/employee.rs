//! Employee model

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{AuditFields, Role};
use crate::utils::validation::not_blank;

/// Employee entity
///
/// `first_name`, `last_name` and `contact_number` hold plaintext here; the
/// repository encrypts them on write and decrypts them on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub employment_status: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub deleted: bool,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Employee {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    pub fn has_role(&self, role_id: i64) -> bool {
        self.roles.iter().any(|r| r.id == role_id)
    }
}

/// Whole years elapsed from `birthday` to `today`; 0 when absent
pub fn age_on(birthday: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(birthday) = birthday else {
        return 0;
    };
    if birthday > today {
        return 0;
    }
    let mut years = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Employee as returned by the API (no credential)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePublic {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub age: u32,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub employment_status: Option<String>,
    pub roles: Vec<Role>,
    pub deleted: bool,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl From<Employee> for EmployeePublic {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            age: age_on(employee.birthday, Utc::now().date_naive()),
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            birthday: employee.birthday,
            address: employee.address,
            contact_number: employee.contact_number,
            employment_status: employee.employment_status,
            roles: employee.roles,
            deleted: employee.deleted,
            audit: employee.audit,
        }
    }
}

/// Lightweight entry for assignment pickers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeReference {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&Employee> for EmployeeReference {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            full_name: employee.full_name(),
        }
    }
}

/// Values for a new employee row, already hashed and stamped
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub employment_status: Option<String>,
    pub password_hash: String,
    pub audit: AuditFields,
}

/// Create employee request (admin create and self-registration)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateEmployeeRequest {
    #[validate(
        length(max = 100, message = "First name is too long"),
        custom(function = "not_blank", message = "First name is required")
    )]
    pub first_name: String,
    #[validate(
        length(max = 100, message = "Last name is too long"),
        custom(function = "not_blank", message = "Last name is required")
    )]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub employment_status: Option<String>,
    /// Roles to grant; defaults to EMPLOYEE
    pub role_ids: Option<Vec<i64>>,
}

/// Admin update request; absent password keeps the current one, absent
/// `role_ids` keeps the current roles
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateEmployeeRequest {
    #[validate(
        length(max = 100, message = "First name is too long"),
        custom(function = "not_blank", message = "First name is required")
    )]
    pub first_name: String,
    #[validate(
        length(max = 100, message = "Last name is too long"),
        custom(function = "not_blank", message = "Last name is required")
    )]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password must not be empty"))]
    pub password: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub employment_status: Option<String>,
    pub role_ids: Option<Vec<i64>>,
}

/// Self-service profile update; absent email keeps the current one
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(
        length(max = 100, message = "First name is too long"),
        custom(function = "not_blank", message = "First name is required")
    )]
    pub first_name: String,
    #[validate(
        length(max = 100, message = "Last name is too long"),
        custom(function = "not_blank", message = "Last name is required")
    )]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 128, message = "Password must not be empty"))]
    pub password: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
}

/// Result of a profile update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateResponse {
    pub employee: EmployeePublic,
    pub email_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
