//! Authentication service
//!
//! Provides password hashing with Argon2 and employee authentication.

use std::sync::Arc;

use anyhow::{Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::db::{DbPool, EmployeeRepository, FieldCipher};
use crate::models::Employee;

/// Authentication service for credential checks and principal lookup
pub struct AuthService {
    pool: DbPool,
    cipher: Arc<FieldCipher>,
}

impl AuthService {
    pub fn new(pool: DbPool, cipher: Arc<FieldCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Active employee by email, with roles
    pub async fn find_active_by_email(&self, email: &str) -> Result<Option<Employee>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        EmployeeRepository::new(&mut *conn, &self.cipher)
            .find_active_by_email(email)
            .await
    }

    /// Check an email/password pair; `None` covers both unknown email and
    /// wrong password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Employee>> {
        match self.find_active_by_email(email).await? {
            Some(employee) if Self::verify_password(password, &employee.password_hash)? => {
                Ok(Some(employee))
            }
            _ => Ok(None),
        }
    }
}
