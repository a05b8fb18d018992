//! Credential records and the lookup contract the kernel reads them through.

use anyhow::Result;
use std::future::Future;

use super::error::AuthError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: Option<String>,
}

/// A stored account as read on every authentication attempt. Never mutated here.
#[derive(Clone, Debug)]
pub struct CredentialRecord {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub salt: Option<String>,
    pub is_active: bool,
}

impl CredentialRecord {
    /// Stored `(hash, salt)`, or `None` for an account without a password.
    ///
    /// # Errors
    /// Returns `AuthError::MalformedInput` when only one of the two is present.
    pub fn credentials(&self) -> Result<Option<(&str, &str)>, AuthError> {
        match (self.password_hash.as_deref(), self.salt.as_deref()) {
            (Some(hash), Some(salt)) => Ok(Some((hash, salt))),
            (None, None) => Ok(None),
            _ => Err(AuthError::MalformedInput(format!(
                "user {} has a password hash without a salt or vice versa",
                self.id
            ))),
        }
    }
}

/// Read side of the account store.
pub trait CredentialStore: Send + Sync {
    /// Find the credential record for `email`; `Ok(None)` is a lookup miss.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<CredentialRecord>>> + Send;

    fn find_roles_for_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Role>>> + Send;
}
