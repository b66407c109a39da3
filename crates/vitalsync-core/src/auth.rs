//! Platform authentication and owner-access authorization.
//!
//! Token issuance and session management belong to the platform; the core
//! only needs to turn a presented token into an acting identity and check
//! that identity against the requested data owner before any adapter runs.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{RequestError, RequestErrorKind, ValidationError};

/// Privilege level of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// May only read their own data.
    User,
    /// Granted read access to other users' data through a class-level rule.
    Privileged,
    Admin,
}

/// The acting identity resolved from a platform token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub privilege: PrivilegeLevel,
}

impl AuthenticatedUser {
    pub fn new(username: impl Into<String>, privilege: PrivilegeLevel) -> Self {
        Self {
            username: username.into(),
            privilege,
        }
    }

    pub const fn can_read_other_owners(&self) -> bool {
        matches!(
            self.privilege,
            PrivilegeLevel::Privileged | PrivilegeLevel::Admin
        )
    }
}

/// Validates the platform's own token and yields the acting identity.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, RequestError>;
}

/// Token-table authenticator used by tests and the CLI.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: Mutex<HashMap<String, AuthenticatedUser>>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, user: AuthenticatedUser) -> &Self {
        self.tokens
            .lock()
            .expect("token table should not be poisoned")
            .insert(token.into(), user);
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, RequestError> {
        self.tokens
            .lock()
            .expect("token table should not be poisoned")
            .get(token)
            .cloned()
            .ok_or_else(|| RequestError::authentication("the token is unknown or expired"))
    }
}

/// Resolves the effective data owner for a request and enforces the access
/// rule: a user may only read another user's data when privileged. Runs
/// before any adapter is constructed or serviced.
pub fn authorize_owner_access(
    user: &AuthenticatedUser,
    owner: Option<&str>,
) -> Result<String, RequestError> {
    let owner = match owner {
        Some(owner) => {
            if owner.trim().is_empty() {
                return Err(RequestError::validation(
                    RequestErrorKind::InvalidOwner,
                    ValidationError::EmptyUsername,
                ));
            }
            owner
        }
        None => return Ok(user.username.clone()),
    };

    if owner == user.username || user.can_read_other_owners() {
        Ok(owner.to_owned())
    } else {
        Err(RequestError::authorization(format!(
            "user '{}' may not read data owned by '{owner}'",
            user.username
        )))
    }
}
