//! Session facade: bearer token to caller resolution
//!
//! Every tracker operation resolves its token here exactly once and then
//! passes the resulting [`Caller`] down. Role checks go through the helpers
//! on `Caller` rather than inspecting `role` ad hoc.

use std::collections::HashMap;

use tracing::debug;

use crate::id::generate_token;
use crate::identity::IdentityStore;
use crate::user::UserRef;
use crate::{Error, Issue, Result, Role, User};

/// The authenticated identity behind a request
#[derive(Debug, Clone)]
pub struct Caller {
    user: User,
}

impl Caller {
    pub(crate) fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role.is_admin()
    }

    pub fn to_ref(&self) -> UserRef {
        self.user.to_ref()
    }

    /// Fail with `Forbidden` unless the caller is an admin
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("admin access required to {}", action)))
        }
    }

    /// Whether the issue is inside the caller's role-scoped view
    pub fn can_see(&self, issue: &Issue) -> bool {
        self.is_admin() || issue.is_reported_by(self.id())
    }

    /// Fail with `Forbidden` unless the caller owns the issue or is an admin
    pub fn require_owner_or_admin(&self, issue: &Issue, action: &str) -> Result<()> {
        if self.can_see(issue) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "only the reporter or an admin may {} {}",
                action, issue.id
            )))
        }
    }
}

/// Token registry
#[derive(Debug, Default)]
pub struct SessionFacade {
    tokens: HashMap<String, String>,
}

impl SessionFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for a user and return its token
    pub fn open(&mut self, user_id: &str) -> String {
        let token = generate_token();
        self.tokens.insert(token.clone(), user_id.to_string());
        debug!(user = %user_id, "opened session");
        token
    }

    /// Map a token to its caller
    ///
    /// A missing or unknown token, or one whose user was deleted or
    /// deactivated, yields `Unauthenticated`.
    pub fn resolve(&self, identity: &IdentityStore, token: Option<&str>) -> Result<Caller> {
        let token = token.ok_or(Error::Unauthenticated)?;
        let user_id = self.tokens.get(token).ok_or(Error::Unauthenticated)?;
        let user = identity
            .get(user_id)
            .filter(|u| u.is_active)
            .ok_or(Error::Unauthenticated)?;
        Ok(Caller::new(user.clone()))
    }

    /// Revoke one token; returns whether it existed
    pub fn revoke(&mut self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Revoke every token of a user; returns how many were dropped
    pub fn revoke_user(&mut self, user_id: &str) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, uid| uid != user_id);
        before - self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
