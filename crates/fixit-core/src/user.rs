//! User data model for fixit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::Validation(format!("unknown role '{}'", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// A registered account
///
/// The password hash is held by the identity store and never leaves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Snapshot embedded in issues and comments
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} <{}>",
            self.id,
            self.role,
            self.full_name(),
            self.email
        )
    }
}

/// Reference to a user as stored on issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Self-service registration payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub password: String,
}

impl Registration {
    pub fn validate(&self, min_password_length: usize) -> Result<()> {
        require_non_empty("firstName", &self.first_name)?;
        require_non_empty("lastName", &self.last_name)?;
        require_non_empty("department", &self.department)?;
        validate_email(&self.email)?;
        validate_password(&self.password, min_password_length)
    }
}

/// Editable profile fields
///
/// Email, role and activation state are not part of the patch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.department.is_none()
            && self.student_id.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref v) = self.first_name {
            require_non_empty("firstName", v)?;
        }
        if let Some(ref v) = self.last_name {
            require_non_empty("lastName", v)?;
        }
        if let Some(ref v) = self.department {
            require_non_empty("department", v)?;
        }
        Ok(())
    }

    /// Apply a validated patch. An empty student ID clears it.
    pub fn apply(&self, user: &mut User) {
        if let Some(ref v) = self.first_name {
            user.first_name = v.trim().to_string();
        }
        if let Some(ref v) = self.last_name {
            user.last_name = v.trim().to_string();
        }
        if let Some(ref v) = self.department {
            user.department = v.trim().to_string();
        }
        if let Some(ref v) = self.student_id {
            let v = v.trim();
            user.student_id = (!v.is_empty()).then(|| v.to_string());
        }
    }
}

/// Canonical form used for uniqueness checks and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ if email.is_empty() => Err(Error::Validation("email is required".into())),
        _ => Err(Error::Validation(format!("invalid email '{}'", email))),
    }
}

pub(crate) fn validate_password(password: &str, min_length: usize) -> Result<()> {
    if password.chars().count() < min_length {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            min_length
        )));
    }
    Ok(())
}
