//! Identity store: user records and their credentials

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::id::Sequence;
use crate::password::{hash_password, verify_password};
use crate::user::{ProfilePatch, Registration, normalize_email, validate_password};
use crate::{Error, Result, Role, User};

/// A validated registration whose email was free when it was checked
#[derive(Debug)]
pub struct RegistrationDraft {
    registration: Registration,
    pepper: Option<String>,
}

impl RegistrationDraft {
    /// Hash the password; CPU-heavy and independent of the store
    pub fn hash(self) -> Result<HashedRegistration> {
        let hash = hash_password(&self.registration.password, self.pepper.as_deref())?;
        Ok(HashedRegistration {
            registration: self.registration,
            hash,
        })
    }
}

#[derive(Debug)]
pub struct HashedRegistration {
    registration: Registration,
    hash: String,
}

/// Credentials looked up for a login, pending verification
#[derive(Debug)]
pub struct LoginAttempt {
    user: User,
    hash: String,
    password: String,
    pepper: Option<String>,
}

impl LoginAttempt {
    /// Check the password against the stored hash
    pub fn verify(self) -> Result<User> {
        if !verify_password(&self.password, &self.hash, self.pepper.as_deref())? {
            warn!(user = %self.user.id, "rejected login with wrong password");
            return Err(Error::InvalidCredentials);
        }
        Ok(self.user)
    }
}

/// In-memory user registry
///
/// Users are kept in registration order. Password hashes live in a separate
/// map keyed by user ID so that `User` values can be handed out freely.
pub struct IdentityStore {
    users: Vec<User>,
    credentials: HashMap<String, String>,
    ids: Sequence,
    auth: AuthConfig,
}

impl IdentityStore {
    pub fn new(user_prefix: &str, auth: AuthConfig) -> Self {
        Self {
            users: Vec::new(),
            credentials: HashMap::new(),
            ids: Sequence::new(user_prefix),
            auth,
        }
    }

    /// All users in registration order
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::user_not_found(id))
    }

    /// Look up a user by email, active or not
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let email = normalize_email(email);
        self.users.iter().find(|u| u.email == email)
    }

    pub fn has_admin(&self) -> bool {
        self.users.iter().any(|u| u.role.is_admin())
    }

    /// Self-service registration; the role is always `user`
    pub fn register(&mut self, registration: Registration) -> Result<User> {
        self.create(registration, Role::User)
    }

    /// Create an account with an explicit role
    pub(crate) fn create(&mut self, registration: Registration, role: Role) -> Result<User> {
        let hashed = self.prepare(registration)?.hash()?;
        self.insert(hashed, role)
    }

    /// Validate a registration and check the email is free
    ///
    /// The returned draft hashes its password without touching the store,
    /// so the caller can do that outside any lock.
    pub fn prepare(&self, registration: Registration) -> Result<RegistrationDraft> {
        registration.validate(self.auth.min_password_length)?;
        self.ensure_email_free(&registration.email)?;
        Ok(RegistrationDraft {
            registration,
            pepper: self.auth.pepper.clone(),
        })
    }

    fn ensure_email_free(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if self.find_by_email(&email).is_some() {
            return Err(Error::DuplicateEmail(email));
        }
        Ok(())
    }

    /// Store a hashed registration; the email is checked again since it
    /// may have been taken after `prepare`
    pub fn insert(&mut self, hashed: HashedRegistration, role: Role) -> Result<User> {
        let HashedRegistration { registration, hash } = hashed;
        self.ensure_email_free(&registration.email)?;

        let student_id = registration
            .student_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let user = User {
            id: self.ids.next_id(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            email: normalize_email(&registration.email),
            role,
            department: registration.department.trim().to_string(),
            student_id,
            is_active: true,
            created_at: Utc::now(),
        };

        self.credentials.insert(user.id.clone(), hash);
        self.users.push(user.clone());
        info!(user = %user.id, role = %user.role, "registered user");
        Ok(user)
    }

    /// Look up the credentials for a login without verifying them yet
    ///
    /// Unknown and inactive accounts fail here with `InvalidCredentials`.
    pub fn begin_login(&self, email: &str, password: &str) -> Result<LoginAttempt> {
        let user = self
            .find_by_email(email)
            .filter(|u| u.is_active)
            .ok_or(Error::InvalidCredentials)?;

        let hash = self
            .credentials
            .get(&user.id)
            .ok_or(Error::InvalidCredentials)?;

        Ok(LoginAttempt {
            user: user.clone(),
            hash: hash.clone(),
            password: password.to_string(),
            pepper: self.auth.pepper.clone(),
        })
    }

    /// Resolve credentials to an active user
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        self.begin_login(email, password)?.verify()
    }

    /// Merge the permitted profile fields into a user record
    pub fn update_profile(&mut self, id: &str, patch: &ProfilePatch) -> Result<User> {
        patch.validate()?;
        let user = self.get_mut(id)?;
        patch.apply(user);
        Ok(user.clone())
    }

    pub fn change_password(&mut self, id: &str, current: &str, new: &str) -> Result<()> {
        let hash = self
            .credentials
            .get(id)
            .ok_or_else(|| Error::user_not_found(id))?;
        if !verify_password(current, hash, self.auth.pepper.as_deref())? {
            return Err(Error::InvalidCredentials);
        }
        validate_password(new, self.auth.min_password_length)?;

        let new_hash = hash_password(new, self.auth.pepper.as_deref())?;
        self.credentials.insert(id.to_string(), new_hash);
        info!(user = %id, "changed password");
        Ok(())
    }

    /// Flip the active flag, returning the updated user
    pub fn toggle_active(&mut self, id: &str) -> Result<User> {
        let user = self.get_mut(id)?;
        user.is_active = !user.is_active;
        info!(user = %user.id, active = user.is_active, "toggled user status");
        Ok(user.clone())
    }

    pub fn remove(&mut self, id: &str) -> Result<User> {
        let index = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::user_not_found(id))?;
        self.credentials.remove(id);
        let user = self.users.remove(index);
        info!(user = %user.id, "deleted user");
        Ok(user)
    }

    /// Active non-admin users whose name or email contains `query`
    pub fn search_staff(&self, query: &str, limit: usize) -> Vec<User> {
        let query = query.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| u.role == Role::User && u.is_active)
            .filter(|u| {
                u.first_name.to_lowercase().contains(&query)
                    || u.last_name.to_lowercase().contains(&query)
                    || u.email.contains(&query)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> IdentityStore {
        IdentityStore::new("usr", AuthConfig::default())
    }

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: email.into(),
            department: "Computer Science".into(),
            student_id: Some("CS042".into()),
            password: "cobol-rules".into(),
        }
    }

    #[test]
    fn test_register_forces_user_role() {
        let mut store = store();
        let user = store.register(registration("Grace@University.edu ")).unwrap();
        assert_eq!(user.id, "usr-1");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert_eq!(user.email, "grace@university.edu");
    }

    #[test]
    fn test_duplicate_email_is_case_insensitive() {
        let mut store = store();
        store.register(registration("grace@university.edu")).unwrap();
        let err = store
            .register(registration("GRACE@university.edu"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn test_authenticate() {
        let mut store = store();
        let user = store.register(registration("grace@university.edu")).unwrap();

        let found = store
            .authenticate("grace@university.edu", "cobol-rules")
            .unwrap();
        assert_eq!(found.id, user.id);

        assert!(matches!(
            store.authenticate("grace@university.edu", "fortran"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("nobody@university.edu", "cobol-rules"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_email_taken_between_prepare_and_insert() {
        let mut store = store();
        let draft = store.prepare(registration("grace@university.edu")).unwrap();
        store.register(registration("GRACE@university.edu")).unwrap();

        let hashed = draft.hash().unwrap();
        assert!(matches!(
            store.insert(hashed, Role::User),
            Err(Error::DuplicateEmail(_))
        ));
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn test_login_attempt_verifies_outside_store() {
        let mut store = store();
        let user = store.register(registration("grace@university.edu")).unwrap();

        let attempt = store.begin_login("grace@university.edu", "cobol-rules").unwrap();
        assert_eq!(attempt.verify().unwrap().id, user.id);

        let attempt = store.begin_login("grace@university.edu", "fortran").unwrap();
        assert!(matches!(attempt.verify(), Err(Error::InvalidCredentials)));
    }

    #[test]
    fn test_inactive_user_cannot_authenticate() {
        let mut store = store();
        let user = store.register(registration("grace@university.edu")).unwrap();
        store.toggle_active(&user.id).unwrap();
        assert!(matches!(
            store.authenticate("grace@university.edu", "cobol-rules"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_change_password() {
        let mut store = store();
        let user = store.register(registration("grace@university.edu")).unwrap();

        assert!(matches!(
            store.change_password(&user.id, "wrong-password", "new-password"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            store.change_password(&user.id, "cobol-rules", "short"),
            Err(Error::Validation(_))
        ));

        store
            .change_password(&user.id, "cobol-rules", "new-password")
            .unwrap();
        assert!(store.authenticate("grace@university.edu", "new-password").is_ok());
        assert!(store.authenticate("grace@university.edu", "cobol-rules").is_err());
    }

    #[test]
    fn test_invalid_profile_patch_changes_nothing() {
        let mut store = store();
        let user = store.register(registration("grace@university.edu")).unwrap();
        let patch = ProfilePatch {
            first_name: Some("Amazing".into()),
            last_name: Some(" ".into()),
            ..Default::default()
        };
        assert!(store.update_profile(&user.id, &patch).is_err());
        assert_eq!(store.get(&user.id).unwrap().first_name, "Grace");
    }

    #[test]
    fn test_search_staff() {
        let mut store = store();
        store.register(registration("grace@university.edu")).unwrap();
        let mut other = registration("alan@university.edu");
        other.first_name = "Alan".into();
        other.last_name = "Turing".into();
        store.register(other).unwrap();
        store
            .create(registration("boss@university.edu"), Role::Admin)
            .unwrap();

        let found = store.search_staff("TUR", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Alan");

        // admins are never listed as staff
        assert_eq!(store.search_staff("university", 10).len(), 2);
        assert_eq!(store.search_staff("university", 1).len(), 1);
    }
}
