//! The tracker: identity, sessions and issues behind one entry point
//!
//! Each public operation takes the caller's bearer token, resolves it
//! through the [`SessionFacade`] once and hands the resulting caller to the
//! stores.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::identity::{HashedRegistration, IdentityStore, LoginAttempt, RegistrationDraft};
use crate::issue::Filter;
use crate::session::{Caller, SessionFacade};
use crate::stats::{AdminStats, RoleCounts, UserStats, role_counts, user_stats};
use crate::store::{IssueStore, Listing};
use crate::user::{ProfilePatch, Registration};
use crate::{
    Category, Error, Issue, IssueFilter, IssuePatch, NewIssue, Priority, Result, Role, Status,
    User,
};

/// Maximum number of matches returned by a staff search
pub const STAFF_SEARCH_LIMIT: usize = 10;

/// Number of users listed under "recent" in user stats
pub const RECENT_USERS_LIMIT: usize = 5;

/// A user together with a freshly issued session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Users matching a role filter plus role counts over that selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListing {
    pub users: Vec<User>,
    pub stats: RoleCounts,
}

pub struct Tracker {
    config: Config,
    identity: IdentityStore,
    sessions: SessionFacade,
    issues: IssueStore,
}

impl Tracker {
    /// An empty tracker
    pub fn new(config: Config) -> Self {
        Self {
            identity: IdentityStore::new(&config.user_prefix, config.auth.clone()),
            sessions: SessionFacade::new(),
            issues: IssueStore::new(&config.issue_prefix),
            config,
        }
    }

    /// A tracker with the startup data the config asks for: demo data
    /// and/or a bootstrap admin
    pub fn from_config(config: Config) -> Result<Self> {
        let mut tracker = Self::new(config);
        if tracker.config.seed_demo_data {
            tracker.seed_demo_data()?;
        }
        if let Some(admin) = tracker.config.admin.clone() {
            match tracker.seed_admin(admin.registration()) {
                Ok(_) | Err(Error::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(tracker)
    }

    /// Resolve a bearer token to its caller; `Unauthenticated` when there
    /// is no live session behind it
    pub fn authenticate(&self, token: Option<&str>) -> Result<Caller> {
        self.sessions.resolve(&self.identity, token)
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    pub fn register(&mut self, registration: Registration) -> Result<AuthSession> {
        let hashed = self.prepare_registration(registration)?.hash()?;
        self.complete_registration(hashed)
    }

    /// First half of a registration: validation and the duplicate email
    /// check. Hash the draft, then pass it to `complete_registration`.
    pub fn prepare_registration(&self, registration: Registration) -> Result<RegistrationDraft> {
        self.identity.prepare(registration)
    }

    pub fn complete_registration(&mut self, hashed: HashedRegistration) -> Result<AuthSession> {
        let user = self.identity.insert(hashed, Role::User)?;
        let token = self.sessions.open(&user.id);
        Ok(AuthSession { user, token })
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<AuthSession> {
        let user = self.identity.authenticate(email, password)?;
        self.complete_login(user)
    }

    /// First half of a login: credential lookup. Verify the attempt, then
    /// pass the user to `complete_login`.
    pub fn begin_login(&self, email: &str, password: &str) -> Result<LoginAttempt> {
        self.identity.begin_login(email, password)
    }

    /// Open a session for a verified user that is still active
    pub fn complete_login(&mut self, user: User) -> Result<AuthSession> {
        let user = self
            .identity
            .get(&user.id)
            .filter(|u| u.is_active)
            .ok_or(Error::InvalidCredentials)?
            .clone();
        let token = self.sessions.open(&user.id);
        info!(user = %user.id, "logged in");
        Ok(AuthSession { user, token })
    }

    pub fn profile(&self, token: Option<&str>) -> Result<User> {
        Ok(self.authenticate(token)?.user().clone())
    }

    pub fn update_profile(&mut self, token: Option<&str>, patch: &ProfilePatch) -> Result<User> {
        let caller = self.authenticate(token)?;
        self.identity.update_profile(caller.id(), patch)
    }

    pub fn change_password(
        &mut self,
        token: Option<&str>,
        current: &str,
        new: &str,
    ) -> Result<()> {
        let caller = self.authenticate(token)?;
        self.identity.change_password(caller.id(), current, new)
    }

    /// Revoke the token if there is one; always succeeds
    pub fn logout(&mut self, token: Option<&str>) {
        if let Some(token) = token
            && self.sessions.revoke(token)
        {
            info!("logged out");
        }
    }

    /// Create the first admin account
    pub fn seed_admin(&mut self, registration: Registration) -> Result<User> {
        if self.identity.has_admin() {
            return Err(Error::AlreadyExists("an admin user already exists".into()));
        }
        self.identity.create(registration, Role::Admin)
    }

    // ------------------------------------------------------------------
    // Issues
    // ------------------------------------------------------------------

    pub fn list_issues(&self, token: Option<&str>, filter: &IssueFilter) -> Result<Listing> {
        let caller = self.authenticate(token)?;
        Ok(self.issues.list(&caller, filter))
    }

    pub fn get_issue(&self, token: Option<&str>, id: &str) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        self.issues.get(&caller, id)
    }

    pub fn create_issue(&mut self, token: Option<&str>, submission: NewIssue) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        self.issues.create(&caller, submission)
    }

    pub fn update_issue(
        &mut self,
        token: Option<&str>,
        id: &str,
        patch: &IssuePatch,
    ) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        self.issues.update(&caller, id, patch)
    }

    pub fn delete_issue(&mut self, token: Option<&str>, id: &str) -> Result<()> {
        let caller = self.authenticate(token)?;
        self.issues.delete(&caller, id)
    }

    /// Admin status transition; `status` must name one of the four statuses
    pub fn set_status(
        &mut self,
        token: Option<&str>,
        id: &str,
        status: &str,
        comment: Option<&str>,
    ) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        caller.require_admin("change issue status")?;
        let status: Status = status.parse()?;
        self.issues.set_status(&caller, id, status, comment)
    }

    /// Admin assignment to an existing user
    pub fn assign_issue(
        &mut self,
        token: Option<&str>,
        id: &str,
        assignee_id: &str,
        comment: Option<&str>,
    ) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        caller.require_admin("assign issues")?;
        let assignee = self
            .identity
            .get(assignee_id)
            .ok_or_else(|| Error::user_not_found(assignee_id))?
            .to_ref();
        self.issues.assign(&caller, id, assignee, comment)
    }

    pub fn add_comment(&mut self, token: Option<&str>, id: &str, content: &str) -> Result<Issue> {
        let caller = self.authenticate(token)?;
        self.issues.add_comment(&caller, id, content)
    }

    pub fn issue_stats(&self, token: Option<&str>) -> Result<AdminStats> {
        let caller = self.authenticate(token)?;
        self.issues.stats(&caller, self.config.recent_issues_limit)
    }

    // ------------------------------------------------------------------
    // User administration
    // ------------------------------------------------------------------

    fn admin(&self, token: Option<&str>, action: &str) -> Result<Caller> {
        let caller = self.authenticate(token)?;
        caller.require_admin(action)?;
        Ok(caller)
    }

    pub fn list_users(&self, token: Option<&str>, role: Filter<Role>) -> Result<UserListing> {
        self.admin(token, "list users")?;
        let users: Vec<User> = self
            .identity
            .users()
            .iter()
            .filter(|u| role.matches(&u.role))
            .cloned()
            .collect();
        let stats = role_counts(&users);
        Ok(UserListing { users, stats })
    }

    pub fn get_user(&self, token: Option<&str>, id: &str) -> Result<User> {
        self.admin(token, "view users")?;
        self.identity
            .get(id)
            .cloned()
            .ok_or_else(|| Error::user_not_found(id))
    }

    pub fn update_user(
        &mut self,
        token: Option<&str>,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<User> {
        self.admin(token, "update users")?;
        self.identity.update_profile(id, patch)
    }

    /// Activate or deactivate a user; deactivation ends their sessions
    pub fn toggle_user_status(&mut self, token: Option<&str>, id: &str) -> Result<User> {
        let caller = self.admin(token, "change user status")?;
        if caller.id() == id {
            return Err(Error::Validation("you cannot deactivate yourself".into()));
        }
        let user = self.identity.toggle_active(id)?;
        if !user.is_active {
            self.sessions.revoke_user(id);
        }
        Ok(user)
    }

    pub fn delete_user(&mut self, token: Option<&str>, id: &str) -> Result<()> {
        let caller = self.admin(token, "delete users")?;
        if caller.id() == id {
            return Err(Error::Validation("you cannot delete yourself".into()));
        }
        self.identity.remove(id)?;
        self.sessions.revoke_user(id);
        Ok(())
    }

    pub fn user_stats(&self, token: Option<&str>) -> Result<UserStats> {
        self.admin(token, "view user statistics")?;
        Ok(user_stats(self.identity.users(), RECENT_USERS_LIMIT))
    }

    pub fn search_staff(&self, token: Option<&str>, query: &str) -> Result<Vec<User>> {
        self.admin(token, "search staff")?;
        Ok(self.identity.search_staff(query, STAFF_SEARCH_LIMIT))
    }

    // ------------------------------------------------------------------
    // Demo data
    // ------------------------------------------------------------------

    /// Load the demo admin, demo student and their two issues
    fn seed_demo_data(&mut self) -> Result<()> {
        let password = self.config.auth.demo_password.clone();

        self.seed_admin(Registration {
            first_name: "Admin".into(),
            last_name: "User".into(),
            email: "admin@university.edu".into(),
            department: "Administration".into(),
            student_id: None,
            password: password.clone(),
        })?;

        let student = self
            .identity
            .register(Registration {
                first_name: "John".into(),
                last_name: "Student".into(),
                email: "student@university.edu".into(),
                department: "Computer Science".into(),
                student_id: Some("CS001".into()),
                password,
            })?
            .to_ref();

        let demo = [
            (
                "Broken Light Bulb",
                Category::Electricity,
                "Room 101",
                "The light bulb in the corner is not working",
                Priority::Medium,
                Status::Pending,
                15,
            ),
            (
                "WiFi Connection Issues",
                Category::Wifi,
                "Library",
                "WiFi is very slow in the library area",
                Priority::High,
                Status::InProgress,
                14,
            ),
        ];

        for (title, category, location, description, priority, status, day) in demo {
            let mut issue = Issue::new(
                String::new(),
                NewIssue {
                    category,
                    location: location.into(),
                    description: description.into(),
                    priority: Some(priority),
                },
                student.clone(),
            );
            issue.title = title.into();
            issue.status = status;
            if let Some(created) = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).single() {
                issue.created_at = created;
                issue.updated_at = created;
            }
            self.issues.push_seeded(issue);
        }

        info!(issues = self.issues.len(), "loaded demo data");
        Ok(())
    }
}
