//! In-memory issue store
//!
//! Issues are kept newest first. Every operation takes the resolved
//! [`Caller`] and applies role scoping itself.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::id::Sequence;
use crate::session::Caller;
use crate::stats::{AdminStats, StatusCounts, admin_stats, status_counts};
use crate::user::{UserRef, require_non_empty};
use crate::{Error, Issue, IssueFilter, IssuePatch, NewIssue, Result, Status};

/// Result of a listing: filtered issues plus stats over the caller's
/// whole visible set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub issues: Vec<Issue>,
    pub stats: StatusCounts,
}

pub struct IssueStore {
    issues: Vec<Issue>,
    ids: Sequence,
}

impl IssueStore {
    pub fn new(issue_prefix: &str) -> Self {
        Self {
            issues: Vec::new(),
            ids: Sequence::new(issue_prefix),
        }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues inside the caller's role-scoped view, newest first
    fn visible<'a>(&'a self, caller: &'a Caller) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues.iter().filter(move |i| caller.can_see(i))
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.issues
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::issue_not_found(id))
    }

    /// Look up an issue the caller may mutate
    fn owned_mut(&mut self, caller: &Caller, id: &str, action: &str) -> Result<&mut Issue> {
        let index = self.position(id)?;
        let issue = &mut self.issues[index];
        caller.require_owner_or_admin(issue, action)?;
        Ok(issue)
    }

    fn admin_mut(&mut self, caller: &Caller, id: &str, action: &str) -> Result<&mut Issue> {
        caller.require_admin(action)?;
        let index = self.position(id)?;
        Ok(&mut self.issues[index])
    }

    /// Submit a new issue; it always starts `pending`
    pub fn create(&mut self, caller: &Caller, submission: NewIssue) -> Result<Issue> {
        submission.validate()?;
        let issue = Issue::new(self.ids.next_id(), submission, caller.to_ref());
        self.issues.insert(0, issue.clone());
        info!(issue = %issue.id, reporter = %caller.id(), "created issue");
        Ok(issue)
    }

    /// Append a prebuilt issue after the existing ones, assigning it the
    /// next ID. Used for demo data.
    pub(crate) fn push_seeded(&mut self, mut issue: Issue) -> Issue {
        issue.id = self.ids.next_id();
        self.issues.push(issue.clone());
        issue
    }

    /// Role-scoped listing
    ///
    /// `stats` are computed over the role-scoped set before `filter` is
    /// applied.
    pub fn list(&self, caller: &Caller, filter: &IssueFilter) -> Listing {
        let stats = status_counts(self.visible(caller));
        let issues: Vec<Issue> = self
            .visible(caller)
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        debug!(caller = %caller.id(), count = issues.len(), "listed issues");
        Listing { issues, stats }
    }

    /// Single issue read; issues outside the caller's view are `NotFound`
    pub fn get(&self, caller: &Caller, id: &str) -> Result<Issue> {
        self.visible(caller)
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::issue_not_found(id))
    }

    pub fn update(&mut self, caller: &Caller, id: &str, patch: &IssuePatch) -> Result<Issue> {
        let issue = self.owned_mut(caller, id, "edit")?;
        patch.validate()?;
        issue.apply_patch(patch);
        info!(issue = %id, by = %caller.id(), "updated issue");
        Ok(issue.clone())
    }

    pub fn delete(&mut self, caller: &Caller, id: &str) -> Result<()> {
        let index = self.position(id)?;
        caller.require_owner_or_admin(&self.issues[index], "delete")?;
        self.issues.remove(index);
        info!(issue = %id, by = %caller.id(), "deleted issue");
        Ok(())
    }

    /// Admin status transition; any of the four statuses is accepted
    pub fn set_status(
        &mut self,
        caller: &Caller,
        id: &str,
        status: Status,
        comment: Option<&str>,
    ) -> Result<Issue> {
        let author = caller.to_ref();
        let issue = self.admin_mut(caller, id, "change issue status")?;
        let from = issue.status;
        issue.set_status(status);
        append_note(issue, author, comment);
        info!(issue = %id, %from, to = %status, "changed issue status");
        Ok(issue.clone())
    }

    /// Admin assignment; status is left untouched
    pub fn assign(
        &mut self,
        caller: &Caller,
        id: &str,
        assignee: UserRef,
        comment: Option<&str>,
    ) -> Result<Issue> {
        let author = caller.to_ref();
        let issue = self.admin_mut(caller, id, "assign issues")?;
        info!(issue = %id, assignee = %assignee.id, "assigned issue");
        issue.assign(assignee);
        append_note(issue, author, comment);
        Ok(issue.clone())
    }

    pub fn add_comment(&mut self, caller: &Caller, id: &str, content: &str) -> Result<Issue> {
        let author = caller.to_ref();
        let issue = self.owned_mut(caller, id, "comment on")?;
        require_non_empty("content", content)?;
        issue.add_comment(author, content);
        debug!(issue = %id, by = %caller.id(), "added comment");
        Ok(issue.clone())
    }

    /// Admin-only breakdown over every issue
    pub fn stats(&self, caller: &Caller, recent_limit: usize) -> Result<AdminStats> {
        caller.require_admin("view issue statistics")?;
        Ok(admin_stats(&self.issues, recent_limit))
    }
}

/// Attach an optional note from a status change or assignment
fn append_note(issue: &mut Issue, author: UserRef, note: Option<&str>) {
    if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
        issue.add_comment(author, note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Priority, Role, User};
    use chrono::Utc;

    fn caller(id: &str, role: Role) -> Caller {
        Caller::new(User {
            id: id.into(),
            first_name: "Test".into(),
            last_name: id.into(),
            email: format!("{}@university.edu", id),
            role,
            department: "Testing".into(),
            student_id: None,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    fn submission(category: Category) -> NewIssue {
        NewIssue {
            category,
            location: "Room 101".into(),
            description: "light is out".into(),
            priority: Some(Priority::High),
        }
    }

    #[test]
    fn test_create_prepends() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let first = store.create(&alice, submission(Category::Electricity)).unwrap();
        let second = store.create(&alice, submission(Category::Water)).unwrap();

        let listing = store.list(&alice, &IssueFilter::default());
        assert_eq!(listing.issues[0].id, second.id);
        assert_eq!(listing.issues[1].id, first.id);
    }

    #[test]
    fn test_invalid_submission_is_not_stored() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let mut bad = submission(Category::Wifi);
        bad.location = String::new();
        assert!(matches!(store.create(&alice, bad), Err(Error::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_is_role_scoped() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let bob = caller("usr-2", Role::User);
        let admin = caller("usr-3", Role::Admin);
        let issue = store.create(&alice, submission(Category::Wifi)).unwrap();

        assert!(store.get(&alice, &issue.id).is_ok());
        assert!(store.get(&admin, &issue.id).is_ok());
        assert!(matches!(
            store.get(&bob, &issue.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_status_change_with_note() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let admin = caller("usr-3", Role::Admin);
        let issue = store.create(&alice, submission(Category::Wifi)).unwrap();

        let updated = store
            .set_status(&admin, &issue.id, Status::Cancelled, Some("duplicate"))
            .unwrap();
        assert_eq!(updated.status, Status::Cancelled);
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].author.id, "usr-3");

        let updated = store
            .set_status(&admin, &issue.id, Status::Pending, Some("   "))
            .unwrap();
        assert_eq!(updated.status, Status::Pending);
        assert_eq!(updated.comments.len(), 1);
    }

    #[test]
    fn test_update_rejects_foreign_and_invalid() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let bob = caller("usr-2", Role::User);
        let issue = store.create(&alice, submission(Category::Wifi)).unwrap();

        let patch = IssuePatch {
            description: Some("now totally dead".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(&bob, &issue.id, &patch),
            Err(Error::Forbidden(_))
        ));

        let bad = IssuePatch {
            priority: Some(Priority::Urgent),
            location: Some(" ".into()),
            ..Default::default()
        };
        assert!(store.update(&alice, &issue.id, &bad).is_err());
        assert_eq!(
            store.get(&alice, &issue.id).unwrap().priority,
            Priority::High
        );

        let updated = store.update(&alice, &issue.id, &patch).unwrap();
        assert_eq!(updated.description, "now totally dead");
        assert_eq!(updated.status, Status::Pending);
    }

    #[test]
    fn test_comment_requires_content() {
        let mut store = IssueStore::new("fix");
        let alice = caller("usr-1", Role::User);
        let issue = store.create(&alice, submission(Category::Wifi)).unwrap();
        assert!(matches!(
            store.add_comment(&alice, &issue.id, "  "),
            Err(Error::Validation(_))
        ));
        let updated = store.add_comment(&alice, &issue.id, "still broken").unwrap();
        assert_eq!(updated.comments[0].content, "still broken");
    }
}
