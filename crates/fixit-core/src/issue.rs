//! Issue data model for fixit
//!
//! Statuses, categories and priorities serialize in lowercase, with
//! `in-progress` for the in-progress status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::{UserRef, require_non_empty};
use crate::{Error, Result};

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Cancelled,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Resolved,
        Status::Cancelled,
    ];
}

impl std::str::FromStr for Status {
    type Err = Error;

    /// Only the four wire names are accepted, exactly as written
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "in-progress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            "cancelled" => Ok(Status::Cancelled),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::InProgress => write!(f, "in-progress"),
            Status::Resolved => write!(f, "resolved"),
            Status::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Facility area an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Electricity,
    Wifi,
    Water,
    Cleanliness,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electricity,
        Category::Wifi,
        Category::Water,
        Category::Cleanliness,
        Category::Other,
    ];

    /// Capitalised form used in derived titles
    pub fn label(&self) -> &'static str {
        match self {
            Category::Electricity => "Electricity",
            Category::Wifi => "Wifi",
            Category::Water => "Water",
            Category::Cleanliness => "Cleanliness",
            Category::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "electricity" => Ok(Category::Electricity),
            "wifi" => Ok(Category::Wifi),
            "water" => Ok(Category::Water),
            "cleanliness" => Ok(Category::Cleanliness),
            "other" => Ok(Category::Other),
            _ => Err(Error::Validation(format!("unknown category '{}'", s))),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

/// Issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(Error::Validation(format!("unknown priority '{}'", s))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// A comment on an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: UserRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Submission payload for a new issue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub category: Category,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl NewIssue {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("location", &self.location)?;
        require_non_empty("description", &self.description)
    }
}

/// Editable issue fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePatch {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl IssuePatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref location) = self.location {
            require_non_empty("location", location)?;
        }
        if let Some(ref description) = self.description {
            require_non_empty("description", description)?;
        }
        Ok(())
    }
}

/// Core issue structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Sequential identifier (fix-N)
    pub id: String,

    /// Derived from category and location
    pub title: String,

    pub category: Category,

    pub location: String,

    pub description: String,

    pub priority: Priority,

    pub status: Status,

    /// Who submitted the issue
    pub reported_by: UserRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserRef>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// When the issue last entered `resolved`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Issue {
    /// Create a pending issue from a validated submission
    pub fn new(id: String, submission: NewIssue, reporter: UserRef) -> Self {
        let now = Utc::now();
        let location = submission.location.trim().to_string();
        Self {
            id,
            title: derive_title(submission.category, &location),
            category: submission.category,
            location,
            description: submission.description.trim().to_string(),
            priority: submission.priority.unwrap_or_default(),
            status: Status::Pending,
            reported_by: reporter,
            assigned_to: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    pub fn is_reported_by(&self, user_id: &str) -> bool {
        self.reported_by.id == user_id
    }

    /// Record a status transition
    pub fn set_status(&mut self, status: Status) {
        let now = Utc::now();
        if status == Status::Resolved && self.status != Status::Resolved {
            self.resolved_at = Some(now);
        } else if status != Status::Resolved {
            self.resolved_at = None;
        }
        self.status = status;
        self.updated_at = now;
    }

    pub fn assign(&mut self, assignee: UserRef) {
        self.assigned_to = Some(assignee);
        self.updated_at = Utc::now();
    }

    pub fn add_comment(&mut self, author: UserRef, content: &str) {
        let now = Utc::now();
        self.comments.push(Comment {
            author,
            content: content.trim().to_string(),
            created_at: now,
        });
        self.updated_at = now;
    }

    /// Apply a validated patch, re-deriving the title
    pub fn apply_patch(&mut self, patch: &IssuePatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(ref location) = patch.location {
            self.location = location.trim().to_string();
        }
        if let Some(ref description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.title = derive_title(self.category, &self.location);
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] [{}] {} - {}",
            self.id, self.priority, self.category, self.status, self.title
        )
    }
}

/// `"<Category> Issue - <Location>"`
pub fn derive_title(category: Category, location: &str) -> String {
    format!("{} Issue - {}", category.label(), location)
}

/// A listing filter on one dimension: a concrete value or `all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::All
    }
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }
}

impl<T> std::str::FromStr for Filter<T>
where
    T: std::str::FromStr<Err = Error>,
{
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(Filter::All)
        } else {
            s.parse().map(Filter::Only)
        }
    }
}

/// Listing filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub status: Filter<Status>,
    pub category: Filter<Category>,
    pub priority: Filter<Priority>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.status.matches(&issue.status)
            && self.category.matches(&issue.category)
            && self.priority.matches(&issue.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter() -> UserRef {
        UserRef {
            id: "usr-2".into(),
            first_name: "John".into(),
            last_name: "Student".into(),
            email: "student@university.edu".into(),
        }
    }

    fn submission() -> NewIssue {
        NewIssue {
            category: Category::Wifi,
            location: " Library ".into(),
            description: "slow".into(),
            priority: None,
        }
    }

    #[test]
    fn test_new_issue_defaults() {
        let issue = Issue::new("fix-1".into(), submission(), reporter());
        assert_eq!(issue.status, Status::Pending);
        assert_eq!(issue.priority, Priority::Medium);
        assert_eq!(issue.title, "Wifi Issue - Library");
        assert_eq!(issue.location, "Library");
        assert!(issue.is_reported_by("usr-2"));
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!(Status::InProgress.to_string(), "in-progress");
        for status in Status::ALL {
            assert_eq!(status.to_string().parse::<Status>().unwrap(), status);
        }
        assert!(matches!(
            "closed".parse::<Status>(),
            Err(Error::InvalidStatus(s)) if s == "closed"
        ));
    }

    #[test]
    fn test_status_rejects_aliases_and_case() {
        for alias in [
            "in_progress",
            "inprogress",
            "IN_PROGRESS",
            "In-Progress",
            "canceled",
            "Resolved",
            "PENDING",
            " pending",
        ] {
            assert!(
                matches!(alias.parse::<Status>(), Err(Error::InvalidStatus(_))),
                "{alias} should be rejected"
            );
        }
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn test_resolved_at_tracks_status() {
        let mut issue = Issue::new("fix-1".into(), submission(), reporter());
        issue.set_status(Status::Resolved);
        assert!(issue.resolved_at.is_some());
        issue.set_status(Status::InProgress);
        assert!(issue.resolved_at.is_none());
    }

    #[test]
    fn test_patch_rederives_title() {
        let mut issue = Issue::new("fix-1".into(), submission(), reporter());
        let patch = IssuePatch {
            category: Some(Category::Water),
            location: Some("Gym".into()),
            ..Default::default()
        };
        patch.validate().unwrap();
        issue.apply_patch(&patch);
        assert_eq!(issue.title, "Water Issue - Gym");
        assert_eq!(issue.description, "slow");
    }

    #[test]
    fn test_new_issue_requires_fields() {
        let mut s = submission();
        s.description = "   ".into();
        assert!(matches!(s.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("all".parse::<Filter<Status>>().unwrap(), Filter::All);
        assert_eq!("".parse::<Filter<Category>>().unwrap(), Filter::All);
        assert_eq!(
            "urgent".parse::<Filter<Priority>>().unwrap(),
            Filter::Only(Priority::Urgent)
        );
        assert!("nope".parse::<Filter<Category>>().is_err());
    }
}
