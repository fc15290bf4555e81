//! Statistics over issue and user collections
//!
//! Everything here is a pure function of its input and is recomputed on
//! every call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Category, Issue, Priority, Role, Status, User};

/// Issue counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    #[serde(rename = "in-progress")]
    pub in_progress: usize,
    pub resolved: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.resolved + self.cancelled
    }

    fn bump(&mut self, status: Status) {
        match status {
            Status::Pending => self.pending += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Resolved => self.resolved += 1,
            Status::Cancelled => self.cancelled += 1,
        }
    }
}

pub fn status_counts<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for issue in issues {
        counts.bump(issue.status);
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Histogram over all five categories, zero-filled, in declaration order
pub fn category_counts<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Category::ALL
        .iter()
        .map(|&category| CategoryCount { category, count: 0 })
        .collect();
    for issue in issues {
        if let Some(entry) = counts.iter_mut().find(|c| c.category == issue.category) {
            entry.count += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

/// Histogram over all four priorities, zero-filled, lowest first
pub fn priority_counts<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Vec<PriorityCount> {
    let mut counts: Vec<PriorityCount> = Priority::ALL
        .iter()
        .map(|&priority| PriorityCount { priority, count: 0 })
        .collect();
    for issue in issues {
        if let Some(entry) = counts.iter_mut().find(|c| c.priority == issue.priority) {
            entry.count += 1;
        }
    }
    counts
}

/// Headline numbers of the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub urgent: usize,
}

/// Admin-only breakdown of the whole issue set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub overview: Overview,
    pub categories: Vec<CategoryCount>,
    pub recent_issues: Vec<Issue>,
}

/// Build the admin breakdown. `issues` must already be in listing order
/// (newest first); the first `recent_limit` become `recent_issues`.
pub fn admin_stats(issues: &[Issue], recent_limit: usize) -> AdminStats {
    let by_status = status_counts(issues);
    AdminStats {
        overview: Overview {
            total: issues.len(),
            pending: by_status.pending,
            in_progress: by_status.in_progress,
            resolved: by_status.resolved,
            urgent: issues
                .iter()
                .filter(|i| i.priority == Priority::Urgent)
                .count(),
        },
        categories: category_counts(issues),
        recent_issues: issues.iter().take(recent_limit).cloned().collect(),
    }
}

/// User counts per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub user: usize,
    pub admin: usize,
}

pub fn role_counts<'a>(users: impl IntoIterator<Item = &'a User>) -> RoleCounts {
    let mut counts = RoleCounts::default();
    for user in users {
        match user.role {
            Role::User => counts.user += 1,
            Role::Admin => counts.admin += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverview {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: usize,
}

/// Admin-only breakdown of the user base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub overview: UserOverview,
    pub roles: Vec<RoleCount>,
    pub departments: Vec<DepartmentCount>,
    pub recent_users: Vec<User>,
}

pub fn user_stats(users: &[User], recent_limit: usize) -> UserStats {
    let active = users.iter().filter(|u| u.is_active).count();
    let by_role = role_counts(users);

    let mut departments: BTreeMap<&str, usize> = BTreeMap::new();
    for user in users {
        *departments.entry(user.department.as_str()).or_default() += 1;
    }

    UserStats {
        overview: UserOverview {
            total: users.len(),
            active,
            inactive: users.len() - active,
        },
        roles: Role::ALL
            .iter()
            .map(|&role| RoleCount {
                role,
                count: match role {
                    Role::User => by_role.user,
                    Role::Admin => by_role.admin,
                },
            })
            .collect(),
        departments: departments
            .into_iter()
            .map(|(department, count)| DepartmentCount {
                department: department.to_string(),
                count,
            })
            .collect(),
        recent_users: users.iter().take(recent_limit).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserRef;
    use crate::{Issue, NewIssue};

    fn issue(id: &str, category: Category, priority: Priority, status: Status) -> Issue {
        let reporter = UserRef {
            id: "usr-2".into(),
            first_name: "John".into(),
            last_name: "Student".into(),
            email: "student@university.edu".into(),
        };
        let mut issue = Issue::new(
            id.into(),
            NewIssue {
                category,
                location: "Room 101".into(),
                description: "broken".into(),
                priority: Some(priority),
            },
            reporter,
        );
        issue.set_status(status);
        issue
    }

    fn sample() -> Vec<Issue> {
        vec![
            issue("fix-4", Category::Wifi, Priority::Urgent, Status::Pending),
            issue("fix-3", Category::Wifi, Priority::Low, Status::InProgress),
            issue("fix-2", Category::Water, Priority::Urgent, Status::Resolved),
            issue("fix-1", Category::Other, Priority::Medium, Status::Cancelled),
        ]
    }

    #[test]
    fn test_status_counts() {
        let issues = sample();
        let counts = status_counts(&issues);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.in_progress, 1);
        assert_eq!(counts.resolved, 1);
        assert_eq!(counts.cancelled, 1);
        assert_eq!(counts.total(), issues.len());
    }

    #[test]
    fn test_status_counts_json_keys() {
        let value = serde_json::to_value(StatusCounts::default()).unwrap();
        assert!(value.get("in-progress").is_some());
        assert!(value.get("in_progress").is_none());
    }

    #[test]
    fn test_category_counts_zero_filled() {
        let issues = sample();
        let counts = category_counts(&issues);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0].category, Category::Electricity);
        assert_eq!(counts[0].count, 0);
        assert_eq!(counts[1].count, 2);
        assert_eq!(counts[2].count, 1);
        assert_eq!(counts[3].count, 0);
        assert_eq!(counts[4].count, 1);
    }

    #[test]
    fn test_priority_counts_zero_filled() {
        let issues = sample();
        let counts = priority_counts(&issues);
        let pairs: Vec<_> = counts.iter().map(|c| (c.priority, c.count)).collect();
        assert_eq!(
            pairs,
            [
                (Priority::Low, 1),
                (Priority::Medium, 1),
                (Priority::High, 0),
                (Priority::Urgent, 2),
            ]
        );
        assert!(priority_counts(&[]).iter().all(|c| c.count == 0));
    }

    #[test]
    fn test_admin_stats() {
        let issues = sample();
        let stats = admin_stats(&issues, 2);
        assert_eq!(stats.overview.total, 4);
        assert_eq!(stats.overview.urgent, 2);
        assert_eq!(stats.overview.in_progress, 1);
        assert_eq!(stats.recent_issues.len(), 2);
        assert_eq!(stats.recent_issues[0].id, "fix-4");
    }

    #[test]
    fn test_admin_stats_empty() {
        let stats = admin_stats(&[], 5);
        assert_eq!(stats.overview, Overview::default());
        assert!(stats.categories.iter().all(|c| c.count == 0));
        assert!(stats.recent_issues.is_empty());
    }
}
