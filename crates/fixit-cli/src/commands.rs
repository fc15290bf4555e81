//! CLI command implementations

use std::path::PathBuf;

use anyhow::{Result, bail};
use colored::{ColoredString, Colorize};
use fixit_core::{
    AdminStats, AuthSession, Config, Issue, IssuePatch, Listing, NewIssue, Priority, ProfilePatch,
    Registration, Role, Status, User, UserListing, UserStats, stats::priority_counts,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tabled::{Table, Tabled, settings::Style};

use crate::client::Client;
use crate::session::SessionFile;

/// Everything a command needs: where the API is, the saved session and
/// the output mode
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub api_url: String,
    pub session: SessionFile,
    pub json: bool,
}

impl Context {
    fn client(&self) -> Result<Client> {
        Ok(Client::new(&self.api_url, self.session.load()?))
    }

    fn anonymous(&self) -> Client {
        Client::new(&self.api_url, None)
    }
}

#[derive(Deserialize)]
struct UserBody {
    user: User,
}

#[derive(Deserialize)]
struct UsersBody {
    users: Vec<User>,
}

#[derive(Deserialize)]
struct IssueBody {
    issue: Issue,
}

/// Table row for an issue. Cells stay plain text so column widths line up.
#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Reported by")]
    reporter: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Issue> for IssueRow {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            status: issue.status.to_string(),
            priority: issue.priority.to_string(),
            title: issue.title.clone(),
            reporter: format!(
                "{} {}",
                issue.reported_by.first_name, issue.reported_by.last_name
            ),
            created: issue.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Department")]
    department: String,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role.to_string(),
            department: user.department.clone(),
            active: if user.is_active { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "Count")]
    count: usize,
}

fn status_label(status: Status) -> ColoredString {
    let text = status.to_string();
    match status {
        Status::Pending => text.yellow(),
        Status::InProgress => text.blue(),
        Status::Resolved => text.green(),
        Status::Cancelled => text.dimmed(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    let text = priority.to_string();
    match priority {
        Priority::Low => text.dimmed(),
        Priority::Medium => text.normal(),
        Priority::High => text.yellow(),
        Priority::Urgent => text.red().bold(),
    }
}

/// One-line priority breakdown, e.g. `2 low, 0 medium, 1 high, 0 urgent`
fn priority_summary(issues: &[Issue]) -> String {
    priority_counts(issues)
        .iter()
        .map(|c| format!("{} {}", c.count, c.priority))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<R: Tabled>(rows: Vec<R>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn print_issue(issue: &Issue) {
    println!("{} {}", issue.id.cyan().bold(), issue.title.bold());
    println!();
    println!("Status:      {}", status_label(issue.status));
    println!("Priority:    {}", priority_label(issue.priority));
    println!("Category:    {}", issue.category);
    println!("Location:    {}", issue.location);
    println!(
        "Reported by: {} {} <{}>",
        issue.reported_by.first_name, issue.reported_by.last_name, issue.reported_by.email
    );
    if let Some(ref assignee) = issue.assigned_to {
        println!(
            "Assigned to: {} {} <{}>",
            assignee.first_name, assignee.last_name, assignee.email
        );
    }
    println!("Created:     {}", issue.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated:     {}", issue.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(resolved) = issue.resolved_at {
        println!("Resolved:    {}", resolved.format("%Y-%m-%d %H:%M"));
    }

    println!();
    println!("{}", "Description:".bold());
    println!("{}", issue.description);

    if !issue.comments.is_empty() {
        println!();
        println!("{}", "Comments:".bold());
        for comment in &issue.comments {
            println!(
                "  {} {} {}",
                comment.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                format!("{} {}:", comment.author.first_name, comment.author.last_name).cyan(),
                comment.content
            );
        }
    }
}

fn print_user(user: &User) {
    println!("{} {}", user.id.cyan().bold(), user.full_name().bold());
    println!();
    println!("Email:       {}", user.email);
    println!("Role:        {}", user.role);
    println!("Department:  {}", user.department);
    if let Some(ref student_id) = user.student_id {
        println!("Student ID:  {}", student_id);
    }
    let active = if user.is_active {
        "yes".green()
    } else {
        "no".red()
    };
    println!("Active:      {}", active);
    println!("Joined:      {}", user.created_at.format("%Y-%m-%d"));
}

fn print_updated(ctx: &Context, issue: &Issue, message: &str) -> Result<()> {
    if ctx.json {
        print_json(issue)
    } else {
        println!("{} {} {}", "✓".green(), message, issue.id.cyan());
        println!("  Status: {}", status_label(issue.status));
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Authentication
// ----------------------------------------------------------------------

fn start_session(ctx: &Context, session: &AuthSession, verb: &str) -> Result<()> {
    ctx.session.save(&session.token)?;
    if ctx.json {
        print_json(&session.user)
    } else {
        println!(
            "{} {} as {} ({})",
            "✓".green(),
            verb,
            session.user.email.cyan(),
            session.user.role
        );
        Ok(())
    }
}

pub fn register(ctx: &Context, registration: Registration) -> Result<()> {
    let session: AuthSession = ctx.anonymous().post("/auth/register", &registration)?;
    start_session(ctx, &session, "Registered")
}

pub fn login(ctx: &Context, email: &str, password: &str) -> Result<()> {
    let session: AuthSession = ctx
        .anonymous()
        .post("/auth/login", &json!({ "email": email, "password": password }))?;
    start_session(ctx, &session, "Logged in")
}

/// Forgets the local token first, then tells the server. A server that
/// cannot be reached only produces a warning.
pub fn logout(ctx: &Context) -> Result<()> {
    let Some(token) = ctx.session.load()? else {
        if !ctx.json {
            println!("Not logged in");
        }
        return Ok(());
    };
    ctx.session.clear()?;

    let revoked: Result<Value> =
        Client::new(&ctx.api_url, Some(token)).post("/auth/logout", &json!({}));
    if let Err(e) = revoked {
        eprintln!("{} server session not ended: {}", "warning:".yellow(), e);
    }
    if !ctx.json {
        println!("{} Logged out", "✓".green());
    }
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<()> {
    let body: UserBody = ctx.client()?.get("/auth/me")?;
    if ctx.json {
        print_json(&body.user)
    } else {
        print_user(&body.user);
        Ok(())
    }
}

pub fn profile(ctx: &Context, patch: ProfilePatch) -> Result<()> {
    if patch.is_empty() {
        return whoami(ctx);
    }
    let body: UserBody = ctx.client()?.patch("/auth/me", &patch)?;
    if ctx.json {
        print_json(&body.user)
    } else {
        println!("{} Updated profile of {}", "✓".green(), body.user.email.cyan());
        Ok(())
    }
}

pub fn passwd(ctx: &Context, current: &str, new: &str) -> Result<()> {
    let _: Value = ctx.client()?.post(
        "/auth/password",
        &json!({ "currentPassword": current, "newPassword": new }),
    )?;
    if !ctx.json {
        println!("{} Password changed", "✓".green());
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Issues
// ----------------------------------------------------------------------

pub fn create(ctx: &Context, submission: NewIssue) -> Result<()> {
    let body: IssueBody = ctx.client()?.post("/issues", &submission)?;
    let issue = body.issue;
    if ctx.json {
        print_json(&issue)
    } else {
        println!("{} Created issue: {}", "✓".green(), issue.id.cyan());
        println!("  Title:    {}", issue.title);
        println!("  Priority: {}", priority_label(issue.priority));
        Ok(())
    }
}

pub fn list(
    ctx: &Context,
    status: Option<String>,
    category: Option<String>,
    priority: Option<String>,
) -> Result<()> {
    let mut query = Vec::new();
    if let Some(ref s) = status {
        query.push(("status", s.as_str()));
    }
    if let Some(ref c) = category {
        query.push(("category", c.as_str()));
    }
    if let Some(ref p) = priority {
        query.push(("priority", p.as_str()));
    }

    let listing: Listing = ctx.client()?.get_query("/issues", &query)?;
    if ctx.json {
        return print_json(&listing);
    }

    if listing.issues.is_empty() {
        println!("No issues found");
    } else {
        print_table(listing.issues.iter().map(IssueRow::from).collect());
    }
    let stats = listing.stats;
    println!(
        "{} pending, {} in progress, {} resolved, {} cancelled",
        stats.pending.to_string().yellow(),
        stats.in_progress.to_string().blue(),
        stats.resolved.to_string().green(),
        stats.cancelled.to_string().dimmed()
    );
    if !listing.issues.is_empty() {
        println!("By priority: {}", priority_summary(&listing.issues));
    }
    Ok(())
}

pub fn show(ctx: &Context, id: &str) -> Result<()> {
    let body: IssueBody = ctx.client()?.get(&format!("/issues/{}", id))?;
    if ctx.json {
        print_json(&body.issue)
    } else {
        print_issue(&body.issue);
        Ok(())
    }
}

pub fn edit(ctx: &Context, id: &str, patch: IssuePatch) -> Result<()> {
    if patch.category.is_none()
        && patch.location.is_none()
        && patch.description.is_none()
        && patch.priority.is_none()
    {
        bail!("Nothing to change; pass at least one of --category, --location, --description, --priority");
    }
    let body: IssueBody = ctx.client()?.patch(&format!("/issues/{}", id), &patch)?;
    print_updated(ctx, &body.issue, "Updated")
}

pub fn delete(ctx: &Context, id: &str) -> Result<()> {
    let _: Value = ctx.client()?.delete(&format!("/issues/{}", id))?;
    if ctx.json {
        print_json(&json!({ "deleted": id }))
    } else {
        println!("{} Deleted {}", "✓".green(), id.cyan());
        Ok(())
    }
}

pub fn status(ctx: &Context, id: &str, status: &str, comment: Option<String>) -> Result<()> {
    let body: IssueBody = ctx.client()?.post(
        &format!("/issues/{}/status", id),
        &json!({ "status": status, "comment": comment }),
    )?;
    print_updated(ctx, &body.issue, "Changed status of")
}

pub fn assign(ctx: &Context, id: &str, user_id: &str, comment: Option<String>) -> Result<()> {
    let body: IssueBody = ctx.client()?.post(
        &format!("/issues/{}/assign", id),
        &json!({ "assignedTo": user_id, "comment": comment }),
    )?;
    print_updated(ctx, &body.issue, "Assigned")
}

pub fn comment(ctx: &Context, id: &str, content: &str) -> Result<()> {
    let body: IssueBody = ctx.client()?.post(
        &format!("/issues/{}/comments", id),
        &json!({ "content": content }),
    )?;
    print_updated(ctx, &body.issue, "Commented on")
}

pub fn stats(ctx: &Context) -> Result<()> {
    let stats: AdminStats = ctx.client()?.get("/issues/stats")?;
    if ctx.json {
        return print_json(&stats);
    }

    let o = stats.overview;
    println!("{}", "Overview".bold());
    println!("  Total:       {}", o.total);
    println!("  Pending:     {}", o.pending.to_string().yellow());
    println!("  In progress: {}", o.in_progress.to_string().blue());
    println!("  Resolved:    {}", o.resolved.to_string().green());
    println!("  Urgent:      {}", o.urgent.to_string().red());
    println!();

    println!("{}", "By category".bold());
    print_table(
        stats
            .categories
            .iter()
            .map(|c| CountRow {
                label: c.category.label().to_string(),
                count: c.count,
            })
            .collect(),
    );

    if !stats.recent_issues.is_empty() {
        println!();
        println!("{}", "Recent issues".bold());
        print_table(stats.recent_issues.iter().map(IssueRow::from).collect());
    }
    Ok(())
}

// ----------------------------------------------------------------------
// User administration
// ----------------------------------------------------------------------

pub fn users_list(ctx: &Context, role: Option<String>) -> Result<()> {
    if let Some(ref r) = role
        && !r.eq_ignore_ascii_case("all")
    {
        r.parse::<Role>()?;
    }
    let query: Vec<(&str, &str)> = role.iter().map(|r| ("role", r.as_str())).collect();
    let listing: UserListing = ctx.client()?.get_query("/users", &query)?;
    if ctx.json {
        return print_json(&listing);
    }

    if listing.users.is_empty() {
        println!("No users found");
    } else {
        print_table(listing.users.iter().map(UserRow::from).collect());
    }
    println!(
        "{} users, {} admins",
        listing.stats.user.to_string().cyan(),
        listing.stats.admin.to_string().cyan()
    );
    Ok(())
}

pub fn users_show(ctx: &Context, id: &str) -> Result<()> {
    let body: UserBody = ctx.client()?.get(&format!("/users/{}", id))?;
    if ctx.json {
        print_json(&body.user)
    } else {
        print_user(&body.user);
        Ok(())
    }
}

pub fn users_update(ctx: &Context, id: &str, patch: ProfilePatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to change; pass at least one field to update");
    }
    let body: UserBody = ctx.client()?.patch(&format!("/users/{}", id), &patch)?;
    if ctx.json {
        print_json(&body.user)
    } else {
        println!("{} Updated {}", "✓".green(), body.user.id.cyan());
        Ok(())
    }
}

pub fn users_toggle(ctx: &Context, id: &str) -> Result<()> {
    let body: UserBody = ctx
        .client()?
        .post(&format!("/users/{}/toggle-status", id), &json!({}))?;
    if ctx.json {
        return print_json(&body.user);
    }
    let state = if body.user.is_active {
        "activated".green()
    } else {
        "deactivated".red()
    };
    println!("{} {} {}", "✓".green(), body.user.email.cyan(), state);
    Ok(())
}

pub fn users_delete(ctx: &Context, id: &str) -> Result<()> {
    let _: Value = ctx.client()?.delete(&format!("/users/{}", id))?;
    if ctx.json {
        print_json(&json!({ "deleted": id }))
    } else {
        println!("{} Deleted user {}", "✓".green(), id.cyan());
        Ok(())
    }
}

pub fn users_stats(ctx: &Context) -> Result<()> {
    let stats: UserStats = ctx.client()?.get("/users/stats")?;
    if ctx.json {
        return print_json(&stats);
    }

    println!("{}", "Users".bold());
    println!("  Total:    {}", stats.overview.total);
    println!("  Active:   {}", stats.overview.active.to_string().green());
    println!("  Inactive: {}", stats.overview.inactive.to_string().red());
    println!();

    let mut rows: Vec<CountRow> = stats
        .roles
        .iter()
        .map(|r| CountRow {
            label: r.role.to_string(),
            count: r.count,
        })
        .collect();
    rows.extend(stats.departments.iter().map(|d| CountRow {
        label: d.department.clone(),
        count: d.count,
    }));
    print_table(rows);

    if !stats.recent_users.is_empty() {
        println!();
        println!("{}", "Recently joined".bold());
        print_table(stats.recent_users.iter().map(UserRow::from).collect());
    }
    Ok(())
}

pub fn users_search(ctx: &Context, query: &str) -> Result<()> {
    let body: UsersBody = ctx.client()?.get_query("/users/search", &[("q", query)])?;
    if ctx.json {
        return print_json(&body.users);
    }
    if body.users.is_empty() {
        println!("No matching staff");
    } else {
        print_table(body.users.iter().map(UserRow::from).collect());
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------

pub fn config_show(ctx: &Context) -> Result<()> {
    if ctx.json {
        print_json(&ctx.config)
    } else {
        println!("{}", format!("# {}", ctx.config_path.display()).dimmed());
        print!("{}", toml::to_string_pretty(&ctx.config)?);
        Ok(())
    }
}

pub fn config_init(ctx: &Context, force: bool) -> Result<()> {
    if ctx.config_path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            ctx.config_path.display()
        );
    }
    if let Some(parent) = ctx.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&ctx.config_path, Config::default_with_comments())?;
    println!(
        "{} Wrote default config to {}",
        "✓".green(),
        ctx.config_path.display()
    );
    Ok(())
}

pub fn config_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_path.display());
    Ok(())
}

pub fn config_set_api(ctx: &Context, url: &str) -> Result<()> {
    let mut config = ctx.config.clone();
    config.client.api_url = url.trim_end_matches('/').to_string();
    config.save(&ctx.config_path)?;
    println!("{} API URL set to {}", "✓".green(), config.client.api_url.cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixit_core::{Category, UserRef};
    use tempfile::TempDir;

    fn issue(id: &str, priority: Priority) -> Issue {
        Issue::new(
            id.to_string(),
            NewIssue {
                category: Category::Water,
                location: "Block C".into(),
                description: "leak".into(),
                priority: Some(priority),
            },
            UserRef {
                id: "usr-1".into(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                email: "john@university.edu".into(),
            },
        )
    }

    #[test]
    fn test_issue_row_cells_are_plain() {
        colored::control::set_override(true);
        let row = IssueRow::from(&issue("fix-1", Priority::Urgent));
        colored::control::unset_override();

        assert_eq!(row.status, "pending");
        assert_eq!(row.priority, "urgent");
        let rendered = Table::new(vec![row]).to_string();
        assert!(!rendered.contains('\x1b'));
    }

    #[test]
    fn test_priority_summary() {
        let issues = vec![
            issue("fix-1", Priority::High),
            issue("fix-2", Priority::Low),
            issue("fix-3", Priority::High),
        ];
        assert_eq!(priority_summary(&issues), "1 low, 0 medium, 2 high, 0 urgent");
        assert_eq!(priority_summary(&[]), "0 low, 0 medium, 0 high, 0 urgent");
    }

    #[test]
    fn test_logout_clears_session_when_server_unreachable() {
        let dir = TempDir::new().unwrap();
        let session = SessionFile::new(dir.path().join("session"));
        session.save("fxs_abc").unwrap();
        let ctx = Context {
            config: Config::default(),
            config_path: dir.path().join("config.toml"),
            api_url: "http://127.0.0.1:1".into(),
            session,
            json: true,
        };

        logout(&ctx).unwrap();
        assert_eq!(ctx.session.load().unwrap(), None);
        assert!(!ctx.session.path().exists());
    }
}
