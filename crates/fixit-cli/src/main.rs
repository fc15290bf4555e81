//! fixit - report and triage campus facility issues
//!
//! Thin client for fixit-api. The session token from `login` is kept in
//! $XDG_STATE_HOME/fixit/session.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fixit_core::{Config, IssuePatch, NewIssue, ProfilePatch, Registration};

mod client;
mod commands;
mod session;

use commands::Context;
use session::SessionFile;

#[derive(Parser)]
#[command(name = "fixit")]
#[command(about = "Report and triage campus facility issues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(long, global = true, env = "FIXIT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of fixit-api (overrides client.api_url)
    #[arg(long, global = true, env = "FIXIT_API_URL")]
    api: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        department: String,

        #[arg(long)]
        student_id: Option<String>,

        #[arg(long, env = "FIXIT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and save the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "FIXIT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the saved session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show or update your profile
    Profile {
        #[command(flatten)]
        fields: ProfileArgs,
    },

    /// Change your password
    Passwd {
        #[arg(long)]
        current: String,

        #[arg(long)]
        new: String,
    },

    /// Report a new issue
    Create {
        /// Category (electricity, wifi, water, cleanliness, other)
        category: String,

        /// Where the problem is
        #[arg(short, long)]
        location: String,

        /// What is wrong
        #[arg(short, long)]
        description: String,

        /// Priority (low, medium, high, urgent)
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// List issues visible to you
    List {
        /// Filter by status (pending, in-progress, resolved, cancelled, all)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by priority
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Show issue details
    Show {
        /// Issue ID
        id: String,
    },

    /// Edit one of your issues
    Edit {
        /// Issue ID
        id: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Delete an issue
    Delete {
        /// Issue ID
        id: String,
    },

    /// Change an issue's status (admin)
    Status {
        /// Issue ID
        id: String,

        /// New status (pending, in-progress, resolved, cancelled)
        status: String,

        /// Note added to the issue
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Assign an issue to a user (admin)
    Assign {
        /// Issue ID
        id: String,

        /// User ID of the assignee
        user: String,

        /// Note added to the issue
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Comment on an issue
    Comment {
        /// Issue ID
        id: String,

        /// Comment text
        content: String,
    },

    /// Show issue statistics (admin)
    Stats,

    /// Manage users (admin)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args)]
struct ProfileArgs {
    #[arg(long)]
    first_name: Option<String>,

    #[arg(long)]
    last_name: Option<String>,

    #[arg(long)]
    department: Option<String>,

    /// Student ID; pass an empty string to clear it
    #[arg(long)]
    student_id: Option<String>,
}

impl From<ProfileArgs> for ProfilePatch {
    fn from(args: ProfileArgs) -> Self {
        ProfilePatch {
            first_name: args.first_name,
            last_name: args.last_name,
            department: args.department,
            student_id: args.student_id,
        }
    }
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List {
        /// Filter by role (user, admin, all)
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Show a user
    Show {
        /// User ID
        id: String,
    },

    /// Update a user's profile fields
    Update {
        /// User ID
        id: String,

        #[command(flatten)]
        fields: ProfileArgs,
    },

    /// Activate or deactivate a user
    Toggle {
        /// User ID
        id: String,
    },

    /// Delete a user
    Delete {
        /// User ID
        id: String,
    },

    /// Show user statistics
    Stats,

    /// Search active staff by name or email
    Search {
        query: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
    /// Set the API URL used by the CLI
    SetApi {
        url: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;
    let api_url = cli.api.unwrap_or_else(|| config.client.api_url.clone());
    let ctx = Context {
        config,
        config_path,
        api_url,
        session: SessionFile::default_location()?,
        json: cli.json,
    };

    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            department,
            student_id,
            password,
        } => commands::register(
            &ctx,
            Registration {
                first_name,
                last_name,
                email,
                department,
                student_id,
                password,
            },
        ),
        Commands::Login { email, password } => commands::login(&ctx, &email, &password),
        Commands::Logout => commands::logout(&ctx),
        Commands::Whoami => commands::whoami(&ctx),
        Commands::Profile { fields } => commands::profile(&ctx, fields.into()),
        Commands::Passwd { current, new } => commands::passwd(&ctx, &current, &new),
        Commands::Create {
            category,
            location,
            description,
            priority,
        } => commands::create(
            &ctx,
            NewIssue {
                category: category.parse()?,
                location,
                description,
                priority: priority.map(|p| p.parse()).transpose()?,
            },
        ),
        Commands::List {
            status,
            category,
            priority,
        } => commands::list(&ctx, status, category, priority),
        Commands::Show { id } => commands::show(&ctx, &id),
        Commands::Edit {
            id,
            category,
            location,
            description,
            priority,
        } => commands::edit(
            &ctx,
            &id,
            IssuePatch {
                category: category.map(|c| c.parse()).transpose()?,
                location,
                description,
                priority: priority.map(|p| p.parse()).transpose()?,
            },
        ),
        Commands::Delete { id } => commands::delete(&ctx, &id),
        Commands::Status {
            id,
            status,
            comment,
        } => commands::status(&ctx, &id, &status, comment),
        Commands::Assign { id, user, comment } => commands::assign(&ctx, &id, &user, comment),
        Commands::Comment { id, content } => commands::comment(&ctx, &id, &content),
        Commands::Stats => commands::stats(&ctx),
        Commands::Users { command } => match command {
            UserCommands::List { role } => commands::users_list(&ctx, role),
            UserCommands::Show { id } => commands::users_show(&ctx, &id),
            UserCommands::Update { id, fields } => commands::users_update(&ctx, &id, fields.into()),
            UserCommands::Toggle { id } => commands::users_toggle(&ctx, &id),
            UserCommands::Delete { id } => commands::users_delete(&ctx, &id),
            UserCommands::Stats => commands::users_stats(&ctx),
            UserCommands::Search { query } => commands::users_search(&ctx, &query),
        },
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config_show(&ctx),
            Some(ConfigCommands::Init { force }) => commands::config_init(&ctx, force),
            Some(ConfigCommands::Path) => commands::config_path(&ctx),
            Some(ConfigCommands::SetApi { url }) => commands::config_set_api(&ctx, &url),
        },
    }
}
