//! fixit-core: Core library for the fixit facility issue tracker
//!
//! Students report facility issues, admins triage them through a status
//! lifecycle. Everything lives in memory inside a [`Tracker`] owned by the
//! caller; access is scoped by the role behind each session token.

pub mod config;
pub mod error;
pub mod id;
pub mod identity;
pub mod issue;
pub mod password;
pub mod session;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod user;

pub use config::Config;
pub use error::Error;
pub use identity::{HashedRegistration, IdentityStore, LoginAttempt, RegistrationDraft};
pub use issue::{Category, Comment, Filter, Issue, IssueFilter, IssuePatch, NewIssue, Priority, Status};
pub use session::{Caller, SessionFacade};
pub use stats::{AdminStats, StatusCounts, UserStats};
pub use store::{IssueStore, Listing};
pub use tracker::{AuthSession, Tracker, UserListing};
pub use user::{ProfilePatch, Registration, Role, User, UserRef};

/// Result type for fixit operations
pub type Result<T> = std::result::Result<T, Error>;
