//! Configuration for fixit
//!
//! Stored in $XDG_CONFIG_HOME/fixit/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::user::Registration;

const CONFIG_DIR: &str = "fixit";
const CONFIG_FILE: &str = "config.toml";

/// fixit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Issue ID prefix (e.g., "fix")
    pub issue_prefix: String,

    /// User ID prefix (e.g., "usr")
    pub user_prefix: String,

    /// Number of issues listed under "recent" in admin stats
    pub recent_issues_limit: usize,

    /// Load the demo accounts and issues at startup
    pub seed_demo_data: bool,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Bootstrap admin created at startup when no admin exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminBootstrap>,

    /// CLI client settings
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issue_prefix: "fix".to_string(),
            user_prefix: "usr".to_string(),
            recent_issues_limit: 5,
            seed_demo_data: false,
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            admin: None,
            client: ClientConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3847,
        }
    }
}

/// Credential configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum password length for registration and password changes
    pub min_password_length: usize,

    /// Optional pepper prepended to passwords before Argon2id hashing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pepper: Option<String>,

    /// Password given to the demo accounts
    pub demo_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            pepper: None,
            demo_password: "password123".to_string(),
        }
    }
}

/// Bootstrap admin account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_first_name")]
    pub first_name: String,
    #[serde(default = "default_admin_last_name")]
    pub last_name: String,
    #[serde(default = "default_admin_department")]
    pub department: String,
}

fn default_admin_first_name() -> String {
    "Admin".to_string()
}

fn default_admin_last_name() -> String {
    "User".to_string()
}

fn default_admin_department() -> String {
    "Administration".to_string()
}

impl AdminBootstrap {
    pub fn registration(&self) -> Registration {
        Registration {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            department: self.department.clone(),
            student_id: None,
            password: self.password.clone(),
        }
    }
}

/// CLI client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of fixit-api
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3847".to_string(),
        }
    }
}

impl Config {
    /// Default config path ($XDG_CONFIG_HOME/fixit/config.toml)
    pub fn default_path() -> crate::Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("could not determine config directory".into()))?;
        Ok(base.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load config from a TOML file, falling back to defaults if absent
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate a default config file with comments
    pub fn default_with_comments() -> String {
        r#"# fixit configuration

# Issue ID prefix (IDs look like fix-1, fix-2, ...)
issue_prefix = "fix"

# User ID prefix
user_prefix = "usr"

# Number of issues shown under "recent" in admin stats
recent_issues_limit = 5

# Load demo accounts (admin@university.edu, student@university.edu)
# and two demo issues at startup
seed_demo_data = false

[server]
host = "127.0.0.1"
port = 3847

[auth]
# Minimum password length for registration and password changes
min_password_length = 8

# Optional pepper prepended to passwords before hashing
# pepper = "change-me"

# Password given to the demo accounts
demo_password = "password123"

# Bootstrap admin created at startup when no admin exists
# [admin]
# email = "admin@university.edu"
# password = "change-me-please"
# first_name = "Admin"
# last_name = "User"
# department = "Administration"

[client]
# Base URL of fixit-api used by the fixit CLI
api_url = "http://127.0.0.1:3847"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_default_matches_default() {
        let parsed = Config::parse(&Config::default_with_comments()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = Config::parse(
            r#"
issue_prefix = "hall"

[server]
port = 9000

[admin]
email = "root@university.edu"
password = "secret-secret"
"#,
        )
        .unwrap();
        assert_eq!(parsed.issue_prefix, "hall");
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.auth.min_password_length, 8);

        let admin = parsed.admin.unwrap();
        assert_eq!(admin.first_name, "Admin");
        assert_eq!(admin.registration().department, "Administration");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            Config::parse("recent_issues_limit = \"five\""),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_default() {
        let config = Config::load(Path::new("/nonexistent/fixit/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
