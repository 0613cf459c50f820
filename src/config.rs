use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Permission;

/// SafeDocs - command line client for the SafeDocs document vault
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// SafeDocs API base URL
    #[arg(short = 'u', long, env = "SAFEDOCS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Path to the local session database
    #[arg(short = 'd', long, env = "SAFEDOCS_STATE_DB")]
    pub state_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "60")]
    pub http_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in with a Google ID token
    Login {
        /// Google ID token (prompted when omitted)
        #[arg(long)]
        id_token: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Folder operations
    #[command(subcommand)]
    Folders(FolderCommand),
    /// Document operations
    #[command(subcommand)]
    Docs(DocCommand),
    /// Folder sharing
    #[command(subcommand)]
    Shares(ShareCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum FolderCommand {
    /// List child folders (root when no parent given)
    List {
        #[arg(long)]
        parent: Option<String>,
    },
    /// Create a folder
    Create {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Print the folder tree
    Tree {
        /// Maximum depth to expand
        #[arg(long, default_value = "3")]
        depth: usize,
    },
    /// Show the caller's rights on a folder
    Access { folder_id: String },
    /// List documents in a folder
    Docs { folder_id: String },
    /// List folders shared with the caller
    Shared,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DocCommand {
    /// Show a document
    Get { id: String },
    /// Create a document record
    Create {
        title: String,
        #[arg(long)]
        folder: Option<String>,
        /// Expiry as RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<String>,
        /// Tags as key=value, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// File to upload right after creation
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Search by text and tags
    Search(SearchArgs),
    /// Documents expiring soon
    Expiring,
    /// Upload the file content of a document
    Upload {
        id: String,
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// List versions of a document
    Versions { id: String },
    /// Upload a new version
    AddVersion {
        id: String,
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
    /// Revert to an older version
    Revert { id: String, version: u32 },
    /// Download the current file
    Download {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Documents shared with the caller
    Shared,
    /// Save the inline rendition of a document
    View {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the inline viewer URL
    ViewUrl { id: String },
    /// Print the thumbnail URL
    ThumbnailUrl {
        id: String,
        #[arg(long, default_value = "320")]
        width: u32,
        #[arg(long, default_value = "200")]
        height: u32,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SearchArgs {
    /// Free text query
    #[arg(short, long)]
    pub query: Option<String>,
    #[arg(long)]
    pub tag_key: Option<String>,
    #[arg(long)]
    pub tag_value: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShareCommand {
    /// List shares of a folder
    List { folder_id: String },
    /// Share a folder with a user by email
    Add {
        folder_id: String,
        email: String,
        #[arg(long, default_value = "READ")]
        permission: Permission,
    },
    /// Revoke a share by target user id
    Revoke { folder_id: String, user_id: String },
    /// Revoke a share by target email
    RevokeEmail { folder_id: String, email: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_url: String,

    // Session persistence
    pub state_db: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Self::from_args(args)
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<(Self, Command)> {
        let state_db = match args.state_db {
            Some(path) => expand_tilde(&path),
            None => default_state_db()
                .context("cannot determine a data directory; set SAFEDOCS_STATE_DB")?,
        };

        let config = Config {
            api_url: args.api_url.trim_end_matches('/').to_string(),
            state_db,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,
            log_level: args.log_level,
            log_json: args.log_json,
        };

        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            anyhow::bail!(
                "SAFEDOCS_API_URL must be an http(s) URL: {}",
                self.api_url
            );
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        Ok(())
    }
}

/// Default session database under the platform data directory
fn default_state_db() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("safedocs").join("state.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a `key=value` tag argument
pub fn parse_tag(s: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = s
        .split_once('=')
        .with_context(|| format!("tag must be key=value: {}", s))?;

    if key.is_empty() {
        anyhow::bail!("tag key cannot be empty: {}", s);
    }

    Ok((key.to_string(), serde_json::Value::String(value.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_explicit_flags() {
        let args = parse(&[
            "safedocs",
            "--api-url",
            "https://vault.example.com/",
            "--state-db",
            "/tmp/state.sqlite3",
            "--http-timeout",
            "5",
            "whoami",
        ]);
        let (config, command) = Config::from_args(args).unwrap();

        assert_eq!(config.api_url, "https://vault.example.com");
        assert_eq!(config.state_db, PathBuf::from("/tmp/state.sqlite3"));
        assert_eq!(config.http_request_timeout, 5);
        assert_eq!(command, Command::Whoami);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let args = parse(&[
            "safedocs",
            "--api-url",
            "ftp://vault",
            "--state-db",
            "/tmp/s.db",
            "logout",
        ]);
        let (config, _) = Config::from_args(args).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_subcommands() {
        let args = parse(&[
            "safedocs",
            "--state-db",
            "/tmp/s.db",
            "shares",
            "add",
            "f1",
            "bob@example.com",
            "--permission",
            "write",
        ]);
        assert_eq!(
            args.command,
            Command::Shares(ShareCommand::Add {
                folder_id: "f1".to_string(),
                email: "bob@example.com".to_string(),
                permission: Permission::Write,
            })
        );

        let args = parse(&["safedocs", "docs", "search", "-q", "lease", "--tag-key", "kind"]);
        assert_eq!(
            args.command,
            Command::Docs(DocCommand::Search(SearchArgs {
                query: Some("lease".to_string()),
                tag_key: Some("kind".to_string()),
                tag_value: None,
            }))
        );
    }

    #[test]
    fn test_docs_view_requires_output() {
        let args = parse(&["safedocs", "docs", "view", "d1", "-o", "/tmp/d1.pdf"]);
        assert_eq!(
            args.command,
            Command::Docs(DocCommand::View {
                id: "d1".to_string(),
                output: PathBuf::from("/tmp/d1.pdf"),
            })
        );

        assert!(CliArgs::try_parse_from(["safedocs", "docs", "view", "d1"]).is_err());
    }

    #[test]
    fn test_login_without_token() {
        let args = parse(&["safedocs", "login"]);
        assert_eq!(args.command, Command::Login { id_token: None });
    }

    #[test]
    fn test_parse_tag() {
        let (key, value) = parse_tag("year=2024").unwrap();
        assert_eq!(key, "year");
        assert_eq!(value, serde_json::json!("2024"));

        let (_, value) = parse_tag("note=a=b").unwrap();
        assert_eq!(value, serde_json::json!("a=b"));

        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
    }
}
