// src/config.rs
use crate::constants::{
    DEFAULT_CHECKPOINT_FILE, DEFAULT_CONFIG_FILE, DEFAULT_PAGE_SIZE, DEFAULT_RETRY_WAIT_SECS,
    FREE_TIER_REQUEST_INTERVAL_SECS, X_API_BASE_URL,
};
use crate::error::AppError;
use crate::types::{ApiBaseUrl, Credentials, PageSize, Secret};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// JSON file holding API_KEY, API_KEY_SECRET, ACCESS_TOKEN and ACCESS_TOKEN_SECRET
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// File where progress is saved between runs
    #[arg(long, default_value = DEFAULT_CHECKPOINT_FILE)]
    pub checkpoint: PathBuf,

    /// Blocked users requested per list call (1-1000)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u16,

    /// Minimum seconds between paced API requests (free tier: 900)
    #[arg(long, default_value_t = FREE_TIER_REQUEST_INTERVAL_SECS)]
    pub request_interval: u64,

    /// Seconds to wait before retrying after a non-rate-limit error
    #[arg(long, default_value_t = DEFAULT_RETRY_WAIT_SECS)]
    pub retry_wait: u64,

    /// Stop after this many successful unblocks
    #[arg(long)]
    pub max_unblocks: Option<u64>,

    /// List who would be unblocked without unblocking or saving progress
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Print saved progress and exit without contacting the API
    #[arg(long, default_value_t = false)]
    pub status: bool,

    /// Base URL of the X API v2
    #[arg(long, default_value = X_API_BASE_URL)]
    pub api_base_url: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// On-disk credentials file, keyed the way the X developer portal labels them.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsFile {
    #[serde(rename = "API_KEY")]
    pub api_key: Option<String>,
    #[serde(rename = "API_KEY_SECRET")]
    pub api_key_secret: Option<String>,
    #[serde(rename = "ACCESS_TOKEN")]
    pub access_token: Option<String>,
    #[serde(rename = "ACCESS_TOKEN_SECRET")]
    pub access_token_secret: Option<String>,
}

/// Environment variables that override the credentials file, field by field.
pub const CREDENTIAL_ENV_VARS: [(&str, &str); 4] = [
    ("API_KEY", "X_API_KEY"),
    ("API_KEY_SECRET", "X_API_KEY_SECRET"),
    ("ACCESS_TOKEN", "X_ACCESS_TOKEN"),
    ("ACCESS_TOKEN_SECRET", "X_ACCESS_TOKEN_SECRET"),
];

impl CredentialsFile {
    /// Reads the file; a missing or unreadable file yields an empty set.
    pub fn read(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(file) => file,
                Err(e) => {
                    log::warn!("Could not parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::debug!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (field, var) in CREDENTIAL_ENV_VARS {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                match field {
                    "API_KEY" => self.api_key = Some(value),
                    "API_KEY_SECRET" => self.api_key_secret = Some(value),
                    "ACCESS_TOKEN" => self.access_token = Some(value),
                    _ => self.access_token_secret = Some(value),
                }
            }
        }
        self
    }

    /// Validates that all four values are present.
    pub fn into_credentials(self, source: &Path) -> Result<Credentials, AppError> {
        let mut missing = Vec::new();
        let mut take = |field: &'static str, value: Option<String>| match value
            .map(|v| Secret::new(field, v))
        {
            Some(Ok(secret)) => Some(secret),
            _ => {
                missing.push(field);
                None
            }
        };

        let consumer_key = take("API_KEY", self.api_key);
        let consumer_secret = take("API_KEY_SECRET", self.api_key_secret);
        let access_token = take("ACCESS_TOKEN", self.access_token);
        let access_token_secret = take("ACCESS_TOKEN_SECRET", self.access_token_secret);

        match (consumer_key, consumer_secret, access_token, access_token_secret) {
            (Some(consumer_key), Some(consumer_secret), Some(access_token), Some(access_token_secret)) => {
                Ok(Credentials {
                    consumer_key,
                    consumer_secret,
                    access_token,
                    access_token_secret,
                })
            }
            _ => Err(AppError::MissingConfiguration(format!(
                "{} not set. Copy config.example.json to {} and add your API credentials, \
                 or set the X_* environment variables",
                missing.join(", "),
                source.display()
            ))),
        }
    }
}

/// Resolved job configuration, validated and ready to drive a run.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub credentials: Credentials,
    pub checkpoint_path: PathBuf,
    pub page_size: PageSize,
    pub request_interval: Duration,
    pub retry_wait: Duration,
    pub max_unblocks: Option<u64>,
    pub dry_run: bool,
    pub api_base_url: ApiBaseUrl,
    pub verbose: bool,
}

impl JobConfig {
    /// Resolves a complete job configuration from CLI input, the credentials
    /// file and the environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let file = CredentialsFile::read(&cli.config).with_overrides(|var| std::env::var(var).ok());
        Self::from_parts(cli, file)
    }

    /// Resolves against an already-loaded credentials file.
    pub fn from_parts(cli: CommandLineInput, file: CredentialsFile) -> Result<Self, AppError> {
        let credentials = file.into_credentials(&cli.config)?;
        let page_size = PageSize::new(cli.page_size)?;
        let api_base_url = ApiBaseUrl::parse(&cli.api_base_url)?;

        if cli.request_interval == 0 {
            log::warn!("Request pacing disabled (--request-interval 0); expect rate-limit responses");
        }

        Ok(JobConfig {
            credentials,
            checkpoint_path: cli.checkpoint,
            page_size,
            request_interval: Duration::from_secs(cli.request_interval),
            retry_wait: Duration::from_secs(cli.retry_wait),
            max_unblocks: cli.max_unblocks,
            dry_run: cli.dry_run,
            api_base_url,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CommandLineInput {
        let mut argv = vec!["xunblock"];
        argv.extend_from_slice(args);
        CommandLineInput::parse_from(argv)
    }

    fn full_file() -> CredentialsFile {
        serde_json::from_str(
            r#"{"API_KEY": "ck", "API_KEY_SECRET": "cs", "ACCESS_TOKEN": "at", "ACCESS_TOKEN_SECRET": "ats"}"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_follow_free_tier() {
        let config = JobConfig::from_parts(cli(&[]), full_file()).unwrap();
        assert_eq!(config.page_size.get(), 1);
        assert_eq!(config.request_interval, Duration::from_secs(900));
        assert_eq!(config.retry_wait, Duration::from_secs(900));
        assert_eq!(config.checkpoint_path, PathBuf::from("unblock_progress.json"));
        assert_eq!(config.api_base_url.as_str(), "https://api.twitter.com/2");
        assert!(!config.dry_run);
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let file: CredentialsFile =
            serde_json::from_str(r#"{"API_KEY": "ck", "ACCESS_TOKEN": "  "}"#).unwrap();
        let err = JobConfig::from_parts(cli(&[]), file).unwrap_err();
        assert!(err.is_fatal());
        let message = err.to_string();
        assert!(message.contains("API_KEY_SECRET, ACCESS_TOKEN, ACCESS_TOKEN_SECRET"));
        assert!(message.contains("config.json"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let file: CredentialsFile = serde_json::from_str(r#"{"API_KEY": "from-file"}"#).unwrap();
        let file = file.with_overrides(|var| match var {
            "X_API_KEY" => Some("from-env".to_string()),
            "X_API_KEY_SECRET" => Some("cs".to_string()),
            "X_ACCESS_TOKEN" => Some("at".to_string()),
            "X_ACCESS_TOKEN_SECRET" => Some("ats".to_string()),
            _ => None,
        });
        let credentials = file.into_credentials(Path::new("config.json")).unwrap();
        assert_eq!(credentials.consumer_key.expose(), "from-env");
    }

    #[test]
    fn unreadable_file_is_empty() {
        let file = CredentialsFile::read(Path::new("/definitely/not/here/config.json"));
        assert!(file.api_key.is_none());
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        assert!(JobConfig::from_parts(cli(&["--page-size", "0"]), full_file()).is_err());
        let config =
            JobConfig::from_parts(cli(&["--page-size", "1000", "--dry-run"]), full_file()).unwrap();
        assert_eq!(config.page_size.get(), 1000);
        assert!(config.dry_run);
    }
}
