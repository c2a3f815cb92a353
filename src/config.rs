//! Configuration types for repo-crawler

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Target language. Selects the source-file extension filter, the
/// deny list of excluded repositories, and the default search URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `.java` sources
    Java,
    /// `.go` sources
    Go,
    /// `.py` sources
    Python,
}

impl Language {
    /// Extension suffix retained during archive extraction
    #[must_use]
    pub fn source_suffix(&self) -> &'static str {
        match self {
            Language::Java => ".java",
            Language::Go => ".go",
            Language::Python => ".py",
        }
    }

    /// Lowercase name used in search URLs and config keys
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Go => "go",
            Language::Python => "python",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "java" => Ok(Language::Java),
            "go" => Ok(Language::Go),
            "python" => Ok(Language::Python),
            other => Err(format!(
                "unknown language '{other}' (expected java, go or python)"
            )),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch behavior: retry delays and budgets, politeness pause
///
/// Nested sub-config within [`Config`], flattened for serialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Delay between attempts when a listing page returns a non-success
    /// status (default: 10s). Listing fetches retry without a ceiling.
    #[serde(default = "default_listing_retry_delay")]
    pub listing_retry_delay: Duration,

    /// Delay between bounded-retry attempts for landing pages and
    /// archives (default: 5s)
    #[serde(default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Pause after every successful archive fetch, bounding outbound
    /// request rate independent of concurrency (default: 1.5s)
    #[serde(default = "default_politeness_delay")]
    pub politeness_delay: Duration,

    /// Retry budget for resolving a landing page (default: 3)
    #[serde(default = "default_resolve_retries")]
    pub resolve_retries: u32,

    /// Retry budget for downloading an archive (default: 4)
    #[serde(default = "default_download_retries")]
    pub download_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            listing_retry_delay: default_listing_retry_delay(),
            retry_delay: default_retry_delay(),
            politeness_delay: default_politeness_delay(),
            resolve_retries: default_resolve_retries(),
            download_retries: default_download_retries(),
        }
    }
}

/// Main configuration for [`crate::RepoCrawler`]
///
/// Constructed once and handed to the crawler; there are no process-wide
/// mutable knobs. All delays and capacities that were constants in earlier
/// incarnations of this tool live here so tests and embedders can compress
/// them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Target language (default: java)
    #[serde(default = "default_language")]
    pub language: Language,

    /// Root directory for completion markers and lock/staging directories
    /// (default: "./corpus")
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Base URL repository references are resolved against
    /// (default: "https://github.com/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// First listing page URL. When absent, derived from the language.
    #[serde(default)]
    pub start_url: Option<String>,

    /// Maximum concurrent archive downloads (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Retry and politeness behavior
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// How long to wait for one listing page's pipelines to settle before
    /// moving on (default: 15 minutes)
    #[serde(default = "default_page_timeout")]
    pub page_timeout: Duration,

    /// Grace period for outstanding pipelines to unwind after a shutdown
    /// request (default: 5s)
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: Duration,

    /// Repository references excluded from crawling, keyed by language
    #[serde(default = "default_deny_lists")]
    pub deny_lists: HashMap<Language, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            root_dir: default_root_dir(),
            base_url: default_base_url(),
            start_url: None,
            max_concurrent_downloads: default_max_concurrent(),
            fetch: FetchConfig::default(),
            page_timeout: default_page_timeout(),
            shutdown_grace: default_shutdown_grace(),
            deny_lists: default_deny_lists(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Deny list for the configured language (empty if none configured)
    #[must_use]
    pub fn deny_list(&self) -> &[String] {
        self.deny_lists
            .get(&self.language)
            .map_or(&[], Vec::as_slice)
    }

    /// Base URL repository references are resolved against
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// First listing page URL, derived from the language when not set
    pub fn start_url(&self) -> Result<Url> {
        match &self.start_url {
            Some(raw) => Ok(Url::parse(raw)?),
            None => {
                let raw = format!(
                    "https://github.com/search?langOverride=&q=language%3A{}&repo=&start_value=1&type=Repositories",
                    self.language.as_str()
                );
                Ok(Url::parse(&raw)?)
            }
        }
    }

    /// Reject configurations the crawler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        self.base_url()?;
        self.start_url()?;
        Ok(())
    }
}

fn default_language() -> Language {
    Language::Java
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./corpus")
}

fn default_base_url() -> String {
    "https://github.com/".to_string()
}

fn default_max_concurrent() -> usize {
    5
}

fn default_listing_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_politeness_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_resolve_retries() -> u32 {
    3
}

fn default_download_retries() -> u32 {
    4
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(900)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_deny_lists() -> HashMap<Language, Vec<String>> {
    let mut lists = HashMap::new();
    lists.insert(
        Language::Python,
        vec![
            "/ansible/ansible".to_string(),
            "/bitcoinbook/bitcoinbook".to_string(),
            "/nltk/nltk".to_string(),
        ],
    );
    lists
}
