//! Configuration management for Tacit
//!
//! This module provides the agent configuration: remote service endpoints,
//! page selectors, polling cadence, and browser attachment settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{Result, TacitError, UserAction};

/// Agent configuration
///
/// Loaded from `.tacit/config.toml` in the working directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TacitConfig {
    /// Remote service endpoints
    #[serde(default)]
    pub endpoints: Endpoints,

    /// CSS selectors for the watched page
    #[serde(default)]
    pub page: PageSelectors,

    /// Polling and retry cadence
    #[serde(default)]
    pub timing: Timing,

    /// Browser attachment
    #[serde(default)]
    pub browser: BrowserSettings,
}

/// Remote service endpoints (full URLs)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_predict")]
    pub predict: String,

    #[serde(default = "default_feedback")]
    pub feedback: String,

    #[serde(default = "default_capture")]
    pub capture: String,
}

/// CSS selectors used to read the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// Container whose subtree is observed
    #[serde(default = "default_container")]
    pub container: String,

    /// Subject heading; its presence marks the detail view
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Sender element in the detail view
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Attribute of the sender element holding the address
    #[serde(default = "default_sender_attribute")]
    pub sender_attribute: String,

    /// Row element in the list view
    #[serde(default = "default_list_row")]
    pub list_row: String,

    /// Subject element inside a list row
    #[serde(default = "default_list_subject")]
    pub list_subject: String,

    /// Buttons whose clicks are captured, keyed by action
    #[serde(default = "default_actions")]
    pub actions: BTreeMap<UserAction, String>,
}

/// Polling and retry cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timing {
    /// Fixed delay between container lookups
    #[serde(default = "default_container_retry_ms")]
    pub container_retry_ms: u64,

    /// How often the page is polled for notifications and clicks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Browser attachment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Connect to an existing browser on this CDP port instead of launching one
    #[serde(default)]
    pub debug_port: Option<u16>,

    /// Launch headless (ignored when connecting)
    #[serde(default)]
    pub headless: bool,

    /// Page to open after attaching
    #[serde(default = "default_start_url")]
    pub start_url: String,
}

// Default value providers
fn default_predict() -> String {
    "http://127.0.0.1:8000/predict".to_string()
}

fn default_feedback() -> String {
    "http://127.0.0.1:8000/feedback".to_string()
}

fn default_capture() -> String {
    "http://127.0.0.1:8000/capture".to_string()
}

fn default_container() -> String {
    r#"[role="main"]"#.to_string()
}

fn default_subject() -> String {
    "h2.hP".to_string()
}

fn default_sender() -> String {
    "span.gD[email]".to_string()
}

fn default_sender_attribute() -> String {
    "email".to_string()
}

fn default_list_row() -> String {
    "tr.zA".to_string()
}

fn default_list_subject() -> String {
    "span.bog".to_string()
}

fn default_actions() -> BTreeMap<UserAction, String> {
    BTreeMap::from([
        (UserAction::Delete, r#"[aria-label="Delete"]"#.to_string()),
        (UserAction::Archive, r#"[aria-label="Archive"]"#.to_string()),
        (UserAction::ReportSpam, r#"[aria-label="Report spam"]"#.to_string()),
    ])
}

fn default_container_retry_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_start_url() -> String {
    "https://mail.google.com/".to_string()
}

impl TacitConfig {
    /// Load configuration from `.tacit/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".tacit/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| TacitError::Config(format!("Failed to parse config file: {}", e)))?;
            config.timing.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.tacit/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".tacit");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| TacitError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Timing {
    /// Reject zero periods; a zero poll interval cannot drive a timer
    pub fn validate(&self) -> Result<()> {
        if self.container_retry_ms == 0 {
            return Err(TacitError::Config(
                "timing.container_retry_ms must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(TacitError::Config(
                "timing.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay between container lookups, never shorter than 1 ms
    pub fn container_retry(&self) -> Duration {
        Duration::from_millis(self.container_retry_ms.max(1))
    }

    /// Page poll period, never shorter than 1 ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            predict: default_predict(),
            feedback: default_feedback(),
            capture: default_capture(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at a different service base URL
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            predict: format!("{}/predict", base),
            feedback: format!("{}/feedback", base),
            capture: format!("{}/capture", base),
        }
    }
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            container: default_container(),
            subject: default_subject(),
            sender: default_sender(),
            sender_attribute: default_sender_attribute(),
            list_row: default_list_row(),
            list_subject: default_list_subject(),
            actions: default_actions(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            container_retry_ms: default_container_retry_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            debug_port: None,
            headless: false,
            start_url: default_start_url(),
        }
    }
}
