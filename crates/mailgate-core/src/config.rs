//! Gateway configuration.
//!
//! Loaded from JSON:
//!
//! ```json
//! {
//!   "imap": "imaps://imap.example.com",
//!   "smtp": "smtp://smtp.example.com",
//!   "messages_per_page": 50
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of messages on one listing page.
pub const DEFAULT_MESSAGES_PER_PAGE: u32 = 50;

const fn default_messages_per_page() -> u32 {
    DEFAULT_MESSAGES_PER_PAGE
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Retrieval server.
    pub imap: mailgate_imap::Config,
    /// Submission server. Sending is disabled without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<mailgate_smtp::Config>,
    /// Messages per listing page.
    #[serde(default = "default_messages_per_page")]
    pub messages_per_page: u32,
}

impl Config {
    /// Creates a configuration for a retrieval server, without sending.
    #[must_use]
    pub const fn new(imap: mailgate_imap::Config) -> Self {
        Self {
            imap,
            smtp: None,
            messages_per_page: DEFAULT_MESSAGES_PER_PAGE,
        }
    }

    /// Sets the submission server.
    #[must_use]
    pub fn with_smtp(mut self, smtp: mailgate_smtp::Config) -> Self {
        self.smtp = Some(smtp);
        self
    }

    /// Sets the listing page size.
    #[must_use]
    pub const fn with_messages_per_page(mut self, messages_per_page: u32) -> Self {
        self.messages_per_page = messages_per_page;
        self
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed, an endpoint URL
    /// is invalid, or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&contents)?;
        tracing::info!(imap = %config.imap, "Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `messages_per_page` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.messages_per_page == 0 {
            return Err(Error::Config(
                "messages_per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
