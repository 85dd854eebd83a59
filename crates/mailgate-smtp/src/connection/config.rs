//! Submission endpoint configuration.
//!
//! Endpoints are URLs: `smtps://host` (implicit TLS, port 465),
//! `smtp://host` (STARTTLS, port 587) or `smtp+insecure://host`
//! (plaintext, port 587).

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext. Only for local relays and tests.
    None,
    /// Plaintext greeting upgraded with STARTTLS.
    #[default]
    StartTls,
    /// TLS from the first byte.
    Implicit,
}

impl Security {
    /// Returns the default submission port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 587,
            Self::Implicit => 465,
        }
    }

    /// URL scheme for this security mode.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::None => "smtp+insecure",
            Self::StartTls => "smtp",
            Self::Implicit => "smtps",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "smtp+insecure" => Some(Self::None),
            "smtp" => Some(Self::StartTls),
            "smtps" => Some(Self::Implicit),
            _ => None,
        }
    }
}

/// SMTP connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Connection timeout.
    pub connect_timeout: Duration,
}

impl Config {
    /// Creates a STARTTLS configuration on the submission port.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_security(host, Security::default())
    }

    /// Creates a configuration on the default port for `security`.
    #[must_use]
    pub fn with_security(host: impl Into<String>, security: Security) -> Self {
        Self {
            host: host.into(),
            port: security.default_port(),
            security,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Parses an endpoint URL such as `smtps://smtp.example.com`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] for unparseable URLs, unknown
    /// schemes, missing hosts, or URLs carrying credentials or a path.
    pub fn from_url(input: &str) -> Result<Self> {
        let url = url::Url::parse(input)
            .map_err(|e| Error::InvalidEndpoint(format!("{input:?}: {e}")))?;

        let security = Security::from_scheme(url.scheme()).ok_or_else(|| {
            Error::InvalidEndpoint(format!("{input:?}: unsupported scheme {:?}", url.scheme()))
        })?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidEndpoint(format!("{input:?}: missing host")))?;
        if !url.username().is_empty() || url.password().is_some() {
            return Err(Error::InvalidEndpoint(format!(
                "{input:?}: credentials do not belong in the endpoint"
            )));
        }
        if !matches!(url.path(), "" | "/") {
            return Err(Error::InvalidEndpoint(format!("{input:?}: unexpected path")));
        }

        let mut config = Self::with_security(host, security);
        if let Some(port) = url.port() {
            config.port = port;
        }
        Ok(config)
    }
}

impl fmt::Display for Config {
    /// Renders the endpoint URL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.security.scheme(), self.host, self.port)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_url(s)
    }
}

impl TryFrom<String> for Config {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::from_url(&s)
    }
}

impl From<Config> for String {
    fn from(config: Config) -> Self {
        config.to_string()
    }
}
