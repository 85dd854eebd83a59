//! Message envelopes.

use std::fmt;

/// Message envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// Date header.
    pub date: Option<String>,
    /// Subject header.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header.
    pub message_id: Option<String>,
}

impl Envelope {
    /// Subject, or the empty string when absent.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or_default()
    }

    /// Addresses a reply should go to: Reply-To, else From.
    #[must_use]
    pub fn reply_recipients(&self) -> &[Address] {
        if self.reply_to.is_empty() {
            &self.from
        } else {
            &self.reply_to
        }
    }
}

/// Email address from envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route (obsolete).
    pub adl: Option<String>,
    /// Mailbox name (local part).
    pub mailbox: Option<String>,
    /// Host name (domain part).
    pub host: Option<String>,
}

impl Address {
    /// Creates an address from a display name and `local@host`.
    #[must_use]
    pub fn new(name: Option<&str>, email: &str) -> Self {
        let (mailbox, host) = email
            .rsplit_once('@')
            .map_or((Some(email.to_string()), None), |(m, h)| {
                (Some(m.to_string()), Some(h.to_string()))
            });
        Self {
            name: name.map(str::to_string),
            adl: None,
            mailbox,
            host,
        }
    }

    /// Returns the full email address.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    /// `Name <local@host>`, or the bare address without a name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let email = self.email().unwrap_or_default();
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => write!(f, "{name} <{email}>"),
            _ => f.write_str(&email),
        }
    }
}
