//! Command arguments: FETCH items and SEARCH criteria.

use std::fmt;

/// FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Envelope structure.
    Envelope,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier; `None` fetches the whole message.
        section: Option<String>,
        /// Peek (don't set \Seen).
        peek: bool,
    },
}

impl FetchAttribute {
    /// The whole raw message, without marking it seen.
    #[must_use]
    pub const fn full_message() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }
}

impl fmt::Display for FetchAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags => f.write_str("FLAGS"),
            Self::Envelope => f.write_str("ENVELOPE"),
            Self::BodyStructure => f.write_str("BODYSTRUCTURE"),
            Self::Uid => f.write_str("UID"),
            Self::Body { section, peek } => {
                let name = if *peek { "BODY.PEEK" } else { "BODY" };
                write!(f, "{name}[{}]", section.as_deref().unwrap_or_default())
            }
        }
    }
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages without \Seen flag.
    Unseen,
    /// Headers or body contain text.
    Text(String),
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// All criteria must match.
    And(Vec<Self>),
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Unseen => f.write_str("UNSEEN"),
            Self::Text(s) => write!(f, "TEXT {}", quote(s)),
            Self::Subject(s) => write!(f, "SUBJECT {}", quote(s)),
            Self::From(s) => write!(f, "FROM {}", quote(s)),
            Self::And(items) => {
                let parts: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(" "))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
