//! # mailgate-imap
//!
//! Client interface for the mail-retrieval protocol (IMAP).
//!
//! This crate holds the vocabulary a mailgate session speaks to a
//! retrieval server. It does not open sockets: a wire client implements
//! [`Connection`] and plugs in through the core crate's backend.
//!
//! ## Contents
//!
//! - **Types**: [`SeqNum`], [`Uid`], [`Flags`], [`Mailbox`], [`MailboxStatus`],
//!   [`Envelope`], [`BodyStructure`], sequence and UID sets
//! - **Commands**: [`FetchAttribute`], [`SearchCriteria`]
//! - **Connection**: the [`Connection`] trait and [`FetchedMessage`]
//! - **Disconnect notification**: [`DisconnectNotifier`] / [`DisconnectWatch`]
//! - **Endpoints**: [`Config`] parsed from `imaps://`, `imap://` or
//!   `imap+insecure://` URLs
//!
//! ## Quick Start
//!
//! ```
//! use mailgate_imap::{Config, Security, SequenceSet};
//!
//! let config: Config = "imaps://imap.example.com".parse()?;
//! assert_eq!(config.security, Security::Implicit);
//! assert_eq!(config.port, 993);
//!
//! let page = SequenceSet::range(26, 45).expect("non-zero bounds");
//! assert_eq!(page.to_string(), "26:45");
//! # Ok::<(), mailgate_imap::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod types;

pub use command::{FetchAttribute, SearchCriteria};
pub use connection::{
    Config, ConfigBuilder, Connection, DisconnectNotifier, DisconnectWatch, FetchedMessage,
    Security, disconnect_channel,
};
pub use error::{Error, Result};
pub use types::{
    Address, Attachment, BodyDisposition, BodyFields, BodyStructure, Envelope, Flag, Flags,
    ListResponse, Mailbox, MailboxAttribute, MailboxStatus, SeqNum, SequenceSet, Uid, UidSet,
    UidValidity,
};
