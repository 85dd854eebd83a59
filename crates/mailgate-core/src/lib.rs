//! # mailgate-core
//!
//! Session management and mailbox logic for a webmail gateway.
//!
//! A web front end hands each logged-in user an opaque [`Token`]. Behind
//! it sits a [`Session`]: one authenticated retrieval connection, used by
//! one request at a time. The [`SessionManager`] owns the token registry,
//! and drops a session by itself when its connection closes.
//!
//! This crate provides:
//! - **Sessions**: login, token lookup, logout, disconnect cleanup
//! - **Mailbox queries**: mailbox listing, paged message listing, search,
//!   part retrieval by [`PartPath`](mailgate_mime::PartPath)
//! - **Composition**: reply quoting, reply drafts, submission
//! - **Configuration**: JSON [`Config`] with endpoint URLs
//!
//! Protocol wire clients are supplied through a [`Backend`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgate_core::{Config, SessionManager};
//!
//! let config = Config::load("mailgate.json")?;
//! let manager = SessionManager::new(MyBackend::default(), config);
//!
//! let token = manager.login("alice@example.com", "secret").await?;
//! let session = manager.resolve(&token)?;
//! let page = session.list_messages("INBOX", 0).await?;
//! for message in &page.messages {
//!     println!("{} {}", message.seq_num, message.envelope.subject());
//! }
//! manager.logout(&token).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod backend;
pub mod compose;
mod config;
mod error;
pub mod mailbox;
mod manager;
mod session;
mod token;

pub use backend::Backend;
pub use compose::{
    OutgoingMessage, default_from, parse_address_list, quote_for_reply, send_message,
};
pub use config::{Config, DEFAULT_MESSAGES_PER_PAGE};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use mailbox::{
    MessagePage, MessageSummary, ensure_selected, get_message_part, list_mailboxes,
    list_messages, search_messages,
};
pub use manager::SessionManager;
pub use session::{ConnFuture, Session};
pub use token::{TOKEN_BYTES, Token};
