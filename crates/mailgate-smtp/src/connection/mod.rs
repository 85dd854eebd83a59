//! The submission connection interface.

mod config;

pub use config::{Config, Security};

use crate::Result;
use crate::address::Address;
use std::future::Future;

/// An open connection to a submission server, past the greeting and EHLO.
///
/// Methods map one-to-one onto SMTP commands. A message is submitted with
/// `mail_from`, one `rcpt_to` per recipient, then `data`.
pub trait Connection: Send + 'static {
    /// Authenticates with AUTH PLAIN.
    ///
    /// Rejected credentials must surface as [`Error::Auth`](crate::Error::Auth).
    fn auth_plain(
        &mut self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Starts a transaction with MAIL FROM.
    fn mail_from(&mut self, from: &Address) -> impl Future<Output = Result<()>> + Send;

    /// Adds a recipient with RCPT TO.
    fn rcpt_to(&mut self, to: &Address) -> impl Future<Output = Result<()>> + Send;

    /// Sends the message content with DATA. `message` uses CRLF line
    /// endings and is not yet dot-stuffed.
    fn data(&mut self, message: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Sends QUIT and closes the connection.
    fn quit(&mut self) -> impl Future<Output = Result<()>> + Send;
}
