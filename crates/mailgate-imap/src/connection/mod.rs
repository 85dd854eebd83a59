//! The retrieval connection interface.
//!
//! Wire implementations live outside this crate. Anything that can log in,
//! select, fetch and search, and can tell its owner when it has been closed,
//! can back a mailgate session.

mod config;
mod disconnect;

pub use config::{Config, ConfigBuilder, Security};
pub use disconnect::{DisconnectNotifier, DisconnectWatch, channel as disconnect_channel};

use crate::Result;
use crate::command::{FetchAttribute, SearchCriteria};
use crate::types::{
    BodyStructure, Envelope, Flags, ListResponse, Mailbox, MailboxStatus, SeqNum, SequenceSet,
    Uid, UidSet,
};
use std::future::Future;

/// One message as returned by FETCH.
///
/// Fields are `None` when the matching [`FetchAttribute`] was not requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number in the selected mailbox.
    pub seq_num: SeqNum,
    /// UID.
    pub uid: Option<Uid>,
    /// Flags.
    pub flags: Option<Flags>,
    /// Envelope.
    pub envelope: Option<Envelope>,
    /// Body structure.
    pub body_structure: Option<BodyStructure>,
    /// Raw body section bytes.
    pub body: Option<Vec<u8>>,
}

impl FetchedMessage {
    /// Creates an entry carrying only a sequence number.
    #[must_use]
    pub const fn new(seq_num: SeqNum) -> Self {
        Self {
            seq_num,
            uid: None,
            flags: None,
            envelope: None,
            body_structure: None,
            body: None,
        }
    }
}

/// An open connection to a retrieval server.
///
/// Every method issues at most one protocol round trip. Callers must not
/// run two methods at once on the same connection; `&mut self` makes the
/// type system enforce that.
pub trait Connection: Send + 'static {
    /// Authenticates with LOGIN.
    ///
    /// Rejected credentials must surface as [`Error::Auth`](crate::Error::Auth);
    /// every other error is treated as a transport problem.
    fn login(&mut self, username: &str, password: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Sends LOGOUT and closes the connection.
    fn logout(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Returns a watch that resolves when the connection closes for any reason.
    fn disconnected(&self) -> DisconnectWatch;

    /// Status of the currently selected mailbox, if any.
    ///
    /// Callers reuse this status instead of selecting again, so
    /// implementors must keep `exists` in step with the unsolicited
    /// `EXISTS` and `EXPUNGE` responses they receive on the selected
    /// mailbox.
    fn selected(&self) -> Option<&MailboxStatus>;

    /// Lists mailboxes matching `pattern` under `reference`.
    fn list(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<ListResponse>>> + Send;

    /// Selects a mailbox.
    fn select(&mut self, mailbox: &Mailbox) -> impl Future<Output = Result<MailboxStatus>> + Send;

    /// Fetches messages by sequence number.
    fn fetch(
        &mut self,
        set: &SequenceSet,
        items: &[FetchAttribute],
    ) -> impl Future<Output = Result<Vec<FetchedMessage>>> + Send;

    /// Fetches messages by UID.
    fn uid_fetch(
        &mut self,
        set: &UidSet,
        items: &[FetchAttribute],
    ) -> impl Future<Output = Result<Vec<FetchedMessage>>> + Send;

    /// Searches the selected mailbox, returning matches in server order.
    fn search(
        &mut self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<SeqNum>>> + Send;
}
