//! Core IMAP types.

mod body;
mod envelope;
mod flags;
mod identifiers;
mod mailbox;
mod sequence;

pub use body::{Attachment, BodyDisposition, BodyFields, BodyStructure};
pub use envelope::{Address, Envelope};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use sequence::{SequenceSet, UidSet};
