//! Mailbox queries: listing mailboxes, paging through messages, searching,
//! and locating one body part of a message.
//!
//! Every function takes a live connection and is meant to run inside
//! [`Session::with_connection`](crate::Session::with_connection).
//!
//! Listings address messages by sequence number, which is only stable
//! until another client expunges from the mailbox. Message retrieval uses
//! UIDs, so a page rendered before such a change may link to messages that
//! now sit on a different page; nothing here tries to detect that.

use crate::error::{Error, Result};
use mailgate_imap::{
    BodyStructure, Connection, Envelope, FetchAttribute, FetchedMessage, Flags, ListResponse,
    Mailbox, MailboxStatus, SearchCriteria, SeqNum, SequenceSet, Uid, UidSet,
};
use mailgate_mime::{Entity, MessagePart, PartPath};
use std::collections::HashMap;

/// Items fetched for a listing row.
const SUMMARY_ITEMS: [FetchAttribute; 3] = [
    FetchAttribute::Uid,
    FetchAttribute::Flags,
    FetchAttribute::Envelope,
];

/// One message in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Position in the selected mailbox.
    pub seq_num: SeqNum,
    /// Persistent identifier, used to open the message.
    pub uid: Uid,
    /// Header summary.
    pub envelope: Envelope,
    /// Flags.
    pub flags: Flags,
    /// MIME structure, when it was fetched.
    pub body_structure: Option<BodyStructure>,
}

impl MessageSummary {
    fn from_fetch(msg: FetchedMessage) -> Result<Self> {
        let uid = msg.uid.ok_or_else(|| Error::Protocol {
            context: "reading fetch results".to_string(),
            source: Box::new(mailgate_imap::Error::Protocol(format!(
                "message {} returned without UID",
                msg.seq_num
            ))),
        })?;
        Ok(Self {
            seq_num: msg.seq_num,
            uid,
            envelope: msg.envelope.unwrap_or_default(),
            flags: msg.flags.unwrap_or_default(),
            body_structure: msg.body_structure,
        })
    }

    /// Listing page holding this message when the mailbox has `total`
    /// messages shown `page_size` at a time.
    #[must_use]
    pub fn mailbox_page(&self, total: u32, page_size: u32) -> u32 {
        total.saturating_sub(self.seq_num.get()) / page_size.max(1)
    }

    /// Path of the body to display, if the structure was fetched and has one.
    #[must_use]
    pub fn text_part_path(&self) -> Option<PartPath> {
        self.body_structure.as_ref()?.text_part_path()
    }

    /// Attachments, if the structure was fetched.
    #[must_use]
    pub fn attachments(&self) -> Vec<mailgate_imap::Attachment> {
        self.body_structure
            .as_ref()
            .map(BodyStructure::attachments)
            .unwrap_or_default()
    }

    /// Looks up a part in the fetched structure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the structure was not fetched or
    /// the path does not exist.
    pub fn part(&self, path: &PartPath) -> Result<&BodyStructure> {
        let structure = self.body_structure.as_ref().ok_or_else(|| {
            Error::InvalidPath(mailgate_mime::Error::InvalidPath(
                "body structure not fetched".to_string(),
            ))
        })?;
        Ok(path.resolve(structure)?)
    }
}

/// One page of a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    /// Status of the listed mailbox.
    pub mailbox: MailboxStatus,
    /// Messages, most recent first.
    pub messages: Vec<MessageSummary>,
    /// Index of this page.
    pub page: u32,
    /// Index of the previous page, if any.
    pub prev_page: Option<u32>,
    /// Index of the next page, if any.
    pub next_page: Option<u32>,
}

/// Sequence numbers `(from, to)` shown on `page`, counting back from the
/// newest message. `None` when the page is past the oldest message.
#[must_use]
pub fn page_range(total: u32, page: u32, page_size: u32) -> Option<(u32, u32)> {
    let size = u64::from(page_size.max(1));
    let to = u64::from(total)
        .checked_sub(u64::from(page) * size)
        .filter(|&to| to > 0)?;
    let from = (to + 1).saturating_sub(size).max(1);
    Some((u32::try_from(from).ok()?, u32::try_from(to).ok()?))
}

/// Index of the page after `page`, if more messages remain.
#[must_use]
pub fn next_page(total: u32, page: u32, page_size: u32) -> Option<u32> {
    let shown = (u64::from(page) + 1) * u64::from(page_size.max(1));
    if shown < u64::from(total) {
        page.checked_add(1)
    } else {
        None
    }
}

/// Selects `mailbox` unless it is already the selected one.
///
/// A reused selection reports whatever
/// [`Connection::selected`](mailgate_imap::Connection::selected) holds, so
/// its `exists` count is only as fresh as the connection keeps it.
///
/// # Errors
///
/// Returns an error if SELECT fails.
pub async fn ensure_selected<C: Connection>(conn: &mut C, mailbox: &str) -> Result<MailboxStatus> {
    if let Some(status) = conn.selected()
        && status.name.matches(mailbox)
    {
        return Ok(status.clone());
    }

    tracing::debug!(mailbox, "Selecting mailbox");
    conn.select(&Mailbox::new(mailbox))
        .await
        .map_err(|e| Error::imap(format!("selecting {mailbox}"), e))
}

/// Lists every mailbox, in server order.
///
/// # Errors
///
/// Returns an error if LIST fails.
pub async fn list_mailboxes<C: Connection>(conn: &mut C) -> Result<Vec<ListResponse>> {
    let mailboxes = conn
        .list("", "*")
        .await
        .map_err(|e| Error::imap("listing mailboxes", e))?;
    tracing::debug!(count = mailboxes.len(), "Listed mailboxes");
    Ok(mailboxes)
}

/// Lists one page of `mailbox`, newest first.
///
/// A page past the end is empty rather than an error.
///
/// # Errors
///
/// Returns an error if SELECT or FETCH fails.
pub async fn list_messages<C: Connection>(
    conn: &mut C,
    mailbox: &str,
    page: u32,
    page_size: u32,
) -> Result<MessagePage> {
    let status = ensure_selected(conn, mailbox).await?;
    let total = status.exists;

    let mut messages = match page_range(total, page, page_size)
        .and_then(|(from, to)| SequenceSet::range(from, to))
    {
        Some(set) => {
            tracing::debug!(mailbox, %set, "Fetching page");
            fetch_summaries(conn, &set, mailbox).await?
        }
        None => Vec::new(),
    };
    messages.sort_by(|a, b| b.seq_num.cmp(&a.seq_num));

    Ok(MessagePage {
        mailbox: status,
        messages,
        page,
        prev_page: page.checked_sub(1),
        next_page: next_page(total, page, page_size),
    })
}

/// Runs a text search over `mailbox`.
///
/// Results come back in the order the server listed the matches, on a
/// single page.
///
/// # Errors
///
/// Returns an error if SELECT, SEARCH or FETCH fails.
pub async fn search_messages<C: Connection>(
    conn: &mut C,
    mailbox: &str,
    query: &str,
) -> Result<Vec<MessageSummary>> {
    ensure_selected(conn, mailbox).await?;

    let hits = conn
        .search(&SearchCriteria::Text(query.to_string()))
        .await
        .map_err(|e| Error::imap(format!("searching {mailbox}"), e))?;
    tracing::debug!(mailbox, hits = hits.len(), "Search finished");

    let Some(set) = SequenceSet::from_nums(&hits) else {
        return Ok(Vec::new());
    };
    let mut by_seq: HashMap<SeqNum, MessageSummary> = fetch_summaries(conn, &set, mailbox)
        .await?
        .into_iter()
        .map(|summary| (summary.seq_num, summary))
        .collect();

    Ok(hits.iter().filter_map(|seq| by_seq.remove(seq)).collect())
}

/// Fetches message `uid` from `mailbox` and locates the part at `path`.
///
/// The empty path yields the whole message.
///
/// # Errors
///
/// Returns [`Error::MessageNotFound`] if no message has that UID,
/// [`Error::InvalidPath`] if the path does not exist in the message, and
/// protocol or decoding errors otherwise.
pub async fn get_message_part<C: Connection>(
    conn: &mut C,
    mailbox: &str,
    uid: Uid,
    path: &PartPath,
) -> Result<(MessageSummary, MessagePart)> {
    ensure_selected(conn, mailbox).await?;

    tracing::debug!(mailbox, %uid, %path, "Fetching message part");
    let items = [
        FetchAttribute::Uid,
        FetchAttribute::Flags,
        FetchAttribute::Envelope,
        FetchAttribute::BodyStructure,
        FetchAttribute::full_message(),
    ];
    let mut fetched = conn
        .uid_fetch(&UidSet::single(uid), &items)
        .await
        .map_err(|e| Error::imap(format!("fetching a message from {mailbox}"), e))?;

    let index = fetched
        .iter()
        .position(|m| m.uid == Some(uid))
        .ok_or_else(|| Error::MessageNotFound {
            mailbox: mailbox.to_string(),
        })?;
    let mut message = fetched.swap_remove(index);
    let raw = message.body.take().ok_or_else(|| Error::Protocol {
        context: format!("fetching a message from {mailbox}"),
        source: Box::new(mailgate_imap::Error::Protocol(format!(
            "message {uid} returned without a body"
        ))),
    })?;
    let summary = MessageSummary::from_fetch(message)?;

    // Reject bad paths before parsing the whole message.
    if summary.body_structure.is_some() {
        summary.part(path)?;
    }

    let entity = Entity::parse(&raw)?;
    let part = MessagePart::extract(entity, path.clone())?;
    Ok((summary, part))
}

async fn fetch_summaries<C: Connection>(
    conn: &mut C,
    set: &SequenceSet,
    mailbox: &str,
) -> Result<Vec<MessageSummary>> {
    conn.fetch(set, &SUMMARY_ITEMS)
        .await
        .map_err(|e| Error::imap(format!("fetching messages from {mailbox}"), e))?
        .into_iter()
        .map(MessageSummary::from_fetch)
        .collect()
}
