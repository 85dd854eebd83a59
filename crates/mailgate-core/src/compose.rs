//! Composing, quoting and sending messages.

use crate::error::{Error, Result};
use crate::mailbox::MessageSummary;
use chrono::{DateTime, FixedOffset, Local};
use mailgate_mime::{Entity, Headers};
use mailgate_smtp::{Address, Connection};

/// An email message to send.
///
/// Addresses are kept as typed by the user and validated when sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub text: String,
    /// Message-ID of the message being answered.
    pub in_reply_to: Option<String>,
}

impl OutgoingMessage {
    /// Creates an empty message from `from`.
    #[must_use]
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Drafts a reply to `original`.
    ///
    /// Recipients come from Reply-To, or From when there is none. The
    /// subject gains a `Re: ` prefix unless it already has one.
    #[must_use]
    pub fn reply(original: &MessageSummary, quoted_text: String, from: impl Into<String>) -> Self {
        let envelope = &original.envelope;
        let subject = envelope.subject();
        let subject = if has_reply_prefix(subject) {
            subject.to_string()
        } else {
            format!("Re: {subject}")
        };

        Self {
            from: from.into(),
            to: envelope
                .reply_recipients()
                .iter()
                .filter_map(mailgate_imap::Address::email)
                .collect(),
            subject,
            text: quoted_text,
            in_reply_to: envelope
                .message_id
                .as_deref()
                .map(str::trim)
                .filter(|id| check_message_id(id).is_ok())
                .map(str::to_string),
        }
    }

    /// Renders the message as RFC 5322 text with CRLF line endings.
    #[must_use]
    pub fn to_rfc5322(&self, date: &DateTime<FixedOffset>) -> String {
        let mut headers = Headers::new();
        headers.add("Date", date.to_rfc2822());
        headers.add("From", self.from.trim());
        headers.add(
            "To",
            self.to.iter().map(|a| a.trim()).collect::<Vec<_>>().join(", "),
        );
        if !self.subject.is_empty() {
            headers.add("Subject", Headers::encode_value(&self.subject));
        }
        if let Some(id) = &self.in_reply_to {
            headers.add("In-Reply-To", id.as_str());
        }
        headers.add("MIME-Version", "1.0");
        headers.add("Content-Type", "text/plain; charset=utf-8");
        headers.add("Content-Transfer-Encoding", "8bit");

        let body = self.text.lines().collect::<Vec<_>>().join("\r\n");
        format!("{headers}\r\n{body}\r\n")
    }

    /// Checks the sender, recipients and `In-Reply-To`, returning the
    /// addresses parsed.
    fn envelope(&self) -> Result<(Address, Vec<Address>)> {
        if self.from.trim().is_empty() {
            return Err(Error::InvalidDraft("missing sender".to_string()));
        }
        let from = parse_address(&self.from)?;

        if self.to.is_empty() {
            return Err(Error::InvalidDraft("no recipients".to_string()));
        }
        let to = self
            .to
            .iter()
            .map(|addr| parse_address(addr))
            .collect::<Result<Vec<_>>>()?;

        if let Some(id) = &self.in_reply_to {
            check_message_id(id)?;
        }

        Ok((from, to))
    }
}

fn parse_address(addr: &str) -> Result<Address> {
    Address::new(addr.trim()).map_err(|e| Error::InvalidDraft(e.to_string()))
}

/// Accepts a single `<id>` with no whitespace or control characters.
fn check_message_id(id: &str) -> Result<()> {
    let inner = id.strip_prefix('<').and_then(|rest| rest.strip_suffix('>'));
    match inner {
        Some(inner)
            if !inner.is_empty()
                && !inner
                    .chars()
                    .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>')) =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidDraft(format!("malformed In-Reply-To {id:?}"))),
    }
}

fn has_reply_prefix(subject: &str) -> bool {
    subject
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
}

/// The username as a From address, if it looks like one.
#[must_use]
pub fn default_from(username: &str) -> Option<String> {
    username.contains('@').then(|| username.to_string())
}

/// Splits a comma-separated address field, dropping blank entries.
#[must_use]
pub fn parse_address_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// Quotes a text part for a reply: every line prefixed with `>`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedContentType`] for parts that are not text,
/// and [`Error::Mime`] if the body cannot be decoded.
pub fn quote_for_reply(entity: &Entity) -> Result<String> {
    let content_type = entity.content_type();
    if !content_type.is_text() {
        return Err(Error::UnsupportedContentType(content_type.mime_type()));
    }

    let text = entity.body_text()?;
    let mut quoted = String::with_capacity(text.len() + text.len() / 8);
    for line in text.lines() {
        if line.is_empty() {
            quoted.push('>');
        } else {
            quoted.push_str("> ");
            quoted.push_str(line);
        }
        quoted.push('\n');
    }
    Ok(quoted)
}

/// Submits `draft` over an authenticated submission connection.
///
/// No copy is stored in a Sent mailbox.
///
/// # Errors
///
/// Returns [`Error::InvalidDraft`] before talking to the server if the
/// sender, a recipient or the `In-Reply-To` id is missing or malformed, and a transport or send
/// error if the server refuses the message.
pub async fn send_message<C: Connection>(conn: &mut C, draft: &OutgoingMessage) -> Result<()> {
    let (from, to) = draft.envelope()?;
    let message = draft.to_rfc5322(&Local::now().fixed_offset());

    tracing::debug!(recipients = to.len(), bytes = message.len(), "Submitting message");
    conn.mail_from(&from)
        .await
        .map_err(|e| Error::smtp("starting the mail transaction", e))?;
    for rcpt in &to {
        conn.rcpt_to(rcpt)
            .await
            .map_err(|e| Error::smtp("adding a recipient", e))?;
    }
    conn.data(message.as_bytes())
        .await
        .map_err(|e| Error::smtp("sending message data", e))?;
    Ok(())
}
