//! In-memory backend for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use mailgate_core::{Backend, Config, SessionManager};
use mailgate_imap::{
    Address, BodyStructure, DisconnectNotifier, DisconnectWatch, Envelope, FetchAttribute,
    FetchedMessage, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus,
    SearchCriteria, SeqNum, SequenceSet, Uid, UidSet,
};
use mailgate_mime::{Entity, Headers};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const USER: &str = "alice@example.com";
pub const PASSWORD: &str = "correct horse";

/// A stored message.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub uid: Uid,
    pub raw: Vec<u8>,
    pub flags: Flags,
}

impl StoredMessage {
    /// The parsed entity, or `None` when the parser refuses the message.
    fn entity(&self) -> Option<Entity> {
        Entity::parse(&self.raw).ok()
    }

    fn envelope(&self) -> Envelope {
        let text = String::from_utf8_lossy(&self.raw);
        let headers = Headers::parse(text.split("\r\n\r\n").next().unwrap_or_default());
        let addresses = |name: &str| headers.get(name).map(parse_addresses).unwrap_or_default();
        Envelope {
            date: headers.get("date").map(str::to_string),
            subject: headers.get("subject").map(str::to_string),
            from: addresses("from"),
            sender: Vec::new(),
            reply_to: addresses("reply-to"),
            to: addresses("to"),
            cc: addresses("cc"),
            bcc: Vec::new(),
            in_reply_to: headers.get("in-reply-to").map(str::to_string),
            message_id: headers.get("message-id").map(str::to_string),
        }
    }
}

fn parse_addresses(value: &str) -> Vec<Address> {
    value
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| match a.split_once('<') {
            Some((name, rest)) => {
                let name = name.trim().trim_matches('"');
                let email = rest.trim_end_matches('>');
                Address::new((!name.is_empty()).then_some(name), email)
            }
            None => Address::new(None, a),
        })
        .collect()
}

/// A message accepted by the fake submission server.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub from: String,
    pub to: Vec<String>,
    pub data: String,
}

/// State shared by every fake connection, inspected by tests.
#[derive(Debug, Default)]
pub struct FakeState {
    mailboxes: Mutex<Vec<(String, Vec<StoredMessage>)>>,
    notifiers: Mutex<Vec<Arc<DisconnectNotifier>>>,
    commands: Mutex<Vec<String>>,
    sent: Mutex<Vec<SentMail>>,
    pub unreachable: AtomicBool,
    pub smtp_rejects_auth: AtomicBool,
    pub fail_logout: AtomicBool,
    pub connections: AtomicUsize,
    pub logouts: AtomicUsize,
    pub smtp_quits: AtomicUsize,
    in_flight: AtomicBool,
    pub overlaps: AtomicUsize,
    pub operations: AtomicUsize,
    login_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeState {
    /// Makes every later LOGIN wait for a permit from `gate`.
    pub fn hold_logins(&self, gate: Arc<Notify>) {
        *self.login_gate.lock().unwrap() = Some(gate);
    }

    /// Adds a mailbox holding `messages` (raw RFC 5322), UIDs from 101.
    pub fn add_mailbox(&self, name: &str, messages: Vec<Vec<u8>>) {
        let stored = (101u32..)
            .zip(messages)
            .map(|(uid, raw)| StoredMessage {
                uid: Uid::new(uid).unwrap(),
                raw,
                flags: Flags::new(),
            })
            .collect();
        self.mailboxes.lock().unwrap().push((name.to_string(), stored));
    }

    /// Closes every open retrieval connection from the server side.
    pub fn drop_connections(&self) {
        for notifier in self.notifiers.lock().unwrap().iter() {
            notifier.notify();
        }
    }

    /// Protocol commands issued so far, e.g. `SELECT INBOX`.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count_commands(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    fn log(&self, command: String) {
        self.commands.lock().unwrap().push(command);
    }

    /// Marks one command in flight, yielding so that a concurrent command
    /// on the same connection would be caught overlapping.
    async fn round_trip(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.operations.fetch_add(1, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }

    fn messages(&self, mailbox: &str) -> Option<Vec<StoredMessage>> {
        self.mailboxes
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| Mailbox::new(name.clone()).matches(mailbox))
            .map(|(_, messages)| messages.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    pub state: Arc<FakeState>,
}

impl Backend for FakeBackend {
    type Imap = FakeImap;
    type Smtp = FakeSmtp;

    async fn connect_imap(&self, _config: &mailgate_imap::Config) -> mailgate_imap::Result<FakeImap> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(mailgate_imap::Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        let notifier = Arc::new(mailgate_imap::disconnect_channel().0);
        self.state.notifiers.lock().unwrap().push(Arc::clone(&notifier));
        Ok(FakeImap {
            state: Arc::clone(&self.state),
            notifier,
            authenticated: false,
            selected: None,
        })
    }

    async fn connect_smtp(&self, _config: &mailgate_smtp::Config) -> mailgate_smtp::Result<FakeSmtp> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(mailgate_smtp::Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )));
        }
        Ok(FakeSmtp {
            state: Arc::clone(&self.state),
            authenticated: false,
            from: None,
            to: Vec::new(),
        })
    }
}

pub struct FakeImap {
    state: Arc<FakeState>,
    notifier: Arc<DisconnectNotifier>,
    authenticated: bool,
    selected: Option<MailboxStatus>,
}

impl FakeImap {
    fn check_open(&self) -> mailgate_imap::Result<()> {
        if self.notifier.is_notified() {
            Err(mailgate_imap::Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn selected_messages(&self) -> mailgate_imap::Result<Vec<StoredMessage>> {
        let status = self
            .selected
            .as_ref()
            .ok_or_else(|| mailgate_imap::Error::InvalidState("no mailbox selected".into()))?;
        self.state
            .messages(status.name.as_str())
            .ok_or_else(|| mailgate_imap::Error::No("mailbox vanished".into()))
    }
}

fn fetched(seq: u32, message: &StoredMessage, items: &[FetchAttribute]) -> FetchedMessage {
    let mut out = FetchedMessage::new(SeqNum::new(seq).unwrap());
    for item in items {
        match item {
            FetchAttribute::Uid => out.uid = Some(message.uid),
            FetchAttribute::Flags => out.flags = Some(message.flags.clone()),
            FetchAttribute::Envelope => out.envelope = Some(message.envelope()),
            FetchAttribute::BodyStructure => {
                out.body_structure = message.entity().map(|e| BodyStructure::from(&e));
            }
            FetchAttribute::Body { .. } => out.body = Some(message.raw.clone()),
        }
    }
    out
}

impl mailgate_imap::Connection for FakeImap {
    async fn login(&mut self, username: &str, password: &str) -> mailgate_imap::Result<()> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log(format!("LOGIN {username}"));
        let gate = self.state.login_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if username == USER && password == PASSWORD {
            self.authenticated = true;
            Ok(())
        } else {
            Err(mailgate_imap::Error::Auth("[AUTHENTICATIONFAILED] Invalid credentials".into()))
        }
    }

    async fn logout(&mut self) -> mailgate_imap::Result<()> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log("LOGOUT".to_string());
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
        self.notifier.notify();
        if self.state.fail_logout.load(Ordering::SeqCst) {
            return Err(mailgate_imap::Error::Bye("server shutting down".into()));
        }
        Ok(())
    }

    fn disconnected(&self) -> DisconnectWatch {
        self.notifier.watch()
    }

    fn selected(&self) -> Option<&MailboxStatus> {
        self.selected.as_ref()
    }

    async fn list(&mut self, _reference: &str, _pattern: &str) -> mailgate_imap::Result<Vec<ListResponse>> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log("LIST".to_string());
        let mailboxes = self.state.mailboxes.lock().unwrap();
        Ok(mailboxes
            .iter()
            .map(|(name, _)| ListResponse {
                attributes: vec![MailboxAttribute::HasNoChildren],
                delimiter: Some('/'),
                mailbox: Mailbox::new(name.clone()),
            })
            .collect())
    }

    async fn select(&mut self, mailbox: &Mailbox) -> mailgate_imap::Result<MailboxStatus> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log(format!("SELECT {mailbox}"));
        let messages = self
            .state
            .messages(mailbox.as_str())
            .ok_or_else(|| mailgate_imap::Error::No(format!("[NONEXISTENT] {mailbox}")))?;
        let mut status = MailboxStatus::new(mailbox.clone(), u32::try_from(messages.len()).unwrap());
        status.uid_next = messages.last().and_then(|m| Uid::new(m.uid.get() + 1));
        status.flags = [Flag::Seen, Flag::Answered, Flag::Flagged].into_iter().collect();
        self.selected = Some(status.clone());
        Ok(status)
    }

    async fn fetch(
        &mut self,
        set: &SequenceSet,
        items: &[FetchAttribute],
    ) -> mailgate_imap::Result<Vec<FetchedMessage>> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log(format!("FETCH {set}"));
        let messages = self.selected_messages()?;
        let last = u32::try_from(messages.len()).unwrap();
        Ok((1u32..)
            .zip(&messages)
            .filter(|(seq, _)| set.contains(SeqNum::new(*seq).unwrap(), last))
            .map(|(seq, message)| fetched(seq, message, items))
            .collect())
    }

    async fn uid_fetch(
        &mut self,
        set: &UidSet,
        items: &[FetchAttribute],
    ) -> mailgate_imap::Result<Vec<FetchedMessage>> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log(format!("UID FETCH {set}"));
        let messages = self.selected_messages()?;
        Ok((1u32..)
            .zip(&messages)
            .filter(|(_, message)| set.contains(message.uid))
            .map(|(seq, message)| fetched(seq, message, items))
            .collect())
    }

    /// Matches are returned newest first, so callers must keep server order.
    async fn search(&mut self, criteria: &SearchCriteria) -> mailgate_imap::Result<Vec<SeqNum>> {
        self.check_open()?;
        self.state.round_trip().await;
        self.state.log(format!("SEARCH {criteria}"));
        let SearchCriteria::Text(needle) = criteria else {
            return Err(mailgate_imap::Error::Bad("unsupported criteria".into()));
        };
        let needle = needle.to_lowercase();
        let messages = self.selected_messages()?;
        let mut hits: Vec<SeqNum> = (1u32..)
            .zip(&messages)
            .filter(|(_, m)| String::from_utf8_lossy(&m.raw).to_lowercase().contains(&needle))
            .map(|(seq, _)| SeqNum::new(seq).unwrap())
            .collect();
        hits.reverse();
        Ok(hits)
    }
}

pub struct FakeSmtp {
    state: Arc<FakeState>,
    authenticated: bool,
    from: Option<String>,
    to: Vec<String>,
}

impl mailgate_smtp::Connection for FakeSmtp {
    async fn auth_plain(&mut self, username: &str, password: &str) -> mailgate_smtp::Result<()> {
        if self.state.smtp_rejects_auth.load(Ordering::SeqCst) || username != USER || password != PASSWORD {
            return Err(mailgate_smtp::Error::Auth("535 5.7.8 authentication failed".into()));
        }
        self.authenticated = true;
        Ok(())
    }

    async fn mail_from(&mut self, from: &mailgate_smtp::Address) -> mailgate_smtp::Result<()> {
        if !self.authenticated {
            return Err(mailgate_smtp::Error::smtp_error(530, "authentication required"));
        }
        self.from = Some(from.to_string());
        Ok(())
    }

    async fn rcpt_to(&mut self, to: &mailgate_smtp::Address) -> mailgate_smtp::Result<()> {
        if to.domain() == "rejected.example" {
            return Err(mailgate_smtp::Error::smtp_error(550, "no such user"));
        }
        self.to.push(to.to_string());
        Ok(())
    }

    async fn data(&mut self, message: &[u8]) -> mailgate_smtp::Result<()> {
        let from = self
            .from
            .take()
            .ok_or_else(|| mailgate_smtp::Error::InvalidState("DATA before MAIL FROM".into()))?;
        self.state.sent.lock().unwrap().push(SentMail {
            from,
            to: std::mem::take(&mut self.to),
            data: String::from_utf8(message.to_vec()).unwrap(),
        });
        Ok(())
    }

    async fn quit(&mut self) -> mailgate_smtp::Result<()> {
        self.state.smtp_quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds a plain message with the given subject.
pub fn plain_message(subject: &str, body: &str) -> Vec<u8> {
    let mut headers = Headers::new();
    headers.add("From", "Bob <bob@example.com>");
    headers.add("To", USER);
    headers.add("Subject", subject);
    headers.add("Message-ID", format!("<{}@example.com>", subject.replace(' ', ".")));
    headers.add("Content-Type", "text/plain; charset=utf-8");
    format!("{headers}\r\n{body}").into_bytes()
}

/// A message whose multiparts nest `levels` deep.
pub fn deeply_nested_message(levels: usize) -> Vec<u8> {
    let mut raw = String::from("From: Bob <bob@example.com>\r\nSubject: Matryoshka\r\n");
    for level in 0..levels {
        raw.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=b{level}\r\n\r\n--b{level}\r\n"
        ));
    }
    raw.push_str("Content-Type: text/plain\r\n\r\ninnermost");
    raw.into_bytes()
}

/// A multipart message three levels deep:
///
/// ```text
/// mixed
/// ├── 1 alternative
/// │   ├── 1 text/plain
/// │   └── 2 text/html
/// └── 2 mixed
///     ├── 1 image/png (attachment)
///     └── 2 text/plain
/// ```
pub fn nested_message() -> Vec<u8> {
    concat!(
        "From: Bob <bob@example.com>\r\n",
        "Reply-To: team@example.com\r\n",
        "To: alice@example.com\r\n",
        "Subject: Quarterly numbers\r\n",
        "Message-ID: <q3@example.com>\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
        "\r\n",
        "--alt\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "Numbers attached.\r\n",
        "Call me.\r\n",
        "--alt\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>Numbers attached.</p>\r\n",
        "--alt--\r\n",
        "--outer\r\n",
        "Content-Type: multipart/mixed; boundary=\"inner\"\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: image/png; name=chart.png\r\n",
        "Content-Disposition: attachment; filename=chart.png\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "iVBORw0KGgo=\r\n",
        "--inner\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "Footnote.\r\n",
        "--inner--\r\n",
        "--outer--\r\n",
    )
    .as_bytes()
    .to_vec()
}

pub fn config() -> Config {
    Config::new("imap+insecure://localhost".parse().unwrap())
        .with_smtp("smtp+insecure://localhost".parse().unwrap())
}

/// A manager over a fresh fake backend with an `INBOX` of `inbox_size`
/// plain messages, `Subject: message N`.
pub fn manager(inbox_size: u32, messages_per_page: u32) -> (SessionManager<FakeBackend>, Arc<FakeState>) {
    let backend = FakeBackend::default();
    let inbox = (1..=inbox_size)
        .map(|n| plain_message(&format!("message {n}"), &format!("Body of message {n}.")))
        .collect();
    backend.state.add_mailbox("INBOX", inbox);
    let state = Arc::clone(&backend.state);
    let manager = SessionManager::new(backend, config().with_messages_per_page(messages_per_page));
    (manager, state)
}

/// Waits until `check` holds, failing the test after a second.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("condition not reached within a second"));
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn subjects(messages: &[mailgate_core::MessageSummary]) -> Vec<String> {
    messages
        .iter()
        .map(|m| m.envelope.subject().to_string())
        .collect()
}

pub fn seqs(messages: &[mailgate_core::MessageSummary]) -> Vec<u32> {
    messages.iter().map(|m| m.seq_num.get()).collect()
}
