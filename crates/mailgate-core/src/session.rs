//! One logged-in user's connection.

use crate::backend::Backend;
use crate::compose::{self, OutgoingMessage};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mailbox::{self, MessagePage, MessageSummary};
use mailgate_imap::{Connection as _, ListResponse, Uid};
use mailgate_mime::{MessagePart, PartPath};
use mailgate_smtp::Connection as _;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Future returned by a unit of work run against a connection.
pub type ConnFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// An authenticated retrieval connection and the credentials that opened it.
///
/// The connection is only reachable through [`with_connection`], which
/// runs one unit of work at a time. Callers waiting for the connection are
/// served in the order they asked.
///
/// [`with_connection`]: Self::with_connection
pub struct Session<B: Backend> {
    username: String,
    password: String,
    conn: Mutex<B::Imap>,
    backend: Arc<B>,
    config: Arc<Config>,
}

impl<B: Backend> Session<B> {
    pub(crate) fn new(
        username: String,
        password: String,
        conn: B::Imap,
        backend: Arc<B>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            username,
            password,
            conn: Mutex::new(conn),
            backend,
            config,
        }
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password the session logged in with.
    ///
    /// Only for authenticating a second protocol as the same user.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Runs `work` with exclusive use of the connection.
    ///
    /// The connection is released when `work` finishes, whether it
    /// succeeded or not, and its result is returned unchanged. No timeout
    /// is applied. Dropping the returned future while `work` is mid-command
    /// leaves the connection in an unknown protocol state, so callers that
    /// stop waiting should let it run to completion in the background.
    ///
    /// ```ignore
    /// let name = mailbox.to_string();
    /// let status = session
    ///     .with_connection(move |conn| Box::pin(async move {
    ///         mailgate_core::mailbox::ensure_selected(conn, &name).await
    ///     }))
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns.
    pub async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut B::Imap) -> ConnFuture<'c, T>,
    {
        let mut conn = self.conn.lock().await;
        work(&mut *conn).await
    }

    /// Logs out, waiting for any running unit of work first.
    ///
    /// Closing twice may fail on the second call; treat that as already
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns an error if LOGOUT fails.
    pub async fn close(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        conn.logout()
            .await
            .map_err(|e| Error::imap("logging out", e))
    }

    /// Opens a submission connection as this user and runs `work` on it.
    ///
    /// The connection is authenticated with the session's credentials and
    /// closed afterwards; a failing QUIT is logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without a submission endpoint,
    /// [`Error::Auth`] if the credentials are refused, a transport error if
    /// the server cannot be reached, or the error from `work`.
    pub async fn with_submission<T, F>(&self, work: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut B::Smtp) -> ConnFuture<'c, T>,
    {
        let config = self.config.smtp.as_ref().ok_or_else(|| {
            Error::Config("no submission server configured".to_string())
        })?;

        let mut conn = self
            .backend
            .connect_smtp(config)
            .await
            .map_err(|e| Error::transport("connecting to the submission server", e))?;
        conn.auth_plain(&self.username, &self.password)
            .await
            .map_err(|e| Error::smtp("authenticating to the submission server", e))?;

        let result = work(&mut conn).await;

        if let Err(e) = conn.quit().await {
            tracing::warn!(username = %self.username, error = %e, "Failed to close submission connection");
        }
        result
    }

    /// Lists every mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if LIST fails.
    pub async fn list_mailboxes(&self) -> Result<Vec<ListResponse>> {
        self.with_connection(|conn| Box::pin(mailbox::list_mailboxes(conn)))
            .await
    }

    /// Lists one page of `name`, sized by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if SELECT or FETCH fails.
    pub async fn list_messages(&self, name: &str, page: u32) -> Result<MessagePage> {
        let name = name.to_string();
        let page_size = self.config.messages_per_page;
        self.with_connection(move |conn| {
            Box::pin(async move { mailbox::list_messages(conn, &name, page, page_size).await })
        })
        .await
    }

    /// Searches `name` for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if SELECT, SEARCH or FETCH fails.
    pub async fn search_messages(&self, name: &str, query: &str) -> Result<Vec<MessageSummary>> {
        let name = name.to_string();
        let query = query.to_string();
        self.with_connection(move |conn| {
            Box::pin(async move { mailbox::search_messages(conn, &name, &query).await })
        })
        .await
    }

    /// Fetches one part of message `uid` in `name`.
    ///
    /// # Errors
    ///
    /// See [`mailbox::get_message_part`].
    pub async fn get_message_part(
        &self,
        name: &str,
        uid: Uid,
        path: &PartPath,
    ) -> Result<(MessageSummary, MessagePart)> {
        let name = name.to_string();
        let path = path.clone();
        self.with_connection(move |conn| {
            Box::pin(async move { mailbox::get_message_part(conn, &name, uid, &path).await })
        })
        .await
    }

    /// Drafts a reply to message `uid`, quoting `part` or, when `None`,
    /// the message's preferred text body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedContentType`] if the quoted part is not
    /// text or the message has no text body, plus any fetch error.
    pub async fn draft_reply(
        &self,
        name: &str,
        uid: Uid,
        part: Option<PartPath>,
    ) -> Result<OutgoingMessage> {
        let (summary, message) = self.get_message_part(name, uid, &PartPath::root()).await?;
        let path = part
            .or_else(|| summary.text_part_path())
            .ok_or_else(|| {
                Error::UnsupportedContentType(message.entity.content_type().mime_type())
            })?;

        let quoted = compose::quote_for_reply(path.resolve(&message.entity)?)?;
        let from = compose::default_from(&self.username).unwrap_or_default();
        Ok(OutgoingMessage::reply(&summary, quoted, from))
    }

    /// Sends `draft` through the submission server as this user.
    ///
    /// # Errors
    ///
    /// See [`with_submission`](Self::with_submission) and
    /// [`compose::send_message`].
    pub async fn send(&self, draft: OutgoingMessage) -> Result<()> {
        self.with_submission(move |conn| {
            Box::pin(async move { compose::send_message(conn, &draft).await })
        })
        .await?;
        tracing::info!(username = %self.username, "Message sent");
        Ok(())
    }
}

impl<B: Backend> fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
