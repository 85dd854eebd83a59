//! The session registry.

use crate::backend::Backend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::token::Token;
use mailgate_imap::{Connection as _, DisconnectWatch};
use std::collections::hash_map;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::AbortHandle;

struct Entry<B: Backend> {
    session: Arc<Session<B>>,
    watcher: AbortHandle,
}

type Registry<B> = Arc<Mutex<HashMap<Token, Entry<B>>>>;

type TokenSource = Arc<dyn Fn() -> Result<Token> + Send + Sync>;

/// Maps session tokens to live sessions.
///
/// Sessions are added by [`login`](Self::login) and removed by
/// [`logout`](Self::logout) or when their connection reports that it has
/// closed. There is no idle timeout: a connection the server keeps open
/// forever keeps its entry forever.
///
/// The registry lock is only held for map reads and writes, never across a
/// network round trip, so a slow login or a long fetch on one session does
/// not hold up lookups for another.
///
/// Cloning is cheap and every clone shares the same registry.
pub struct SessionManager<B: Backend> {
    backend: Arc<B>,
    config: Arc<Config>,
    sessions: Registry<B>,
    tokens: TokenSource,
}

impl<B: Backend> SessionManager<B> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(backend: B, config: Config) -> Self {
        Self {
            backend: Arc::new(backend),
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tokens: Arc::new(Token::generate),
        }
    }

    /// Replaces [`Token::generate`] as the source of new session tokens.
    ///
    /// A token that collides with a live session is discarded and the
    /// source asked again.
    #[must_use]
    pub fn with_token_source(
        mut self,
        source: impl Fn() -> Result<Token> + Send + Sync + 'static,
    ) -> Self {
        self.tokens = Arc::new(source);
        self
    }

    /// The configuration sessions are opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connects, logs in, and registers a new session.
    ///
    /// Must be called from within a tokio runtime: the session's
    /// disconnect watcher is spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the credentials,
    /// [`Error::Transport`] if it cannot be reached or login fails for
    /// another reason, and [`Error::RandomSource`] if no token can be
    /// generated. The connection is logged out on every failure after it
    /// was opened.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token> {
        let mut conn = self
            .backend
            .connect_imap(&self.config.imap)
            .await
            .map_err(|e| {
                tracing::warn!(username, error = %e, "Could not reach mail server");
                Error::transport("connecting to the mail server", e)
            })?;

        if let Err(e) = conn.login(username, password).await {
            tracing::warn!(username, error = %e, "Login failed");
            if let Err(e) = conn.logout().await {
                tracing::debug!(username, error = %e, "Logout after failed login failed");
            }
            return Err(match e {
                mailgate_imap::Error::Auth(_) => Error::Auth(Box::new(e)),
                e => Error::transport("logging in", e),
            });
        }

        let disconnected = conn.disconnected();
        let session = Arc::new(Session::new(
            username.to_string(),
            password.to_string(),
            conn,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
        ));

        let token = match self.register(&session, disconnected) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(username, error = %e, "Could not register session");
                if let Err(e) = session.close().await {
                    tracing::warn!(username, error = %e, "Logout failed");
                }
                return Err(e);
            }
        };

        tracing::info!(username, "Session created");
        Ok(token)
    }

    /// Stores `session` under a fresh token and watches its connection.
    fn register(
        &self,
        session: &Arc<Session<B>>,
        mut disconnected: DisconnectWatch,
    ) -> Result<Token> {
        loop {
            let token = (self.tokens)()?;
            let mut sessions = lock(&self.sessions);
            let hash_map::Entry::Vacant(slot) = sessions.entry(token.clone()) else {
                tracing::debug!("Generated token already in use, retrying");
                continue;
            };

            let registry = Arc::clone(&self.sessions);
            let watched = Arc::downgrade(session);
            let key = token.clone();
            let name = session.username().to_string();
            let watcher = tokio::spawn(async move {
                disconnected.closed().await;
                if remove_if_same(&registry, &key, &watched) {
                    tracing::info!(username = %name, "Connection closed, session removed");
                }
            });
            slot.insert(Entry {
                session: Arc::clone(session),
                watcher: watcher.abort_handle(),
            });
            return Ok(token);
        }
    }

    /// Looks up the session for `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExpired`] if there is none.
    pub fn resolve(&self, token: &Token) -> Result<Arc<Session<B>>> {
        lock(&self.sessions)
            .get(token)
            .map(|entry| Arc::clone(&entry.session))
            .ok_or(Error::SessionExpired)
    }

    /// Removes the session for `token` and logs it out.
    ///
    /// The session is gone from the registry even if LOGOUT fails; that
    /// failure is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExpired`] if there is no such session.
    pub async fn logout(&self, token: &Token) -> Result<()> {
        let entry = lock(&self.sessions)
            .remove(token)
            .ok_or(Error::SessionExpired)?;
        entry.watcher.abort();

        let session = entry.session;
        if let Err(e) = session.close().await {
            tracing::warn!(username = session.username(), error = %e, "Logout failed, treating session as closed");
        }
        tracing::info!(username = session.username(), "Session logged out");
        Ok(())
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Returns true if there are no live sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }

    /// Returns true if `token` maps to a live session.
    #[must_use]
    pub fn contains(&self, token: &Token) -> bool {
        lock(&self.sessions).contains_key(token)
    }
}

impl<B: Backend> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
            sessions: Arc::clone(&self.sessions),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

/// Map operations cannot leave the registry half-updated, so a poisoned
/// lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes `token` only if it still belongs to `session`.
fn remove_if_same<B: Backend>(
    registry: &Mutex<HashMap<Token, Entry<B>>>,
    token: &Token,
    session: &Weak<Session<B>>,
) -> bool {
    let mut sessions = lock(registry);
    let same = sessions
        .get(token)
        .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(&entry.session), session.as_ptr()));
    if same {
        sessions.remove(token);
    }
    same
}
