//! Error types for the core library.
//!
//! Display strings are safe to show to a user: they name the operation
//! that failed but never carry raw server text. The underlying protocol
//! error stays reachable through [`std::error::Error::source`] for logs.

use thiserror::Error;

/// Boxed error from a protocol layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the credentials.
    #[error("Invalid username or password")]
    Auth(#[source] BoxError),

    /// The server could not be reached or the connection was lost.
    #[error("Mail server unavailable while {context}")]
    Transport {
        /// Operation in progress.
        context: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// No live session for the token.
    #[error("Session expired")]
    SessionExpired,

    /// A part path could not be parsed or does not exist in the message.
    #[error("Invalid part path")]
    InvalidPath(#[source] mailgate_mime::Error),

    /// Reply requested on a part that is not text.
    #[error("Cannot quote a {0} part")]
    UnsupportedContentType(String),

    /// The entropy source failed while generating a session token.
    #[error("Random source unavailable")]
    RandomSource(#[source] rand::Error),

    /// The server refused a command.
    #[error("Mail server rejected the request while {context}")]
    Protocol {
        /// Operation in progress.
        context: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },

    /// The requested message is not in the mailbox.
    #[error("Message not found in {mailbox}")]
    MessageNotFound {
        /// Mailbox searched.
        mailbox: String,
    },

    /// The outgoing message is incomplete or malformed.
    #[error("Invalid message: {0}")]
    InvalidDraft(String),

    /// The submission server refused the message.
    #[error("Failed to send message")]
    Send(#[source] mailgate_smtp::Error),

    /// A fetched message could not be decoded.
    #[error("Message could not be decoded")]
    Mime(#[source] mailgate_mime::Error),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Broad error category, for callers that pick a response by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials rejected; show a login form again.
    AuthFailure,
    /// Service unavailable; safe to retry later.
    TransportFailure,
    /// Token unknown; redirect to login.
    SessionExpired,
    /// Bad part path in the request.
    InvalidPath,
    /// Reply on a non-text part.
    UnsupportedContentType,
    /// Entropy source failure.
    RandomSourceFailure,
    /// Message or other resource not found.
    NotFound,
    /// Caller supplied invalid input.
    InvalidInput,
    /// Anything else.
    Internal,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::AuthFailure,
            Self::Transport { .. } => ErrorKind::TransportFailure,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::UnsupportedContentType(_) => ErrorKind::UnsupportedContentType,
            Self::RandomSource(_) => ErrorKind::RandomSourceFailure,
            Self::MessageNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidDraft(_) => ErrorKind::InvalidInput,
            Self::Protocol { .. } | Self::Send(_) | Self::Mime(_) | Self::Config(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Wraps a retrieval error raised while doing `context`.
    pub(crate) fn imap(context: impl Into<String>, err: mailgate_imap::Error) -> Self {
        let context = context.into();
        match err {
            mailgate_imap::Error::Auth(_) => Self::Auth(Box::new(err)),
            err if err.is_disconnect() => Self::Transport {
                context,
                source: Box::new(err),
            },
            err => Self::Protocol {
                context,
                source: Box::new(err),
            },
        }
    }

    /// Wraps a submission error raised while doing `context`.
    pub(crate) fn smtp(context: impl Into<String>, err: mailgate_smtp::Error) -> Self {
        match err {
            mailgate_smtp::Error::Auth(_) => Self::Auth(Box::new(err)),
            mailgate_smtp::Error::Io(_) => Self::Transport {
                context: context.into(),
                source: Box::new(err),
            },
            mailgate_smtp::Error::InvalidAddress(ref reason) => {
                Self::InvalidDraft(reason.clone())
            }
            err => Self::Send(err),
        }
    }

    /// Wraps a connection failure, whatever the underlying error.
    pub(crate) fn transport<E>(context: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            context: context.into(),
            source: Box::new(err),
        }
    }
}

impl From<mailgate_mime::Error> for Error {
    fn from(err: mailgate_mime::Error) -> Self {
        match err {
            mailgate_mime::Error::InvalidPath(_) => Self::InvalidPath(err),
            err => Self::Mime(err),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
