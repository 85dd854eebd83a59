//! Connection factory.

use std::future::Future;

/// Opens protocol connections.
///
/// A backend is shared by every session of a [`SessionManager`](crate::SessionManager).
/// Production backends wrap wire clients; tests plug in in-memory fakes.
pub trait Backend: Send + Sync + 'static {
    /// Retrieval connection type.
    type Imap: mailgate_imap::Connection;
    /// Submission connection type.
    type Smtp: mailgate_smtp::Connection;

    /// Opens an unauthenticated retrieval connection.
    fn connect_imap(
        &self,
        config: &mailgate_imap::Config,
    ) -> impl Future<Output = mailgate_imap::Result<Self::Imap>> + Send;

    /// Opens a submission connection, ready for AUTH.
    fn connect_smtp(
        &self,
        config: &mailgate_smtp::Config,
    ) -> impl Future<Output = mailgate_smtp::Result<Self::Smtp>> + Send;
}
