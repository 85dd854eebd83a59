//! # mailgate-smtp
//!
//! Client interface for the mail-submission protocol (SMTP).
//!
//! A wire client implements [`Connection`]; mailgate drives it through
//! AUTH, MAIL FROM, RCPT TO, DATA and QUIT. Endpoints are configured as
//! `smtps://`, `smtp://` (STARTTLS) or `smtp+insecure://` URLs.
//!
//! ## Quick Start
//!
//! ```
//! use mailgate_smtp::{Address, Config, Security};
//!
//! let config: Config = "smtps://smtp.example.com".parse()?;
//! assert_eq!(config.security, Security::Implicit);
//! assert_eq!(config.port, 465);
//!
//! let to = Address::new("recipient@example.com")?;
//! assert_eq!(to.domain(), "example.com");
//! # Ok::<(), mailgate_smtp::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
pub mod connection;
mod error;

pub use address::Address;
pub use connection::{Config, Connection, Security};
pub use error::{Error, Result};
