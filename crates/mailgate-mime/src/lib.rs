//! # mailgate-mime
//!
//! MIME entity trees and part-path addressing.
//!
//! ## Features
//!
//! - **Entity parsing**: Parse raw RFC 5322 messages into a tree of
//!   [`Entity`] nodes, recursing through nested multiparts up to
//!   [`MAX_DEPTH`] levels
//! - **Part paths**: Address one entity with a [`PartPath`] such as `2.1`;
//!   the empty path is the whole message
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 header words
//! - **Content types**: Parsed `Content-Type` / `Content-Disposition`
//!
//! ## Quick Start
//!
//! ```
//! use mailgate_mime::{Entity, MessagePart, PartPath};
//!
//! let raw = b"Content-Type: multipart/mixed; boundary=x\r\n\r\n\
//!             --x\r\nContent-Type: text/plain\r\n\r\nHello\r\n--x--\r\n";
//!
//! let message = Entity::parse(raw)?;
//! let path: PartPath = "1".parse()?;
//! let part = MessagePart::extract(message, path)?;
//! assert_eq!(part.entity.body_text()?, "Hello");
//! # Ok::<(), mailgate_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod entity;
mod error;
mod header;
mod path;

pub mod encoding;

pub use content_type::{ContentDisposition, ContentType};
pub use entity::{Body, Entity, MAX_DEPTH, TransferEncoding};
pub use error::{Error, Result};
pub use header::Headers;
pub use path::{MessagePart, PartPath, PartTree};
