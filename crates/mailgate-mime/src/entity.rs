//! MIME entity tree.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::path::PartTree;
use std::fmt;

/// Deepest multipart nesting [`Entity::parse`] accepts.
pub const MAX_DEPTH: usize = 64;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit data.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Body of an entity: raw content for leaves, child entities for multiparts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Leaf content, still transfer-encoded.
    Single(Vec<u8>),
    /// Children of a multipart entity, in document order.
    Multipart(Vec<Entity>),
}

/// A node in a message's MIME tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Entity headers.
    pub headers: Headers,
    /// Entity body.
    pub body: Body,
}

impl Entity {
    /// Creates a leaf entity.
    #[must_use]
    pub const fn leaf(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body: Body::Single(body),
        }
    }

    /// Creates a multipart entity.
    #[must_use]
    pub const fn multipart(headers: Headers, children: Vec<Self>) -> Self {
        Self {
            headers,
            body: Body::Multipart(children),
        }
    }

    /// Parses a raw RFC 5322 message (or body part) into an entity tree.
    ///
    /// At most [`MAX_DEPTH`] multipart levels are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart entity has no boundary, or
    /// [`Error::TooDeep`] if multiparts nest deeper than [`MAX_DEPTH`].
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Self::parse_at(raw, 0)
    }

    fn parse_at(raw: &[u8], depth: usize) -> Result<Self> {
        let (header_block, body) = split_headers_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_block));
        let content_type = headers.content_type();

        if !content_type.is_multipart() {
            return Ok(Self::leaf(headers, body.to_vec()));
        }
        if depth >= MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let children = split_multipart(body, boundary)
            .into_iter()
            .map(|part| Self::parse_at(part, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::multipart(headers, children))
    }

    /// Gets the declared content type (RFC 2045 default when absent).
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers.content_type()
    }

    /// Checks if this entity has children.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, Body::Multipart(_))
    }

    /// Returns the children of a multipart entity.
    #[must_use]
    pub fn children(&self) -> Option<&[Self]> {
        match &self.body {
            Body::Multipart(children) => Some(children),
            Body::Single(_) => None,
        }
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes a leaf body according to its transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error for multipart entities or when decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let Body::Single(raw) = &self.body else {
            return Err(Error::NotALeaf);
        };

        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(raw),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(raw),
            _ => Ok(raw.clone()),
        }
    }

    /// Decodes a leaf body as text. Invalid UTF-8 sequences are replaced.
    ///
    /// # Errors
    ///
    /// Returns an error for multipart entities or when decoding fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

impl PartTree for Entity {
    fn subparts(&self) -> Option<&[Self]> {
        self.children()
    }
}

/// Splits at the first blank line.
fn split_headers_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&raw[..0], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&raw[..0], &raw[1..]);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n").map(|i| (i, i + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    split.map_or((raw, &raw[raw.len()..]), |(end, body_start)| {
        (&raw[..end], &raw[body_start..])
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits a multipart body into the raw bytes of each part.
///
/// The line break preceding a delimiter belongs to the delimiter. Preamble
/// and epilogue are discarded. A missing close delimiter ends the last part
/// at the end of input.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let line_start = offset;
        offset += line.len();

        let Some(rest) = line.trim_ascii_end().strip_prefix(delimiter.as_bytes()) else {
            continue;
        };
        let closing = rest == b"--";
        if !rest.is_empty() && !closing {
            continue;
        }

        if let Some(s) = start.take() {
            parts.push(strip_line_break(&body[s..line_start]));
        }
        if closing {
            return parts;
        }
        start = Some(offset);
    }

    if let Some(s) = start {
        parts.push(&body[s..]);
    }
    parts
}

fn strip_line_break(part: &[u8]) -> &[u8] {
    part.strip_suffix(b"\r\n")
        .or_else(|| part.strip_suffix(b"\n"))
        .unwrap_or(part)
}
