//! Part paths: addressing one entity inside a MIME tree.
//!
//! A part path is a sequence of 1-based child indices. `[2, 1]` means "the
//! first child of the second child of the root". The empty path addresses
//! the root entity itself, i.e. the whole message.
//!
//! Paths are written as decimal integers joined by `.` or `/` (`"2.1"`,
//! `"2/1"`); the empty string is the empty path.

use crate::content_type::ContentType;
use crate::entity::{Body, Entity};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;
use std::str::FromStr;

/// A tree whose nodes may have ordered children.
///
/// Implemented by parsed entities and by server-reported body structures,
/// so both can be addressed with the same paths.
pub trait PartTree: Sized {
    /// Returns the children if this node is multipart, `None` for leaves.
    fn subparts(&self) -> Option<&[Self]>;
}

/// Ordered sequence of 1-based child indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PartPath(Vec<u32>);

impl PartPath {
    /// The empty path, addressing the whole message.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if any index is zero.
    pub fn new(indices: Vec<u32>) -> Result<Self> {
        if indices.contains(&0) {
            return Err(Error::InvalidPath(
                "part indices start at 1".to_string(),
            ));
        }
        Ok(Self(indices))
    }

    /// Returns true for the empty path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the indices.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Returns this path extended by one child index.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Resolves this path against a tree, returning the addressed node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] when an index is out of range or when a
    /// step tries to descend into a leaf.
    pub fn resolve<'a, T: PartTree>(&self, root: &'a T) -> Result<&'a T> {
        let mut node = root;
        for (depth, &index) in self.0.iter().enumerate() {
            let children = node
                .subparts()
                .ok_or_else(|| self.not_multipart(depth))?;
            node = child_index(children.len(), index)
                .and_then(|i| children.get(i))
                .ok_or_else(|| self.out_of_range(depth, children.len()))?;
        }
        Ok(node)
    }

    fn not_multipart(&self, depth: usize) -> Error {
        Error::InvalidPath(format!(
            "{self}: part at depth {depth} is not multipart"
        ))
    }

    fn out_of_range(&self, depth: usize, count: usize) -> Error {
        Error::InvalidPath(format!(
            "{self}: index at depth {depth} is outside 1..={count}"
        ))
    }
}

fn child_index(count: usize, index: u32) -> Option<usize> {
    let index = usize::try_from(index).ok()?;
    (1..=count).contains(&index).then(|| index - 1)
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

impl FromStr for PartPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let indices = s
            .split(['.', '/'])
            .map(|segment| {
                if segment.is_empty() {
                    return Err(Error::InvalidPath(format!("{s:?}: empty segment")));
                }
                if !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::InvalidPath(format!(
                        "{s:?}: segment {segment:?} is not a number"
                    )));
                }
                segment.parse::<u32>().map_err(|e| {
                    Error::InvalidPath(format!("{s:?}: segment {segment:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(indices)
    }
}

/// An entity located by a part path, detached from its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    /// Path used to locate the entity.
    pub path: PartPath,
    /// The located entity.
    pub entity: Entity,
}

impl MessagePart {
    /// Descends into `message` along `path`, taking ownership of the
    /// addressed subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] when the path does not exist.
    pub fn extract(message: Entity, path: PartPath) -> Result<Self> {
        // Validate first so the error message can name the whole path.
        path.resolve(&message)?;

        let mut entity = message;
        for (depth, &index) in path.as_slice().iter().enumerate() {
            let Body::Multipart(mut children) = entity.body else {
                return Err(path.not_multipart(depth));
            };
            let i = child_index(children.len(), index)
                .ok_or_else(|| path.out_of_range(depth, children.len()))?;
            entity = children.swap_remove(i);
        }

        Ok(Self { path, entity })
    }

    /// Content type used to present this part.
    ///
    /// The whole message (empty path) is reported as `message/rfc822`
    /// rather than its own top-level type.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        if self.path.is_root() {
            ContentType::message_rfc822()
        } else {
            self.entity.content_type()
        }
    }

    /// Headers of the located entity.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.entity.headers
    }

    /// Suggested filename from `Content-Disposition`, falling back to the
    /// `name` parameter of `Content-Type`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let raw = self
            .entity
            .headers
            .content_disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| {
                self.entity
                    .content_type()
                    .parameter("name")
                    .map(str::to_string)
            })?;
        Some(Headers::decode_value(&raw).unwrap_or(raw))
    }

    /// Whether a raw download of this part should be offered as an
    /// attachment rather than displayed inline.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        let disposition_attachment = self
            .entity
            .headers
            .content_disposition()
            .is_some_and(|d| d.is_attachment());
        disposition_attachment || !self.content_type().is("text", "plain")
    }
}
