//! Body structure reported by FETCH BODYSTRUCTURE.

use super::Envelope;
use mailgate_mime::{Body, Entity, Headers, MAX_DEPTH, PartPath, PartTree};

/// Fields shared by every non-multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BodyFields {
    /// Body parameters.
    pub params: Vec<(String, String)>,
    /// Content-ID.
    pub id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Content-Transfer-Encoding.
    pub encoding: String,
    /// Body size in bytes.
    pub size: u32,
    /// Content-Disposition.
    pub disposition: Option<BodyDisposition>,
}

impl BodyFields {
    /// Returns a body parameter by case-insensitive name.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        find_param(&self.params, key)
    }
}

/// Content-Disposition as reported in the body structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDisposition {
    /// Disposition type, e.g. `attachment`.
    pub kind: String,
    /// Disposition parameters.
    pub params: Vec<(String, String)>,
}

/// Body structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// Single-part body that is neither text nor a message.
    Basic {
        /// MIME type.
        media_type: String,
        /// MIME subtype.
        media_subtype: String,
        /// Common fields.
        fields: BodyFields,
    },
    /// Text body.
    Text {
        /// Text subtype.
        subtype: String,
        /// Common fields.
        fields: BodyFields,
        /// Size in lines.
        lines: u32,
    },
    /// Message/RFC822 body.
    Message {
        /// Common fields.
        fields: BodyFields,
        /// Envelope of nested message.
        envelope: Box<Envelope>,
        /// Body structure of nested message.
        body: Box<Self>,
        /// Size in lines.
        lines: u32,
    },
    /// Multipart body.
    Multipart {
        /// Child body parts.
        bodies: Vec<Self>,
        /// Multipart subtype.
        subtype: String,
    },
}

/// A leaf part offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Where the part sits in the message.
    pub path: PartPath,
    /// Suggested filename, decoded.
    pub filename: Option<String>,
    /// `type/subtype`.
    pub mime_type: String,
}

impl BodyStructure {
    /// Returns `type/subtype`, lowercased.
    #[must_use]
    pub fn mime_type(&self) -> String {
        match self {
            Self::Basic {
                media_type,
                media_subtype,
                ..
            } => format!("{media_type}/{media_subtype}").to_ascii_lowercase(),
            Self::Text { subtype, .. } => format!("text/{}", subtype.to_ascii_lowercase()),
            Self::Message { .. } => "message/rfc822".to_string(),
            Self::Multipart { subtype, .. } => {
                format!("multipart/{}", subtype.to_ascii_lowercase())
            }
        }
    }

    /// Checks the type and subtype, ignoring case.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.mime_type()
            .split_once('/')
            .is_some_and(|(m, s)| m.eq_ignore_ascii_case(main_type) && s.eq_ignore_ascii_case(sub_type))
    }

    /// Common fields, `None` for multiparts.
    #[must_use]
    pub const fn fields(&self) -> Option<&BodyFields> {
        match self {
            Self::Basic { fields, .. } | Self::Text { fields, .. } | Self::Message { fields, .. } => {
                Some(fields)
            }
            Self::Multipart { .. } => None,
        }
    }

    /// Suggested filename from the disposition, falling back to the `name`
    /// parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let fields = self.fields()?;
        let raw = fields
            .disposition
            .as_ref()
            .and_then(|d| find_param(&d.params, "filename"))
            .or_else(|| fields.param("name"))?;
        Some(Headers::decode_value(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// Returns true for leaves with an `attachment` disposition or a filename.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        let Some(fields) = self.fields() else {
            return false;
        };
        let disposition = fields
            .disposition
            .as_ref()
            .is_some_and(|d| d.kind.eq_ignore_ascii_case("attachment"));
        disposition || self.filename().is_some()
    }

    /// Path of the body to display: the first inline `text/plain` leaf,
    /// else the first inline `text/html` leaf, searched depth-first.
    ///
    /// A single-part text message is its own body, so the empty path is
    /// returned.
    #[must_use]
    pub fn text_part_path(&self) -> Option<PartPath> {
        let mut leaves = Vec::new();
        collect_leaves(self, PartPath::root(), &mut leaves);
        let inline_text = |sub: &str| {
            leaves
                .iter()
                .find(|(_, node)| node.is("text", sub) && !node.is_attachment())
                .map(|(path, _)| path.clone())
        };
        inline_text("plain").or_else(|| inline_text("html"))
    }

    /// Every attachment leaf, in document order.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut leaves = Vec::new();
        collect_leaves(self, PartPath::root(), &mut leaves);
        leaves
            .into_iter()
            .filter(|(_, node)| node.is_attachment())
            .map(|(path, node)| Attachment {
                path,
                filename: node.filename(),
                mime_type: node.mime_type(),
            })
            .collect()
    }
}

fn collect_leaves<'a>(node: &'a BodyStructure, path: PartPath, out: &mut Vec<(PartPath, &'a BodyStructure)>) {
    match node {
        BodyStructure::Multipart { bodies, .. } => {
            for (index, child) in (1u32..).zip(bodies) {
                collect_leaves(child, path.child(index), out);
            }
        }
        _ => out.push((path, node)),
    }
}

fn find_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

impl PartTree for BodyStructure {
    fn subparts(&self) -> Option<&[Self]> {
        match self {
            Self::Multipart { bodies, .. } => Some(bodies),
            _ => None,
        }
    }
}

impl From<&Entity> for BodyStructure {
    /// Describes a parsed entity the way a server would report it.
    ///
    /// Embedded `message/rfc822` parts are described too, down to
    /// [`MAX_DEPTH`] levels in total; deeper ones are left opaque.
    fn from(entity: &Entity) -> Self {
        describe(entity, 0)
    }
}

fn opaque() -> BodyStructure {
    BodyStructure::Basic {
        media_type: "application".to_string(),
        media_subtype: "octet-stream".to_string(),
        fields: BodyFields::default(),
    }
}

fn describe(entity: &Entity, depth: usize) -> BodyStructure {
    let content_type = entity.content_type();
    let raw = match &entity.body {
        Body::Multipart(children) => {
            return BodyStructure::Multipart {
                bodies: children.iter().map(|child| describe(child, depth + 1)).collect(),
                subtype: content_type.sub_type,
            };
        }
        Body::Single(raw) => raw,
    };

    let fields = BodyFields {
        params: content_type
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        id: entity.headers.get("content-id").map(str::to_string),
        description: entity
            .headers
            .get("content-description")
            .map(str::to_string),
        encoding: entity.transfer_encoding().to_string(),
        size: u32::try_from(raw.len()).unwrap_or(u32::MAX),
        disposition: entity.headers.content_disposition().map(|d| BodyDisposition {
            kind: d.kind,
            params: d.parameters.into_iter().collect(),
        }),
    };
    let lines = u32::try_from(raw.split(|&b| b == b'\n').count()).unwrap_or(u32::MAX);

    if content_type.is_text() {
        BodyStructure::Text {
            subtype: content_type.sub_type,
            fields,
            lines,
        }
    } else if content_type.is("message", "rfc822") {
        let nested = (depth < MAX_DEPTH)
            .then(|| Entity::parse(raw).ok())
            .flatten()
            .map_or_else(opaque, |nested| describe(&nested, depth + 1));
        BodyStructure::Message {
            fields,
            envelope: Box::default(),
            body: Box::new(nested),
            lines,
        }
    } else {
        BodyStructure::Basic {
            media_type: content_type.main_type,
            media_subtype: content_type.sub_type,
            fields,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn text(subtype: &str) -> BodyStructure {
        BodyStructure::Text {
            subtype: subtype.to_string(),
            fields: BodyFields {
                params: vec![("charset".to_string(), "utf-8".to_string())],
                encoding: "7bit".to_string(),
                ..BodyFields::default()
            },
            lines: 1,
        }
    }

    fn attachment(media_type: &str, media_subtype: &str, filename: &str) -> BodyStructure {
        BodyStructure::Basic {
            media_type: media_type.to_string(),
            media_subtype: media_subtype.to_string(),
            fields: BodyFields {
                encoding: "base64".to_string(),
                disposition: Some(BodyDisposition {
                    kind: "attachment".to_string(),
                    params: vec![("filename".to_string(), filename.to_string())],
                }),
                ..BodyFields::default()
            },
        }
    }

    fn multipart(subtype: &str, bodies: Vec<BodyStructure>) -> BodyStructure {
        BodyStructure::Multipart {
            bodies,
            subtype: subtype.to_string(),
        }
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(text("HTML").mime_type(), "text/html");
        assert_eq!(multipart("Mixed", vec![]).mime_type(), "multipart/mixed");
        assert!(attachment("Application", "PDF", "a.pdf").is("application", "pdf"));
    }

    #[test]
    fn test_text_part_single() {
        assert_eq!(text("plain").text_part_path(), Some(PartPath::root()));
        assert_eq!(attachment("image", "png", "x.png").text_part_path(), None);
    }

    #[test]
    fn test_text_part_prefers_plain() {
        let body = multipart(
            "mixed",
            vec![
                multipart("alternative", vec![text("html"), text("plain")]),
                attachment("application", "pdf", "report.pdf"),
            ],
        );
        assert_eq!(body.text_part_path().unwrap().to_string(), "1.2");
    }

    #[test]
    fn test_text_part_falls_back_to_html() {
        let body = multipart("alternative", vec![text("html")]);
        assert_eq!(body.text_part_path().unwrap().to_string(), "1");
    }

    #[test]
    fn test_attachments() {
        let body = multipart(
            "mixed",
            vec![
                text("plain"),
                multipart(
                    "mixed",
                    vec![attachment("image", "png", "=?utf-8?Q?caf=C3=A9.png?=")],
                ),
                attachment("application", "pdf", "report.pdf"),
            ],
        );
        let attachments = body.attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].path.to_string(), "2.1");
        assert_eq!(attachments[0].filename.as_deref(), Some("café.png"));
        assert_eq!(attachments[1].mime_type, "application/pdf");
    }

    #[test]
    fn test_resolve_with_part_path() {
        let body = multipart("mixed", vec![text("plain"), attachment("image", "png", "a.png")]);
        let path: PartPath = "2".parse().unwrap();
        assert!(path.resolve(&body).unwrap().is("image", "png"));
        assert!("3".parse::<PartPath>().unwrap().resolve(&body).is_err());
    }

    #[test]
    fn test_from_entity() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hello\r\n",
            "--b\r\n",
            "Content-Type: application/pdf\r\n",
            "Content-Disposition: attachment; filename=r.pdf\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAAA\r\n",
            "--b--\r\n",
        );
        let entity = Entity::parse(raw.as_bytes()).unwrap();
        let body = BodyStructure::from(&entity);

        assert!(body.is("multipart", "mixed"));
        assert_eq!(body.text_part_path().unwrap().to_string(), "1");
        let attachments = body.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename.as_deref(), Some("r.pdf"));
        assert_eq!(
            attachments[0].path.resolve(&body).unwrap().fields().unwrap().encoding,
            "base64"
        );
    }

    #[test]
    fn test_from_entity_bounds_embedded_messages() {
        let mut raw = "Content-Type: message/rfc822\r\n\r\n".repeat(500);
        raw.push_str("Content-Type: text/plain\r\n\r\ninnermost");
        let entity = Entity::parse(raw.as_bytes()).unwrap();

        let mut node = &BodyStructure::from(&entity);
        let mut levels = 0;
        while let BodyStructure::Message { body, .. } = node {
            node = body;
            levels += 1;
        }
        assert_eq!(levels, MAX_DEPTH + 1);
        assert!(node.is("application", "octet-stream"));
    }
}
