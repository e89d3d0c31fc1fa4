//! Policy document header parsing.
//!
//! Only the parts the decision point needs are read: the root element and
//! its id, plus every `RemotePolicyReference`. Rule content is left to the
//! evaluation engine.

use puma_types::PolicyReference;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{PolicyError, PolicyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Policy,
    PolicySet,
}

impl PolicyKind {
    fn id_attribute(self) -> &'static [u8] {
        match self {
            Self::Policy => b"PolicyId",
            Self::PolicySet => b"PolicySetId",
        }
    }

    fn element(self) -> &'static str {
        match self {
            Self::Policy => "Policy",
            Self::PolicySet => "PolicySet",
        }
    }
}

/// A parsed application policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    id: String,
    kind: PolicyKind,
    remote_references: Vec<PolicyReference>,
    text: String,
}

impl PolicyDocument {
    pub fn parse(text: impl Into<String>) -> PolicyResult<Self> {
        let text = text.into();
        let mut reader = Reader::from_str(&text);
        reader.config_mut().trim_text(true);

        let mut root: Option<(PolicyKind, String)> = None;
        let mut remote_references = Vec::new();
        let mut reference_text = false;

        loop {
            let event = reader.read_event().map_err(|e| {
                PolicyError::Malformed(format!("at byte {}: {e}", reader.error_position()))
            })?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let name = e.local_name();
                    if root.is_none() {
                        let kind = match name.as_ref() {
                            b"Policy" => PolicyKind::Policy,
                            b"PolicySet" => PolicyKind::PolicySet,
                            _ => return Err(PolicyError::MissingRoot),
                        };
                        let id = attribute(e, kind.id_attribute())?.ok_or_else(|| {
                            PolicyError::MissingPolicyId {
                                element: kind.element().to_string(),
                            }
                        })?;
                        root = Some((kind, id));
                    } else if name.as_ref() == b"RemotePolicyReference" {
                        match attribute(e, b"PolicyId")? {
                            Some(id) => remote_references.push(PolicyReference::new(id)),
                            None => reference_text = !is_empty,
                        }
                    }
                }
                Event::Text(ref t) if reference_text => {
                    let id = t.unescape().map_err(|e| PolicyError::Malformed(e.to_string()))?;
                    remote_references.push(PolicyReference::new(id.trim()));
                    reference_text = false;
                }
                Event::End(_) => reference_text = false,
                Event::Eof => break,
                _ => {}
            }
        }

        let (kind, id) = root.ok_or(PolicyError::MissingRoot)?;
        Ok(Self {
            id,
            kind,
            remote_references,
            text,
        })
    }

    /// Parses and checks the declared id against `expected_id`.
    pub fn parse_expecting(text: impl Into<String>, expected_id: &str) -> PolicyResult<Self> {
        let document = Self::parse(text)?;
        if document.id != expected_id {
            return Err(PolicyError::IdMismatch {
                expected: expected_id.to_string(),
                found: document.id,
            });
        }
        Ok(document)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Ids of the remote policies this document defers to, in document order.
    pub fn remote_references(&self) -> &[PolicyReference] {
        &self.remote_references
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> PolicyResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| PolicyError::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| PolicyError::Malformed(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
