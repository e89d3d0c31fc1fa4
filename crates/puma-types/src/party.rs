//! Request parties and the cached attribute set.
//!
//! A request is made of four parties: [`Subject`], [`Object`], [`Action`]
//! and [`Environment`]. Each carries an informational id and the attributes
//! that describe it. Decision points never key off the ids; policies only
//! see the flattened [`CachedAttributeSet`].

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeValue, DataType, OwnerKind, Value};
use crate::error::{AttributeError, Result};

/// Sentinel subject id placed in every request forwarded to an engine.
pub const SUBJECT_ID_PLACEHOLDER: &str = "THE-SUBJECT-ID-IN-THE-REQUEST-WHICH-SHOULD-NEVER-BE-NEEDED";
/// Sentinel object id placed in every request forwarded to an engine.
pub const OBJECT_ID_PLACEHOLDER: &str = "THE-OBJECT-ID-IN-THE-REQUEST-WHICH-SHOULD-NEVER-BE-NEEDED";
/// Sentinel action id placed in every request forwarded to an engine.
pub const ACTION_ID_PLACEHOLDER: &str = "THE-ACTION-ID-IN-THE-REQUEST-WHICH-SHOULD-NEVER-BE-NEEDED";

/// Implements the accessors and attribute handling shared by all parties.
macro_rules! party {
    ($name:ident, $kind:expr) => {
        impl $name {
            /// The owner kind of every attribute this party carries.
            pub const OWNER: OwnerKind = $kind;

            pub fn id(&self) -> &str {
                &self.id
            }

            pub fn attributes(&self) -> &[AttributeValue] {
                &self.attributes
            }

            /// Attaches an attribute.
            ///
            /// Rejects attributes owned by another party kind and ids that
            /// are already present.
            pub fn add_attribute(&mut self, attribute: AttributeValue) -> Result<()> {
                if attribute.owner_kind() != Self::OWNER {
                    return Err(AttributeError::OwnerMismatch {
                        id: attribute.id().to_string(),
                        expected: Self::OWNER,
                        found: attribute.owner_kind(),
                    });
                }
                if self.attributes.iter().any(|a| a.id() == attribute.id()) {
                    return Err(AttributeError::DuplicateAttribute {
                        id: attribute.id().to_string(),
                    });
                }
                self.attributes.push(attribute);
                Ok(())
            }

            /// Builder form of [`Self::add_attribute`].
            pub fn with_attribute(mut self, attribute: AttributeValue) -> Result<Self> {
                self.add_attribute(attribute)?;
                Ok(self)
            }

            /// Attaches an ATOMIC attribute named `name` (namespaced with
            /// this party's prefix).
            pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
                self.add_attribute(AttributeValue::atomic(Self::OWNER, name, value)?)
            }

            /// Attaches a GROUPED attribute named `name`.
            pub fn set_all(
                &mut self,
                name: &str,
                data_type: DataType,
                values: Vec<Value>,
            ) -> Result<()> {
                self.add_attribute(AttributeValue::grouped(Self::OWNER, name, data_type, values)?)
            }
        }

        impl TryFrom<RawParty> for $name {
            type Error = AttributeError;

            fn try_from(raw: RawParty) -> Result<Self> {
                let mut party = Self {
                    id: raw.id,
                    attributes: Vec::with_capacity(raw.attributes.len()),
                };
                for attribute in raw.attributes {
                    party.add_attribute(attribute)?;
                }
                Ok(party)
            }
        }
    };
}

/// Unchecked serde shape shared by all parties. Deserialized parties are
/// rebuilt through `add_attribute`.
#[derive(Deserialize)]
struct RawParty {
    id: String,
    attributes: Vec<AttributeValue>,
}

/// The entity requesting access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParty")]
pub struct Subject {
    id: String,
    attributes: Vec<AttributeValue>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
        }
    }
}

party!(Subject, OwnerKind::Subject);

/// The resource being accessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParty")]
pub struct Object {
    id: String,
    attributes: Vec<AttributeValue>,
}

impl Object {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
        }
    }
}

party!(Object, OwnerKind::Resource);

/// The operation being performed.
///
/// The action name is also exposed as the ATOMIC string attribute
/// `action:id`, since policies only see cached attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParty")]
pub struct Action {
    id: String,
    attributes: Vec<AttributeValue>,
}

impl Action {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut action = Self::bare(id.clone());
        action.attributes.push(AttributeValue::atomic_string(
            OwnerKind::Action,
            "action:id".to_string(),
            id,
        ));
        action
    }

    /// An action without the `action:id` attribute.
    fn bare(id: String) -> Self {
        Self {
            id,
            attributes: Vec::new(),
        }
    }
}

party!(Action, OwnerKind::Action);

/// The context of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParty")]
pub struct Environment {
    id: String,
    attributes: Vec<AttributeValue>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            id: "environment".to_string(),
            attributes: Vec::new(),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

party!(Environment, OwnerKind::Environment);

// ============================================================================
// Party Ids
// ============================================================================

/// The `(subject, object, action)` id triple, used for log correlation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyIds {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PartyIds {
    pub fn of(subject: &Subject, object: &Object, action: &Action) -> Self {
        Self {
            subject: subject.id.clone(),
            object: object.id.clone(),
            action: action.id.clone(),
        }
    }
}

impl Display for PartyIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.object, self.action)
    }
}

// ============================================================================
// Evaluation Request
// ============================================================================

/// The four parties of one authorization question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub subject: Subject,
    pub object: Object,
    pub action: Action,
    pub environment: Environment,
}

impl EvaluationRequest {
    /// The request forwarded to engines and legacy remotes.
    ///
    /// Carries sentinel ids and no attributes; every policy-relevant fact
    /// travels in the [`CachedAttributeSet`] instead.
    pub fn placeholder() -> Self {
        Self {
            subject: Subject::new(SUBJECT_ID_PLACEHOLDER),
            object: Object::new(OBJECT_ID_PLACEHOLDER),
            action: Action::bare(ACTION_ID_PLACEHOLDER.to_string()),
            environment: Environment::new(),
        }
    }
}

// ============================================================================
// Cached Attribute Set
// ============================================================================

/// The flattened attributes of one evaluation call.
///
/// Ordered subject, object, action, environment. Built fresh per call by
/// [`as_cached_attributes`] and never shared across calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedAttributeSet {
    attributes: Vec<AttributeValue>,
}

/// Concatenates the attributes of all four parties in the fixed order
/// subject, object, action, environment.
pub fn as_cached_attributes(
    subject: &Subject,
    object: &Object,
    action: &Action,
    environment: &Environment,
) -> CachedAttributeSet {
    let attributes = subject
        .attributes
        .iter()
        .chain(&object.attributes)
        .chain(&action.attributes)
        .chain(&environment.attributes)
        .cloned()
        .collect();
    CachedAttributeSet { attributes }
}

impl CachedAttributeSet {
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn as_slice(&self) -> &[AttributeValue] {
        &self.attributes
    }

    /// Looks up an attribute by owner, id and data type.
    pub fn find(&self, owner: OwnerKind, id: &str, data_type: DataType) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.owner_kind() == owner && a.id() == id && a.data_type() == data_type)
    }

    /// Looks up an attribute by id only.
    pub fn get(&self, id: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|a| a.id() == id)
    }
}

impl<'a> IntoIterator for &'a CachedAttributeSet {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_parties() -> (Subject, Object, Action, Environment) {
        let mut subject = Subject::new("maarten");
        subject
            .set_all("roles", DataType::String, vec!["helpdesk".into(), "iminds-pr".into()])
            .unwrap();
        subject.set("fired", false).unwrap();

        let mut object = Object::new("123");
        object.set("type", "document").unwrap();

        let action = Action::new("delete");

        let mut environment = Environment::new();
        environment.set("system-load", 90).unwrap();

        (subject, object, action, environment)
    }

    #[test]
    fn test_cached_attribute_order() {
        let (subject, object, action, environment) = sample_parties();
        let cache = as_cached_attributes(&subject, &object, &action, &environment);

        let ids: Vec<&str> = cache.iter().map(AttributeValue::id).collect();
        assert_eq!(
            ids,
            vec![
                "subject:roles",
                "subject:fired",
                "object:type",
                "action:id",
                "environment:system-load",
            ]
        );
    }

    #[test]
    fn test_action_exposes_id_attribute() {
        let action = Action::new("read");
        let attr = action.attributes().first().unwrap();
        assert_eq!(attr.id(), "action:id");
        assert_eq!(attr.values(), &[Value::from("read")]);
    }

    #[test]
    fn test_owner_mismatch_rejected() {
        let mut subject = Subject::new("alice");
        let attr = AttributeValue::atomic(OwnerKind::Resource, "type", "document").unwrap();
        assert!(matches!(
            subject.add_attribute(attr),
            Err(AttributeError::OwnerMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let mut subject = Subject::new("alice");
        subject.set("email", "a@example.com").unwrap();
        assert_eq!(
            subject.set("email", "b@example.com"),
            Err(AttributeError::DuplicateAttribute {
                id: "subject:email".to_string()
            })
        );
    }

    #[test]
    fn test_deserialize_rejects_foreign_attribute() {
        let object = Object::new("123").with_attribute(
            AttributeValue::atomic(OwnerKind::Resource, "type", "document").unwrap(),
        );
        let json = serde_json::to_string(&object.unwrap()).unwrap();

        assert!(serde_json::from_str::<Subject>(&json).is_err());
        assert_eq!(
            serde_json::from_str::<Object>(&json).unwrap().attributes()[0].id(),
            "object:type"
        );
    }

    #[test]
    fn test_deserialize_rejects_duplicate_attribute() {
        let json = r#"{"id":"alice","attributes":[
            {"id":"subject:email","owner_kind":"SUBJECT","data_type":"STRING","multiplicity":"ATOMIC","values":[{"String":"a@example.com"}]},
            {"id":"subject:email","owner_kind":"SUBJECT","data_type":"STRING","multiplicity":"ATOMIC","values":[{"String":"b@example.com"}]}
        ]}"#;
        let err = serde_json::from_str::<Subject>(json).unwrap_err().to_string();
        assert!(err.contains("duplicate attribute"), "{err}");
    }

    #[test]
    fn test_action_serde_keeps_id_attribute() {
        let action = Action::new("delete");
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(serde_json::from_str::<Action>(&json).unwrap(), action);
    }

    #[test]
    fn test_placeholder_request_hides_ids() {
        let request = EvaluationRequest::placeholder();
        assert_eq!(request.subject.id(), SUBJECT_ID_PLACEHOLDER);
        assert_eq!(request.object.id(), OBJECT_ID_PLACEHOLDER);
        assert_eq!(request.action.id(), ACTION_ID_PLACEHOLDER);
        assert!(request.action.attributes().is_empty());
        assert!(request.environment.attributes().is_empty());
    }

    #[test]
    fn test_find_by_owner_and_type() {
        let (subject, object, action, environment) = sample_parties();
        let cache = as_cached_attributes(&subject, &object, &action, &environment);

        assert!(cache.find(OwnerKind::Subject, "subject:roles", DataType::String).is_some());
        assert!(cache.find(OwnerKind::Subject, "subject:roles", DataType::Integer).is_none());
        assert!(cache.find(OwnerKind::Resource, "subject:roles", DataType::String).is_none());
    }

    #[test]
    fn test_party_ids_display() {
        let (subject, object, action, _) = sample_parties();
        assert_eq!(
            PartyIds::of(&subject, &object, &action).to_string(),
            "(maarten, 123, delete)"
        );
    }
}
