//! Typed, multi-valued attributes.
//!
//! Every attribute is owned by one request component ([`OwnerKind`]), has a
//! single [`DataType`] shared by all its values, and a [`Multiplicity`]:
//! - **ATOMIC**: exactly one value
//! - **GROUPED**: zero or more values
//!
//! Attribute ids are namespaced by their owner (`subject:roles`,
//! `object:type`, `action:id`, `environment:system-load`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttributeError, Result};

// ============================================================================
// Owner Kind
// ============================================================================

/// The request component an attribute describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerKind {
    /// The entity asking for access.
    Subject,
    /// The object being accessed.
    Resource,
    /// The operation being performed.
    Action,
    /// Context of the request (time, system state).
    Environment,
}

/// Id prefixes understood by [`infer_owner_kind`], in lookup order.
const OWNER_PREFIXES: [(&str, OwnerKind); 6] = [
    ("subject:", OwnerKind::Subject),
    ("object:", OwnerKind::Resource),
    ("resource:", OwnerKind::Resource),
    ("action:", OwnerKind::Action),
    ("environment:", OwnerKind::Environment),
    ("env:", OwnerKind::Environment),
];

impl OwnerKind {
    /// The canonical id prefix used when namespacing attribute names.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Subject => "subject:",
            Self::Resource => "object:",
            Self::Action => "action:",
            Self::Environment => "environment:",
        }
    }

    /// The upper-case tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "SUBJECT",
            Self::Resource => "RESOURCE",
            Self::Action => "ACTION",
            Self::Environment => "ENVIRONMENT",
        }
    }

    /// Returns true if `id` already carries one of this owner's prefixes.
    fn owns_prefix_of(self, id: &str) -> bool {
        OWNER_PREFIXES
            .iter()
            .any(|(prefix, kind)| *kind == self && id.starts_with(prefix))
    }
}

/// Infers the owner kind of an attribute from its id prefix.
///
/// Recognized prefixes: `subject:`, `object:` / `resource:`, `action:`,
/// `environment:` / `env:`. Anything else is an error; there is no default
/// owner.
pub fn infer_owner_kind(id: &str) -> Result<OwnerKind> {
    OWNER_PREFIXES
        .iter()
        .find(|(prefix, _)| id.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| AttributeError::UnknownOwnerPrefix { id: id.to_string() })
}

// ============================================================================
// Data Type / Multiplicity
// ============================================================================

/// The data type shared by all values of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Integer,
    Boolean,
    /// Milliseconds since the Unix epoch (UTC).
    #[serde(rename = "DATETIME")]
    DateTime,
    Double,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::DateTime => "DATETIME",
            Self::Double => "DOUBLE",
        }
    }
}

/// How many values an attribute carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Multiplicity {
    /// Exactly one value.
    Atomic,
    /// Zero or more values.
    Grouped,
}

// ============================================================================
// Value
// ============================================================================

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Milliseconds since the Unix epoch (UTC).
    DateTime(i64),
    Double(f64),
}

impl Value {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Boolean(_) => DataType::Boolean,
            Self::DateTime(_) => DataType::DateTime,
            Self::Double(_) => DataType::Double,
        }
    }

    /// Creates a DATETIME value from a UTC timestamp.
    pub fn datetime(ts: DateTime<Utc>) -> Self {
        Self::DateTime(ts.timestamp_millis())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(i) | Self::DateTime(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Double(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::datetime(value)
    }
}

// ============================================================================
// Attribute Value
// ============================================================================

/// One named, typed attribute.
///
/// Fields are private: the only way to obtain an `AttributeValue` is through
/// a constructor that checks the cardinality, type and owner invariants.
/// Deserialization goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAttributeValue")]
pub struct AttributeValue {
    id: String,
    owner_kind: OwnerKind,
    data_type: DataType,
    multiplicity: Multiplicity,
    values: Vec<Value>,
}

impl AttributeValue {
    /// Creates an attribute, namespacing `name` with the owner's prefix.
    ///
    /// A name that already carries one of the owner's prefixes is kept as is.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::AtomicCardinality`] if `multiplicity` is ATOMIC and
    ///   `values` does not hold exactly one value
    /// - [`AttributeError::TypeMismatch`] if a value is not of `data_type`
    pub fn new(
        owner_kind: OwnerKind,
        name: &str,
        data_type: DataType,
        multiplicity: Multiplicity,
        values: Vec<Value>,
    ) -> Result<Self> {
        let id = if owner_kind.owns_prefix_of(name) {
            name.to_string()
        } else {
            format!("{}{name}", owner_kind.prefix())
        };
        Self::checked(id, owner_kind, data_type, multiplicity, values)
    }

    /// Creates an ATOMIC attribute whose data type follows from the value.
    pub fn atomic(owner_kind: OwnerKind, name: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        Self::new(
            owner_kind,
            name,
            value.data_type(),
            Multiplicity::Atomic,
            vec![value],
        )
    }

    /// Creates a GROUPED attribute.
    pub fn grouped(
        owner_kind: OwnerKind,
        name: &str,
        data_type: DataType,
        values: Vec<Value>,
    ) -> Result<Self> {
        Self::new(owner_kind, name, data_type, Multiplicity::Grouped, values)
    }

    /// Creates an attribute from a fully namespaced id, inferring the owner
    /// kind from its prefix.
    pub fn inferred(
        id: &str,
        data_type: DataType,
        multiplicity: Multiplicity,
        values: Vec<Value>,
    ) -> Result<Self> {
        let owner_kind = infer_owner_kind(id)?;
        Self::checked(id.to_string(), owner_kind, data_type, multiplicity, values)
    }

    /// An ATOMIC string attribute with an already namespaced id. One string
    /// value satisfies both invariants.
    pub(crate) fn atomic_string(owner_kind: OwnerKind, id: String, value: String) -> Self {
        Self {
            id,
            owner_kind,
            data_type: DataType::String,
            multiplicity: Multiplicity::Atomic,
            values: vec![Value::String(value)],
        }
    }

    fn checked(
        id: String,
        owner_kind: OwnerKind,
        data_type: DataType,
        multiplicity: Multiplicity,
        values: Vec<Value>,
    ) -> Result<Self> {
        let prefixed = infer_owner_kind(&id)?;
        if prefixed != owner_kind {
            return Err(AttributeError::OwnerMismatch {
                id,
                expected: owner_kind,
                found: prefixed,
            });
        }
        if multiplicity == Multiplicity::Atomic && values.len() != 1 {
            return Err(AttributeError::AtomicCardinality {
                id,
                count: values.len(),
            });
        }
        if let Some(bad) = values.iter().find(|v| v.data_type() != data_type) {
            return Err(AttributeError::TypeMismatch {
                id,
                expected: data_type,
                found: bad.data_type(),
            });
        }
        Ok(Self {
            id,
            owner_kind,
            data_type,
            multiplicity,
            values,
        })
    }

    /// Appends a value to a GROUPED attribute.
    ///
    /// An ATOMIC attribute already holds its single value, so adding to it
    /// is a cardinality violation.
    pub fn add_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.multiplicity == Multiplicity::Atomic {
            return Err(AttributeError::AtomicCardinality {
                id: self.id.clone(),
                count: self.values.len() + 1,
            });
        }
        if value.data_type() != self.data_type {
            return Err(AttributeError::TypeMismatch {
                id: self.id.clone(),
                expected: self.data_type,
                found: value.data_type(),
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_kind(&self) -> OwnerKind {
        self.owner_kind
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns true if any value equals `value`.
    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

/// Unchecked serde shape of an [`AttributeValue`].
#[derive(Deserialize)]
struct RawAttributeValue {
    id: String,
    owner_kind: OwnerKind,
    data_type: DataType,
    multiplicity: Multiplicity,
    values: Vec<Value>,
}

impl TryFrom<RawAttributeValue> for AttributeValue {
    type Error = AttributeError;

    fn try_from(raw: RawAttributeValue) -> Result<Self> {
        Self::checked(
            raw.id,
            raw.owner_kind,
            raw.data_type,
            raw.multiplicity,
            raw.values,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("subject:roles", OwnerKind::Subject)]
    #[test_case("object:type", OwnerKind::Resource)]
    #[test_case("resource:owner", OwnerKind::Resource)]
    #[test_case("action:id", OwnerKind::Action)]
    #[test_case("environment:system-load", OwnerKind::Environment)]
    #[test_case("env:system-status", OwnerKind::Environment)]
    fn test_infer_owner_kind(id: &str, expected: OwnerKind) {
        assert_eq!(infer_owner_kind(id).unwrap(), expected);
    }

    #[test_case("roles")]
    #[test_case("user:roles")]
    #[test_case("")]
    #[test_case("Subject:roles")]
    fn test_infer_owner_kind_rejects_unknown_prefix(id: &str) {
        assert!(matches!(
            infer_owner_kind(id),
            Err(AttributeError::UnknownOwnerPrefix { .. })
        ));
    }

    #[test]
    fn test_namespacing() {
        let attr = AttributeValue::atomic(OwnerKind::Subject, "email", "a@example.com").unwrap();
        assert_eq!(attr.id(), "subject:email");

        let attr = AttributeValue::atomic(OwnerKind::Subject, "subject:email", "a@b").unwrap();
        assert_eq!(attr.id(), "subject:email", "existing prefix is kept");

        let attr = AttributeValue::atomic(OwnerKind::Resource, "resource:type", "doc").unwrap();
        assert_eq!(attr.id(), "resource:type", "alias prefix is kept");

        let attr = AttributeValue::atomic(OwnerKind::Environment, "system-load", 90).unwrap();
        assert_eq!(attr.id(), "environment:system-load");
        assert_eq!(attr.data_type(), DataType::Integer);
    }

    #[test]
    fn test_atomic_requires_exactly_one_value() {
        let empty = AttributeValue::new(
            OwnerKind::Subject,
            "fired",
            DataType::Boolean,
            Multiplicity::Atomic,
            vec![],
        );
        assert_eq!(
            empty,
            Err(AttributeError::AtomicCardinality {
                id: "subject:fired".to_string(),
                count: 0
            })
        );

        let two = AttributeValue::new(
            OwnerKind::Subject,
            "fired",
            DataType::Boolean,
            Multiplicity::Atomic,
            vec![Value::Boolean(true), Value::Boolean(false)],
        );
        assert!(matches!(
            two,
            Err(AttributeError::AtomicCardinality { count: 2, .. })
        ));
    }

    #[test]
    fn test_add_value_to_atomic_rejected() {
        let mut attr = AttributeValue::atomic(OwnerKind::Subject, "tenant", "1").unwrap();
        assert!(attr.add_value("2").is_err());
        assert_eq!(attr.values().len(), 1, "atomic value must be untouched");
    }

    #[test]
    fn test_grouped_build_up() {
        let mut roles =
            AttributeValue::grouped(OwnerKind::Subject, "roles", DataType::String, vec![]).unwrap();
        roles.add_value("helpdesk").unwrap();
        roles.add_value("iminds-pr").unwrap();
        assert_eq!(roles.values().len(), 2);
        assert!(roles.contains(&Value::from("helpdesk")));

        let err = roles.add_value(7).unwrap_err();
        assert!(matches!(err, AttributeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let result = AttributeValue::grouped(
            OwnerKind::Resource,
            "destinations",
            DataType::String,
            vec![Value::from("a@example.com"), Value::Integer(3)],
        );
        assert!(matches!(
            result,
            Err(AttributeError::TypeMismatch {
                expected: DataType::String,
                found: DataType::Integer,
                ..
            })
        ));
    }

    #[test]
    fn test_inferred_keeps_id() {
        let attr = AttributeValue::inferred(
            "env:system-status",
            DataType::String,
            Multiplicity::Atomic,
            vec![Value::from("overload")],
        )
        .unwrap();
        assert_eq!(attr.id(), "env:system-status");
        assert_eq!(attr.owner_kind(), OwnerKind::Environment);
    }

    #[test]
    fn test_deserialize_rejects_empty_atomic() {
        let result = serde_json::from_str::<AttributeValue>(
            r#"{"id":"subject:fired","owner_kind":"SUBJECT","data_type":"BOOLEAN","multiplicity":"ATOMIC","values":[]}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("exactly one value"), "{err}");
    }

    #[test]
    fn test_deserialize_rejects_mixed_value_types() {
        let result = serde_json::from_str::<AttributeValue>(
            r#"{"id":"subject:tags","owner_kind":"SUBJECT","data_type":"BOOLEAN","multiplicity":"GROUPED","values":[{"String":"a"},{"Integer":3}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_foreign_prefix() {
        let result = serde_json::from_str::<AttributeValue>(
            r#"{"id":"object:type","owner_kind":"SUBJECT","data_type":"STRING","multiplicity":"ATOMIC","values":[{"String":"doc"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_keeps_valid_attribute() {
        let roles = AttributeValue::grouped(
            OwnerKind::Subject,
            "roles",
            DataType::String,
            vec!["helpdesk".into()],
        )
        .unwrap();
        let json = serde_json::to_string(&roles).unwrap();
        assert_eq!(serde_json::from_str::<AttributeValue>(&json).unwrap(), roles);
    }

    #[test]
    fn test_datetime_is_millis() {
        use chrono::TimeZone;
        let ts = Utc.with_ymd_and_hms(2014, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(Value::datetime(ts), Value::DateTime(1_393_675_200_000));
    }

    proptest! {
        #[test]
        fn prop_atomic_cardinality_never_truncated(n in 0usize..6) {
            let values: Vec<Value> = (0..n).map(|i| Value::Integer(i as i64)).collect();
            let result = AttributeValue::new(
                OwnerKind::Subject,
                "ancienity",
                DataType::Integer,
                Multiplicity::Atomic,
                values,
            );
            if n == 1 {
                prop_assert_eq!(result.unwrap().values().len(), 1);
            } else {
                let is_cardinality_error =
                    matches!(result, Err(AttributeError::AtomicCardinality { count, .. }) if count == n);
                prop_assert!(is_cardinality_error);
            }
        }

        #[test]
        fn prop_grouped_keeps_all_values(n in 0usize..16) {
            let values: Vec<Value> = (0..n).map(|i| Value::from(format!("v{i}"))).collect();
            let attr = AttributeValue::grouped(OwnerKind::Resource, "tags", DataType::String, values.clone()).unwrap();
            prop_assert_eq!(attr.values(), &values[..]);
        }
    }
}
