//! JSON bodies of the REST transport.
//!
//! ```json
//! {"attributes":[{"id":"subject:roles","ownerKind":"SUBJECT",
//!   "dataType":"STRING","multiplicity":"GROUPED","values":["helpdesk"]}]}
//! ```
//!
//! DATETIME values are integers (milliseconds since the epoch).

use puma_types::{
    AttributeValue, CachedAttributeSet, DataType, Multiplicity, OwnerKind, Value, infer_owner_kind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::decision::RemoteDecision;
use crate::error::{WireError, WireResult};

/// Path of the evaluation endpoint, relative to the base URL.
pub const EVALUATE_PATH: &str = "/evaluate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestAttribute {
    pub id: String,
    /// Must agree with the id prefix when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_kind: Option<OwnerKind>,
    pub data_type: DataType,
    pub multiplicity: Multiplicity,
    pub values: Vec<Json>,
}

impl RestAttribute {
    pub fn encode(attribute: &AttributeValue) -> Self {
        Self {
            id: attribute.id().to_string(),
            owner_kind: Some(attribute.owner_kind()),
            data_type: attribute.data_type(),
            multiplicity: attribute.multiplicity(),
            values: attribute.values().iter().map(value_to_json).collect(),
        }
    }

    /// The owner kind named by the id prefix.
    ///
    /// Ids on the wire are already namespaced. An explicit `ownerKind` must
    /// agree with the prefix; it never renames the id.
    pub fn resolve_owner_kind(&self) -> WireResult<OwnerKind> {
        let prefixed = infer_owner_kind(&self.id)?;
        match self.owner_kind {
            Some(declared) if declared != prefixed => Err(WireError::OwnerKindMismatch {
                id: self.id.clone(),
                declared,
                prefixed,
            }),
            _ => Ok(prefixed),
        }
    }

    pub fn decode(&self) -> WireResult<AttributeValue> {
        self.resolve_owner_kind()?;
        let values = self
            .values
            .iter()
            .map(|json| {
                json_to_value(json, self.data_type).ok_or_else(|| WireError::InvalidJsonValue {
                    id: self.id.clone(),
                    data_type: self.data_type,
                })
            })
            .collect::<WireResult<Vec<_>>>()?;
        Ok(AttributeValue::inferred(
            &self.id,
            self.data_type,
            self.multiplicity,
            values,
        )?)
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::from(s.as_str()),
        Value::Integer(i) | Value::DateTime(i) => Json::from(*i),
        Value::Boolean(b) => Json::from(*b),
        Value::Double(d) => Json::from(*d),
    }
}

fn json_to_value(json: &Json, data_type: DataType) -> Option<Value> {
    match data_type {
        DataType::String => json.as_str().map(Value::from),
        DataType::Integer => json.as_i64().map(Value::Integer),
        DataType::Boolean => json.as_bool().map(Value::Boolean),
        DataType::DateTime => json.as_i64().map(Value::DateTime),
        DataType::Double => json.as_f64().map(Value::Double),
    }
}

/// Body of `POST /evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateBody {
    pub attributes: Vec<RestAttribute>,
}

impl EvaluateBody {
    pub fn from_cache(attributes: &CachedAttributeSet) -> Self {
        Self {
            attributes: attributes.iter().map(RestAttribute::encode).collect(),
        }
    }

    pub fn to_json(&self) -> WireResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reply of `POST /evaluate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateReply {
    #[serde(default)]
    pub results: Vec<RestResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestResult {
    pub decision: String,
}

impl RestResult {
    pub fn decision(&self) -> RemoteDecision {
        RemoteDecision::from_name(&self.decision)
    }
}

impl EvaluateReply {
    pub fn from_json(body: &str) -> WireResult<Self> {
        Ok(serde_json::from_str(body)?)
    }
}
