//! # puma-types: Attribute and decision model
//!
//! Shared by every tier of the PUMA authorization architecture:
//! - Attributes ([`AttributeValue`], [`OwnerKind`], [`DataType`], [`Multiplicity`], [`Value`])
//! - Request parties ([`Subject`], [`Object`], [`Action`], [`Environment`])
//! - The per-call attribute cache ([`CachedAttributeSet`], [`as_cached_attributes`])
//! - Decisions ([`Decision`], [`PdpResult`], [`PolicyReference`])
//! - The event taxonomy ([`AuthzEvent`], [`EventSink`])
//!
//! ## Example
//!
//! ```
//! use puma_types::{Action, DataType, Environment, Object, Subject, as_cached_attributes};
//!
//! let mut subject = Subject::new("maarten");
//! subject.set_all("roles", DataType::String, vec!["helpdesk".into()])?;
//! subject.set("fired", false)?;
//!
//! let mut object = Object::new("123");
//! object.set("type", "document")?;
//!
//! let cache = as_cached_attributes(&subject, &object, &Action::new("read"), &Environment::new());
//! assert_eq!(cache.len(), 4);
//! # Ok::<(), puma_types::AttributeError>(())
//! ```

pub mod attribute;
pub mod decision;
mod error;
pub mod event;
pub mod party;

pub use attribute::{AttributeValue, DataType, Multiplicity, OwnerKind, Value, infer_owner_kind};
pub use decision::{Decision, PdpResult, PolicyReference, STATUS_OK};
pub use error::{AttributeError, Result};
pub use event::{AuthzEvent, EventKind, EventSink, RecordingSink, Severity, TracingSink};
pub use party::{
    Action, CachedAttributeSet, Environment, EvaluationRequest, Object, PartyIds, Subject,
    as_cached_attributes,
};
