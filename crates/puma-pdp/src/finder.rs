//! Attribute finders.
//!
//! An engine that needs an attribute the caller did not supply asks the
//! evaluation context, which consults the cached attributes first and the
//! registered finders after that.

use chrono::{DateTime, Utc};
use puma_types::{DataType, OwnerKind, Value};

use crate::error::FinderError;

pub const CURRENT_DATETIME: &str = "environment:current-datetime";
pub const CURRENT_DATE: &str = "environment:current-date";
pub const CURRENT_TIME: &str = "environment:current-time";

/// Per-evaluation facts shared by all finders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinderContext {
    now: DateTime<Utc>,
}

impl FinderContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// The evaluation's notion of "now"; fixed for the whole evaluation.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// A source of attributes beyond those supplied with the request.
pub trait AttributeFinder: Send + Sync {
    /// Looks up an attribute. `Ok(None)` means this finder does not know it.
    fn find(
        &self,
        owner: OwnerKind,
        id: &str,
        data_type: DataType,
        context: &FinderContext,
    ) -> Result<Option<Vec<Value>>, FinderError>;
}

/// Answers the current date and time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentAttributeFinder;

impl AttributeFinder for EnvironmentAttributeFinder {
    fn find(
        &self,
        owner: OwnerKind,
        id: &str,
        data_type: DataType,
        context: &FinderContext,
    ) -> Result<Option<Vec<Value>>, FinderError> {
        if owner != OwnerKind::Environment {
            return Ok(None);
        }
        let now = context.now();
        let value = match (id, data_type) {
            (CURRENT_DATETIME, DataType::DateTime) => Value::datetime(now),
            (CURRENT_DATE, DataType::String) => Value::String(now.format("%Y-%m-%d").to_string()),
            (CURRENT_TIME, DataType::String) => Value::String(now.format("%H:%M:%S").to_string()),
            _ => return Ok(None),
        };
        Ok(Some(vec![value]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> FinderContext {
        FinderContext::new(Utc.with_ymd_and_hms(2014, 3, 1, 12, 30, 5).unwrap())
    }

    #[test]
    fn test_current_datetime_millis() {
        let found = EnvironmentAttributeFinder
            .find(
                OwnerKind::Environment,
                CURRENT_DATETIME,
                DataType::DateTime,
                &context(),
            )
            .unwrap();
        assert_eq!(found, Some(vec![Value::DateTime(1_393_677_005_000)]));
    }

    #[test]
    fn test_current_date_and_time() {
        let finder = EnvironmentAttributeFinder;
        assert_eq!(
            finder
                .find(OwnerKind::Environment, CURRENT_DATE, DataType::String, &context())
                .unwrap(),
            Some(vec![Value::from("2014-03-01")])
        );
        assert_eq!(
            finder
                .find(OwnerKind::Environment, CURRENT_TIME, DataType::String, &context())
                .unwrap(),
            Some(vec![Value::from("12:30:05")])
        );
    }

    #[test]
    fn test_unknown_lookups_are_none() {
        let finder = EnvironmentAttributeFinder;
        assert_eq!(
            finder
                .find(OwnerKind::Subject, CURRENT_DATETIME, DataType::DateTime, &context())
                .unwrap(),
            None
        );
        assert_eq!(
            finder
                .find(OwnerKind::Environment, CURRENT_DATETIME, DataType::String, &context())
                .unwrap(),
            None
        );
        assert_eq!(
            finder
                .find(OwnerKind::Environment, "environment:system-load", DataType::Integer, &context())
                .unwrap(),
            None
        );
    }
}
