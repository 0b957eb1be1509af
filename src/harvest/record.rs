//! Harvested records

use crate::model::RecordStatus;
use serde::Serialize;
use std::collections::BTreeMap;

/// A metadata field: one value, or the ordered values of a repeated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// Append another occurrence, turning a single value into a list.
    pub fn push(&mut self, value: String) {
        match self {
            Self::One(first) => {
                let first = std::mem::take(first);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(values) => values.push(value),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }
}

/// One record of a `ListRecords` page.
///
/// Deleted records carry only `identifier`, `datestamp` and the status;
/// `sets` and `fields` are empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestRecord {
    pub identifier: String,
    pub arxiv_id: String,
    pub datestamp: String,
    pub sets: Vec<String>,
    pub status: RecordStatus,
    /// Metadata field local name → value(s)
    pub fields: BTreeMap<String, FieldValue>,
}

impl HarvestRecord {
    pub fn is_deleted(&self) -> bool {
        self.status == RecordStatus::Deleted
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::first)
    }

    pub fn values(&self, field: &str) -> Vec<&str> {
        self.fields.get(field).map(FieldValue::values).unwrap_or_default()
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<HarvestRecord>,
    /// `None` once the listing is complete
    pub resumption_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_values_collapse_into_ordered_list() {
        let mut value = FieldValue::One("a".to_string());
        value.push("b".to_string());
        value.push("c".to_string());
        assert_eq!(value, FieldValue::Many(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(value.first(), Some("a"));
    }
}
