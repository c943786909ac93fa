use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pagination::Cursor;

/// A single stored record: attribute name to attribute value.
pub type Item = HashMap<String, FieldValue>;

/// A typed attribute value, independent of any particular store SDK.
///
/// Numbers are kept as decimal strings so that no precision is lost between
/// the application and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    L(Vec<FieldValue>),
    M(HashMap<String, FieldValue>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
}

impl FieldValue {
    /// Creates a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Creates a number value from anything that formats as a decimal.
    pub fn number(value: impl ToString) -> Self {
        Self::N(value.to_string())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short type descriptor, matching the store's attribute type names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Bool(_) => "BOOL",
            Self::Null => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
        }
    }

    /// Orders two scalar values of the same type.
    ///
    /// Returns `None` for mismatched types, non-scalar values, or numbers that
    /// don't parse. Strings and binaries compare byte-wise.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::S(a), Self::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::B(a), Self::B(b)) => Some(a.cmp(b)),
            (Self::N(a), Self::N(b)) => {
                let a: f64 = a.trim().parse().ok()?;
                let b: f64 = b.trim().parse().ok()?;
                a.partial_cmp(&b)
            }
            _ => None,
        }
    }

    /// Equality as the store evaluates it (`1` and `1.0` are the same number).
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::N(_), Self::N(_)) => self.compare(other) == Some(Ordering::Equal),
            _ => self == other,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::N(value.to_string())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::N(value.to_string())
    }
}

/// Scalar types a key attribute may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    S,
    N,
    B,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: KeyType,
}

/// Key schema of the table an entity is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: KeyAttribute,
}

impl KeySchema {
    /// Creates a key schema with a single partition key.
    pub fn new(name: impl Into<String>, attribute_type: KeyType) -> Self {
        Self {
            partition_key: KeyAttribute {
                name: name.into(),
                attribute_type,
            },
        }
    }

    /// Derives the key schema from an entity's identifier attribute.
    pub fn for_entity<T: super::Entity>() -> Self {
        Self::new(
            T::ID_ATTRIBUTE,
            <T::Id as super::EntityId>::KEY_TYPE,
        )
    }

    /// Extracts the key attributes of an item, if all of them are present.
    pub fn key_of(&self, item: &Item) -> Option<Item> {
        let name = &self.partition_key.name;
        item.get(name)
            .map(|value| Item::from([(name.clone(), value.clone())]))
    }
}

/// Result of a full scan across every store page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutput<T> {
    /// Matching items, in store order.
    pub items: Vec<T>,
    /// Number of matching items.
    pub count: usize,
}

impl<T> ScanOutput<T> {
    pub fn new(items: Vec<T>) -> Self {
        let count = items.len();
        Self { items, count }
    }
}

/// One page of a paginated scan, as returned by a store client.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Continuation token; `None` once the scan reached the end of the table.
    pub next_cursor: Option<Cursor>,
}

/// Outcome of a batch write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPutOutput {
    /// Items the store did not write. Not retried.
    pub unprocessed: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_numbers_numerically() {
        let a = FieldValue::number(9);
        let b = FieldValue::number(10);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert!(FieldValue::N("1".into()).matches(&FieldValue::N("1.0".into())));
    }

    #[test]
    fn test_compare_strings_bytewise() {
        let a = FieldValue::from("Zebra");
        let b = FieldValue::from("apple");
        assert_eq!(a.compare(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_mismatched_types() {
        assert_eq!(FieldValue::from("1").compare(&FieldValue::number(1)), None);
        assert!(!FieldValue::from("1").matches(&FieldValue::number(1)));
    }

    #[test]
    fn test_key_of_extracts_partition_key() {
        let schema = KeySchema::new("id", KeyType::S);
        let item = Item::from([
            ("id".to_string(), FieldValue::from("a-1")),
            ("value".to_string(), FieldValue::from("mango")),
        ]);

        let key = schema.key_of(&item).unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key.get("id"), Some(&FieldValue::from("a-1")));
    }

    #[test]
    fn test_key_of_missing_key() {
        let schema = KeySchema::new("id", KeyType::S);
        let item = Item::from([("value".to_string(), FieldValue::from("mango"))]);
        assert!(schema.key_of(&item).is_none());
    }
}
