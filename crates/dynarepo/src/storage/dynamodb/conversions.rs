//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between `AttributeValue` maps and the
//! store-neutral `Item`. These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use dynarepo_core::storage::{FieldValue, Item, RepositoryError};

/// Convert a field value to a DynamoDB attribute value.
pub fn to_attribute_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::S(s) => AttributeValue::S(s),
        FieldValue::N(n) => AttributeValue::N(n),
        FieldValue::B(b) => AttributeValue::B(Blob::new(b)),
        FieldValue::Bool(b) => AttributeValue::Bool(b),
        FieldValue::Null => AttributeValue::Null(true),
        FieldValue::L(list) => AttributeValue::L(list.into_iter().map(to_attribute_value).collect()),
        FieldValue::M(map) => AttributeValue::M(to_attribute_map(map)),
        FieldValue::Ss(set) => AttributeValue::Ss(set),
        FieldValue::Ns(set) => AttributeValue::Ns(set),
        FieldValue::Bs(set) => AttributeValue::Bs(set.into_iter().map(Blob::new).collect()),
    }
}

/// Convert a DynamoDB attribute value to a field value.
pub fn from_attribute_value(value: AttributeValue) -> Result<FieldValue, RepositoryError> {
    Ok(match value {
        AttributeValue::S(s) => FieldValue::S(s),
        AttributeValue::N(n) => FieldValue::N(n),
        AttributeValue::B(b) => FieldValue::B(b.into_inner()),
        AttributeValue::Bool(b) => FieldValue::Bool(b),
        AttributeValue::Null(_) => FieldValue::Null,
        AttributeValue::L(list) => FieldValue::L(
            list.into_iter()
                .map(from_attribute_value)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => FieldValue::M(from_attribute_map(map)?),
        AttributeValue::Ss(set) => FieldValue::Ss(set),
        AttributeValue::Ns(set) => FieldValue::Ns(set),
        AttributeValue::Bs(set) => FieldValue::Bs(set.into_iter().map(Blob::into_inner).collect()),
        other => {
            return Err(RepositoryError::InvalidData(format!(
                "Unsupported attribute value: {other:?}"
            )))
        }
    })
}

/// Convert an item to a DynamoDB attribute map.
pub fn to_attribute_map(item: Item) -> HashMap<String, AttributeValue> {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute_value(value)))
        .collect()
}

/// Convert a DynamoDB attribute map to an item.
pub fn from_attribute_map(
    map: HashMap<String, AttributeValue>,
) -> Result<Item, RepositoryError> {
    map.into_iter()
        .map(|(name, value)| Ok((name, from_attribute_value(value)?)))
        .collect()
}

/// Convert an optional attribute map, treating absent and empty maps alike.
pub fn from_optional_attribute_map(
    map: Option<HashMap<String, AttributeValue>>,
) -> Result<Option<Item>, RepositoryError> {
    match map {
        Some(map) if !map.is_empty() => Ok(Some(from_attribute_map(map)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item::from([
            ("id".to_string(), FieldValue::from("fruit-1")),
            ("weight".to_string(), FieldValue::number(120)),
            ("ripe".to_string(), FieldValue::Bool(true)),
            ("photo".to_string(), FieldValue::B(vec![0xde, 0xad])),
            ("note".to_string(), FieldValue::Null),
            (
                "tags".to_string(),
                FieldValue::Ss(vec!["sweet".to_string(), "tropical".to_string()]),
            ),
            (
                "origin".to_string(),
                FieldValue::M(HashMap::from([
                    ("country".to_string(), FieldValue::from("BR")),
                    (
                        "farms".to_string(),
                        FieldValue::L(vec![FieldValue::number(1), FieldValue::number(2)]),
                    ),
                ])),
            ),
        ])
    }

    #[test]
    fn test_item_to_attribute_map() {
        let map = to_attribute_map(sample_item());

        assert_eq!(map.get("id").unwrap().as_s().unwrap(), "fruit-1");
        assert_eq!(map.get("weight").unwrap().as_n().unwrap(), "120");
        assert!(*map.get("ripe").unwrap().as_bool().unwrap());
        assert_eq!(
            map.get("photo").unwrap().as_b().unwrap().clone().into_inner(),
            vec![0xde, 0xad]
        );
        assert!(*map.get("note").unwrap().as_null().unwrap());

        let origin = map.get("origin").unwrap().as_m().unwrap();
        assert_eq!(origin.get("country").unwrap().as_s().unwrap(), "BR");
        assert_eq!(origin.get("farms").unwrap().as_l().unwrap().len(), 2);
    }

    #[test]
    fn test_attribute_map_to_item() {
        let map = to_attribute_map(sample_item());

        let item = from_attribute_map(map).unwrap();

        assert_eq!(item, sample_item());
    }

    #[test]
    fn test_binary_sets_convert() {
        let value = to_attribute_value(FieldValue::Bs(vec![vec![1], vec![2, 3]]));
        assert_eq!(value.as_bs().unwrap().len(), 2);
        assert_eq!(
            from_attribute_value(value).unwrap(),
            FieldValue::Bs(vec![vec![1], vec![2, 3]])
        );
    }

    #[test]
    fn test_optional_attribute_map() {
        assert!(from_optional_attribute_map(None).unwrap().is_none());
        assert!(from_optional_attribute_map(Some(HashMap::new()))
            .unwrap()
            .is_none());

        let map = HashMap::from([("id".to_string(), AttributeValue::S("a".to_string()))]);
        let item = from_optional_attribute_map(Some(map)).unwrap().unwrap();
        assert_eq!(item.get("id"), Some(&FieldValue::from("a")));
    }
}
