//! Item attribute helpers.
//!
//! Pure functions used by `Entity::from_item` implementations to read typed
//! attributes out of a store item.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{FieldValue, Item, RepositoryError};

/// Get a required string attribute.
pub fn get_string(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(FieldValue::as_s)
        .map(|s| s.to_string())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional string attribute.
pub fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key)
        .and_then(FieldValue::as_s)
        .map(|s| s.to_string())
}

/// Get a required number attribute, parsed into `N`.
pub fn get_number<N: FromStr>(item: &Item, key: &str) -> Result<N, RepositoryError> {
    let raw = item
        .get(key)
        .and_then(FieldValue::as_n)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| RepositoryError::InvalidData(format!("Invalid number {}: {}", key, raw)))
}

/// Get a required boolean attribute.
pub fn get_bool(item: &Item, key: &str) -> Result<bool, RepositoryError> {
    item.get(key)
        .and_then(FieldValue::as_bool)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get a required UUID attribute.
pub fn get_uuid(item: &Item, key: &str) -> Result<Uuid, RepositoryError> {
    let s = get_string(item, key)?;
    Uuid::parse_str(&s)
        .map_err(|e| RepositoryError::InvalidData(format!("Invalid UUID {}: {}", key, e)))
}

/// Get a required datetime attribute (RFC 3339 format).
pub fn get_datetime(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let s = get_string(item, key)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidData(format!("Invalid datetime {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        Item::from([
            (
                "id".to_string(),
                FieldValue::from("550e8400-e29b-41d4-a716-446655440001"),
            ),
            ("value".to_string(), FieldValue::from("mango")),
            ("weight".to_string(), FieldValue::number(250)),
            ("ripe".to_string(), FieldValue::Bool(true)),
            (
                "createdAt".to_string(),
                FieldValue::from("2024-01-15T10:30:00Z"),
            ),
        ])
    }

    #[test]
    fn test_get_string_missing_field() {
        let item = Item::new();
        let err = get_string(&item, "missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid data: Missing or invalid field: missing"
        );
    }

    #[test]
    fn test_get_string_wrong_type() {
        let item = sample_item();
        assert!(get_string(&item, "weight").is_err());
    }

    #[test]
    fn test_get_optional_string() {
        let item = sample_item();
        assert!(get_optional_string(&item, "missing").is_none());
        assert_eq!(get_optional_string(&item, "value"), Some("mango".to_string()));
    }

    #[test]
    fn test_get_number() {
        let item = sample_item();
        let weight: u32 = get_number(&item, "weight").unwrap();
        assert_eq!(weight, 250);
        assert!(get_number::<u32>(&item, "value").is_err());
    }

    #[test]
    fn test_get_bool_and_uuid() {
        let item = sample_item();
        assert!(get_bool(&item, "ripe").unwrap());
        assert_eq!(
            get_uuid(&item, "id").unwrap().to_string(),
            "550e8400-e29b-41d4-a716-446655440001"
        );
        assert!(get_uuid(&item, "value").is_err());
    }

    #[test]
    fn test_get_datetime() {
        let item = sample_item();
        let created = get_datetime(&item, "createdAt").unwrap();
        assert_eq!(created.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }
}
