use std::fmt::{Debug, Display};
use std::num::NonZeroU32;

use async_trait::async_trait;
use uuid::Uuid;

use crate::expression::FilterSpecification;
use crate::pagination::Cursor;

use super::{BatchPutOutput, FieldValue, Item, KeySchema, KeyType, Result, ScanOutput, ScanPage};

/// A value that can identify an entity in the store.
pub trait EntityId: Clone + Debug + Display + Send + Sync + 'static {
    /// Attribute type of the key column holding this identifier.
    const KEY_TYPE: KeyType;

    /// Converts the identifier into the key attribute value.
    fn to_field_value(&self) -> FieldValue;

    /// Whether the identifier is a placeholder rather than a real key.
    fn is_missing(&self) -> bool {
        false
    }
}

impl EntityId for String {
    const KEY_TYPE: KeyType = KeyType::S;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::S(self.clone())
    }

    fn is_missing(&self) -> bool {
        self.trim().is_empty()
    }
}

impl EntityId for Uuid {
    const KEY_TYPE: KeyType = KeyType::S;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::S(self.to_string())
    }

    fn is_missing(&self) -> bool {
        self.is_nil()
    }
}

impl EntityId for i64 {
    const KEY_TYPE: KeyType = KeyType::N;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::N(self.to_string())
    }
}

impl EntityId for u64 {
    const KEY_TYPE: KeyType = KeyType::N;

    fn to_field_value(&self) -> FieldValue {
        FieldValue::N(self.to_string())
    }
}

/// An application record stored under a single identifier attribute.
pub trait Entity: Clone + Send + Sync + Sized + 'static {
    type Id: EntityId;

    /// Entity name used in errors and logs.
    const ENTITY_TYPE: &'static str;

    /// Attribute holding the identifier. This is the table's partition key.
    const ID_ATTRIBUTE: &'static str;

    /// The identifier, or `None` if it hasn't been assigned yet.
    fn id(&self) -> Option<&Self::Id>;

    /// Converts the entity into a store item.
    fn to_item(&self) -> Item;

    /// Converts a store item back into the entity.
    fn from_item(item: &Item) -> Result<Self>;

    /// Builds the key item for an identifier.
    fn key(id: &Self::Id) -> Item {
        Item::from([(Self::ID_ATTRIBUTE.to_string(), id.to_field_value())])
    }
}

/// Client bound to one table of an external key-value/document store.
///
/// Implementations own retries, timeouts and connection handling; callers
/// receive whatever the store reports.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Writes a single item, replacing any item with the same key.
    async fn put(&self, item: Item) -> Result<()>;

    /// Writes several items. Items the store didn't accept are returned.
    async fn batch_put(&self, items: Vec<Item>) -> Result<BatchPutOutput>;

    /// Reads an item by key.
    async fn get(&self, key: Item) -> Result<Option<Item>>;

    /// Deletes an item by key. Deleting a missing key is not an error.
    async fn delete(&self, key: Item) -> Result<()>;

    /// Scans the whole table, following continuation tokens until the end.
    async fn scan(&self, filter: Option<&FilterSpecification>) -> Result<ScanOutput<Item>>;

    /// Scans a single page.
    ///
    /// At most `page_size` items are evaluated (store default when `None`),
    /// starting after `cursor`.
    async fn scan_page(
        &self,
        filter: Option<&FilterSpecification>,
        page_size: Option<NonZeroU32>,
        cursor: Option<&Cursor>,
    ) -> Result<ScanPage>;

    /// Creates the bound table. Used by setup harnesses only.
    async fn create_table(&self, schema: &KeySchema) -> Result<()>;

    /// Deletes the bound table. Used by setup harnesses only.
    async fn delete_table(&self) -> Result<()>;
}

#[async_trait]
impl<S: StoreClient + ?Sized> StoreClient for std::sync::Arc<S> {
    async fn put(&self, item: Item) -> Result<()> {
        (**self).put(item).await
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<BatchPutOutput> {
        (**self).batch_put(items).await
    }

    async fn get(&self, key: Item) -> Result<Option<Item>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: Item) -> Result<()> {
        (**self).delete(key).await
    }

    async fn scan(&self, filter: Option<&FilterSpecification>) -> Result<ScanOutput<Item>> {
        (**self).scan(filter).await
    }

    async fn scan_page(
        &self,
        filter: Option<&FilterSpecification>,
        page_size: Option<NonZeroU32>,
        cursor: Option<&Cursor>,
    ) -> Result<ScanPage> {
        (**self).scan_page(filter, page_size, cursor).await
    }

    async fn create_table(&self, schema: &KeySchema) -> Result<()> {
        (**self).create_table(schema).await
    }

    async fn delete_table(&self) -> Result<()> {
        (**self).delete_table().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_blank_is_missing() {
        assert!(String::new().is_missing());
        assert!("   ".to_string().is_missing());
        assert!(!"abc".to_string().is_missing());
    }

    #[test]
    fn test_uuid_nil_is_missing() {
        assert!(Uuid::nil().is_missing());
        assert!(!Uuid::new_v4().is_missing());
    }

    #[test]
    fn test_numeric_ids_are_never_missing() {
        assert!(!0i64.is_missing());
        assert_eq!(42u64.to_field_value(), FieldValue::N("42".to_string()));
        assert_eq!(<i64 as EntityId>::KEY_TYPE, KeyType::N);
    }
}
