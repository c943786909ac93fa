//! In-memory store client.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::num::NonZeroU32;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dynarepo_core::expression::FilterSpecification;
use dynarepo_core::pagination::Cursor;
use dynarepo_core::storage::{
    BatchPutOutput, Entity, FieldValue, Item, KeySchema, KeyType, RepositoryError, Result,
    ScanOutput, ScanPage, StoreClient,
};

use super::error::StoreError;
use super::expression::Condition;

/// Writes a decimal number as `[-]digits e exponent`, with the value equal to
/// `0.digits * 10^exponent`, so numbers that compare equal share one token.
fn canonical_number(text: &str) -> Option<String> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{integer}{fraction}");
    let leading = digits.len() - digits.trim_start_matches('0').len();
    let significant = digits.trim_matches('0');
    if significant.is_empty() {
        return Some("0".to_string());
    }

    let scale = exponent
        .checked_add(i64::try_from(integer.len()).ok()?)?
        .checked_sub(i64::try_from(leading).ok()?)?;
    let sign = if negative { "-" } else { "" };
    Some(format!("{sign}{significant}e{scale}"))
}

#[derive(Debug)]
struct Table {
    schema: KeySchema,
    /// Items by key token, which also fixes the scan order.
    items: BTreeMap<String, Item>,
}

impl Table {
    fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            items: BTreeMap::new(),
        }
    }

    /// Turns the key attributes of `item` into the map key.
    fn key_token(&self, item: &Item) -> std::result::Result<String, StoreError> {
        let attribute = &self.schema.partition_key;
        let value = item
            .get(&attribute.name)
            .ok_or_else(|| StoreError::MissingKey(attribute.name.clone()))?;

        match (attribute.attribute_type, value) {
            (KeyType::S, FieldValue::S(s)) if s.is_empty() => {
                Err(StoreError::EmptyKey(attribute.name.clone()))
            }
            (KeyType::B, FieldValue::B(b)) if b.is_empty() => {
                Err(StoreError::EmptyKey(attribute.name.clone()))
            }
            (KeyType::S, FieldValue::S(s)) => Ok(s.clone()),
            (KeyType::N, FieldValue::N(n)) => canonical_number(n).ok_or_else(|| {
                StoreError::InvalidNumber {
                    attribute: attribute.name.clone(),
                    value: n.clone(),
                }
            }),
            (KeyType::B, FieldValue::B(b)) => {
                Ok(b.iter().fold(String::with_capacity(b.len() * 2), |mut hex, byte| {
                    let _ = write!(hex, "{byte:02x}");
                    hex
                }))
            }
            (expected, actual) => Err(StoreError::KeyTypeMismatch {
                attribute: attribute.name.clone(),
                expected: format!("{expected:?}"),
                actual: actual.type_name(),
            }),
        }
    }

    fn scan_page(
        &self,
        condition: Option<&Condition>,
        page_size: Option<NonZeroU32>,
        cursor: Option<&Cursor>,
    ) -> std::result::Result<ScanPage, StoreError> {
        let start = match cursor {
            Some(cursor) => Bound::Excluded(self.key_token(&cursor.decode()?)?),
            None => Bound::Unbounded,
        };
        let limit = page_size.map_or(usize::MAX, |size| size.get() as usize);

        let mut remaining = self
            .items
            .range::<String, _>((start, Bound::Unbounded))
            .map(|(_, item)| item);
        let mut items = Vec::new();
        let mut last_evaluated = None;

        for item in remaining.by_ref().take(limit) {
            if condition.is_none_or(|condition| condition.matches(item)) {
                items.push(item.clone());
            }
            last_evaluated = Some(item);
        }

        let next_cursor = match (last_evaluated, remaining.next()) {
            (Some(last), Some(_)) => {
                let key = self
                    .schema
                    .key_of(last)
                    .ok_or_else(|| StoreError::MissingKey(self.schema.partition_key.name.clone()))?;
                Some(Cursor::encode(&key)?)
            }
            _ => None,
        };

        Ok(ScanPage { items, next_cursor })
    }
}

/// Store client keeping a single table in process memory.
///
/// Behaves like the managed store for everything a repository relies on:
/// filter expressions are parsed and evaluated, a page size bounds the number
/// of items evaluated (not returned), and cursors carry the last evaluated key.
/// Clones share the same table.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    table_name: String,
    table: Arc<RwLock<Option<Table>>>,
}

impl InMemoryStore {
    /// Creates a store with an empty table already in place.
    pub fn new(table_name: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            table_name: table_name.into(),
            table: Arc::new(RwLock::new(Some(Table::new(schema)))),
        }
    }

    /// Creates a store whose table is keyed the way `T` is.
    pub fn for_entity<T: Entity>(table_name: impl Into<String>) -> Self {
        Self::new(table_name, KeySchema::for_entity::<T>())
    }

    /// Creates a store with no table; call `create_table` before using it.
    pub fn without_table(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            table: Arc::new(RwLock::new(None)),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Number of items in the table, or zero if there is no table.
    pub async fn len(&self) -> usize {
        self.table
            .read()
            .await
            .as_ref()
            .map_or(0, |table| table.items.len())
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn with_table<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Table) -> std::result::Result<R, StoreError>,
    ) -> Result<R> {
        let guard = self.table.read().await;
        guard
            .as_ref()
            .ok_or_else(|| StoreError::TableNotFound(self.table_name.clone()))
            .and_then(f)
            .map_err(|e| RepositoryError::store(operation, e))
    }

    async fn with_table_mut<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Table) -> std::result::Result<R, StoreError>,
    ) -> Result<R> {
        let mut guard = self.table.write().await;
        guard
            .as_mut()
            .ok_or_else(|| StoreError::TableNotFound(self.table_name.clone()))
            .and_then(f)
            .map_err(|e| RepositoryError::store(operation, e))
    }
}

fn parse_filter(
    filter: Option<&FilterSpecification>,
) -> std::result::Result<Option<Condition>, StoreError> {
    Ok(filter.map(Condition::parse).transpose()?)
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn put(&self, item: Item) -> Result<()> {
        self.with_table_mut("PutItem", |table| {
            let token = table.key_token(&item)?;
            table.items.insert(token, item);
            Ok(())
        })
        .await
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<BatchPutOutput> {
        self.with_table_mut("BatchWriteItem", |table| {
            // The whole batch is rejected if any item lacks its key.
            let tokens = items
                .iter()
                .map(|item| table.key_token(item))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            table.items.extend(tokens.into_iter().zip(items));
            Ok(BatchPutOutput::default())
        })
        .await
    }

    async fn get(&self, key: Item) -> Result<Option<Item>> {
        self.with_table("GetItem", |table| {
            let token = table.key_token(&key)?;
            Ok(table.items.get(&token).cloned())
        })
        .await
    }

    async fn delete(&self, key: Item) -> Result<()> {
        self.with_table_mut("DeleteItem", |table| {
            let token = table.key_token(&key)?;
            table.items.remove(&token);
            Ok(())
        })
        .await
    }

    async fn scan(&self, filter: Option<&FilterSpecification>) -> Result<ScanOutput<Item>> {
        self.with_table("Scan", |table| {
            let condition = parse_filter(filter)?;
            let page = table.scan_page(condition.as_ref(), None, None)?;
            Ok(ScanOutput::new(page.items))
        })
        .await
    }

    async fn scan_page(
        &self,
        filter: Option<&FilterSpecification>,
        page_size: Option<NonZeroU32>,
        cursor: Option<&Cursor>,
    ) -> Result<ScanPage> {
        self.with_table("Scan", |table| {
            let condition = parse_filter(filter)?;
            table.scan_page(condition.as_ref(), page_size, cursor)
        })
        .await
    }

    async fn create_table(&self, schema: &KeySchema) -> Result<()> {
        let mut guard = self.table.write().await;
        if guard.is_some() {
            return Err(RepositoryError::store(
                "CreateTable",
                StoreError::TableExists(self.table_name.clone()),
            ));
        }
        tracing::debug!(table = %self.table_name, key = %schema.partition_key.name, "Creating table");
        *guard = Some(Table::new(schema.clone()));
        Ok(())
    }

    async fn delete_table(&self) -> Result<()> {
        let mut guard = self.table.write().await;
        if guard.take().is_none() {
            return Err(RepositoryError::store(
                "DeleteTable",
                StoreError::TableNotFound(self.table_name.clone()),
            ));
        }
        tracing::debug!(table = %self.table_name, "Deleted table");
        Ok(())
    }
}
