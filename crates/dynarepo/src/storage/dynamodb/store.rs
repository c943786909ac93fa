//! DynamoDB store client.
//!
//! Implements `StoreClient` from `dynarepo_core::storage` on top of
//! `aws-sdk-dynamodb`. One store is bound to one table.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::operation::scan::builders::ScanFluentBuilder;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType as DynamoKeyType,
    PutRequest, ScalarAttributeType, TableStatus, WriteRequest,
};
use aws_sdk_dynamodb::Client;

use dynarepo_core::expression::FilterSpecification;
use dynarepo_core::pagination::Cursor;
use dynarepo_core::storage::{
    BatchPutOutput, Item, KeySchema, KeyType, RepositoryError, Result, ScanOutput, ScanPage,
    StoreClient,
};

use super::client::create_client;
use super::conversions::{
    from_attribute_map, from_optional_attribute_map, to_attribute_map, to_attribute_value,
};
use super::error::{map_sdk_error, map_store_error, DynamoDbError};
use crate::config::StoreConfig;

/// Maximum number of put requests DynamoDB accepts in one BatchWriteItem call.
const BATCH_WRITE_LIMIT: usize = 25;

const TABLE_ACTIVE_MAX_ATTEMPTS: u32 = 60;
const TABLE_ACTIVE_DELAY: Duration = Duration::from_secs(2);

/// DynamoDB-based store client.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
}

impl DynamoDbStore {
    /// Creates a new store with the given DynamoDB client and table name.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn builder() -> DynamoDbStoreBuilder {
        DynamoDbStoreBuilder::default()
    }

    /// Creates a store from an explicit configuration.
    pub async fn from_config(config: &StoreConfig) -> Self {
        tracing::debug!(
            table = %config.table_name,
            target = %config.target_display(),
            "Connecting to DynamoDB"
        );
        let client = create_client(config).await;
        Self::new(client, config.table_name.clone())
    }

    /// Creates a new store from environment configuration.
    ///
    /// Uses the AWS SDK default credential chain and reads the table name from
    /// `DYNAMODB_TABLE_NAME` (defaults to "dynarepo"). See [`StoreConfig`].
    pub async fn from_env() -> Self {
        Self::from_config(&StoreConfig::from_env()).await
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get the underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn scan_request(&self, filter: Option<&FilterSpecification>) -> ScanFluentBuilder {
        with_filter(self.client.scan().table_name(&self.table_name), filter)
    }

    /// Returns the table status, or `None` if the table does not exist.
    pub async fn table_status(&self) -> Result<Option<TableStatus>> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(output) => {
                let table = output.table.ok_or_else(|| {
                    map_store_error(
                        "DescribeTable",
                        DynamoDbError::MissingTableDescription {
                            table_name: self.table_name.clone(),
                        },
                    )
                })?;
                Ok(table.table_status)
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(map_sdk_error("DescribeTable", err)),
        }
    }

    async fn wait_for_table_active(&self) -> Result<()> {
        for attempt in 1..=TABLE_ACTIVE_MAX_ATTEMPTS {
            if self.table_status().await? == Some(TableStatus::Active) {
                return Ok(());
            }
            tracing::trace!(table = %self.table_name, attempt, "Waiting for table to become active");
            tokio::time::sleep(TABLE_ACTIVE_DELAY).await;
        }

        Err(map_store_error(
            "CreateTable",
            DynamoDbError::TableActivationTimeout {
                table_name: self.table_name.clone(),
            },
        ))
    }
}

/// Applies a filter to a scan request, leaving it unfiltered when absent.
///
/// Placeholder maps are only set when non-empty; DynamoDB rejects empty ones.
fn with_filter(
    request: ScanFluentBuilder,
    filter: Option<&FilterSpecification>,
) -> ScanFluentBuilder {
    let Some(filter) = filter else {
        return request;
    };

    let values: HashMap<String, AttributeValue> = filter
        .values()
        .iter()
        .map(|(placeholder, value)| (placeholder.clone(), to_attribute_value(value.clone())))
        .collect();
    let names = filter.names().clone();

    request
        .filter_expression(filter.expression())
        .set_expression_attribute_values((!values.is_empty()).then_some(values))
        .set_expression_attribute_names((!names.is_empty()).then_some(names))
}

/// Clamps a page size to the SDK's `i32` limit.
fn page_limit(page_size: NonZeroU32) -> i32 {
    i32::try_from(page_size.get()).unwrap_or(i32::MAX)
}

fn scalar_type(key_type: KeyType) -> ScalarAttributeType {
    match key_type {
        KeyType::S => ScalarAttributeType::S,
        KeyType::N => ScalarAttributeType::N,
        KeyType::B => ScalarAttributeType::B,
    }
}

fn put_request(item: Item) -> Result<WriteRequest> {
    let put = PutRequest::builder()
        .set_item(Some(to_attribute_map(item)))
        .build()
        .map_err(|e| RepositoryError::store("BatchWriteItem", e))?;
    Ok(WriteRequest::builder().put_request(put).build())
}

#[async_trait]
impl StoreClient for DynamoDbStore {
    async fn put(&self, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attribute_map(item)))
            .send()
            .await
            .map_err(|e| map_sdk_error("PutItem", e))?;

        Ok(())
    }

    /// Sends chunks of 25. A failed chunk aborts the call; chunks sent
    /// before it stay written and their unprocessed items are only logged.
    async fn batch_put(&self, items: Vec<Item>) -> Result<BatchPutOutput> {
        let total = items.len();
        let mut sent = 0;
        let mut unprocessed = Vec::new();
        let mut items = items.into_iter().peekable();

        while items.peek().is_some() {
            let requests = items
                .by_ref()
                .take(BATCH_WRITE_LIMIT)
                .map(put_request)
                .collect::<Result<Vec<_>>>()?;
            let requests_len = requests.len();

            let output = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, requests)
                .send()
                .await
                .map_err(|e| {
                    if sent > 0 {
                        tracing::warn!(
                            table = %self.table_name,
                            sent,
                            unprocessed = unprocessed.len(),
                            remaining = total - sent,
                            "BatchWriteItem failed after earlier chunks were written"
                        );
                    }
                    map_sdk_error("BatchWriteItem", e)
                })?;
            sent += requests_len;

            for request in output
                .unprocessed_items
                .unwrap_or_default()
                .into_values()
                .flatten()
            {
                if let Some(put) = request.put_request {
                    unprocessed.push(from_attribute_map(put.item)?);
                }
            }
        }

        Ok(BatchPutOutput { unprocessed })
    }

    async fn get(&self, key: Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(to_attribute_map(key)))
            .send()
            .await
            .map_err(|e| map_sdk_error("GetItem", e))?;

        from_optional_attribute_map(output.item)
    }

    async fn delete(&self, key: Item) -> Result<()> {
        // Unconditional: deleting a missing key succeeds.
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(to_attribute_map(key)))
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteItem", e))?;

        Ok(())
    }

    async fn scan(&self, filter: Option<&FilterSpecification>) -> Result<ScanOutput<Item>> {
        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let output = self
                .scan_request(filter)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(|e| map_sdk_error("Scan", e))?;

            for item in output.items.unwrap_or_default() {
                items.push(from_attribute_map(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(ScanOutput::new(items))
    }

    async fn scan_page(
        &self,
        filter: Option<&FilterSpecification>,
        page_size: Option<NonZeroU32>,
        cursor: Option<&Cursor>,
    ) -> Result<ScanPage> {
        let exclusive_start_key = cursor
            .map(|cursor| {
                cursor
                    .decode()
                    .map(to_attribute_map)
                    .map_err(|e| RepositoryError::store("Scan", e))
            })
            .transpose()?;

        let output = self
            .scan_request(filter)
            .set_limit(page_size.map(page_limit))
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(|e| map_sdk_error("Scan", e))?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_attribute_map)
            .collect::<Result<Vec<_>>>()?;

        let next_cursor = from_optional_attribute_map(output.last_evaluated_key)?
            .map(|key| Cursor::encode(&key))
            .transpose()
            .map_err(|e| RepositoryError::store("Scan", e))?;

        Ok(ScanPage { items, next_cursor })
    }

    async fn create_table(&self, schema: &KeySchema) -> Result<()> {
        let key = &schema.partition_key;
        let key_schema = KeySchemaElement::builder()
            .attribute_name(&key.name)
            .key_type(DynamoKeyType::Hash)
            .build()
            .map_err(|e| RepositoryError::store("CreateTable", e))?;
        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(&key.name)
            .attribute_type(scalar_type(key.attribute_type))
            .build()
            .map_err(|e| RepositoryError::store("CreateTable", e))?;

        tracing::info!(table = %self.table_name, key = %key.name, "Creating table");
        self.client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(key_schema)
            .attribute_definitions(attribute_definition)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateTable", e))?;

        self.wait_for_table_active().await
    }

    async fn delete_table(&self) -> Result<()> {
        tracing::info!(table = %self.table_name, "Deleting table");
        self.client
            .delete_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteTable", e))?;

        Ok(())
    }
}

/// Builder for [`DynamoDbStore`].
#[derive(Debug, Default)]
pub struct DynamoDbStoreBuilder {
    client: Option<Client>,
    table_name: Option<String>,
}

impl DynamoDbStoreBuilder {
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Builds the store, failing if the client or table name was not supplied.
    pub fn build(self) -> Result<DynamoDbStore> {
        let client = self
            .client
            .ok_or(RepositoryError::ConfigurationMissing("DynamoDB client"))?;
        let table_name = self
            .table_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(RepositoryError::ConfigurationMissing("table name"))?;

        Ok(DynamoDbStore::new(client, table_name))
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
    use dynarepo_core::storage::FieldValue;

    use super::*;

    fn offline_client() -> Client {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url("http://localhost:1")
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_builder_requires_client() {
        let err = DynamoDbStore::builder()
            .table_name("fruits")
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::ConfigurationMissing("DynamoDB client")
        ));
    }

    #[test]
    fn test_builder_requires_table_name() {
        let err = DynamoDbStore::builder()
            .client(offline_client())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConfigurationMissing("table name")
        ));

        let err = DynamoDbStore::builder()
            .client(offline_client())
            .table_name("  ")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConfigurationMissing("table name")
        ));
    }

    #[test]
    fn test_builder_builds_store() {
        let store = DynamoDbStore::builder()
            .client(offline_client())
            .table_name("fruits")
            .build()
            .unwrap();

        assert_eq!(store.table_name(), "fruits");
    }

    #[test]
    fn test_with_filter_sets_expression_and_placeholders() {
        let store = DynamoDbStore::new(offline_client(), "fruits");
        let filter = FilterSpecification::new("#v = :v", HashMap::new())
            .with_name("#v", "value")
            .with_value(":v", FieldValue::from("mango"));

        let request = store.scan_request(Some(&filter));

        assert_eq!(request.get_table_name().as_deref(), Some("fruits"));
        assert_eq!(request.get_filter_expression().as_deref(), Some("#v = :v"));
        let values = request.get_expression_attribute_values().as_ref().unwrap();
        assert_eq!(values.get(":v").unwrap().as_s().unwrap(), "mango");
        let names = request.get_expression_attribute_names().as_ref().unwrap();
        assert_eq!(names.get("#v").map(String::as_str), Some("value"));
    }

    #[test]
    fn test_with_filter_omits_empty_placeholder_maps() {
        let store = DynamoDbStore::new(offline_client(), "fruits");
        let filter = FilterSpecification::new(" ( attribute_exists(color) ) ", HashMap::new());

        let request = store.scan_request(Some(&filter));
        assert!(request.get_expression_attribute_values().is_none());
        assert!(request.get_expression_attribute_names().is_none());

        let unfiltered = store.scan_request(None);
        assert!(unfiltered.get_filter_expression().is_none());
    }

    #[test]
    fn test_page_limit_clamps() {
        assert_eq!(page_limit(NonZeroU32::new(25).unwrap()), 25);
        assert_eq!(page_limit(NonZeroU32::MAX), i32::MAX);
    }

    #[test]
    fn test_put_request_wraps_item() {
        let item = Item::from([("id".to_string(), FieldValue::from("fruit-1"))]);

        let request = put_request(item).unwrap();

        let put = request.put_request().unwrap();
        assert_eq!(put.item().get("id").unwrap().as_s().unwrap(), "fruit-1");
    }
}
