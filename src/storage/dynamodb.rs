//! DynamoDB store adapter
//!
//! Thin mapping between the crate's item model and `BatchWriteItem` /
//! `BatchGetItem`. Unprocessed entries in a response are matched back to the
//! exact descriptors that were submitted, so retry rounds resubmit the same
//! logical items.

use super::{BatchStore, GetBatchOutput};
use crate::config::StoreConfig;
use crate::core::batch::{AttributeMap, AttributeValue, ItemKey, WriteItem};
use crate::models::{Audit, Product, TableItem};
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    AttributeValue as SdkValue, DeleteRequest, KeysAndAttributes, PutRequest, WriteRequest,
};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

use super::memory::{DEFAULT_MAX_ITEMS_PER_REQUEST, DEFAULT_MAX_KEYS_PER_GET};

type SdkItem = HashMap<String, SdkValue>;

/// Connection settings for [`DynamoDbStore`]
#[derive(Debug, Clone, Default)]
pub struct DynamoDbStoreConfig {
    /// Collection name → table name
    pub tables: HashMap<String, String>,
    /// AWS region (SDK default when unset)
    pub region: Option<String>,
    /// Endpoint override, e.g. DynamoDB Local
    pub endpoint: Option<String>,
    /// Operation timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl From<&StoreConfig> for DynamoDbStoreConfig {
    fn from(config: &StoreConfig) -> Self {
        let tables = HashMap::from([
            (Product::COLLECTION.to_string(), config.products_table.clone()),
            (Audit::COLLECTION.to_string(), config.audits_table.clone()),
        ]);
        Self {
            tables,
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            timeout_ms: config.timeout_ms,
        }
    }
}

/// [`BatchStore`] backed by Amazon DynamoDB
#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
    tables: HashMap<String, String>,
}

impl std::fmt::Debug for DynamoDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbStore")
            .field("tables", &self.tables)
            .finish()
    }
}

impl DynamoDbStore {
    /// Load the shared AWS configuration and build a client with overrides
    pub async fn new(config: DynamoDbStoreConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        let client = Client::from_conf(builder.build());
        debug!(tables = ?config.tables, "DynamoDB client ready");
        Ok(Self::from_client(client, config.tables))
    }

    /// Wrap a pre-built client
    pub fn from_client(client: Client, tables: HashMap<String, String>) -> Self {
        Self { client, tables }
    }

    fn table(&self, collection: &str) -> Result<&str> {
        self.tables
            .get(collection)
            .map(String::as_str)
            .ok_or_else(|| {
                BatchError::validation(format!("no table configured for collection '{collection}'"))
            })
    }

    async fn write(&self, table: &str, requests: Vec<WriteRequest>) -> Result<Vec<WriteRequest>> {
        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| classify("BatchWriteItem", e))?;

        Ok(output
            .unprocessed_items
            .unwrap_or_default()
            .into_values()
            .flatten()
            .collect())
    }
}

#[async_trait]
impl BatchStore for DynamoDbStore {
    fn backend(&self) -> &'static str {
        "dynamodb"
    }

    fn max_items_per_request(&self) -> usize {
        DEFAULT_MAX_ITEMS_PER_REQUEST
    }

    fn max_keys_per_get(&self) -> usize {
        DEFAULT_MAX_KEYS_PER_GET
    }

    async fn put_batch(&self, collection: &str, items: Vec<WriteItem>) -> Result<Vec<WriteItem>> {
        if items.is_empty() {
            return Ok(items);
        }
        let table = self.table(collection)?;
        let key_names = key_names(items.iter().map(WriteItem::key));

        let mut requests = Vec::with_capacity(items.len());
        for item in &items {
            let put = PutRequest::builder()
                .set_item(Some(to_sdk_item(&item.to_record())))
                .build()
                .map_err(|e| BatchError::validation(format!("invalid put request: {e}")))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        let returned = self.write(table, requests).await?;
        let unprocessed_keys: Vec<ItemKey> = returned
            .into_iter()
            .filter_map(|request| request.put_request)
            .map(|put| project_key(from_sdk_item(put.item), &key_names))
            .collect();

        Ok(match_back(items, unprocessed_keys, WriteItem::key, collection))
    }

    async fn delete_batch(&self, collection: &str, keys: Vec<ItemKey>) -> Result<Vec<ItemKey>> {
        if keys.is_empty() {
            return Ok(keys);
        }
        let table = self.table(collection)?;

        let mut requests = Vec::with_capacity(keys.len());
        for key in &keys {
            let delete = DeleteRequest::builder()
                .set_key(Some(to_sdk_item(key.attributes())))
                .build()
                .map_err(|e| BatchError::validation(format!("invalid delete request: {e}")))?;
            requests.push(WriteRequest::builder().delete_request(delete).build());
        }

        let returned = self.write(table, requests).await?;
        let unprocessed_keys: Vec<ItemKey> = returned
            .into_iter()
            .filter_map(|request| request.delete_request)
            .map(|delete| ItemKey::from_attributes(from_sdk_item(delete.key)))
            .collect();

        Ok(match_back(keys, unprocessed_keys, itself, collection))
    }

    async fn get_batch(&self, collection: &str, keys: Vec<ItemKey>) -> Result<GetBatchOutput> {
        if keys.is_empty() {
            return Ok(GetBatchOutput::default());
        }
        let table = self.table(collection)?;
        let key_names = key_names(keys.iter());

        let request = KeysAndAttributes::builder()
            .set_keys(Some(keys.iter().map(|k| to_sdk_item(k.attributes())).collect()))
            .build()
            .map_err(|e| BatchError::validation(format!("invalid get request: {e}")))?;

        let output = self
            .client
            .batch_get_item()
            .request_items(table, request)
            .send()
            .await
            .map_err(|e| classify("BatchGetItem", e))?;

        let found: Vec<AttributeMap> = output
            .responses
            .unwrap_or_default()
            .into_values()
            .flatten()
            .map(from_sdk_item)
            .collect();
        let unprocessed: Vec<ItemKey> = output
            .unprocessed_keys
            .unwrap_or_default()
            .into_values()
            .flat_map(|k| k.keys)
            .map(|k| ItemKey::from_attributes(from_sdk_item(k)))
            .collect();

        let answered: BTreeSet<ItemKey> = found
            .iter()
            .map(|record| project_key(record.clone(), &key_names))
            .chain(unprocessed.iter().cloned())
            .collect();
        let missing = keys.into_iter().filter(|k| !answered.contains(k)).collect();

        Ok(GetBatchOutput {
            found,
            missing,
            unprocessed,
        })
    }
}

/// Map an SDK failure onto the crate's error taxonomy
fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> BatchError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = format!("{operation} failed: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            BatchError::transient(message)
        }
        SdkError::ConstructionFailure(_) => BatchError::validation(message),
        _ => match err.as_service_error().and_then(|e| e.code()) {
            Some(code) => classify_code(code, message),
            None => BatchError::permanent(message),
        },
    }
}

fn classify_code(code: &str, message: String) -> BatchError {
    match code {
        "ProvisionedThroughputExceededException"
        | "ThrottlingException"
        | "RequestLimitExceeded"
        | "LimitExceededException"
        | "InternalServerError"
        | "ServiceUnavailable" => BatchError::transient(message),
        "ResourceNotFoundException" | "ValidationException" => BatchError::validation(message),
        _ => BatchError::permanent(message),
    }
}

/// Attribute names that make up the keys of one request
fn key_names<'a>(keys: impl Iterator<Item = &'a ItemKey>) -> BTreeSet<String> {
    keys.flat_map(|k| k.attributes().keys().cloned()).collect()
}

fn itself(key: &ItemKey) -> &ItemKey {
    key
}

fn project_key(mut record: AttributeMap, key_names: &BTreeSet<String>) -> ItemKey {
    record.retain(|name, _| key_names.contains(name));
    ItemKey::from_attributes(record)
}

/// Select the submitted entries whose keys the store handed back
fn match_back<T>(
    submitted: Vec<T>,
    returned: Vec<ItemKey>,
    key_of: impl Fn(&T) -> &ItemKey,
    collection: &str,
) -> Vec<T> {
    if returned.is_empty() {
        return Vec::new();
    }
    let returned: BTreeSet<ItemKey> = returned.into_iter().collect();
    let matched: Vec<T> = submitted
        .into_iter()
        .filter(|entry| returned.contains(key_of(entry)))
        .collect();
    if matched.len() != returned.len() {
        warn!(
            collection = collection,
            returned = returned.len(),
            matched = matched.len(),
            "Store returned unprocessed entries that were not submitted"
        );
    }
    matched
}

fn to_sdk_item(attributes: &AttributeMap) -> SdkItem {
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

fn to_sdk_value(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null => SdkValue::Null(true),
        AttributeValue::L(l) => SdkValue::L(l.iter().map(to_sdk_value).collect()),
        AttributeValue::M(m) => SdkValue::M(to_sdk_item(m)),
    }
}

fn from_sdk_item(item: SdkItem) -> AttributeMap {
    item.into_iter()
        .map(|(name, value)| (name, from_sdk_value(value)))
        .collect()
}

fn from_sdk_value(value: SdkValue) -> AttributeValue {
    match value {
        SdkValue::S(s) => AttributeValue::S(s),
        SdkValue::N(n) => AttributeValue::N(n),
        SdkValue::B(b) => AttributeValue::B(b.into_inner()),
        SdkValue::Bool(b) => AttributeValue::Bool(b),
        SdkValue::Null(_) => AttributeValue::Null,
        SdkValue::L(l) => AttributeValue::L(l.into_iter().map(from_sdk_value).collect()),
        SdkValue::M(m) => AttributeValue::M(from_sdk_item(m)),
        SdkValue::Ss(set) => AttributeValue::L(set.into_iter().map(AttributeValue::S).collect()),
        SdkValue::Ns(set) => AttributeValue::L(set.into_iter().map(AttributeValue::N).collect()),
        SdkValue::Bs(set) => AttributeValue::L(
            set.into_iter()
                .map(|b| AttributeValue::B(b.into_inner()))
                .collect(),
        ),
        other => {
            warn!(value = ?other, "Unsupported DynamoDB attribute type");
            AttributeValue::Null
        }
    }
}
