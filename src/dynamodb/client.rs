use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{PutRequest, TableDescription, WriteRequest},
    Client,
};
use tracing::debug;

use crate::dynamodb::{Item, TableSchema};
use crate::error::{AppError, Result};

const SERVICE: &str = "DynamoDB";

/// Maximum number of put requests accepted by one BatchWriteItem call.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// The DynamoDB operations the workflows rely on.
///
/// Kept as small and close to the SDK as possible so that the real client
/// can be swapped with a mock in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Describes a table, `None` when it does not exist.
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableDescription>>;

    async fn create_table(&self, schema: &TableSchema) -> Result<()>;

    async fn delete_table(&self, table_name: &str) -> Result<()>;

    /// Puts up to `BATCH_WRITE_LIMIT` items, returning the unprocessed ones.
    async fn batch_put(&self, table_name: &str, items: Vec<Item>) -> Result<Vec<Item>>;
}

/// `TableApi` backed by the AWS SDK client.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl TableApi for DynamoDb {
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableDescription>> {
        match self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
        {
            Ok(output) => Ok(output.table),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(AppError::service(SERVICE, err)),
        }
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let TableSchema {
            table_name,
            attribute_definitions,
            key_schema,
            billing_mode,
            provisioned_throughput,
            global_secondary_indexes,
            local_secondary_indexes,
            stream_specification,
            sse_specification,
            table_class,
            deletion_protection_enabled,
        } = schema.clone();

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .billing_mode(billing_mode)
            .set_provisioned_throughput(provisioned_throughput)
            .set_global_secondary_indexes(non_empty(global_secondary_indexes))
            .set_local_secondary_indexes(non_empty(local_secondary_indexes))
            .set_stream_specification(stream_specification)
            .set_sse_specification(sse_specification)
            .set_table_class(table_class)
            .set_deletion_protection_enabled(deletion_protection_enabled)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;
        Ok(())
    }

    async fn delete_table(&self, table_name: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;
        Ok(())
    }

    async fn batch_put(&self, table_name: &str, items: Vec<Item>) -> Result<Vec<Item>> {
        let write_requests = items
            .into_iter()
            .map(|item| -> Result<WriteRequest> {
                Ok(WriteRequest::builder()
                    .put_request(
                        PutRequest::builder()
                            .set_item(Some(item.into_attributes()))
                            .build()?,
                    )
                    .build())
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table_name, write_requests)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;

        let unprocessed: Vec<Item> = output
            .unprocessed_items()
            .and_then(|requests| requests.get(table_name))
            .into_iter()
            .flatten()
            .filter_map(|request| request.put_request())
            .map(|put| Item::from(put.item().clone()))
            .collect();

        debug!(
            "Batch write to '{table_name}' left {} unprocessed item(s)",
            unprocessed.len()
        );
        Ok(unprocessed)
    }
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}
