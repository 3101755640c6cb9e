use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, GlobalSecondaryIndexDescription,
    KeySchemaElement, LocalSecondaryIndex, LocalSecondaryIndexDescription, ProvisionedThroughput,
    ProvisionedThroughputDescription, SseDescription, SseSpecification, SseStatus,
    StreamSpecification, TableClass, TableDescription,
};

use crate::error::Result;

/// Creation-time shape of a DynamoDB table.
///
/// Built field by field from a `TableDescription` so that it can be
/// replayed to CreateTable after the table has been deleted. Everything
/// the service derives on its own (status, sizes, item counts, ARNs, ids,
/// timestamps, index statuses, throughput decrease counters) has no field
/// here and is never sent back.
///
/// # Capacity modes
///
/// - **Provisioned**: the table and each GSI carry read/write capacity.
/// - **On-Demand** (`PAY_PER_REQUEST`): no throughput may be sent, even
///   though DescribeTable reports zeroed throughput for such tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table_name: String,
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeySchemaElement>,
    pub billing_mode: BillingMode,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
    pub stream_specification: Option<StreamSpecification>,
    pub sse_specification: Option<SseSpecification>,
    pub table_class: Option<TableClass>,
    pub deletion_protection_enabled: Option<bool>,
}

impl TableSchema {
    /// Projects a DescribeTable response onto the creation-time shape.
    pub fn from_description(description: &TableDescription) -> Result<Self> {
        let billing_mode = description
            .billing_mode_summary()
            .and_then(|summary| summary.billing_mode())
            .cloned()
            .unwrap_or(BillingMode::Provisioned);
        let provisioned = billing_mode == BillingMode::Provisioned;

        let provisioned_throughput = if provisioned {
            description
                .provisioned_throughput()
                .map(throughput)
                .transpose()?
        } else {
            None
        };

        let global_secondary_indexes = description
            .global_secondary_indexes()
            .iter()
            .map(|gsi| global_index(gsi, provisioned))
            .collect::<Result<Vec<_>>>()?;

        let local_secondary_indexes = description
            .local_secondary_indexes()
            .iter()
            .map(local_index)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            table_name: description.table_name().unwrap_or_default().to_string(),
            attribute_definitions: description.attribute_definitions().to_vec(),
            key_schema: description.key_schema().to_vec(),
            billing_mode,
            provisioned_throughput,
            global_secondary_indexes,
            local_secondary_indexes,
            stream_specification: description
                .stream_specification()
                .filter(|stream| stream.stream_enabled())
                .cloned(),
            sse_specification: description.sse_description().and_then(sse_specification),
            table_class: description
                .table_class_summary()
                .and_then(|summary| summary.table_class())
                .cloned(),
            deletion_protection_enabled: description.deletion_protection_enabled(),
        })
    }
}

fn throughput(description: &ProvisionedThroughputDescription) -> Result<ProvisionedThroughput> {
    Ok(ProvisionedThroughput::builder()
        .set_read_capacity_units(description.read_capacity_units())
        .set_write_capacity_units(description.write_capacity_units())
        .build()?)
}

fn global_index(
    description: &GlobalSecondaryIndexDescription,
    provisioned: bool,
) -> Result<GlobalSecondaryIndex> {
    let provisioned_throughput = if provisioned {
        description
            .provisioned_throughput()
            .map(throughput)
            .transpose()?
    } else {
        None
    };

    Ok(GlobalSecondaryIndex::builder()
        .set_index_name(description.index_name().map(str::to_string))
        .set_key_schema(Some(description.key_schema().to_vec()))
        .set_projection(description.projection().cloned())
        .set_provisioned_throughput(provisioned_throughput)
        .build()?)
}

fn local_index(description: &LocalSecondaryIndexDescription) -> Result<LocalSecondaryIndex> {
    Ok(LocalSecondaryIndex::builder()
        .set_index_name(description.index_name().map(str::to_string))
        .set_key_schema(Some(description.key_schema().to_vec()))
        .set_projection(description.projection().cloned())
        .build()?)
}

// Tables encrypted with the AWS owned key report no SSE description at all.
fn sse_specification(description: &SseDescription) -> Option<SseSpecification> {
    match description.status() {
        Some(SseStatus::Enabled | SseStatus::Enabling | SseStatus::Updating) => Some(
            SseSpecification::builder()
                .enabled(true)
                .set_sse_type(description.sse_type().cloned())
                .set_kms_master_key_id(description.kms_master_key_arn().map(str::to_string))
                .build(),
        ),
        _ => None,
    }
}
