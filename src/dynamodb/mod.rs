//! # DynamoDB Module
//!
//! Thin layer over `aws_sdk_dynamodb` used by the importer and the
//! standalone eraser.
//!
//! ## Components
//!
//! - `TableApi`: the table operations the workflows need, implemented by
//!   `DynamoDb` over the SDK client and mocked in tests.
//! - `Item`: a typed record produced from one imported row.
//! - `Schema`: declared attribute types of a table.
//! - `TableSchema`: creation-time shape of a table, replayed after deletion.

mod client;
mod item;
mod schema;
mod table;

#[cfg(test)]
pub use client::MockTableApi;
pub use client::{DynamoDb, TableApi, BATCH_WRITE_LIMIT};
pub use item::Item;
pub use schema::{FieldType, Schema};
pub use table::TableSchema;
