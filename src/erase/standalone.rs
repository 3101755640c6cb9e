use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableStatus;
use tracing::{error, info};

use crate::dynamodb::{TableApi, TableSchema};
use crate::erase::TableEraser;
use crate::error::Result;
use crate::polling::{poll_until, Poll, PollSettings};

/// Deletes the table and creates it again from its captured schema.
pub struct StandaloneTable {
    tables: Arc<dyn TableApi>,
    schema: TableSchema,
    poll: PollSettings,
}

impl StandaloneTable {
    pub fn new(tables: Arc<dyn TableApi>, schema: TableSchema, poll: PollSettings) -> Self {
        Self {
            tables,
            schema,
            poll,
        }
    }

    async fn wait_for_deletion(&self) -> Result<()> {
        let table_name = &self.schema.table_name;

        poll_until(
            &format!("deletion of the {table_name} table"),
            "Waiting for deletion to complete",
            &self.poll,
            || async move {
                // Any status, DELETING included, means the table is still there.
                Ok(match self.tables.describe_table(table_name).await? {
                    None => Poll::Ready(()),
                    Some(_) => Poll::Pending,
                })
            },
        )
        .await
    }

    async fn wait_until_active(&self) -> Result<()> {
        let table_name = &self.schema.table_name;

        poll_until(
            &format!("the {table_name} table to become active"),
            "Waiting for creation to complete",
            &self.poll,
            || async move {
                let status = self
                    .tables
                    .describe_table(table_name)
                    .await?
                    .and_then(|description| description.table_status().cloned());
                Ok(match status {
                    Some(TableStatus::Active) => Poll::Ready(()),
                    _ => Poll::Pending,
                })
            },
        )
        .await
    }
}

#[async_trait]
impl TableEraser for StandaloneTable {
    fn alert_message(&self) -> String {
        format!(
            "You're going to drop and recreate your {} table!",
            self.schema.table_name
        )
    }

    async fn erase(&self) -> Result<()> {
        let table_name = &self.schema.table_name;

        info!("Deleting the {table_name} table");
        self.tables.delete_table(table_name).await?;
        self.wait_for_deletion().await?;
        info!("{table_name} table deleted");

        info!("Creating the {table_name} table");
        if let Err(err) = self.tables.create_table(&self.schema).await {
            error!("The {table_name} table was deleted and could not be re-created");
            return Err(err);
        }
        self.wait_until_active().await?;
        info!("{table_name} table created");

        Ok(())
    }
}
