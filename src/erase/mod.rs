//! # Erase Module
//!
//! Drops every item of a table by dropping and re-creating the table.
//!
//! ## Strategies
//!
//! - `StandaloneTable`: DeleteTable then CreateTable with the captured
//!   schema. Used for tables no stack owns, or when drift is accepted.
//! - `StackManagedTable`: deploys the owning stack without the table, then
//!   with its original template, so the stack stays the owner.
//!
//! Everything a strategy needs is captured before the confirmation prompt,
//! so a declined prompt or a stack without the table resource never
//! mutates anything.

mod stack_managed;
mod standalone;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cloudformation::{StackApi, StackDescriptor};
use crate::dynamodb::{TableApi, TableSchema};
use crate::error::{AppError, Result};
use crate::polling::PollSettings;
use crate::prompt::Confirmation;

pub use stack_managed::StackManagedTable;
pub use standalone::StandaloneTable;

/// A way of emptying a table.
#[async_trait]
pub trait TableEraser: Send + Sync {
    /// Warning shown before asking for confirmation.
    fn alert_message(&self) -> String;

    async fn erase(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The confirmation prompt was declined.
    Cancelled,
}

pub struct Eraser {
    tables: Arc<dyn TableApi>,
    stacks: Arc<dyn StackApi>,
    poll: PollSettings,
}

impl Eraser {
    pub fn new(tables: Arc<dyn TableApi>, stacks: Arc<dyn StackApi>, poll: PollSettings) -> Self {
        Self {
            tables,
            stacks,
            poll,
        }
    }

    /// Picks the strategy for `table_name`, reading everything it needs.
    pub async fn select_strategy(
        &self,
        table_name: &str,
        with_drift: bool,
    ) -> Result<Box<dyn TableEraser>> {
        let description = self
            .tables
            .describe_table(table_name)
            .await?
            .ok_or_else(|| AppError::TableNotFound {
                table_name: table_name.to_string(),
            })?;
        let schema = TableSchema::from_description(&description)?;

        match self.stacks.owning_stack(table_name).await? {
            Some(stack_name) if !with_drift => {
                debug!("{table_name} table belongs to the {stack_name} stack");
                let descriptor =
                    StackDescriptor::capture(self.stacks.as_ref(), &stack_name, table_name).await?;
                Ok(Box::new(StackManagedTable::new(
                    Arc::clone(&self.stacks),
                    descriptor,
                    table_name,
                    self.poll,
                )))
            }
            Some(stack_name) => {
                warn!("{table_name} table belongs to the {stack_name} stack, erasing it directly will cause drift");
                Ok(Box::new(self.standalone(schema)))
            }
            None => Ok(Box::new(self.standalone(schema))),
        }
    }

    /// Selects a strategy, asks for confirmation and erases the table.
    pub async fn run(
        &self,
        table_name: &str,
        with_drift: bool,
        prompt: &mut dyn Confirmation,
    ) -> Result<Outcome> {
        let eraser = self.select_strategy(table_name, with_drift).await?;

        if !prompt.confirm(&eraser.alert_message())? {
            info!("Erase of {table_name} table canceled");
            return Ok(Outcome::Cancelled);
        }

        eraser.erase().await?;
        Ok(Outcome::Completed)
    }

    fn standalone(&self, schema: TableSchema) -> StandaloneTable {
        StandaloneTable::new(Arc::clone(&self.tables), schema, self.poll)
    }
}
