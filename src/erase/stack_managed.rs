use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_cloudformation::types::StackStatus;
use tracing::{error, info};

use crate::cloudformation::{StackApi, StackDescriptor, StackProgress, StackUpdate};
use crate::erase::TableEraser;
use crate::error::{AppError, Result};
use crate::polling::{poll_until, Poll, PollSettings};

/// Redeploys the owning stack without the table, then with it again.
pub struct StackManagedTable {
    stacks: Arc<dyn StackApi>,
    descriptor: StackDescriptor,
    table_name: String,
    poll: PollSettings,
}

impl StackManagedTable {
    pub fn new(
        stacks: Arc<dyn StackApi>,
        descriptor: StackDescriptor,
        table_name: &str,
        poll: PollSettings,
    ) -> Self {
        Self {
            stacks,
            descriptor,
            table_name: table_name.to_string(),
            poll,
        }
    }

    /// Submits `update` and waits for `UPDATE_COMPLETE`.
    async fn deploy(&self, update: StackUpdate) -> Result<()> {
        let stack_name = &self.descriptor.name;
        self.stacks.update_stack(&update).await?;

        poll_until(
            &format!("the {stack_name} stack update"),
            "Waiting for deployment to complete",
            &self.poll,
            || async move {
                let stack = self.stacks.describe_stack(stack_name).await?;
                let status = stack.stack_status().map(StackStatus::as_str);
                match StackProgress::from_optional_status(status) {
                    StackProgress::Complete => Ok(Poll::Ready(())),
                    StackProgress::InProgress => Ok(Poll::Pending),
                    StackProgress::Failed(status) => Err(AppError::StackUpdateFailed {
                        stack_name: stack_name.clone(),
                        status,
                    }),
                }
            },
        )
        .await
    }
}

#[async_trait]
impl TableEraser for StackManagedTable {
    fn alert_message(&self) -> String {
        format!(
            "You're going to deploy and redeploy your {} stack to drop and recreate the {} table!",
            self.descriptor.name, self.table_name
        )
    }

    async fn erase(&self) -> Result<()> {
        let table_name = &self.table_name;

        info!("Deploying the stack without the {table_name} table");
        self.deploy(self.descriptor.update_without_table()).await?;
        info!("Stack deployed without the {table_name} table");

        info!("Deploying the stack with the {table_name} table");
        if let Err(err) = self.deploy(self.descriptor.update_with_original_template()).await {
            error!(
                "The {} stack no longer declares the {} resource, redeploy its original template to restore the {table_name} table",
                self.descriptor.name, self.descriptor.table_logical_id
            );
            return Err(err);
        }
        info!("Stack deployed with the {table_name} table");

        Ok(())
    }
}
