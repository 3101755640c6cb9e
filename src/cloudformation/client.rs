use async_trait::async_trait;
use aws_sdk_cloudformation::{types::Stack, Client};

use crate::cloudformation::StackUpdate;
use crate::error::{AppError, Result};

const SERVICE: &str = "CloudFormation";

/// The CloudFormation operations the stack-managed eraser relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Name of the stack owning the resource with this physical id, `None`
    /// when CloudFormation does not know the resource.
    async fn owning_stack(&self, physical_resource_id: &str) -> Result<Option<String>>;

    async fn describe_stack(&self, stack_name: &str) -> Result<Stack>;

    /// Template body exactly as CloudFormation stores it.
    async fn template_body(&self, stack_name: &str) -> Result<String>;

    async fn stack_policy(&self, stack_name: &str) -> Result<Option<String>>;

    async fn update_stack(&self, update: &StackUpdate) -> Result<()>;
}

/// `StackApi` backed by the AWS SDK client.
#[derive(Debug, Clone)]
pub struct CloudFormation {
    client: Client,
}

impl CloudFormation {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl StackApi for CloudFormation {
    async fn owning_stack(&self, physical_resource_id: &str) -> Result<Option<String>> {
        let output = match self
            .client
            .describe_stack_resources()
            .physical_resource_id(physical_resource_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                // "Stack for <id> does not exist" comes back as a ValidationError.
                let err = AppError::service(SERVICE, err);
                return if err.is_validation() { Ok(None) } else { Err(err) };
            }
        };

        Ok(output
            .stack_resources()
            .iter()
            .find(|resource| resource.physical_resource_id() == Some(physical_resource_id))
            .and_then(|resource| resource.stack_name())
            .map(str::to_string))
    }

    async fn describe_stack(&self, stack_name: &str) -> Result<Stack> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;

        output
            .stacks()
            .first()
            .cloned()
            .ok_or_else(|| AppError::Service {
                service: SERVICE,
                code: None,
                message: format!("Stack {stack_name} does not exist"),
            })
    }

    async fn template_body(&self, stack_name: &str) -> Result<String> {
        let output = self
            .client
            .get_template()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;

        output
            .template_body()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidTemplate {
                stack_name: stack_name.to_string(),
                reason: "empty template body".to_string(),
            })
    }

    async fn stack_policy(&self, stack_name: &str) -> Result<Option<String>> {
        let output = self
            .client
            .get_stack_policy()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;

        Ok(output.stack_policy_body().map(str::to_string))
    }

    async fn update_stack(&self, update: &StackUpdate) -> Result<()> {
        let update = update.clone();

        self.client
            .update_stack()
            .stack_name(update.stack_name)
            .template_body(update.template_body)
            .set_parameters(Some(update.parameters))
            .set_capabilities(Some(update.capabilities))
            .set_role_arn(update.role_arn)
            .set_rollback_configuration(update.rollback_configuration)
            .set_stack_policy_body(update.stack_policy_body)
            .set_notification_arns(Some(update.notification_arns))
            .set_tags(Some(update.tags))
            .send()
            .await
            .map_err(|e| AppError::service(SERVICE, e))?;
        Ok(())
    }
}
