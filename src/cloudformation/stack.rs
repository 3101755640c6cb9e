use aws_sdk_cloudformation::types::{Capability, Parameter, RollbackConfiguration, Tag};
use tracing::debug;

use crate::cloudformation::{StackApi, Template};
use crate::error::{AppError, Result};

/// Status reported once an UpdateStack call has been fully applied.
pub const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";

/// Where a stack deployment stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackProgress {
    Complete,
    InProgress,
    Failed(String),
}

impl StackProgress {
    pub fn from_status(status: &str) -> Self {
        match status {
            UPDATE_COMPLETE => Self::Complete,
            "UPDATE_ROLLBACK_COMPLETE" | "ROLLBACK_COMPLETE" => Self::Failed(status.to_string()),
            failed if failed.ends_with("_FAILED") => Self::Failed(status.to_string()),
            _ => Self::InProgress,
        }
    }

    /// A stack reported without a status is still being deployed.
    pub fn from_optional_status(status: Option<&str>) -> Self {
        status.map_or(Self::InProgress, Self::from_status)
    }
}

/// Everything UpdateStack needs to redeploy a stack unchanged apart from
/// its template.
#[derive(Debug, Clone, PartialEq)]
pub struct StackUpdate {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: Vec<Parameter>,
    pub capabilities: Vec<Capability>,
    pub role_arn: Option<String>,
    pub rollback_configuration: Option<RollbackConfiguration>,
    pub stack_policy_body: Option<String>,
    pub notification_arns: Vec<String>,
    pub tags: Vec<Tag>,
}

/// A stack owning the table being erased, captured before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StackDescriptor {
    pub name: String,
    pub table_logical_id: String,
    pub original_template: String,
    pub template_without_table: String,
    pub parameters: Vec<Parameter>,
    pub capabilities: Vec<Capability>,
    pub role_arn: Option<String>,
    pub rollback_configuration: Option<RollbackConfiguration>,
    pub notification_arns: Vec<String>,
    pub tags: Vec<Tag>,
    pub policy_body: Option<String>,
}

impl StackDescriptor {
    /// Reads the stack, its template and policy, and prepares the template
    /// without the table. Fails with `TableNotInTemplate` when the stack
    /// declares no `AWS::DynamoDB::Table` named `table_name`.
    pub async fn capture(stacks: &dyn StackApi, stack_name: &str, table_name: &str) -> Result<Self> {
        let stack = stacks.describe_stack(stack_name).await?;
        let original_template = stacks.template_body(stack_name).await?;

        let template =
            Template::parse(&original_template).map_err(|reason| AppError::InvalidTemplate {
                stack_name: stack_name.to_string(),
                reason,
            })?;
        let table_logical_id =
            template
                .table_logical_id(table_name)
                .ok_or_else(|| AppError::TableNotInTemplate {
                    table_name: table_name.to_string(),
                    stack_name: stack_name.to_string(),
                })?;
        let template_without_table = template
            .without_resource(&table_logical_id)
            .to_body()
            .map_err(|reason| AppError::InvalidTemplate {
                stack_name: stack_name.to_string(),
                reason,
            })?;
        debug!("Table {table_name} is the {table_logical_id} resource of the {stack_name} stack");

        let policy_body = stacks.stack_policy(stack_name).await?;

        // Parameter values are not replayed: NoEcho values come back masked.
        let parameters = stack
            .parameters()
            .iter()
            .filter_map(|parameter| parameter.parameter_key())
            .map(|key| {
                Parameter::builder()
                    .parameter_key(key)
                    .use_previous_value(true)
                    .build()
            })
            .collect();

        Ok(Self {
            name: stack_name.to_string(),
            table_logical_id,
            original_template,
            template_without_table,
            parameters,
            capabilities: stack.capabilities().to_vec(),
            role_arn: stack.role_arn().map(str::to_string),
            rollback_configuration: stack.rollback_configuration().cloned(),
            notification_arns: stack.notification_arns().to_vec(),
            tags: stack.tags().to_vec(),
            policy_body,
        })
    }

    pub fn update_without_table(&self) -> StackUpdate {
        self.update_with(&self.template_without_table)
    }

    pub fn update_with_original_template(&self) -> StackUpdate {
        self.update_with(&self.original_template)
    }

    fn update_with(&self, template_body: &str) -> StackUpdate {
        StackUpdate {
            stack_name: self.name.clone(),
            template_body: template_body.to_string(),
            parameters: self.parameters.clone(),
            capabilities: self.capabilities.clone(),
            role_arn: self.role_arn.clone(),
            rollback_configuration: self.rollback_configuration.clone(),
            stack_policy_body: self.policy_body.clone(),
            notification_arns: self.notification_arns.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::MockStackApi;
    use aws_sdk_cloudformation::{
        primitives::DateTime,
        types::{Stack, StackStatus},
    };

    const TEMPLATE: &str = r#"{
        "Parameters": { "Env": { "Type": "String" }, "Secret": { "Type": "String", "NoEcho": true } },
        "Resources": {
            "UsersTable": { "Type": "AWS::DynamoDB::Table", "Properties": { "TableName": "users" } },
            "Topic": { "Type": "AWS::SNS::Topic" }
        }
    }"#;

    fn stack() -> Stack {
        Stack::builder()
            .stack_name("app")
            .stack_status(StackStatus::UpdateComplete)
            .creation_time(DateTime::from_secs(1_600_000_000))
            .parameters(Parameter::builder().parameter_key("Env").parameter_value("prod").build())
            .parameters(Parameter::builder().parameter_key("Secret").parameter_value("****").build())
            .capabilities(Capability::CapabilityNamedIam)
            .role_arn("arn:aws:iam::123456789012:role/deployer")
            .notification_arns("arn:aws:sns:us-east-1:123456789012:deploys")
            .tags(Tag::builder().key("team").value("data").build())
            .build()
    }

    fn mock_stacks(template: &'static str) -> MockStackApi {
        let mut stacks = MockStackApi::new();
        stacks
            .expect_describe_stack()
            .withf(|name| name == "app")
            .returning(|_| Ok(stack()));
        stacks
            .expect_template_body()
            .returning(move |_| Ok(template.to_string()));
        stacks
            .expect_stack_policy()
            .returning(|_| Ok(Some(r#"{"Statement":[]}"#.to_string())));
        stacks
    }

    #[test]
    fn classifies_stack_statuses() {
        assert_eq!(StackProgress::from_status("UPDATE_COMPLETE"), StackProgress::Complete);
        assert_eq!(
            StackProgress::from_status("UPDATE_IN_PROGRESS"),
            StackProgress::InProgress
        );
        assert_eq!(
            StackProgress::from_status("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StackProgress::InProgress
        );
        assert_eq!(
            StackProgress::from_status("UPDATE_ROLLBACK_COMPLETE"),
            StackProgress::Failed("UPDATE_ROLLBACK_COMPLETE".to_string())
        );
        assert_eq!(
            StackProgress::from_status("UPDATE_ROLLBACK_FAILED"),
            StackProgress::Failed("UPDATE_ROLLBACK_FAILED".to_string())
        );
        assert_eq!(StackProgress::from_optional_status(None), StackProgress::InProgress);
        assert_eq!(
            StackProgress::from_optional_status(Some("UPDATE_COMPLETE")),
            StackProgress::Complete
        );
    }

    #[tokio::test]
    async fn captures_everything_needed_to_redeploy() {
        let stacks = mock_stacks(TEMPLATE);

        let descriptor = StackDescriptor::capture(&stacks, "app", "users").await.unwrap();

        assert_eq!(descriptor.table_logical_id, "UsersTable");
        assert_eq!(descriptor.original_template, TEMPLATE);
        assert_eq!(
            Template::parse(&descriptor.template_without_table)
                .unwrap()
                .resource_ids(),
            vec!["Topic"]
        );
        assert_eq!(descriptor.policy_body.as_deref(), Some(r#"{"Statement":[]}"#));
        assert_eq!(descriptor.capabilities, vec![Capability::CapabilityNamedIam]);
        assert_eq!(
            descriptor.role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/deployer")
        );

        let keys: Vec<_> = descriptor
            .parameters
            .iter()
            .map(|p| (p.parameter_key(), p.parameter_value(), p.use_previous_value()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Some("Env"), None, Some(true)),
                (Some("Secret"), None, Some(true)),
            ]
        );
    }

    #[tokio::test]
    async fn updates_differ_only_by_template() {
        let descriptor = StackDescriptor::capture(&mock_stacks(TEMPLATE), "app", "users")
            .await
            .unwrap();

        let without = descriptor.update_without_table();
        let restore = descriptor.update_with_original_template();

        assert_eq!(restore.template_body, TEMPLATE);
        assert_ne!(without.template_body, restore.template_body);
        assert_eq!(
            StackUpdate {
                template_body: restore.template_body.clone(),
                ..without
            },
            restore
        );
    }

    #[tokio::test]
    async fn missing_table_resource_fails_before_reading_the_policy() {
        let mut stacks = MockStackApi::new();
        stacks.expect_describe_stack().returning(|_| Ok(stack()));
        stacks
            .expect_template_body()
            .returning(|_| Ok(TEMPLATE.to_string()));
        stacks.expect_stack_policy().never();

        let err = StackDescriptor::capture(&stacks, "app", "payments")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::TableNotInTemplate { ref table_name, ref stack_name }
                if table_name == "payments" && stack_name == "app"
        ));
    }
}
