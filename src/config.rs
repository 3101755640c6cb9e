//! AWS target and polling configuration.

use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::polling::PollSettings;

/// Where the AWS clients point to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    /// AWS region, falls back to the default provider chain when unset.
    pub region: Option<String>,
    /// Custom endpoint URL (DynamoDB Local, LocalStack).
    pub endpoint_url: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
}

impl AwsSettings {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        let region = self.region.as_deref().unwrap_or("default region");
        match &self.endpoint_url {
            Some(url) => format!("local endpoint {url} ({region})"),
            None => format!("AWS ({region})"),
        }
    }

    /// Loads the shared SDK configuration used by both service clients.
    pub async fn load(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }

        loader.load().await
    }
}

/// Builds polling settings from the command-line values, in seconds.
pub fn poll_settings(timeout_secs: u64, max_interval_secs: u64) -> PollSettings {
    PollSettings {
        step: Duration::from_secs(1),
        max_interval: Duration::from_secs(max_interval_secs.max(1)),
        timeout: Duration::from_secs(timeout_secs),
    }
}
