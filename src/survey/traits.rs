//! Trait seams of the survey pipeline.
//!
//! - PageFetcher: raw page retrieval for one device and endpoint
//! - DeviceLister: where the address list comes from
//! - DirectoryClient: call-manager directory used by cluster discovery

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::SurveyError;
use super::types::Endpoint;

/// Fetches one XML page from a phone.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the response body of `endpoint` on `address`.
    async fn fetch(&self, address: &str, endpoint: Endpoint) -> Result<String, SurveyError>;
}

/// Produces the ordered list of phone addresses to survey.
#[async_trait]
pub trait DeviceLister: Send + Sync {
    /// Short label for logs ("file ip_input.csv", "cluster cucm-pub").
    fn describe(&self) -> String;

    async fn list_addresses(&self) -> Result<Vec<String>, SurveyError>;
}

/// Scope of a directory query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryScope {
    AllPhones,
    DevicePool(String),
}

/// Call-manager directory: device names, then name → address resolution.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn list_device_names(&self, scope: &DiscoveryScope) -> Result<Vec<String>, SurveyError>;

    /// Addresses for the names that are registered; unknown names are absent.
    async fn resolve_addresses(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, String>, SurveyError>;
}
