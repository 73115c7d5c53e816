//! Address discovery.
//!
//! Two listers implement [`DeviceLister`]:
//! - [`FileLister`]: newline-delimited input file
//! - [`ClusterLister`]: call-manager directory (AXL names, RIS addresses)
//!
//! A lister that fails never aborts the run: [`resolve_addresses`] turns the
//! failure into a warning and an empty list, and the batch summary says so.

pub mod cluster;
pub mod file;

use std::time::Duration;

pub use cluster::{AxlDirectoryClient, ClusterLister};
pub use file::{parse_address_list, FileLister};

use crate::config::{DiscoveryMode, SurveyConfig};
use crate::survey::error::SurveyError;
use crate::survey::traits::{DeviceLister, DiscoveryScope};

/// Timeout for each directory SOAP call.
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(30);

/// Addresses to survey plus why the list may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddresses {
    pub addresses: Vec<String>,
    /// Set when the source could not be read.
    pub problem: Option<String>,
}

impl ResolvedAddresses {
    pub fn input_missing(&self) -> bool {
        self.problem.is_some()
    }
}

pub async fn resolve_addresses(lister: &dyn DeviceLister) -> ResolvedAddresses {
    let source = lister.describe();
    match lister.list_addresses().await {
        Ok(addresses) => {
            if addresses.is_empty() {
                tracing::warn!(source = %source, "Address source is empty");
            } else {
                tracing::info!(source = %source, devices = addresses.len(), "Addresses loaded");
            }
            ResolvedAddresses {
                addresses,
                problem: None,
            }
        }
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "No addresses to survey");
            ResolvedAddresses {
                addresses: Vec::new(),
                problem: Some(e.to_string()),
            }
        }
    }
}

/// Lister for the configured discovery mode.
pub fn build_lister(config: &SurveyConfig) -> Result<Box<dyn DeviceLister>, SurveyError> {
    match config.discovery {
        DiscoveryMode::File => Ok(Box::new(FileLister::new(&config.input_path))),
        DiscoveryMode::Cluster => {
            let settings = config
                .cluster
                .as_ref()
                .ok_or_else(|| SurveyError::Config("cluster discovery needs a call-manager host".into()))?;
            let scope = match &settings.device_pool {
                Some(pool) => DiscoveryScope::DevicePool(pool.clone()),
                None => DiscoveryScope::AllPhones,
            };
            let client = AxlDirectoryClient::new(settings, DIRECTORY_TIMEOUT)?;
            Ok(Box::new(ClusterLister::new(client, scope, settings.host.clone())))
        }
    }
}
