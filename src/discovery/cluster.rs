//! Cluster discovery through the call manager's SOAP APIs.
//!
//! Two calls: AXL `listPhone` returns device names for the scope, then RIS
//! `selectCmDevice` maps those names to their registered IP addresses.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::escape::escape;

use crate::config::ClusterSettings;
use crate::survey::error::SurveyError;
use crate::survey::traits::{DeviceLister, DirectoryClient, DiscoveryScope};
use crate::survey::xml::{parse_document, XmlValue};

/// RIS rejects larger `SelectItems` lists.
pub const RIS_BATCH_SIZE: usize = 1000;

const AXL_PATH: &str = "/axl/";
const RIS_PATH: &str = "/realtimeservice2/services/RISService70";

/// Device lister backed by a [`DirectoryClient`].
pub struct ClusterLister<C: DirectoryClient> {
    client: C,
    scope: DiscoveryScope,
    label: String,
}

impl<C: DirectoryClient> ClusterLister<C> {
    pub fn new(client: C, scope: DiscoveryScope, label: impl Into<String>) -> Self {
        Self {
            client,
            scope,
            label: label.into(),
        }
    }
}

#[async_trait]
impl<C: DirectoryClient> DeviceLister for ClusterLister<C> {
    fn describe(&self) -> String {
        match &self.scope {
            DiscoveryScope::AllPhones => format!("cluster {}", self.label),
            DiscoveryScope::DevicePool(pool) => format!("cluster {} (pool {pool})", self.label),
        }
    }

    /// Addresses in directory order. Names without a registered address are
    /// dropped, and so are repeated addresses.
    async fn list_addresses(&self) -> Result<Vec<String>, SurveyError> {
        let names = self.client.list_device_names(&self.scope).await?;
        if names.is_empty() {
            tracing::warn!(scope = ?self.scope, "Directory returned no phones");
            return Ok(Vec::new());
        }

        let resolved = self.client.resolve_addresses(&names).await?;
        let mut seen = HashSet::new();
        let addresses: Vec<String> = names
            .iter()
            .filter_map(|name| resolved.get(name))
            .filter(|address| !address.is_empty() && seen.insert(address.as_str()))
            .cloned()
            .collect();

        tracing::info!(
            names = names.len(),
            resolved = addresses.len(),
            "Discovered phones"
        );
        Ok(addresses)
    }
}

// ═══════════════════════════════════════════
// AXL / RIS client
// ═══════════════════════════════════════════

pub struct AxlDirectoryClient {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
    axl_version: String,
}

impl AxlDirectoryClient {
    /// Client for `https://<host>:8443`. Call managers usually present
    /// self-signed certificates, so certificate checks are off.
    pub fn new(settings: &ClusterSettings, timeout: Duration) -> Result<Self, SurveyError> {
        let base_url = format!("https://{}:8443", settings.host);
        Self::with_base_url(settings, base_url, timeout)
    }

    pub fn with_base_url(
        settings: &ClusterSettings,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SurveyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| SurveyError::Directory(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            axl_version: settings.schema_version().to_string(),
        })
    }

    async fn soap_call(&self, path: &str, action: &str, body: String) -> Result<XmlValue, SurveyError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", action)
            .body(body)
            .send()
            .await
            .map_err(|e| SurveyError::Directory(format!("{url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SurveyError::Directory(format!("{url}: {e}")))?;

        // Faults arrive with HTTP 500 and a SOAP body worth reporting.
        let parsed = parse_document(&text).ok().map(|doc| doc.value);
        if let Some(fault) = parsed.as_ref().and_then(|v| v.find_text("faultstring")) {
            return Err(SurveyError::Directory(format!("{action} fault: {fault}")));
        }
        if !status.is_success() {
            return Err(SurveyError::Directory(format!("{action} returned HTTP {}", status.as_u16())));
        }
        parsed.ok_or_else(|| SurveyError::Directory(format!("{action} returned a malformed response")))
    }
}

#[async_trait]
impl DirectoryClient for AxlDirectoryClient {
    async fn list_device_names(&self, scope: &DiscoveryScope) -> Result<Vec<String>, SurveyError> {
        let action = format!("CUCM:DB ver={} listPhone", self.axl_version);
        let envelope = self
            .soap_call(AXL_PATH, &action, list_phone_request(&self.axl_version, scope))
            .await?;
        Ok(phone_names(&envelope))
    }

    async fn resolve_addresses(&self, names: &[String]) -> Result<HashMap<String, String>, SurveyError> {
        let mut addresses = HashMap::new();
        for chunk in names.chunks(RIS_BATCH_SIZE) {
            let envelope = self
                .soap_call(RIS_PATH, "selectCmDevice", select_cm_device_request(chunk))
                .await?;
            addresses.extend(registered_addresses(&envelope));
        }
        Ok(addresses)
    }
}

/// AXL `listPhone` for every `SEP` device or for one device pool.
pub fn list_phone_request(axl_version: &str, scope: &DiscoveryScope) -> String {
    let criteria = match scope {
        DiscoveryScope::AllPhones => "<name>SEP%</name>".to_string(),
        DiscoveryScope::DevicePool(pool) => {
            format!("<devicePoolName>{}</devicePoolName>", escape(pool.as_str()))
        }
    };
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ns="http://www.cisco.com/AXL/API/{axl_version}"><soapenv:Header/><soapenv:Body><ns:listPhone><searchCriteria>{criteria}</searchCriteria><returnedTags><name/></returnedTags></ns:listPhone></soapenv:Body></soapenv:Envelope>"#
    )
}

/// RIS `selectCmDevice` by name, any registration status.
pub fn select_cm_device_request(names: &[String]) -> String {
    let items: String = names
        .iter()
        .map(|name| format!("<soap:item><soap:Item>{}</soap:Item></soap:item>", escape(name.as_str())))
        .collect();
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:soap="http://schemas.cisco.com/ast/soap"><soapenv:Header/><soapenv:Body><soap:selectCmDevice><soap:StateInfo></soap:StateInfo><soap:CmSelectionCriteria><soap:MaxReturnedDevices>{max}</soap:MaxReturnedDevices><soap:DeviceClass>Phone</soap:DeviceClass><soap:Model>255</soap:Model><soap:Status>Any</soap:Status><soap:NodeName></soap:NodeName><soap:SelectBy>Name</soap:SelectBy><soap:SelectItems>{items}</soap:SelectItems><soap:Protocol>Any</soap:Protocol><soap:DownloadStatus>Any</soap:DownloadStatus></soap:CmSelectionCriteria></soap:selectCmDevice></soapenv:Body></soapenv:Envelope>"#,
        max = RIS_BATCH_SIZE,
    )
}

/// Device names from a `listPhoneResponse`, in response order.
pub fn phone_names(envelope: &XmlValue) -> Vec<String> {
    let mut phones = Vec::new();
    envelope.find_all("phone", &mut phones);
    phones
        .into_iter()
        .filter_map(|phone| phone.get("name").and_then(XmlValue::as_text))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// name → IPv4 address from a `selectCmDeviceResponse`.
///
/// RIS70 nests addresses as `IPAddress/item/IP`; older schemas put the
/// address directly in `IPAddress`.
pub fn registered_addresses(envelope: &XmlValue) -> HashMap<String, String> {
    let mut device_lists = Vec::new();
    envelope.find_all("CmDevices", &mut device_lists);

    let mut addresses = HashMap::new();
    for device in device_lists.into_iter().flat_map(|list| list.get_all("item")) {
        let Some(name) = device.get("Name").and_then(XmlValue::as_text) else {
            continue;
        };
        let address = match device.get("IPAddress") {
            Some(XmlValue::Text(ip)) => Some(ip.as_str()),
            Some(nested) => nested.find_text("IP"),
            None => None,
        };
        if let Some(address) = address.filter(|a| !a.is_empty()) {
            addresses
                .entry(name.to_string())
                .or_insert_with(|| address.to_string());
        }
    }
    addresses
}
