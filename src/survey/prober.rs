//! Device prober: the per-address unit of work.
//!
//! Phases run in order against one phone, each under its own timeout:
//! 1. NetworkConfiguration (mandatory; failure makes the phone unreachable)
//! 2. PortInformation (optional; failure degrades the record)
//! 3. DeviceInformation (optional)
//! 4. StatusMessages + DebugDisplay, only when diagnostics are enabled
//!
//! The record starts from the network fields, then port fields, then device
//! fields are overlaid in that order.

use std::sync::Arc;
use std::time::Duration;

use super::classifier::{classify_page, parse_container};
use super::counters::{pc_port_speed, port_error_total};
use super::diagnostics::{extract, log_entries, DiagnosticKind, DEFAULT_COUNT};
use super::error::SurveyError;
use super::schema::{
    is_report_field, OUT_OF_SERVICE_FIELD, PORT_ERRORS_FIELD, PORT_SPEED_FIELD,
    STATUS_ERRORS_FIELD, TRUST_STATUS_FIELD,
};
use super::traits::PageFetcher;
use super::types::*;

/// Knobs the prober needs from the survey configuration.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub phase_timeout: Duration,
    pub scan_mode: ScanMode,
    pub diagnostics: bool,
    pub diagnostic_count: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(2),
            scan_mode: ScanMode::ScanAll,
            diagnostics: false,
            diagnostic_count: DEFAULT_COUNT,
        }
    }
}

pub struct DeviceProber {
    fetcher: Arc<dyn PageFetcher>,
    settings: ProbeSettings,
}

impl DeviceProber {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ProbeSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Probe one phone. Always returns exactly one outcome.
    pub async fn probe(&self, address: &str) -> ProbeOutcome {
        let network = match self.record_phase(address, Endpoint::NetworkConfiguration, true).await {
            PhaseOutcome::Complete(fields) => fields,
            PhaseOutcome::Fatal { endpoint, error } | PhaseOutcome::Degraded { endpoint, error } => {
                if error.is_network() {
                    tracing::warn!(address, phase = %endpoint, error = %error, "Phone unreachable");
                } else {
                    tracing::warn!(address, phase = %endpoint, error = %error, "Phone returned an unusable page");
                }
                return ProbeOutcome::Unreachable(UnreachableDevice {
                    address: address.to_string(),
                    endpoint,
                    reason: error.to_string(),
                });
            }
        };

        // Filtering only needs the network page, so skip the other fetches.
        if !self.settings.scan_mode.includes(&network) {
            tracing::debug!(address, alt_tftp = network.get("AltTFTP").unwrap_or(""), "Filtered out");
            return ProbeOutcome::Filtered {
                address: address.to_string(),
            };
        }

        let port = self.optional_phase(address, Endpoint::PortInformation).await;
        let device = self.optional_phase(address, Endpoint::DeviceInformation).await;

        let mut fields = merge_record(&network, &port, &device);

        if self.settings.diagnostics {
            for (field, value) in self.collect_diagnostics(address).await {
                fields.insert(field, value);
            }
        }

        tracing::debug!(address, fields = fields.len(), "Phone probed");
        ProbeOutcome::Recorded(DeviceRecord {
            address: address.to_string(),
            fields,
        })
    }

    /// One fetch bounded by the phase timeout, whatever the fetcher does.
    async fn fetch_page(&self, address: &str, endpoint: Endpoint) -> Result<String, SurveyError> {
        let timeout = self.settings.phase_timeout;
        tokio::time::timeout(timeout, self.fetcher.fetch(address, endpoint))
            .await
            .map_err(|_| SurveyError::Timeout {
                endpoint,
                ms: timeout.as_millis() as u64,
            })?
    }

    async fn record_phase(
        &self,
        address: &str,
        endpoint: Endpoint,
        mandatory: bool,
    ) -> PhaseOutcome<FieldMap> {
        let result = match self.fetch_page(address, endpoint).await {
            Ok(body) => classify_page(endpoint, &body),
            Err(e) => Err(e),
        };
        settle(endpoint, mandatory, result)
    }

    async fn optional_phase(&self, address: &str, endpoint: Endpoint) -> FieldMap {
        match self.record_phase(address, endpoint, false).await {
            PhaseOutcome::Complete(fields) => fields,
            PhaseOutcome::Degraded { endpoint, error } | PhaseOutcome::Fatal { endpoint, error } => {
                tracing::warn!(address, phase = %endpoint, error = %error, "Continuing without page");
                FieldMap::new()
            }
        }
    }

    /// Newest-first log entries of a DeviceLog page, empty on failure.
    async fn log_phase(&self, address: &str, endpoint: Endpoint) -> Vec<String> {
        let result = match self.fetch_page(address, endpoint).await {
            Ok(body) => parse_container(endpoint, &body).map(|log| log_entries(&log)),
            Err(e) => Err(e),
        };
        match settle(endpoint, false, result) {
            PhaseOutcome::Complete(entries) => entries,
            PhaseOutcome::Degraded { endpoint, error } | PhaseOutcome::Fatal { endpoint, error } => {
                tracing::warn!(address, phase = %endpoint, error = %error, "Diagnostics page unavailable");
                Vec::new()
            }
        }
    }

    async fn collect_diagnostics(&self, address: &str) -> Vec<(&'static str, String)> {
        let count = self.settings.diagnostic_count;
        let status = self.log_phase(address, Endpoint::StatusMessages).await;
        let debug = self.log_phase(address, Endpoint::DebugDisplay).await;

        [
            (STATUS_ERRORS_FIELD, extract(&status, DiagnosticKind::StatusErrors, count)),
            (TRUST_STATUS_FIELD, extract(&status, DiagnosticKind::TrustList, count)),
            (OUT_OF_SERVICE_FIELD, extract(&debug, DiagnosticKind::OutOfServiceReason, count)),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

fn settle<T>(endpoint: Endpoint, mandatory: bool, result: Result<T, SurveyError>) -> PhaseOutcome<T> {
    match result {
        Ok(value) => PhaseOutcome::Complete(value),
        Err(error) if mandatory => PhaseOutcome::Fatal { endpoint, error },
        Err(error) => PhaseOutcome::Degraded { endpoint, error },
    }
}

/// Merge the three record pages into report fields.
///
/// `PortSpeed` is always set (`N/A` without a PC port or port page) and
/// `PortErrors` carries the summed counters.
pub fn merge_record(network: &FieldMap, port: &FieldMap, device: &FieldMap) -> FieldMap {
    let mut fields = FieldMap::new();
    for page in [network, port, device] {
        let reported: FieldMap = page.iter().filter(|(k, _)| is_report_field(k)).collect();
        fields.overlay(&reported);
    }
    fields.insert(PORT_SPEED_FIELD, pc_port_speed(port));
    fields.insert(PORT_ERRORS_FIELD, port_error_total(port).to_string());
    fields
}
