//! Core types for the phone survey pipeline.
//!
//! These types model one run end to end:
//! Address → Pages → FieldMaps → DeviceRecord | UnreachableDevice → Report.

use serde::{Deserialize, Serialize};

use super::error::SurveyError;

// ═══════════════════════════════════════════
// Endpoints
// ═══════════════════════════════════════════

/// The XML status pages a phone's embedded web server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    NetworkConfiguration,
    PortInformation,
    DeviceInformation,
    StatusMessages,
    DebugDisplay,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkConfiguration => "NetworkConfiguration",
            Self::PortInformation => "PortInformation",
            Self::DeviceInformation => "DeviceInformation",
            Self::StatusMessages => "StatusMessages",
            Self::DebugDisplay => "DebugDisplay",
        }
    }

    /// Request path, appended to `http://<address>`.
    pub fn path(&self) -> &'static str {
        match self {
            Self::NetworkConfiguration => "/NetworkConfigurationX",
            Self::PortInformation => "/PortInformationX?1",
            Self::DeviceInformation => "/DeviceInformationX",
            Self::StatusMessages => "/DeviceLogX?1",
            Self::DebugDisplay => "/DeviceLogX?2",
        }
    }

    /// Top-level element every well-formed page of this endpoint carries.
    pub fn container(&self) -> &'static str {
        match self {
            Self::NetworkConfiguration => "NetworkConfiguration",
            Self::PortInformation => "PortInformation",
            Self::DeviceInformation => "DeviceInformation",
            Self::StatusMessages | Self::DebugDisplay => "DeviceLog",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Field maps and records
// ═══════════════════════════════════════════

/// Ordered field name → value mapping.
///
/// Insertion order is kept; re-inserting an existing key replaces the value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every field of `other` into `self`; `other` wins on collision.
    pub fn overlay(&mut self, other: &FieldMap) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Merged result for one successfully probed phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub address: String,
    pub fields: FieldMap,
}

impl DeviceRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field)
    }
}

/// A phone whose mandatory NetworkConfiguration phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachableDevice {
    pub address: String,
    pub endpoint: Endpoint,
    pub reason: String,
}

// ═══════════════════════════════════════════
// Probe outcomes
// ═══════════════════════════════════════════

/// Result of one probe phase.
#[derive(Debug)]
pub enum PhaseOutcome<T> {
    /// Page fetched and classified.
    Complete(T),
    /// Secondary page failed; the record is still emitted without it.
    Degraded { endpoint: Endpoint, error: SurveyError },
    /// Mandatory page failed; the device is unreachable.
    Fatal { endpoint: Endpoint, error: SurveyError },
}

/// Disposition of one address. Every probed address ends in exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Recorded(DeviceRecord),
    /// Probed successfully but excluded by `ScanMode::AltTftpOnly`.
    Filtered { address: String },
    Unreachable(UnreachableDevice),
}

impl ProbeOutcome {
    pub fn address(&self) -> &str {
        match self {
            Self::Recorded(record) => &record.address,
            Self::Filtered { address } => address,
            Self::Unreachable(device) => &device.address,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Recorded(_) => OutcomeKind::Recorded,
            Self::Filtered { .. } => OutcomeKind::Filtered,
            Self::Unreachable(_) => OutcomeKind::Unreachable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Recorded,
    Filtered,
    Unreachable,
}

// ═══════════════════════════════════════════
// Modes
// ═══════════════════════════════════════════

/// Which successfully probed phones make it into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    ScanAll,
    /// Only phones whose NetworkConfiguration reports `AltTFTP` = `Yes`.
    AltTftpOnly,
}

impl ScanMode {
    pub fn includes(&self, network: &FieldMap) -> bool {
        match self {
            Self::ScanAll => true,
            Self::AltTftpOnly => network.get("AltTFTP") == Some("Yes"),
        }
    }
}

// ═══════════════════════════════════════════
// Batch result
// ═══════════════════════════════════════════

/// Everything a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub run_id: String,
    /// Report rows, in input order.
    pub records: Vec<DeviceRecord>,
    pub filtered: Vec<String>,
    /// In input order.
    pub unreachable: Vec<UnreachableDevice>,
    /// Addresses never started because the run was cancelled.
    pub not_probed: Vec<String>,
    pub input_missing: bool,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn empty(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.records.len() + self.filtered.len()
    }

    pub fn failed(&self) -> usize {
        self.unreachable.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed() + self.not_probed.len()
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurveyEvent {
    Started {
        device_count: usize,
    },
    DeviceFinished {
        completed: usize,
        total: usize,
        address: String,
        outcome: OutcomeKind,
    },
    Completed {
        succeeded: usize,
        unreachable: usize,
        duration_ms: u64,
    },
}
