use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use std::{env, fs};

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::survey::diagnostics::DEFAULT_COUNT;
use crate::survey::error::SurveyError;
use crate::survey::prober::ProbeSettings;
use crate::survey::types::ScanMode;

/// Application-level constants
pub const APP_NAME: &str = "phone-survey";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "PHONE_SURVEY_CONFIG";

pub const DEFAULT_INPUT_FILE: &str = "ip_input.csv";
pub const DEFAULT_REPORT_FILE: &str = "Results.csv";
pub const DEFAULT_UNREACHABLE_FILE: &str = "no_web_access_or_unreachable.txt";
pub const DEFAULT_CONCURRENCY: usize = 32;
pub const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_AXL_VERSION: &str = "11.0";

/// Used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "phone_survey=info,warn"
}

/// Log file name stamped with the run's local start time,
/// e.g. `October_01_2019_08.52.30_PM_survey_log.txt`.
pub fn log_file_name(started: &NaiveDateTime) -> String {
    started.format("%B_%d_%Y_%I.%M.%S_%p_survey_log.txt").to_string()
}

static FQDN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.){2,}([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9]){2,}$",
    )
    .unwrap()
});

/// A call-manager host must be a dotted IPv4 address or an FQDN with at
/// least three labels.
pub fn is_valid_host(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok() || FQDN_RE.is_match(host)
}

// ═══════════════════════════════════════════
// Types
// ═══════════════════════════════════════════

/// Where the address list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Newline-delimited input file.
    #[default]
    File,
    /// Query the call-manager directory (AXL + RIS).
    Cluster,
}

/// Call-manager connection for cluster discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Publisher or subscriber, FQDN or IPv4.
    pub host: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Limit discovery to one device pool.
    pub device_pool: Option<String>,
    pub axl_version: String,
}

impl ClusterSettings {
    /// AXL schema version used in the SOAP namespace.
    pub fn schema_version(&self) -> &str {
        if self.axl_version.trim().is_empty() {
            DEFAULT_AXL_VERSION
        } else {
            self.axl_version.trim()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Maximum phones probed at once.
    pub concurrency: usize,
    /// Timeout for each page fetch.
    pub phase_timeout_secs: u64,
    /// Stop starting new probes after this many seconds.
    pub deadline_secs: Option<u64>,
    pub scan_mode: ScanMode,
    pub discovery: DiscoveryMode,
    pub input_path: PathBuf,
    pub report_path: PathBuf,
    pub unreachable_path: PathBuf,
    /// Fetch the device log pages and fill the diagnostics columns.
    pub diagnostics: bool,
    pub diagnostic_count: usize,
    pub cluster: Option<ClusterSettings>,
    /// Write discovered addresses back to `input_path`.
    pub save_discovered: bool,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            phase_timeout_secs: DEFAULT_PHASE_TIMEOUT_SECS,
            deadline_secs: None,
            scan_mode: ScanMode::ScanAll,
            discovery: DiscoveryMode::File,
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            report_path: PathBuf::from(DEFAULT_REPORT_FILE),
            unreachable_path: PathBuf::from(DEFAULT_UNREACHABLE_FILE),
            diagnostics: false,
            diagnostic_count: DEFAULT_COUNT,
            cluster: None,
            save_discovered: false,
        }
    }
}

// ═══════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════

impl SurveyConfig {
    /// Defaults, then the JSON file (explicit path or `PHONE_SURVEY_CONFIG`),
    /// then environment overrides. CLI flags are applied by the caller.
    pub fn load(path: Option<&Path>) -> Result<Self, SurveyError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut cfg = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, SurveyError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SurveyError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| SurveyError::Config(format!("invalid {}: {e}", path.display())))
    }

    /// Apply `PHONE_SURVEY_*` overrides. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
            let raw = raw?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Ignoring invalid numeric override");
                    None
                }
            }
        }

        if let Some(v) = parsed("PHONE_SURVEY_CONCURRENCY", lookup("PHONE_SURVEY_CONCURRENCY")) {
            self.concurrency = v;
        }
        if let Some(v) = parsed("PHONE_SURVEY_TIMEOUT", lookup("PHONE_SURVEY_TIMEOUT")) {
            self.phase_timeout_secs = v;
        }
        if let Some(v) = parsed("PHONE_SURVEY_DEADLINE", lookup("PHONE_SURVEY_DEADLINE")) {
            self.deadline_secs = Some(v);
        }
        if let Some(v) = lookup("PHONE_SURVEY_INPUT") {
            self.input_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PHONE_SURVEY_REPORT") {
            self.report_path = PathBuf::from(v);
        }

        let host = lookup("PHONE_SURVEY_AXL_HOST");
        let user = lookup("PHONE_SURVEY_AXL_USER");
        let password = lookup("PHONE_SURVEY_AXL_PASSWORD");
        let pool = lookup("PHONE_SURVEY_DEVICE_POOL");
        if host.is_some() || user.is_some() || password.is_some() || pool.is_some() {
            let cluster = self.cluster.get_or_insert_with(ClusterSettings::default);
            if let Some(v) = host {
                cluster.host = v;
            }
            if let Some(v) = user {
                cluster.user = v;
            }
            if let Some(v) = password {
                cluster.password = v;
            }
            if let Some(v) = pool {
                cluster.device_pool = Some(v);
            }
        }
    }

    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.concurrency == 0 {
            return Err(SurveyError::Config("concurrency must be at least 1".into()));
        }
        if self.phase_timeout_secs == 0 {
            return Err(SurveyError::Config("phase timeout must be at least 1 second".into()));
        }
        if self.diagnostic_count == 0 {
            return Err(SurveyError::Config("diagnostic count must be at least 1".into()));
        }

        if self.discovery == DiscoveryMode::Cluster {
            let cluster = self.cluster.as_ref().ok_or_else(|| {
                SurveyError::Config("cluster discovery needs a call-manager host".into())
            })?;
            if !is_valid_host(&cluster.host) {
                return Err(SurveyError::Config(format!(
                    "'{}' is neither an IPv4 address nor a fully qualified domain name",
                    cluster.host
                )));
            }
            if cluster.user.trim().is_empty() || cluster.password.is_empty() {
                return Err(SurveyError::Config("cluster discovery needs a user and password".into()));
            }
            if matches!(&cluster.device_pool, Some(pool) if pool.trim().is_empty()) {
                return Err(SurveyError::Config("device pool name is empty".into()));
            }
        }
        Ok(())
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            phase_timeout: self.phase_timeout(),
            scan_mode: self.scan_mode,
            diagnostics: self.diagnostics,
            diagnostic_count: self.diagnostic_count,
        }
    }
}
