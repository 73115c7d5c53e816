pub mod config;
pub mod discovery;
pub mod survey;

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use config::{DiscoveryMode, SurveyConfig};
use survey::runner::ProgressFn;
use survey::{BatchResult, DeviceLister, PageFetcher, SurveyCancel, SurveyError, SurveyRunner};

/// Install the global subscriber: stderr, plus a plain-text copy of every
/// event in `log_file` when one is given.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), SurveyError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| SurveyError::Config(format!("logging already initialized: {e}")))
}

/// One complete run: resolve addresses, probe, write both output files.
///
/// The report and the unreachable list are written even when there was
/// nothing to probe.
pub async fn run_survey(
    config: &SurveyConfig,
    lister: &dyn DeviceLister,
    fetcher: Arc<dyn PageFetcher>,
    cancel: &SurveyCancel,
    progress: Option<ProgressFn<'_>>,
) -> Result<BatchResult, SurveyError> {
    let resolved = discovery::resolve_addresses(lister).await;

    if config.save_discovered
        && config.discovery == DiscoveryMode::Cluster
        && !resolved.addresses.is_empty()
    {
        survey::write_address_list(&config.input_path, &resolved.addresses)?;
        tracing::info!(
            path = %config.input_path.display(),
            devices = resolved.addresses.len(),
            "Discovered addresses saved"
        );
    }

    let runner = SurveyRunner::from_config(fetcher, config);
    let mut result = runner.run(&resolved.addresses, cancel, progress).await;
    result.input_missing = resolved.input_missing();

    survey::write_report(&config.report_path, &result.records)?;
    survey::write_unreachable(&config.unreachable_path, &result.unreachable)?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::FileLister;
    use crate::survey::test_pages::*;
    use crate::survey::{Endpoint, MockPageFetcher, MockResponse};
    use async_trait::async_trait;

    fn config_in(dir: &Path) -> SurveyConfig {
        SurveyConfig {
            input_path: dir.join("ip_input.csv"),
            report_path: dir.join("Results.csv"),
            unreachable_path: dir.join("no_web_access_or_unreachable.txt"),
            ..SurveyConfig::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_writes_report_and_unreachable_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.input_path, "10.0.0.1\n10.0.0.2\n").unwrap();

        let fetcher = MockPageFetcher::new()
            .with_reply("10.0.0.1", Endpoint::NetworkConfiguration, MockResponse::Timeout)
            .with_phone("10.0.0.2", NETWORK_PAGE, PORT_PAGE, DEVICE_PAGE);
        let lister = FileLister::new(&config.input_path);

        let result = run_survey(&config, &lister, Arc::new(fetcher), &SurveyCancel::new(), None)
            .await
            .unwrap();

        assert_eq!(result.succeeded(), 1);
        assert!(!result.input_missing);

        let mut rdr = csv::Reader::from_path(&config.report_path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].iter().any(|v| v == "001122334455"));

        let unreachable = std::fs::read_to_string(&config.unreachable_path).unwrap();
        assert_eq!(unreachable, "10.0.0.1\n");
    }

    #[tokio::test]
    async fn missing_input_still_writes_empty_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let lister = FileLister::new(&config.input_path);

        let result = run_survey(
            &config,
            &lister,
            Arc::new(MockPageFetcher::new()),
            &SurveyCancel::new(),
            None,
        )
        .await
        .unwrap();

        assert!(result.input_missing);
        assert_eq!(result.total(), 0);
        assert!(config.report_path.exists());
        assert_eq!(std::fs::read_to_string(&config.unreachable_path).unwrap(), "");
    }

    struct DiscoveredLister;

    #[async_trait]
    impl DeviceLister for DiscoveredLister {
        fn describe(&self) -> String {
            "cluster test".into()
        }

        async fn list_addresses(&self) -> Result<Vec<String>, SurveyError> {
            Ok(vec!["10.0.0.2".into(), "10.0.0.3".into()])
        }
    }

    #[tokio::test]
    async fn discovered_addresses_are_saved_for_later_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = SurveyConfig {
            discovery: DiscoveryMode::Cluster,
            save_discovered: true,
            ..config_in(dir.path())
        };

        run_survey(
            &config,
            &DiscoveredLister,
            Arc::new(MockPageFetcher::new()),
            &SurveyCancel::new(),
            None,
        )
        .await
        .unwrap();

        let saved = std::fs::read_to_string(&config.input_path).unwrap();
        assert_eq!(saved, "10.0.0.2\n10.0.0.3\n");
    }
}
