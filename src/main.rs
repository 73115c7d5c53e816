use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use phone_survey::config::{self, ClusterSettings, DiscoveryMode, SurveyConfig};
use phone_survey::survey::{
    BatchResult, HttpPageFetcher, ScanMode, SurveyCancel, SurveyError, SurveyEvent,
};
use phone_survey::{discovery, init_tracing, run_survey};

/// Survey Cisco IP phones through their web pages and write a CSV report
#[derive(Parser, Debug)]
#[command(name = "phone-survey", author, version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Address list, one phone per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// CSV report path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to list phones that could not be reached
    #[arg(long)]
    unreachable: Option<PathBuf>,

    /// Only report phones with an alternate TFTP server configured
    #[arg(long)]
    alt_tftp_only: bool,

    /// Maximum phones probed at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Per-page timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Stop starting new probes after this many seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Also read the device logs (status errors, trust list, out-of-service reason)
    #[arg(long)]
    diagnostics: bool,

    /// Log lines kept per diagnostics column
    #[arg(long)]
    diagnostic_count: Option<usize>,

    /// Discover phones from this call manager (FQDN or IPv4) instead of the input file
    #[arg(long, value_name = "HOST")]
    cluster: Option<String>,

    /// AXL user
    #[arg(long)]
    user: Option<String>,

    /// AXL password
    #[arg(long, env = "PHONE_SURVEY_AXL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Limit cluster discovery to one device pool
    #[arg(long)]
    device_pool: Option<String>,

    /// Write discovered addresses to the input file
    #[arg(long)]
    save_discovered: bool,

    /// Also log to a file; without a path a timestamped name is used
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

impl Cli {
    /// CLI flags take precedence over file and environment settings.
    fn apply(self, cfg: &mut SurveyConfig) {
        if let Some(v) = self.input {
            cfg.input_path = v;
        }
        if let Some(v) = self.output {
            cfg.report_path = v;
        }
        if let Some(v) = self.unreachable {
            cfg.unreachable_path = v;
        }
        if self.alt_tftp_only {
            cfg.scan_mode = ScanMode::AltTftpOnly;
        }
        if let Some(v) = self.concurrency {
            cfg.concurrency = v;
        }
        if let Some(v) = self.timeout {
            cfg.phase_timeout_secs = v;
        }
        if self.deadline.is_some() {
            cfg.deadline_secs = self.deadline;
        }
        if self.diagnostics {
            cfg.diagnostics = true;
        }
        if let Some(v) = self.diagnostic_count {
            cfg.diagnostic_count = v;
        }
        if self.save_discovered {
            cfg.save_discovered = true;
        }

        if self.cluster.is_some() {
            cfg.discovery = DiscoveryMode::Cluster;
        }
        if self.cluster.is_some() || self.user.is_some() || self.password.is_some() || self.device_pool.is_some() {
            let cluster = cfg.cluster.get_or_insert_with(ClusterSettings::default);
            if let Some(v) = self.cluster {
                cluster.host = v;
            }
            if let Some(v) = self.user {
                cluster.user = v;
            }
            if let Some(v) = self.password {
                cluster.password = v;
            }
            if let Some(v) = self.device_pool {
                cluster.device_pool = Some(v);
            }
        }
    }
}

fn print_summary(cfg: &SurveyConfig, result: &BatchResult) {
    if result.input_missing {
        println!("No addresses could be loaded; see the log for details.");
    }
    println!(
        "Successfully probed {} of {} phones in {:.1}s",
        result.succeeded(),
        result.total(),
        Duration::from_millis(result.duration_ms).as_secs_f64()
    );
    if !result.filtered.is_empty() {
        println!("  {} without an alternate TFTP server left out of the report", result.filtered.len());
    }
    println!("  {} rows written to {}", result.records.len(), cfg.report_path.display());
    if !result.unreachable.is_empty() {
        println!(
            "  {} unreachable, listed in {}",
            result.unreachable.len(),
            cfg.unreachable_path.display()
        );
    }
    if !result.not_probed.is_empty() {
        println!("  {} not probed (run cancelled)", result.not_probed.len());
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, SurveyError> {
    let mut cli = Cli::parse();

    let log_file = cli.log_file.take().map(|path| {
        path.unwrap_or_else(|| {
            PathBuf::from(config::log_file_name(&chrono::Local::now().naive_local()))
        })
    });
    init_tracing(log_file.as_deref())?;
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut cfg = SurveyConfig::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);
    cfg.validate()?;

    let cancel = SurveyCancel::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing phones already in progress");
                cancel.cancel();
            }
        });
    }

    let lister = discovery::build_lister(&cfg)?;
    let fetcher = Arc::new(HttpPageFetcher::new(cfg.phase_timeout())?);
    let progress = |event: SurveyEvent| {
        if let SurveyEvent::DeviceFinished { completed, total, .. } = event {
            if completed == total || completed % 50 == 0 {
                tracing::info!(completed, total, "Progress");
            }
        }
    };

    let result = run_survey(&cfg, lister.as_ref(), fetcher, &cancel, Some(&progress)).await?;
    print_summary(&cfg, &result);

    Ok(ExitCode::SUCCESS)
}
