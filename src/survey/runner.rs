//! SurveyRunner: the batch orchestrator.
//!
//! One spawned task per address, gated by a semaphore so at most
//! `concurrency` phones are probed at once. Outcomes are collected by the
//! runner alone and sorted back into input order before they are returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use super::prober::{DeviceProber, ProbeSettings};
use super::traits::PageFetcher;
use super::types::*;
use crate::config::SurveyConfig;

/// Progress callback. Called from the runner's own task, never concurrently.
pub type ProgressFn<'a> = &'a (dyn Fn(SurveyEvent) + Send + Sync);

/// Shared stop flag. Once set, no further probes are started.
#[derive(Debug, Clone, Default)]
pub struct SurveyCancel(Arc<AtomicBool>);

impl SurveyCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct SurveyRunner {
    prober: Arc<DeviceProber>,
    concurrency: usize,
    deadline: Option<Duration>,
}

impl SurveyRunner {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ProbeSettings, concurrency: usize) -> Self {
        Self {
            prober: Arc::new(DeviceProber::new(fetcher, settings)),
            concurrency: concurrency.max(1),
            deadline: None,
        }
    }

    pub fn from_config(fetcher: Arc<dyn PageFetcher>, config: &SurveyConfig) -> Self {
        Self::new(fetcher, config.probe_settings(), config.concurrency).with_deadline(config.deadline())
    }

    /// Stop starting probes this long after the run begins.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Probe every address and wait for all started probes to finish.
    ///
    /// Every address ends up in exactly one of `records`, `filtered`,
    /// `unreachable` or `not_probed`.
    pub async fn run(
        &self,
        addresses: &[String],
        cancel: &SurveyCancel,
        progress: Option<ProgressFn<'_>>,
    ) -> BatchResult {
        let run_id = new_run_id();
        let span = tracing::info_span!("survey", run_id = %run_id);
        self.run_batch(run_id, addresses, cancel, progress)
            .instrument(span)
            .await
    }

    async fn run_batch(
        &self,
        run_id: String,
        addresses: &[String],
        cancel: &SurveyCancel,
        progress: Option<ProgressFn<'_>>,
    ) -> BatchResult {
        let start = Instant::now();
        let total = addresses.len();
        let emit = |event: SurveyEvent| {
            if let Some(progress) = progress {
                progress(event);
            }
        };

        tracing::info!(devices = total, concurrency = self.concurrency, "Survey started");
        emit(SurveyEvent::Started { device_count: total });

        let deadline_timer = self.deadline.map(|deadline| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!(deadline_secs = deadline.as_secs_f64(), "Deadline reached, no new probes will start");
                cancel.cancel();
            })
        });

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut queue = addresses.iter().cloned().enumerate();
        let mut next = queue.next();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes: Vec<(usize, ProbeOutcome)> = Vec::with_capacity(total);
        let mut not_probed: Vec<(usize, String)> = Vec::new();

        loop {
            if next.is_some() && cancel.is_cancelled() {
                not_probed.extend(next.take());
                not_probed.extend(queue.by_ref());
                tracing::warn!(skipped = not_probed.len(), "Survey cancelled");
            }

            tokio::select! {
                biased;

                Some((index, address, joined)) = in_flight.next() => {
                    let outcome = match joined {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(address = %address, error = %e, "Probe task failed");
                            ProbeOutcome::Unreachable(UnreachableDevice {
                                address,
                                endpoint: Endpoint::NetworkConfiguration,
                                reason: format!("probe task failed: {e}"),
                            })
                        }
                    };

                    emit(SurveyEvent::DeviceFinished {
                        completed: outcomes.len() + 1,
                        total,
                        address: outcome.address().to_string(),
                        outcome: outcome.kind(),
                    });
                    outcomes.push((index, outcome));
                }

                permit = semaphore.clone().acquire_owned(), if next.is_some() => {
                    let Ok(permit) = permit else {
                        cancel.cancel();
                        continue;
                    };
                    // Re-checked at the top of the loop.
                    if cancel.is_cancelled() {
                        continue;
                    }
                    let Some((index, address)) = next.take() else {
                        continue;
                    };
                    next = queue.next();

                    let prober = self.prober.clone();
                    let task_address = address.clone();
                    let handle = tokio::spawn(async move {
                        let _permit = permit;
                        prober.probe(&task_address).await
                    }.in_current_span());
                    in_flight.push(async move { (index, address, handle.await) });
                }

                else => break,
            }
        }

        if let Some(timer) = deadline_timer {
            timer.abort();
        }

        let mut result = collect(run_id, outcomes, not_probed);
        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            succeeded = result.succeeded(),
            reported = result.records.len(),
            filtered = result.filtered.len(),
            unreachable = result.failed(),
            not_probed = result.not_probed.len(),
            duration_ms = result.duration_ms,
            "Survey finished"
        );
        emit(SurveyEvent::Completed {
            succeeded: result.succeeded(),
            unreachable: result.failed(),
            duration_ms: result.duration_ms,
        });

        result
    }
}

/// Sort outcomes back into input order and split them by disposition.
fn collect(
    run_id: String,
    mut outcomes: Vec<(usize, ProbeOutcome)>,
    mut not_probed: Vec<(usize, String)>,
) -> BatchResult {
    outcomes.sort_by_key(|(index, _)| *index);
    not_probed.sort_by_key(|(index, _)| *index);

    let mut result = BatchResult::empty(&run_id);
    for (_, outcome) in outcomes {
        match outcome {
            ProbeOutcome::Recorded(record) => result.records.push(record),
            ProbeOutcome::Filtered { address } => result.filtered.push(address),
            ProbeOutcome::Unreachable(device) => result.unreachable.push(device),
        }
    }
    result.not_probed = not_probed.into_iter().map(|(_, address)| address).collect();
    result
}
