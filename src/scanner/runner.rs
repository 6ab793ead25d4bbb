//! The scan engine.
//!
//! Fans out one invocation task per (region, operation) pair under a
//! run-wide concurrency cap, collects classified results, and aggregates
//! them per service. Faults stay contained: a failing task is recorded as an
//! Errored result for its pair and never disturbs siblings; a service whose
//! discovery fails is skipped without aborting the run.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    catalog::{filter_regions, filter_services, CatalogSource},
    invoker::{ErrorDetail, InvocationRequest, InvocationResult, OperationInvoker},
    rules::RuleSet,
    safety::SafetyFilter,
};

use super::{ScanPhase, ScanReport};

/// How many services may be mid-scan at once. Invocation parallelism is
/// governed by the shared permit pool, not by this.
const SERVICE_CONCURRENCY: usize = 4;

/// Scan-wide knobs, resolved from CLI flags before the scanner is built.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Region substring filters; empty retains every region.
    pub region_filters: Vec<String>,
    /// Exact service identifiers to scan; empty retains every service.
    pub service_subset: Vec<String>,
    /// Maximum in-flight invocations across the whole run. 1 means fully
    /// sequential; classification results are identical either way.
    pub jobs: usize,
    pub progress: bool,
}

pub struct Scanner<C, I>
where
    C: CatalogSource,
    I: OperationInvoker + 'static,
{
    catalog: C,
    invoker: Arc<I>,
    rules: RuleSet,
    safety: SafetyFilter,
    options: ScanOptions,
    limiter: Arc<Semaphore>,
    cancel: Arc<AtomicBool>,
}

impl<C, I> Scanner<C, I>
where
    C: CatalogSource,
    I: OperationInvoker + 'static,
{
    pub fn new(
        catalog: C,
        invoker: Arc<I>,
        rules: RuleSet,
        safety: SafetyFilter,
        options: ScanOptions,
    ) -> Self {
        let jobs = options.jobs.max(1);
        Self {
            catalog,
            invoker,
            rules,
            safety,
            options: ScanOptions { jobs, ..options },
            limiter: Arc::new(Semaphore::new(jobs)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for external interrupts. Once set, no new invocations start;
    /// in-flight calls finish and partial results remain valid.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Scans every selected service and returns finalized reports in stable
    /// (service name) order.
    pub async fn run(&self) -> Result<Vec<ScanReport>> {
        let services = filter_services(self.catalog.service_ids(), &self.options.service_subset);
        for requested in &self.options.service_subset {
            if !services.iter().any(|s| s == requested) {
                warn!("Requested service `{requested}` is not in the catalog");
            }
        }

        let progress = build_progress(self.options.progress)?;
        let mut reports: Vec<ScanReport> = stream::iter(services)
            .map(|service| self.scan_service(service, progress.clone()))
            .buffer_unordered(SERVICE_CONCURRENCY)
            .filter_map(|report| async move { report })
            .collect()
            .await;
        progress.finish_and_clear();

        reports.sort_by(|a, b| a.service.cmp(&b.service));
        for report in &mut reports {
            report.finalize();
        }
        Ok(reports)
    }

    /// One full service scan: discover, dispatch, collect. Returns None when
    /// discovery fails or the scan was cancelled before this service started.
    async fn scan_service(&self, service: String, progress: ProgressBar) -> Option<ScanReport> {
        debug!(service = %service, phase = ?ScanPhase::Idle, "scan phase");
        if self.cancel.load(Ordering::Relaxed) {
            return None;
        }

        debug!(service = %service, phase = ?ScanPhase::Discovering, "scan phase");
        let descriptor = match self.catalog.describe(&service) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!("Skipping service `{service}`: {err}");
                return None;
            }
        };

        let regions = filter_regions(&descriptor.regions, &self.options.region_filters);
        let mut report = ScanReport::new(&service);
        if regions.is_empty() {
            warn!("Service `{service}` is not available in any region matching the filter");
            return Some(report);
        }

        debug!(service = %service, phase = ?ScanPhase::Dispatching, "scan phase");
        progress.set_message(format!("scanning {service}"));
        let mut handles: Vec<(String, String, JoinHandle<Option<InvocationResult>>)> = Vec::new();
        'dispatch: for region in &regions {
            for operation in &descriptor.operations {
                if self.cancel.load(Ordering::Relaxed) {
                    break 'dispatch;
                }
                if !self.safety.permits(operation) {
                    report.record(InvocationResult::skipped(operation, region));
                    continue;
                }

                let request = InvocationRequest {
                    service: service.clone(),
                    region: region.clone(),
                    operation: operation.clone(),
                    arguments: self.rules.arguments_for(&service, operation),
                };
                let invoker = Arc::clone(&self.invoker);
                let limiter = Arc::clone(&self.limiter);
                let cancel = Arc::clone(&self.cancel);
                progress.inc_length(1);
                let handle = tokio::spawn(async move {
                    let Ok(_permit) = limiter.acquire_owned().await else {
                        return None;
                    };
                    if cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    Some(invoker.invoke(request).await)
                });
                handles.push((region.clone(), operation.clone(), handle));
            }
        }

        debug!(service = %service, phase = ?ScanPhase::Collecting, "scan phase");
        for (region, operation, handle) in handles {
            match handle.await {
                Ok(Some(result)) => report.record(result),
                // Cancelled before its network call started.
                Ok(None) => {}
                Err(err) => {
                    report.record(InvocationResult::errored(
                        &operation,
                        &region,
                        ErrorDetail::message_only(format!("invocation task failed: {err}")),
                    ));
                }
            }
            progress.inc(1);
        }

        debug!(service = %service, phase = ?ScanPhase::Complete, "scan phase");
        Some(report)
    }
}

fn build_progress(enabled: bool) -> Result<ProgressBar> {
    if !enabled {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.green/blue}] {pos}/{len} [{elapsed_precise}]",
        )?
        .progress_chars("=>-")
        .tick_chars("|/-\\"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}
