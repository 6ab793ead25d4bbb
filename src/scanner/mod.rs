//! Scan orchestration and aggregation.

pub mod runner;
pub mod summary;

pub use runner::{ScanOptions, Scanner};

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Serialize;

use crate::invoker::{InvocationResult, Outcome};

/// Phases of one service scan, in order. Logged for debugging; the
/// transitions are linear and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Discovering,
    Dispatching,
    Collecting,
    Complete,
}

/// All results for one service, grouped by region. Built incrementally while
/// invocations complete, immutable once finalized.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ScanReport {
    pub service: String,
    /// Region identifier to results for that region. BTreeMap keeps region
    /// ordering stable for reproducible output.
    pub regions: BTreeMap<String, Vec<InvocationResult>>,
}

impl ScanReport {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into(), regions: BTreeMap::new() }
    }

    pub fn record(&mut self, result: InvocationResult) {
        self.regions.entry(result.region.clone()).or_default().push(result);
    }

    /// Imposes the within-region ordering. Completion order is arbitrary
    /// under concurrency; sorting here is what makes output reproducible.
    pub fn finalize(&mut self) {
        for results in self.regions.values_mut() {
            results.sort_by(|a, b| a.operation.cmp(&b.operation).then(a.outcome.cmp(&b.outcome)));
        }
    }

    pub fn totals(&self) -> OutcomeTotals {
        let mut totals = OutcomeTotals::default();
        for result in self.regions.values().flatten() {
            totals.add(result.outcome);
        }
        totals
    }

    pub fn num_results(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn tested_regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }
}

/// Per-outcome counters for one or more reports.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeTotals {
    pub allowed: usize,
    pub denied: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl OutcomeTotals {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Allowed => self.allowed += 1,
            Outcome::Denied => self.denied += 1,
            Outcome::Errored => self.errored += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeTotals) {
        self.allowed += other.allowed;
        self.denied += other.denied;
        self.errored += other.errored;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> usize {
        self.allowed + self.denied + self.errored + self.skipped
    }
}
