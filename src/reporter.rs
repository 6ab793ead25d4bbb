//! Report rendering.
//!
//! Consumes finished scan reports and renders them grouped by region with
//! stable ordering, so the same scan always produces the same output.
//! Allowed results are always surfaced; Denied/Errored/Skipped only when the
//! caller asked for everything.

use std::collections::BTreeMap;

use anyhow::Result;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    cli::{
        commands::{aws::AwsArgs, output::ReportOutputFormat},
        global::GlobalArgs,
    },
    invoker::{InvocationResult, Outcome},
    scanner::ScanReport,
};

mod json_format;
mod pretty_format;
pub mod styles;

use styles::Styles;

pub fn run(global_args: &GlobalArgs, reports: &[ScanReport], args: &AwsArgs) -> Result<()> {
    let use_color = global_args.use_color(std::io::stdout()) && !args.output.has_output();
    let reporter = ScanReporter { styles: Styles::new(use_color), show_all: args.show_all };
    let writer = args.output.get_writer()?;
    match args.output.format {
        ReportOutputFormat::Pretty => reporter.pretty_format(writer, reports),
        ReportOutputFormat::Json => reporter.json_format(writer, reports),
        ReportOutputFormat::Jsonl => reporter.jsonl_format(writer, reports),
    }
}

pub struct ScanReporter {
    pub styles: Styles,
    pub show_all: bool,
}

/// One service's visible results, region -> results, ready to serialize.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ServiceRecord<'r> {
    pub service: &'r str,
    pub regions: BTreeMap<&'r str, Vec<&'r InvocationResult>>,
}

impl ScanReporter {
    fn visible(&self, result: &InvocationResult) -> bool {
        self.show_all || result.outcome == Outcome::Allowed
    }

    pub fn build_service_records<'r>(&self, reports: &'r [ScanReport]) -> Vec<ServiceRecord<'r>> {
        reports
            .iter()
            .map(|report| ServiceRecord {
                service: &report.service,
                regions: report
                    .regions
                    .iter()
                    .map(|(region, results)| {
                        (
                            region.as_str(),
                            results.iter().filter(|r| self.visible(r)).collect::<Vec<_>>(),
                        )
                    })
                    .filter(|(_, results)| !results.is_empty())
                    .collect(),
            })
            .collect()
    }

    /// Regions per (operation, outcome), in stable order. Pretty output
    /// collapses an operation to one line per outcome across regions.
    fn group_by_operation<'r>(
        &self,
        report: &'r ScanReport,
        outcome: Outcome,
    ) -> BTreeMap<&'r str, Vec<&'r InvocationResult>> {
        let mut grouped: BTreeMap<&str, Vec<&InvocationResult>> = BTreeMap::new();
        for result in report.regions.values().flatten() {
            if result.outcome == outcome {
                grouped.entry(result.operation.as_str()).or_default().push(result);
            }
        }
        grouped
    }
}
