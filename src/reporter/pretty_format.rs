use std::collections::BTreeSet;

use super::*;

impl ScanReporter {
    pub fn pretty_format<W: std::io::Write>(
        &self,
        mut writer: W,
        reports: &[ScanReport],
    ) -> Result<()> {
        for report in reports {
            writeln!(
                writer,
                "{}",
                self.styles.style_heading.apply_to(format!("=== {} ===", report.service))
            )?;

            let total_regions = report.regions.len();
            for outcome in [Outcome::Allowed, Outcome::Denied, Outcome::Errored, Outcome::Skipped] {
                if outcome != Outcome::Allowed && !self.show_all {
                    continue;
                }
                for (operation, results) in self.group_by_operation(report, outcome) {
                    let line =
                        format_line(operation, outcome, &results, total_regions);
                    writeln!(writer, "{}", self.styles.for_outcome(outcome).apply_to(line))?;
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

fn format_line(
    operation: &str,
    outcome: Outcome,
    results: &[&InvocationResult],
    total_regions: usize,
) -> String {
    let regions: BTreeSet<&str> = results.iter().map(|r| r.region.as_str()).collect();
    let where_part = if total_regions > 0 && regions.len() == total_regions {
        "All regions".to_string()
    } else {
        regions.into_iter().collect::<Vec<_>>().join(", ")
    };

    // Annotate with the error code when it is the same everywhere.
    let codes: BTreeSet<&str> =
        results.iter().filter_map(|r| r.error.as_ref()?.code.as_deref()).collect();
    match (outcome, codes.len()) {
        (Outcome::Denied | Outcome::Errored, 1) => {
            let code = codes.into_iter().next().unwrap_or_default();
            format!("[{}] {operation} - {where_part} ({code})", outcome.marker())
        }
        _ => format!("[{}] {operation} - {where_part}", outcome.marker()),
    }
}
