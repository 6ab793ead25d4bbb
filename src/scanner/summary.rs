use std::io::{self, Write};

use tokio::time::Instant;

use crate::util::Counted;

use super::{OutcomeTotals, ScanReport};

macro_rules! safe_eprintln {
    ($($arg:tt)*) => {
        if let Err(e) = writeln!(io::stderr(), $($arg)*) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                // Consumer went away; nothing left to report.
                std::process::exit(0);
            } else {
                panic!("stderr error: {}", e);
            }
        }
    };
}

/// One-line run summary, written to stderr so structured stdout output stays
/// clean.
pub fn print_scan_summary(start: Instant, reports: &[ScanReport]) {
    let mut totals = OutcomeTotals::default();
    for report in reports {
        totals.merge(&report.totals());
    }

    safe_eprintln!(
        "Scanned {} ({}) in {:.2}s: {} allowed, {} denied, {} errored, {} skipped",
        Counted::regular(reports.len(), "service"),
        Counted::regular(totals.total(), "invocation"),
        start.elapsed().as_secs_f64(),
        totals.allowed,
        totals.denied,
        totals.errored,
        totals.skipped,
    );
}
