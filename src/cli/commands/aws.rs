use std::path::PathBuf;

use clap::Args;

use crate::cli::commands::output::OutputArgs;

/// Default invocation parallelism: twice the CPU count, capped to stay
/// polite toward the target APIs.
fn default_scan_jobs() -> usize {
    (num_cpus::get() * 2).clamp(1, 30)
}

/// `cloudprivs aws` command and flags
#[derive(Args, Debug, Clone)]
pub struct AwsArgs {
    /// Name of the AWS profile to scan; the default credential chain is used
    /// when omitted
    #[arg(long, short = 'p')]
    pub profile: Option<String>,

    /// Region substring filters, e.g. "us" or "eu-west" (repeatable)
    #[arg(long = "regions", short = 'r', value_name = "SUBSTRING")]
    pub regions: Vec<String>,

    /// Only test the given services instead of every catalog service
    /// (repeatable)
    #[arg(long = "services", short = 's', value_name = "SERVICE")]
    pub services: Vec<String>,

    /// Custom tests YAML merged over the built-in defaults (repeatable,
    /// later files win)
    #[arg(long = "custom-tests", short = 't', value_name = "FILE")]
    pub custom_tests: Vec<PathBuf>,

    /// Number of parallel invocations
    #[arg(long, short = 'j', default_value_t = default_scan_jobs())]
    pub jobs: usize,

    /// Run invocations one at a time
    #[arg(long, default_value_t = false)]
    pub no_parallel: bool,

    /// Include denied, errored and skipped operations in the report
    #[arg(long, default_value_t = false)]
    pub show_all: bool,

    /// Per-invocation timeout in seconds
    #[arg(long, default_value_t = 15, value_name = "SECONDS")]
    pub timeout: u64,

    /// Additional operation-name prefixes to deny-list (repeatable)
    #[arg(long = "deny-prefix", value_name = "PREFIX")]
    pub deny_prefixes: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl AwsArgs {
    pub fn effective_jobs(&self) -> usize {
        if self.no_parallel {
            1
        } else {
            self.jobs.max(1)
        }
    }
}
