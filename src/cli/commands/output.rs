use std::path::PathBuf;

use clap::{Args, ValueEnum};
use strum::Display;

use crate::util::get_writer_for_file_or_stdout;

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    pub format: ReportOutputFormat,
}

impl OutputArgs {
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn get_writer(&self) -> std::io::Result<Box<dyn std::io::Write>> {
        get_writer_for_file_or_stdout(self.output.as_ref())
    }
}

/// Report formats for scan results
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum ReportOutputFormat {
    Pretty,
    Json,
    Jsonl,
}
