use clap::{Args, Subcommand, ValueEnum};
use strum::Display;

/// `cloudprivs catalog` command: offline inspection of the embedded service
/// catalog. Never needs credentials or the network.
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CatalogCommand {
    /// List the services in the embedded catalog
    List {
        /// Output format
        #[arg(long, default_value = "pretty")]
        format: CatalogOutputFormat,
    },

    /// Show regions and operations for one service
    Describe {
        /// Service identifier, e.g. "ec2"
        service: String,

        /// Output format
        #[arg(long, default_value = "pretty")]
        format: CatalogOutputFormat,
    },
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum CatalogOutputFormat {
    Pretty,
    Json,
}
