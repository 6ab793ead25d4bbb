use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use anyhow::{Context, Result};
use cloudprivs::{
    catalog::CatalogSource,
    cli::{
        commands::{
            aws::AwsArgs,
            catalog::{CatalogArgs, CatalogCommand, CatalogOutputFormat},
        },
        global::Command,
        CommandLineArgs, GlobalArgs,
    },
    providers::aws::{self, metadata::AwsCatalog, AwsProvider},
    reporter,
    rule_loader::RuleLoader,
    safety::SafetyFilter,
    scanner::{summary::print_scan_summary, ScanOptions, Scanner},
    util::Counted,
};
use tokio::{runtime::Builder, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

fn main() -> Result<()> {
    let args = CommandLineArgs::parse_args();
    setup_logging(&args.global_args);

    let runtime =
        Builder::new_multi_thread().enable_all().build().context("Failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

fn setup_logging(global_args: &GlobalArgs) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(global_args.log_level()).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

async fn async_main(args: CommandLineArgs) -> Result<()> {
    match &args.command {
        Command::Aws(aws_args) => cmd_aws(&args.global_args, aws_args).await,
        Command::Catalog(catalog_args) => cmd_catalog(catalog_args),
    }
}

async fn cmd_aws(global_args: &GlobalArgs, args: &AwsArgs) -> Result<()> {
    let start = Instant::now();

    // Configuration problems are fatal and surface before any network I/O.
    let rules = RuleLoader::new()
        .additional_rule_load_paths(&args.custom_tests)
        .load()
        .context("Failed to load test rules")?;
    let safety = SafetyFilter::default().with_prefixes(args.deny_prefixes.iter().cloned());
    let catalog = AwsCatalog::embedded()?;

    let config = aws::load_session(args.profile.as_deref()).await;
    info!("Established AWS session");
    let identity =
        aws::validate_credentials(&config).await.context("Credential validation failed")?;
    info!("Validated credentials for {identity}");

    let provider = AwsProvider::new(&config, Duration::from_secs(args.timeout)).await?;

    let options = ScanOptions {
        region_filters: args.regions.clone(),
        service_subset: args.services.clone(),
        jobs: args.effective_jobs(),
        progress: global_args.use_progress(),
    };
    let scanner = Scanner::new(catalog, Arc::new(provider), rules, safety, options);

    let cancel = scanner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; letting in-flight invocations finish");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let reports = scanner.run().await?;
    reporter::run(global_args, &reports, args).context("Failed to render report")?;
    print_scan_summary(start, &reports);
    Ok(())
}

fn cmd_catalog(args: &CatalogArgs) -> Result<()> {
    let catalog = AwsCatalog::embedded()?;
    match &args.command {
        CatalogCommand::List { format } => match format {
            CatalogOutputFormat::Pretty => {
                for service in catalog.service_ids() {
                    let descriptor = catalog.describe(&service)?;
                    println!(
                        "{service}: {} in {}",
                        Counted::regular(descriptor.operations.len(), "operation"),
                        Counted::regular(descriptor.regions.len(), "region"),
                    );
                }
            }
            CatalogOutputFormat::Json => {
                let descriptors = catalog
                    .service_ids()
                    .iter()
                    .map(|service| catalog.describe(service))
                    .collect::<Result<Vec<_>, _>>()?;
                println!("{}", serde_json::to_string_pretty(&descriptors)?);
            }
        },
        CatalogCommand::Describe { service, format } => {
            let descriptor = catalog.describe(service)?;
            match format {
                CatalogOutputFormat::Pretty => {
                    println!("service: {}", descriptor.service);
                    println!("regions: {}", descriptor.regions.join(", "));
                    println!("operations:");
                    for operation in &descriptor.operations {
                        println!("  {operation}");
                    }
                }
                CatalogOutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&descriptor)?);
                }
            }
        }
    }
    Ok(())
}
