use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use wastectl::config::{self, Config};
use wastectl::orchestrator::RunOrchestrator;
use wastectl::pricing::PricingResolver;
use wastectl::provider::{InventorySource, MetricsSource, Notifier, ReportStore};
use wastectl::providers::{
    verify_credentials, AwsInventory, AwsMetrics, AwsPriceList, S3ReportStore, SnsNotifier,
};
use wastectl::scanners::{
    ComputeScanner, DatabaseScanner, ObjectStoreScanner, ResourceScanner, VolumeScanner,
};
use wastectl::RunStatus;

#[derive(Parser)]
#[command(name = "wastectl")]
#[command(
    about = "Scheduled cost-waste scanner for AWS accounts",
    long_about = "wastectl scans one AWS account/region for resources that cost money without doing useful work.\n\nDetects:\n  - Idle EC2 instances (low average CPU)\n  - Unattached and low-activity EBS volumes\n  - Idle RDS instances and stale manual snapshots\n  - Inactive S3 buckets\n\nEach wasteful resource gets an estimated monthly cost from the Price List API,\nwith a built-in static price table as fallback. Reports can be persisted to S3\nand summarized over SNS for scheduled (cron) operation."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full cost-waste scan
    Scan {
        /// Region to scan (overrides config)
        #[arg(short, long)]
        region: Option<String>,
        /// Skip persisting the report to S3
        #[arg(long)]
        no_upload: bool,
        /// Skip the SNS summary notification
        #[arg(long)]
        no_notify: bool,
        /// Skip the live Price List API, use the built-in price table only
        #[arg(long)]
        static_pricing: bool,
    },
    /// Initialize a configuration file with default thresholds
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".wastectl.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("wastectl=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { output } => config::init_config(&output),
        Commands::Scan {
            region,
            no_upload,
            no_notify,
            static_pricing,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            scan(config, region, no_upload, no_notify, static_pricing, &cli.output).await
        }
    }
}

async fn scan(
    config: Config,
    region_override: Option<String>,
    no_upload: bool,
    no_notify: bool,
    static_pricing: bool,
    output: &str,
) -> Result<()> {
    let region = region_override.unwrap_or_else(|| config.scan.region.clone());
    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.clone()))
        .load()
        .await;

    let notifier: Option<Arc<dyn Notifier>> = if no_notify {
        None
    } else {
        config
            .report
            .sns_topic_arn
            .as_ref()
            .map(|arn| Arc::new(SnsNotifier::new(&sdk_config, arn)) as Arc<dyn Notifier>)
    };

    // Auth preflight: without a valid identity nothing can be scanned, so
    // this failure gets its own notification instead of a report.
    if let Err(e) = verify_credentials(&sdk_config).await {
        let mut bare = RunOrchestrator::new(&region);
        if let Some(n) = &notifier {
            bare = bare.with_notifier(Arc::clone(n));
        }
        bare.notify_run_failure(&e.to_string()).await;
        anyhow::bail!("credential check failed: {}", e);
    }

    let pricing = if static_pricing || !config.scan.use_pricing_api {
        Arc::new(PricingResolver::static_only())
    } else {
        Arc::new(PricingResolver::new(Arc::new(AwsPriceList::new(&sdk_config))))
    };
    let inventory: Arc<dyn InventorySource> = Arc::new(AwsInventory::new(&sdk_config));
    let metrics: Arc<dyn MetricsSource> = Arc::new(AwsMetrics::new(&sdk_config));

    let mut orchestrator = RunOrchestrator::new(&region)
        .with_scanner(Arc::new(ComputeScanner::new(
            Arc::clone(&inventory),
            Arc::clone(&metrics),
            Arc::clone(&pricing),
            config.compute.clone(),
        )) as Arc<dyn ResourceScanner>)
        .with_scanner(Arc::new(VolumeScanner::new(
            Arc::clone(&inventory),
            Arc::clone(&metrics),
            Arc::clone(&pricing),
            config.volume.clone(),
        )))
        .with_scanner(Arc::new(DatabaseScanner::new(
            Arc::clone(&inventory),
            Arc::clone(&metrics),
            Arc::clone(&pricing),
            config.database.clone(),
        )))
        .with_scanner(Arc::new(ObjectStoreScanner::new(
            Arc::clone(&inventory),
            Arc::clone(&metrics),
            Arc::clone(&pricing),
            config.object_store.clone(),
        )));

    if !no_upload {
        if let Some(bucket) = &config.report.s3_bucket {
            let store: Arc<dyn ReportStore> = Arc::new(S3ReportStore::new(&sdk_config, bucket));
            orchestrator = orchestrator.with_store(store);
        }
    }
    if let Some(n) = notifier {
        orchestrator = orchestrator.with_notifier(n);
    }

    let report = orchestrator.run().await?;

    if output == "json" {
        println!("{}", report.to_json()?);
    } else {
        let status = match report.status {
            RunStatus::Completed => style(report.status.to_string()).green(),
            RunStatus::PartiallyCompleted => style(report.status.to_string()).yellow(),
            RunStatus::Failed => style(report.status.to_string()).red(),
        };
        println!("{} {}", style("Scan").bold(), status);
        println!();
        println!("{}", report.render_table(false));
        println!();
        print!("{}", report.render_summary());
    }
    Ok(())
}
