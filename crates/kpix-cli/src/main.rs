use clap::{Parser, Subcommand};
use kpix_core::Platform;
use kpix_extract::{run_validation, ExtractionService};

#[derive(Debug, Parser)]
#[command(name = "kpix-cli")]
#[command(about = "Social profile KPI extraction from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract KPIs for one profile and print the snapshot as JSON.
    Extract {
        /// Platform name (facebook, instagram, youtube, linkedin, twitter, tiktok)
        platform: Platform,
        /// Profile URL or handle
        target: String,
    },
    /// Run the fixed account matrix and report per-platform shape checks.
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = kpix_core::load_app_config_from_env();
    let service = ExtractionService::from_config(&config)?;
    let orchestrator = service.orchestrator();

    match cli.command {
        Commands::Extract { platform, target } => {
            tracing::info!(%platform, target, "extracting");
            let kpi = orchestrator.extract(platform, &target).await;
            println!("{}", serde_json::to_string_pretty(&kpi)?);
        }
        Commands::Validate => {
            let report = run_validation(&orchestrator).await;
            for platform in Platform::ALL {
                let (passed, total) = report.platform_counts(platform);
                println!("{platform}: {passed}/{total} accounts passed");
            }
            println!("overall pass rate: {:.0}%", report.pass_rate() * 100.0);
        }
    }

    service.shutdown().await;
    Ok(())
}
