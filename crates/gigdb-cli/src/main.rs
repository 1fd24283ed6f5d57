mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gigdb-cli")]
#[command(about = "Event listing and detail extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect listing pages and write each site's detail worklist
    Listings {
        /// Restrict the run to one site (by name or slug)
        #[arg(long)]
        site: Option<String>,

        /// Extract and report listings without writing a worklist
        #[arg(long)]
        dry_run: bool,
    },
    /// Enrich a site's worklist from its detail pages
    Details {
        /// Site whose worklist to process (by name or slug)
        #[arg(long)]
        site: String,

        /// Process at most this many worklist entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Rebuild a site's detail output from saved snapshots without fetching
    Reextract {
        /// Site whose snapshots to replay (by name or slug)
        #[arg(long)]
        site: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = gigdb_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let sites = gigdb_core::load_sites(&config.sites_path)?;

    match cli.command {
        Commands::Listings { site, dry_run } => {
            run::run_listings_command(&config, &sites, site.as_deref(), dry_run).await
        }
        Commands::Details { site, limit } => {
            run::run_details_command(&config, &sites, &site, limit).await
        }
        Commands::Reextract { site } => run::run_reextract_command(&config, &sites, &site),
    }
}
