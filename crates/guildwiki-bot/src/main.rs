mod collect;
mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "guildwiki-bot")]
#[command(about = "Snapshot Discord guilds into the guildwiki servers directory")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Connect to the gateway and snapshot every guild on a fixed interval
    Run,
    /// Run one collection pass over the REST API and exit
    Collect {
        /// Refresh only this guild (by ID); overlaps are left as they are
        #[arg(long)]
        guild: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = guildwiki_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run::run_bot(&config).await,
        Commands::Collect { guild } => run::collect_once(&config, guild.as_deref()).await,
    }
}
