use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notestream::app::AppContext;
use notestream::cli::{commands, Cli, Commands};
use notestream::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so notes on stdout stay clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match &cli.command {
        Commands::Servers => {
            commands::list_servers(&ctx)?;
        }
        Commands::Page { feed, pages } => {
            let remote = ctx.resolve_remote(&cli.target())?;
            commands::page(&ctx, &remote, &feed.descriptor(), *pages).await?;
        }
        Commands::Watch { feed } => {
            let remote = ctx.resolve_remote(&cli.target())?;
            commands::watch(&ctx, &remote, &feed.descriptor()).await?;
        }
    }

    Ok(())
}
