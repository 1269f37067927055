use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use novelty::app::AppContext;
use novelty::cli::{commands, Cli, Commands};
use novelty::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Discover { url } => {
            commands::discover(&ctx, &url).await?;
        }
        Commands::Add { url, all } => {
            commands::add_feed(&ctx, &url, all).await?;
        }
        Commands::Remove { id } => {
            commands::remove_feed(&ctx, id)?;
        }
        Commands::Edit { id, title, url } => {
            commands::edit_feed(&ctx, id, title.as_deref(), url.as_deref())?;
        }
        Commands::StarFeed { id, off } => {
            commands::star_feed(&ctx, id, !off)?;
        }
        Commands::Swap { a, b } => {
            commands::swap_feeds(&ctx, a, b)?;
        }
        Commands::List { json } => {
            commands::list_feeds(&ctx, json)?;
        }
        Commands::Refresh { id, all } => {
            commands::refresh(&ctx, id, all).await?;
        }
        Commands::News { id, starred, json } => {
            commands::list_news(&ctx, id, starred, json)?;
        }
        Commands::Read { id, unread } => {
            commands::mark_read(&ctx, id, !unread)?;
        }
        Commands::Star { id, off } => {
            commands::mark_starred(&ctx, id, !off)?;
        }
    }

    Ok(())
}
