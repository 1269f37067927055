pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "novelty")]
#[command(about = "A small RSS/Atom news reader", long_about = None)]
pub struct Cli {
    /// Number of feeds refreshed concurrently (overrides the config file)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the feeds found at a URL without adding them
    Discover {
        /// Page or feed URL
        url: String,
    },
    /// Discover and add feeds
    Add {
        /// Page or feed URL
        url: String,
        /// Add every feed found instead of the first one
        #[arg(long)]
        all: bool,
    },
    /// Remove a feed and its articles
    Remove {
        /// Feed id
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Rename a feed or change its URL
    Edit {
        /// Feed id
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        /// A new URL gives the feed a new identity and drops its articles
        #[arg(long)]
        url: Option<String>,
    },
    /// Add a feed to my feeds, or take it out with --off
    StarFeed {
        /// Feed id
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        off: bool,
    },
    /// Swap the display positions of two feeds
    Swap {
        #[arg(allow_negative_numbers = true)]
        a: i64,
        #[arg(allow_negative_numbers = true)]
        b: i64,
    },
    /// List feeds
    List {
        #[arg(long)]
        json: bool,
    },
    /// Refresh my feeds, one feed, or every feed
    Refresh {
        /// Feed id; my feeds when omitted
        #[arg(allow_negative_numbers = true)]
        id: Option<i64>,
        /// Refresh every feed concurrently
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// List articles: my news, one feed's, or the starred ones
    News {
        /// Feed id
        #[arg(allow_negative_numbers = true)]
        id: Option<i64>,
        #[arg(long, conflicts_with = "id")]
        starred: bool,
        #[arg(long)]
        json: bool,
    },
    /// Mark an article read, or unread with --unread
    Read {
        /// Article id
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        unread: bool,
    },
    /// Star an article, or unstar it with --off
    Star {
        /// Article id
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        off: bool,
    },
}
