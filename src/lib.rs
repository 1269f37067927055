//! # Novelty
//!
//! An offline-first RSS/Atom news reader core with a small command line.
//!
//! ## Architecture
//!
//! ```text
//! Discovery → Fetcher → Normalizer → Ingest → Store
//! ```
//!
//! - [`discovery`]: Finds the feeds announced by a web page
//! - [`fetcher`]: HTTP client with default headers and request logging
//! - [`normalizer`]: Maps RSS/Atom documents to articles
//! - [`ingest`]: Refreshes feeds, tracks which are refreshing
//! - [`store`]: SQLite persistence with retention pruning
//!
//! ## Quick Start
//!
//! ```bash
//! # Find and add the feeds of a site
//! novelty add https://blog.rust-lang.org/
//!
//! # List feeds
//! novelty list
//!
//! # Refresh my feeds
//! novelty refresh
//!
//! # Read the news
//! novelty news
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, discoverer, ingestor and refresh pool.
pub mod app;

/// Configuration loaded from `~/.config/novelty/config.toml`.
pub mod config;

/// Command-line interface using clap.
pub mod cli;

/// Feed discovery from web pages.
///
/// - [`Discoverer`](discovery::Discoverer): URL to candidate feeds
/// - [`sniff`](discovery::sniff()): RSS or Atom from the root tag
pub mod discovery;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): A subscribed source, identified by its URL
/// - [`Article`](domain::Article): One entry, identified within its feed
/// - [`ArticleState`](domain::ArticleState): Read/starred state
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching documents
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Fetch, normalize and store feeds.
///
/// - [`Ingestor`](ingest::Ingestor): One feed or all of my feeds
/// - [`RefreshPool`](ingest::RefreshPool): Concurrent refreshes with a semaphore
/// - [`FetchStateTracker`](ingest::FetchStateTracker): Observable refreshing flags
pub mod ingest;

/// Feed parsing and normalization.
///
/// Dates, entry HTML and RSS 2.0 / Atom 1.0 documents.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
