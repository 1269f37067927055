use crate::app::{AppContext, NoveltyError, Result};
use crate::domain::{ArticleView, Feed, FoundFeed};
use crate::ingest::ALL_FEEDS;
use crate::store::Store;

pub async fn discover(ctx: &AppContext, url: &str) -> Result<()> {
    let found = ctx.find_feeds(url).await;

    if found.is_empty() {
        println!("No feeds found at {}", url);
        return Ok(());
    }

    for feed in &found {
        print_found(feed);
    }
    Ok(())
}

pub async fn add_feed(ctx: &AppContext, url: &str, all: bool) -> Result<()> {
    let found = ctx.find_feeds(url).await;

    if found.is_empty() {
        println!("No feeds found at {}", url);
        return Ok(());
    }

    let take = if all { found.len() } else { 1 };

    for candidate in found.iter().take(take) {
        let feed = candidate.clone().into_feed(0);

        if !ctx.store.add_feed(&feed)? {
            println!("Feed already exists: {}", feed.url);
            continue;
        }
        println!("Added feed: {} [{}]", feed.display_title(), feed.id);

        match ctx.ingestor.refresh_feed(&feed).await {
            Ok(Some(count)) => println!("Fetched {} articles", count),
            Ok(None) => {}
            Err(e) => eprintln!("  Error fetching {}: {}", feed.url, e),
        }
    }

    if found.len() > take {
        println!("{} more feed(s) found, use --all to add them:", found.len() - take);
        for feed in &found[take..] {
            print_found(feed);
        }
    }

    ctx.clear_found_feeds();
    Ok(())
}

pub fn remove_feed(ctx: &AppContext, id: i64) -> Result<()> {
    let feed = find_feed(ctx, id)?;
    ctx.store.delete_feed(id)?;
    println!("Removed feed: {}", feed.display_title());
    Ok(())
}

pub fn edit_feed(ctx: &AppContext, id: i64, title: Option<&str>, url: Option<&str>) -> Result<()> {
    let feed = find_feed(ctx, id)?;

    let updated = ctx.store.update_feed(
        id,
        title.unwrap_or(&feed.title),
        url.unwrap_or(&feed.url),
    )?;

    if updated.id != feed.id {
        println!("Feed moved to {} [{}]", updated.url, updated.id);
    }
    println!("Updated feed: {}", updated.display_title());
    Ok(())
}

pub fn star_feed(ctx: &AppContext, id: i64, starred: bool) -> Result<()> {
    ctx.store.set_feed_starred(id, starred)?;
    Ok(())
}

pub fn swap_feeds(ctx: &AppContext, a: i64, b: i64) -> Result<()> {
    ctx.store.swap_feed_pages(a, b)?;
    Ok(())
}

pub async fn refresh(ctx: &AppContext, id: Option<i64>, all: bool) -> Result<()> {
    if all {
        return refresh_all(ctx).await;
    }

    let count = match id {
        Some(id) => {
            find_feed(ctx, id)?;
            ctx.pool
                .submit(id)
                .await
                .map_err(|e| NoveltyError::Other(e.to_string()))?
        }
        None => ctx.ingestor.refresh(ALL_FEEDS).await,
    };

    println!("Refresh complete: {} new articles", count);
    Ok(())
}

async fn refresh_all(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds to refresh");
        return Ok(());
    }

    println!("Refreshing {} feeds...", feeds.len());

    let titles: Vec<(i64, String)> = feeds
        .iter()
        .map(|f| (f.id, f.display_title().to_string()))
        .collect();
    let results = ctx.pool.refresh_all(feeds).await;

    let mut total_new = 0;
    let mut errors = 0;

    for (feed_id, result) in results {
        let title = titles
            .iter()
            .find(|(id, _)| *id == feed_id)
            .map(|(_, t)| t.as_str())
            .unwrap_or("?");

        match result {
            Ok(Some(count)) => {
                total_new += count;
                if count > 0 {
                    println!("  {} new articles from {}", count, title);
                }
            }
            Ok(None) => println!("  {} is already refreshing", title),
            Err(e) => {
                errors += 1;
                eprintln!("  Error refreshing {}: {}", title, e);
            }
        }
    }

    println!("Refresh complete: {} new articles, {} errors", total_new, errors);
    Ok(())
}

pub fn list_feeds(ctx: &AppContext, json: bool) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if json {
        return print_json(&feeds);
    }

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let unread = ctx.store.get_unread_count(feed.id)?;
        let star = if feed.is_starred { "★" } else { " " };
        println!(
            "{} {} ({} unread) [{}]\n    {} ({})",
            star,
            feed.display_title(),
            unread,
            feed.id,
            feed.url,
            feed.feed_type
        );
    }

    Ok(())
}

pub fn list_news(ctx: &AppContext, id: Option<i64>, starred: bool, json: bool) -> Result<()> {
    let articles = match id {
        Some(id) => {
            find_feed(ctx, id)?;
            ctx.store.get_articles(id)?
        }
        None if starred => ctx.store.get_starred_articles()?,
        None => ctx.store.get_my_news()?,
    };

    if json {
        return print_json(&articles);
    }

    if articles.is_empty() {
        println!("No articles");
        return Ok(());
    }

    for view in &articles {
        print_article(view);
    }

    Ok(())
}

pub fn mark_read(ctx: &AppContext, id: i64, is_read: bool) -> Result<()> {
    ctx.store.set_read(id, is_read)?;
    Ok(())
}

pub fn mark_starred(ctx: &AppContext, id: i64, is_starred: bool) -> Result<()> {
    ctx.store.set_starred(id, is_starred)?;
    Ok(())
}

fn find_feed(ctx: &AppContext, id: i64) -> Result<Feed> {
    ctx.store.get_feed(id)?.ok_or(NoveltyError::FeedNotFound(id))
}

fn print_found(feed: &FoundFeed) {
    println!("{} ({})\n    {}", feed.title, feed.feed_type, feed.url);
}

fn print_article(view: &ArticleView) {
    let read_marker = if view.is_read { " " } else { "●" };
    let star = if view.is_starred { "★" } else { " " };

    println!(
        "{}{} {} {} - {} [{}]",
        read_marker,
        star,
        view.article.pub_date.format("%Y-%m-%d %H:%M"),
        view.feed_title,
        view.article.display_title(),
        view.article.id
    );
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| NoveltyError::Other(format!("JSON encoding failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}
