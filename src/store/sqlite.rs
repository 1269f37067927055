use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use tokio::sync::broadcast;
use tracing::debug;

use crate::app::{NoveltyError, Result};
use crate::domain::{Article, ArticleState, ArticleView, Feed, FeedType};
use crate::store::{RetentionPolicy, Store, StoreEvent};

const EVENT_CAPACITY: usize = 64;

const FEED_COLUMNS: &str = "id, title, url, feed_type, page, is_starred";

const ARTICLE_VIEW_QUERY: &str =
    "SELECT a.id, a.feed_id, a.title, a.text, a.author, a.pub_date, a.upd_date, a.link, a.saved_at,
            f.title, COALESCE(s.is_read, 0), COALESCE(s.is_starred, 0)
     FROM articles a
     JOIN feeds f ON f.id = a.feed_id
     LEFT JOIN article_state s ON s.article_id = a.id";

const NEWEST_FIRST: &str = "ORDER BY a.pub_date DESC, a.id DESC";

const PRUNE_AGED: &str = "DELETE FROM articles
     WHERE feed_id = ?1 AND saved_at < ?2
       AND id NOT IN (SELECT article_id FROM article_state WHERE is_starred = 1)";

const PRUNE_EXCESS: &str = "DELETE FROM articles
     WHERE feed_id = ?1
       AND id NOT IN (SELECT article_id FROM article_state WHERE is_starred = 1)
       AND id NOT IN (
           SELECT a.id FROM articles a
           LEFT JOIN article_state s ON s.article_id = a.id
           WHERE a.feed_id = ?1 AND COALESCE(s.is_starred, 0) = 0
           ORDER BY a.pub_date DESC, a.id DESC
           LIMIT ?2)";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            events,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| NoveltyError::Other(format!("Database migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            NoveltyError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn notify(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn to_millis(dt: DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn from_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    fn row_to_feed(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            feed_type: FeedType::parse(&row.get::<_, String>(3)?),
            page: row.get(4)?,
            is_starred: row.get(5)?,
        })
    }

    fn row_to_article_view(row: &Row<'_>) -> rusqlite::Result<ArticleView> {
        Ok(ArticleView {
            article: Article {
                id: row.get(0)?,
                feed_id: row.get(1)?,
                title: row.get(2)?,
                text: row.get(3)?,
                author: row.get(4)?,
                pub_date: Self::from_millis(row.get(5)?),
                upd_date: row.get::<_, Option<i64>>(6)?.map(Self::from_millis),
                link: row.get(7)?,
                saved_at: Self::from_millis(row.get(8)?),
            },
            feed_title: row.get(9)?,
            is_read: row.get(10)?,
            is_starred: row.get(11)?,
        })
    }

    fn feed_by_id(conn: &Connection, id: i64) -> Result<Option<Feed>> {
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::row_to_feed,
            )
            .optional()?;
        Ok(feed)
    }

    fn page_of(conn: &Connection, id: i64) -> Result<i64> {
        conn.query_row("SELECT page FROM feeds WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?
            .ok_or(NoveltyError::FeedNotFound(id))
    }

    fn query_feeds(&self, filter: &str) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds {filter} ORDER BY page ASC, id ASC"
        ))?;

        let feeds = stmt
            .query_map([], Self::row_to_feed)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn query_article_views(
        &self,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<ArticleView>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{ARTICLE_VIEW_QUERY} {filter} {NEWEST_FIRST}"))?;

        let articles = stmt
            .query_map(args, Self::row_to_article_view)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(articles)
    }

    fn update_feed_column(&self, id: i64, sql: &str, value: impl rusqlite::ToSql) -> Result<()> {
        let updated = self.conn()?.execute(sql, params![value, id])?;
        if updated == 0 {
            return Err(NoveltyError::FeedNotFound(id));
        }
        self.notify(StoreEvent::FeedsChanged);
        Ok(())
    }

    fn update_state_column(&self, article_id: i64, sql: &str, value: bool) -> Result<()> {
        let feed_id: i64 = self
            .conn()?
            .query_row(sql, params![value, article_id], |row| row.get(0))
            .optional()?
            .ok_or(NoveltyError::ArticleNotFound(article_id))?;
        self.notify(StoreEvent::ArticlesChanged { feed_id });
        Ok(())
    }
}

impl Store for SqliteStore {
    fn add_feed(&self, feed: &Feed) -> Result<bool> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO feeds (id, title, url, feed_type, page, is_starred)
             VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(page), -1) + 1 FROM feeds), ?5)",
            params![
                feed.id,
                feed.title,
                feed.url,
                feed.feed_type.as_str(),
                feed.is_starred
            ],
        )? > 0;

        if inserted {
            self.notify(StoreEvent::FeedsChanged);
        }
        Ok(inserted)
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        Self::feed_by_id(&conn, id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                Self::row_to_feed,
            )
            .optional()?;
        Ok(feed)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        self.query_feeds("")
    }

    fn get_my_feeds(&self) -> Result<Vec<Feed>> {
        self.query_feeds("WHERE is_starred = 1")
    }

    fn update_feed(&self, id: i64, title: &str, url: &str) -> Result<Feed> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let old = Self::feed_by_id(&tx, id)?.ok_or(NoveltyError::FeedNotFound(id))?;

        let feed = if old.url == url {
            tx.execute(
                "UPDATE feeds SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
            Feed {
                title: title.to_string(),
                ..old
            }
        } else {
            let mut feed = Feed::new(title.to_string(), url.to_string(), FeedType::Unknown, old.page);
            feed.is_starred = old.is_starred;

            tx.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
            tx.execute(
                "INSERT INTO feeds (id, title, url, feed_type, page, is_starred)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    feed.id,
                    feed.title,
                    feed.url,
                    feed.feed_type.as_str(),
                    feed.page,
                    feed.is_starred
                ],
            )?;
            debug!("Feed {} replaced by {} for new url {}", id, feed.id, feed.url);
            feed
        };

        tx.commit()?;
        drop(conn);

        self.notify(StoreEvent::FeedsChanged);
        Ok(feed)
    }

    fn update_feed_type(&self, id: i64, feed_type: FeedType) -> Result<()> {
        self.update_feed_column(
            id,
            "UPDATE feeds SET feed_type = ?1 WHERE id = ?2",
            feed_type.as_str(),
        )
    }

    fn set_feed_starred(&self, id: i64, is_starred: bool) -> Result<()> {
        self.update_feed_column(id, "UPDATE feeds SET is_starred = ?1 WHERE id = ?2", is_starred)
    }

    fn swap_feed_pages(&self, a: i64, b: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let page_a = Self::page_of(&tx, a)?;
        let page_b = Self::page_of(&tx, b)?;
        tx.execute("UPDATE feeds SET page = ?1 WHERE id = ?2", params![page_b, a])?;
        tx.execute("UPDATE feeds SET page = ?1 WHERE id = ?2", params![page_a, b])?;

        tx.commit()?;
        drop(conn);

        self.notify(StoreEvent::FeedsChanged);
        Ok(())
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let page = Self::page_of(&tx, id)?;
        tx.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        tx.execute("UPDATE feeds SET page = page - 1 WHERE page > ?1", params![page])?;

        tx.commit()?;
        drop(conn);

        self.notify(StoreEvent::FeedsChanged);
        self.notify(StoreEvent::ArticlesChanged { feed_id: id });
        Ok(())
    }

    fn insert_articles(
        &self,
        feed_id: i64,
        articles: &[Article],
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            // Content is first-write-wins; only the fetch time moves forward so an
            // entry still listed upstream does not age out.
            let mut upsert_article = tx.prepare(
                "INSERT INTO articles
                 (id, feed_id, title, text, author, pub_date, upd_date, link, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at",
            )?;
            let mut exists = tx.prepare("SELECT 1 FROM articles WHERE id = ?1")?;
            let mut insert_state = tx.prepare(
                "INSERT OR IGNORE INTO article_state (article_id, feed_id) VALUES (?1, ?2)",
            )?;

            for article in articles {
                if !exists.exists(params![article.id])? {
                    inserted += 1;
                }
                upsert_article.execute(params![
                    article.id,
                    feed_id,
                    article.title,
                    article.text,
                    article.author,
                    Self::to_millis(article.pub_date),
                    article.upd_date.map(Self::to_millis),
                    article.link,
                    Self::to_millis(article.saved_at)
                ])?;
                insert_state.execute(params![article.id, feed_id])?;
            }
        }

        let aged = tx.execute(
            PRUNE_AGED,
            params![feed_id, Self::to_millis(policy.cutoff(now))],
        )?;
        let excess = tx.execute(
            PRUNE_EXCESS,
            params![feed_id, policy.max_articles_per_feed as i64],
        )?;

        tx.commit()?;
        drop(conn);

        debug!(
            "Feed {}: {} new articles, pruned {} aged and {} excess",
            feed_id, inserted, aged, excess
        );

        self.notify(StoreEvent::ArticlesChanged { feed_id });
        Ok(inserted)
    }

    fn get_article(&self, id: i64) -> Result<Option<ArticleView>> {
        let conn = self.conn()?;
        let article = conn
            .query_row(
                &format!("{ARTICLE_VIEW_QUERY} WHERE a.id = ?1"),
                params![id],
                Self::row_to_article_view,
            )
            .optional()?;
        Ok(article)
    }

    fn get_articles(&self, feed_id: i64) -> Result<Vec<ArticleView>> {
        self.query_article_views("WHERE a.feed_id = ?1", params![feed_id])
    }

    fn get_my_news(&self) -> Result<Vec<ArticleView>> {
        self.query_article_views("WHERE f.is_starred = 1", [])
    }

    fn get_starred_articles(&self) -> Result<Vec<ArticleView>> {
        self.query_article_views("WHERE s.is_starred = 1", [])
    }

    fn get_article_state(&self, article_id: i64) -> Result<Option<ArticleState>> {
        let conn = self.conn()?;
        let state = conn
            .query_row(
                "SELECT article_id, feed_id, is_read, is_starred FROM article_state
                 WHERE article_id = ?1",
                params![article_id],
                |row| {
                    Ok(ArticleState {
                        article_id: row.get(0)?,
                        feed_id: row.get(1)?,
                        is_read: row.get(2)?,
                        is_starred: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    fn set_read(&self, article_id: i64, is_read: bool) -> Result<()> {
        self.update_state_column(
            article_id,
            "UPDATE article_state SET is_read = ?1 WHERE article_id = ?2 RETURNING feed_id",
            is_read,
        )
    }

    fn set_starred(&self, article_id: i64, is_starred: bool) -> Result<()> {
        self.update_state_column(
            article_id,
            "UPDATE article_state SET is_starred = ?1 WHERE article_id = ?2 RETURNING feed_id",
            is_starred,
        )
    }

    fn get_unread_count(&self, feed_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles a
             LEFT JOIN article_state s ON s.article_id = a.id
             WHERE a.feed_id = ?1 AND COALESCE(s.is_read, 0) = 0",
            params![feed_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn add_feed(store: &SqliteStore, url: &str) -> Feed {
        let feed = Feed::new(format!("Feed {}", url), url.to_string(), FeedType::Rss, 0);
        store.add_feed(&feed).unwrap();
        store.get_feed(feed.id).unwrap().unwrap()
    }

    fn article(feed_id: i64, key: &str, pub_date: DateTime<Utc>, saved_at: DateTime<Utc>) -> Article {
        let mut article = Article::new(feed_id, key, saved_at);
        article.title = format!("Title {}", key);
        article.text = "body<br>".into();
        article.pub_date = pub_date;
        article
    }

    fn insert(store: &SqliteStore, feed_id: i64, articles: &[Article]) -> usize {
        store
            .insert_articles(feed_id, articles, &RetentionPolicy::default(), now())
            .unwrap()
    }

    #[test]
    fn test_add_and_get_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.feed_type, FeedType::Rss);
        assert_eq!(feed.page, 0);
        assert!(feed.is_starred);
    }

    #[test]
    fn test_add_feed_appends_page_and_ignores_duplicates() {
        let store = SqliteStore::in_memory().unwrap();
        let a = add_feed(&store, "https://a.example/feed");
        let b = add_feed(&store, "https://b.example/feed");
        assert_eq!((a.page, b.page), (0, 1));

        let again = Feed::new("Other".into(), a.url.clone(), FeedType::Atom, 0);
        assert!(!store.add_feed(&again).unwrap());
        assert_eq!(store.get_all_feeds().unwrap().len(), 2);
        assert_eq!(store.get_feed(a.id).unwrap().unwrap().title, a.title);
    }

    #[test]
    fn test_get_feed_by_url() {
        let store = SqliteStore::in_memory().unwrap();
        add_feed(&store, "https://example.com/feed.xml");

        let found = store.get_feed_by_url("https://example.com/feed.xml").unwrap();
        assert!(found.is_some());

        let missing = store.get_feed_by_url("https://example.com/nonexistent.xml").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_my_feeds_only_starred() {
        let store = SqliteStore::in_memory().unwrap();
        let a = add_feed(&store, "https://a.example/feed");
        let b = add_feed(&store, "https://b.example/feed");
        store.set_feed_starred(a.id, false).unwrap();

        let mine: Vec<_> = store.get_my_feeds().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(mine, vec![b.id]);
        assert!(matches!(
            store.set_feed_starred(42, true),
            Err(NoveltyError::FeedNotFound(42))
        ));
    }

    #[test]
    fn test_update_feed_title_keeps_identity() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        let updated = store.update_feed(feed.id, "Renamed", &feed.url).unwrap();
        assert_eq!(updated.id, feed.id);
        assert_eq!(store.get_feed(feed.id).unwrap().unwrap().title, "Renamed");
    }

    #[test]
    fn test_update_feed_url_replaces_identity() {
        let store = SqliteStore::in_memory().unwrap();
        let first = add_feed(&store, "https://a.example/feed");
        let feed = add_feed(&store, "https://b.example/feed");
        insert(&store, feed.id, &[article(feed.id, "x", now(), now())]);

        let updated = store.update_feed(feed.id, "Moved", "https://c.example/feed").unwrap();

        assert_ne!(updated.id, feed.id);
        assert_eq!(updated.page, feed.page);
        assert_eq!(updated.feed_type, FeedType::Unknown);
        assert!(store.get_feed(feed.id).unwrap().is_none());
        assert!(store.get_articles(feed.id).unwrap().is_empty());

        let ids: Vec<_> = store.get_all_feeds().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![first.id, updated.id]);
    }

    #[test]
    fn test_update_feed_url_conflict_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        let a = add_feed(&store, "https://a.example/feed");
        let b = add_feed(&store, "https://b.example/feed");

        assert!(store.update_feed(b.id, "Clash", &a.url).is_err());
        assert_eq!(store.get_feed(b.id).unwrap(), Some(b));
    }

    #[test]
    fn test_delete_feed_shifts_pages_and_cascades() {
        let store = SqliteStore::in_memory().unwrap();
        let a = add_feed(&store, "https://a.example/feed");
        let b = add_feed(&store, "https://b.example/feed");
        let c = add_feed(&store, "https://c.example/feed");

        let doomed = article(b.id, "x", now(), now());
        insert(&store, b.id, &[doomed.clone()]);

        store.delete_feed(b.id).unwrap();

        assert!(store.get_feed(b.id).unwrap().is_none());
        assert!(store.get_article(doomed.id).unwrap().is_none());
        assert!(store.get_article_state(doomed.id).unwrap().is_none());
        assert_eq!(store.get_feed(a.id).unwrap().unwrap().page, 0);
        assert_eq!(store.get_feed(c.id).unwrap().unwrap().page, 1);

        assert!(matches!(
            store.delete_feed(b.id),
            Err(NoveltyError::FeedNotFound(_))
        ));
    }

    #[test]
    fn test_swap_feed_pages() {
        let store = SqliteStore::in_memory().unwrap();
        let a = add_feed(&store, "https://a.example/feed");
        let b = add_feed(&store, "https://b.example/feed");

        store.swap_feed_pages(a.id, b.id).unwrap();

        let ids: Vec<_> = store.get_all_feeds().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn test_update_feed_type() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        store.update_feed_type(feed.id, FeedType::Atom).unwrap();
        assert_eq!(store.get_feed(feed.id).unwrap().unwrap().feed_type, FeedType::Atom);
    }

    #[test]
    fn test_insert_articles_batch_and_dedup() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        let batch: Vec<_> = (0..3)
            .map(|i| article(feed.id, &format!("entry-{}", i), now(), now()))
            .collect();

        assert_eq!(insert(&store, feed.id, &batch), 3);
        assert_eq!(insert(&store, feed.id, &batch), 0);
        assert_eq!(store.get_articles(feed.id).unwrap().len(), 3);
    }

    #[test]
    fn test_reingest_preserves_state_and_first_content() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        let original = article(feed.id, "entry", now(), now());
        insert(&store, feed.id, &[original.clone()]);
        store.set_read(original.id, true).unwrap();
        store.set_starred(original.id, true).unwrap();

        let mut edited = original.clone();
        edited.title = "Edited upstream".into();
        edited.text = "new body<br>".into();
        insert(&store, feed.id, &[edited]);

        let view = store.get_article(original.id).unwrap().unwrap();
        assert!(view.is_read);
        assert!(view.is_starred);
        assert_eq!(view.article.title, original.title);
        assert_eq!(view.article.text, original.text);
        assert_eq!(view.feed_title, feed.title);
    }

    #[test]
    fn test_timestamps_round_trip_millis() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        let mut a = article(feed.id, "entry", now() - Duration::milliseconds(1), now());
        a.upd_date = Some(now());
        a.author = Some("Ann".into());
        a.link = Some("https://example.com/1".into());
        insert(&store, feed.id, &[a.clone()]);

        let view = store.get_article(a.id).unwrap().unwrap();
        assert_eq!(view.article, a);
    }

    #[test]
    fn test_retention_prunes_aged_unless_starred() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");
        let old = now() - Duration::days(8);

        let kept = article(feed.id, "starred", old, old);
        let dropped = article(feed.id, "stale", old, old);
        insert(&store, feed.id, &[kept.clone(), dropped.clone()]);
        // both were already stale when inserted
        assert!(store.get_article(dropped.id).unwrap().is_none());
        assert!(store.get_article(kept.id).unwrap().is_none());

        let kept = article(feed.id, "starred", old, now() - Duration::days(6));
        let plain = article(feed.id, "plain", old, now() - Duration::days(6));
        insert(&store, feed.id, &[kept.clone(), plain.clone()]);
        store.set_starred(kept.id, true).unwrap();

        let later = now() + Duration::days(2);
        store
            .insert_articles(feed.id, &[], &RetentionPolicy::default(), later)
            .unwrap();

        assert!(store.get_article(kept.id).unwrap().is_some());
        assert!(store.get_article(plain.id).unwrap().is_none());
    }

    #[test]
    fn test_still_listed_entry_survives_age_window() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");
        let policy = RetentionPolicy::default();

        let first = article(feed.id, "still-listed", now(), now());
        assert_eq!(store.insert_articles(feed.id, &[first.clone()], &policy, now()).unwrap(), 1);
        store.set_read(first.id, true).unwrap();

        for later in [now() + Duration::days(8), now() + Duration::days(8) + Duration::hours(1)] {
            let again = article(feed.id, "still-listed", now(), later);
            assert_eq!(store.insert_articles(feed.id, &[again], &policy, later).unwrap(), 0);

            let view = store.get_article(first.id).unwrap().unwrap();
            assert!(view.is_read);
            assert_eq!(view.article.saved_at, later);
            assert_eq!(view.article.title, first.title);
        }
    }

    #[test]
    fn test_retention_keeps_latest_per_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");
        let other = add_feed(&store, "https://other.example/feed.xml");

        let policy = RetentionPolicy {
            max_age: Duration::days(7),
            max_articles_per_feed: 3,
        };

        let batch: Vec<_> = (0..5)
            .map(|i| article(feed.id, &format!("e{}", i), now() - Duration::hours(i), now()))
            .collect();

        // the oldest article is starred before the rest arrive
        store
            .insert_articles(feed.id, &batch[4..], &policy, now())
            .unwrap();
        store.set_starred(batch[4].id, true).unwrap();
        store
            .insert_articles(other.id, &[article(other.id, "o", now(), now())], &policy, now())
            .unwrap();

        store.insert_articles(feed.id, &batch, &policy, now()).unwrap();

        let ids: Vec<_> = store
            .get_articles(feed.id)
            .unwrap()
            .into_iter()
            .map(|v| v.article.id)
            .collect();
        assert_eq!(ids, vec![batch[0].id, batch[1].id, batch[2].id, batch[4].id]);
        assert_eq!(store.get_articles(other.id).unwrap().len(), 1);
    }

    #[test]
    fn test_article_queries() {
        let store = SqliteStore::in_memory().unwrap();
        let mine = add_feed(&store, "https://a.example/feed");
        let hidden = add_feed(&store, "https://b.example/feed");
        store.set_feed_starred(hidden.id, false).unwrap();

        let older = article(mine.id, "older", now() - Duration::hours(2), now());
        let newer = article(mine.id, "newer", now() - Duration::hours(1), now());
        let elsewhere = article(hidden.id, "elsewhere", now(), now());
        insert(&store, mine.id, &[older.clone(), newer.clone()]);
        insert(&store, hidden.id, &[elsewhere.clone()]);
        store.set_starred(elsewhere.id, true).unwrap();

        let ids = |views: Vec<ArticleView>| views.into_iter().map(|v| v.article.id).collect::<Vec<_>>();
        assert_eq!(ids(store.get_articles(mine.id).unwrap()), vec![newer.id, older.id]);
        assert_eq!(ids(store.get_my_news().unwrap()), vec![newer.id, older.id]);
        assert_eq!(ids(store.get_starred_articles().unwrap()), vec![elsewhere.id]);
    }

    #[test]
    fn test_set_read_state_and_unread_count() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = add_feed(&store, "https://example.com/feed.xml");

        let batch: Vec<_> = (0..5)
            .map(|i| article(feed.id, &format!("entry-{}", i), now(), now()))
            .collect();
        insert(&store, feed.id, &batch);
        assert_eq!(store.get_unread_count(feed.id).unwrap(), 5);

        store.set_read(batch[0].id, true).unwrap();
        store.set_read(batch[1].id, true).unwrap();
        assert_eq!(store.get_unread_count(feed.id).unwrap(), 3);

        store.set_read(batch[0].id, false).unwrap();
        let state = store.get_article_state(batch[0].id).unwrap().unwrap();
        assert!(!state.is_read);
        assert_eq!(state.feed_id, feed.id);
        assert_eq!(store.get_unread_count(feed.id).unwrap(), 4);
    }

    #[test]
    fn test_state_of_missing_article() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_article(1).unwrap().is_none());
        assert!(store.get_article_state(1).unwrap().is_none());
        assert!(matches!(
            store.set_read(1, true),
            Err(NoveltyError::ArticleNotFound(1))
        ));
    }

    #[test]
    fn test_writes_publish_events() {
        let store = SqliteStore::in_memory().unwrap();
        let mut events = store.subscribe();

        let feed = add_feed(&store, "https://example.com/feed.xml");
        assert_eq!(events.try_recv().unwrap(), StoreEvent::FeedsChanged);

        let a = article(feed.id, "entry", now(), now());
        insert(&store, feed.id, &[a.clone()]);
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ArticlesChanged { feed_id: feed.id }
        );

        store.set_read(a.id, true).unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::ArticlesChanged { feed_id: feed.id }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novelty.db");

        let feed_id = {
            let store = SqliteStore::new(&path).unwrap();
            add_feed(&store, "https://example.com/feed.xml").id
        };

        let store = SqliteStore::new(&path).unwrap();
        assert!(store.get_feed(feed_id).unwrap().is_some());
    }
}
