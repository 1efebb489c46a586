//! Local story cache
//!
//! Mirrors the feed pages fetched so far into SQLite so the list can be
//! read back in order and paging can resume from the stored bookmarks.
//!
//! ## Tables
//!
//! - `stories` - Story rows, ordered by `seq` (first insertion)
//! - `remote_keys` - One paging bookmark per story
//!
//! Every write touches both tables inside a single transaction.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{PageBookmark, PageKeys, StoryItem};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{drop_schema, init_schema, needs_init};

/// A cached story with its insertion sequence and bookmark
#[derive(Debug, Clone, PartialEq)]
pub struct CachedStory {
    /// Insertion sequence; use as the cursor for `read_chunk`
    pub seq: i64,
    pub story: StoryItem,
    pub keys: Option<PageKeys>,
}

/// SQLite-backed story cache
pub struct StoryCache {
    conn: Connection,
}

impl StoryCache {
    /// Open or create the cache database
    pub fn open(config: &Config) -> StorageResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        Self::prepare(conn)
    }

    /// Open an in-memory cache (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if needs_init(&conn) {
            // Rebuildable: an outdated or half-written cache is discarded
            debug!("Initializing story cache schema");
            drop_schema(&conn)?;
            init_schema(&conn)?;
        }

        Ok(Self { conn })
    }

    // ==================== Writes ====================

    /// Replace the whole cache with the first page of a refresh
    pub fn replace_all(
        &mut self,
        items: &[StoryItem],
        page: u32,
        end_reached: bool,
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        clear_all_data(&tx)?;
        insert_page(&tx, items, PageKeys::for_page(page, end_reached))?;
        tx.commit()?;
        Ok(())
    }

    /// Add a page after the rows already cached
    ///
    /// Rows whose id is already cached are updated in place and keep their
    /// position in the list.
    pub fn append(&mut self, items: &[StoryItem], page: u32, end_reached: bool) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        insert_page(&tx, items, PageKeys::for_page(page, end_reached))?;
        tx.commit()?;
        Ok(())
    }

    /// Mark `page` as past the end of the feed
    ///
    /// Every bookmark that pointed at `page` loses its next key, so the
    /// next append stops without asking the server again.
    pub fn seal_tail(&mut self, page: u32) -> StorageResult<usize> {
        let sealed = self.conn.execute(
            "UPDATE remote_keys SET next_key = NULL WHERE next_key = ?",
            params![page],
        )?;
        Ok(sealed)
    }

    /// Empty both tables
    pub fn clear(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        clear_all_data(&tx)?;
        tx.commit()?;
        Ok(())
    }

    // ==================== Reads ====================

    /// All cached stories in insertion order
    pub fn read_all(&self) -> StorageResult<Vec<StoryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, id, name, description, photo_url, created_at, lat, lon
             FROM stories ORDER BY seq",
        )?;

        let stories = stmt
            .query_map([], |row| story_from_row(row).map(|(_, story)| story))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stories)
    }

    /// Up to `limit` stories inserted after the `after` cursor
    pub fn read_chunk(&self, after: Option<i64>, limit: usize) -> StorageResult<Vec<CachedStory>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.seq, s.id, s.name, s.description, s.photo_url, s.created_at, s.lat, s.lon,
                   k.story_id, k.prev_key, k.next_key
            FROM stories s
            LEFT JOIN remote_keys k ON k.story_id = s.id
            WHERE s.seq > ?
            ORDER BY s.seq
            LIMIT ?
            "#,
        )?;

        let rows = stmt
            .query_map(params![after.unwrap_or(0), limit as i64], |row| {
                let (seq, story) = story_from_row(row)?;
                let bookmark: Option<String> = row.get(8)?;
                let keys = match bookmark {
                    Some(_) => Some(PageKeys {
                        prev_key: row.get(9)?,
                        next_key: row.get(10)?,
                    }),
                    None => None,
                };
                Ok(CachedStory { seq, story, keys })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Iterate the cache in chunks of `limit` stories
    pub fn chunks(&self, limit: usize) -> StoryChunks<'_> {
        self.chunks_after(None, limit)
    }

    /// Iterate the stories inserted after the `after` cursor in chunks
    pub fn chunks_after(&self, after: Option<i64>, limit: usize) -> StoryChunks<'_> {
        StoryChunks {
            cache: self,
            after,
            limit: limit.max(1),
            done: false,
        }
    }

    /// Bookmark of the last row of the most recently fetched page
    pub fn last_bookmark(&self) -> StorageResult<Option<PageBookmark>> {
        let bookmark = self
            .conn
            .query_row(
                r#"
                SELECT k.story_id, k.prev_key, k.next_key
                FROM remote_keys k
                JOIN stories s ON s.id = k.story_id
                ORDER BY COALESCE(k.prev_key, 0) DESC, s.seq DESC
                LIMIT 1
                "#,
                [],
                bookmark_from_row,
            )
            .optional()?;
        Ok(bookmark)
    }

    /// Bookmark stored for one story
    pub fn bookmark_for(&self, story_id: &str) -> StorageResult<Option<PageBookmark>> {
        let bookmark = self
            .conn
            .query_row(
                "SELECT story_id, prev_key, next_key FROM remote_keys WHERE story_id = ?",
                params![story_id],
                bookmark_from_row,
            )
            .optional()?;
        Ok(bookmark)
    }

    /// Number of cached stories
    pub fn story_count(&self) -> StorageResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Chunked reader returned by [`StoryCache::chunks`]
pub struct StoryChunks<'a> {
    cache: &'a StoryCache,
    after: Option<i64>,
    limit: usize,
    done: bool,
}

impl Iterator for StoryChunks<'_> {
    type Item = StorageResult<Vec<CachedStory>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.cache.read_chunk(self.after, self.limit) {
            Ok(rows) if rows.is_empty() => {
                self.done = true;
                None
            }
            Ok(rows) => {
                if rows.len() < self.limit {
                    self.done = true;
                }
                self.after = rows.last().map(|r| r.seq);
                Some(Ok(rows))
            }
            Err(e) => {
                warn!("Story cache read failed: {}", e);
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ==================== Row mapping ====================

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, StoryItem)> {
    Ok((
        row.get(0)?,
        StoryItem {
            id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            photo_url: row.get(4)?,
            created_at: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
        },
    ))
}

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<PageBookmark> {
    Ok(PageBookmark {
        story_id: row.get(0)?,
        keys: PageKeys {
            prev_key: row.get(1)?,
            next_key: row.get(2)?,
        },
    })
}

// ==================== Transaction helpers ====================

fn clear_all_data(tx: &Transaction) -> StorageResult<()> {
    // Bookmarks first: they reference stories
    tx.execute("DELETE FROM remote_keys", [])?;
    tx.execute("DELETE FROM stories", [])?;
    Ok(())
}

fn insert_page(tx: &Transaction, items: &[StoryItem], keys: PageKeys) -> StorageResult<()> {
    let mut story_stmt = tx.prepare(
        r#"
        INSERT INTO stories (id, name, description, photo_url, created_at, lat, lon)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            photo_url = excluded.photo_url,
            created_at = excluded.created_at,
            lat = excluded.lat,
            lon = excluded.lon
        "#,
    )?;
    let mut key_stmt = tx.prepare(
        "INSERT OR REPLACE INTO remote_keys (story_id, prev_key, next_key) VALUES (?, ?, ?)",
    )?;

    for story in items {
        story_stmt.execute(params![
            story.id,
            story.name,
            story.description,
            story.photo_url,
            story.created_at,
            story.lat,
            story.lon,
        ])?;
        key_stmt.execute(params![story.id, keys.prev_key, keys.next_key])?;
    }

    Ok(())
}
