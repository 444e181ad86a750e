//! SQLite storage for clipboard items

use crate::dedup::PriorCapture;
use crate::item::{ClipboardItem, HistoryFilter, ItemType, HISTORY_LIMIT};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const ITEM_COLUMNS: &str =
    "id, content, timestamp, type, category, source, is_code, language";

impl ToSql for ItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// SQLite storage manager.
///
/// Owned by exactly one worker; nothing else holds the connection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clipboard_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                type TEXT NOT NULL,
                category TEXT,
                source TEXT,
                is_code BOOLEAN DEFAULT 0,
                language TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_timestamp ON clipboard_items(timestamp);
            CREATE INDEX IF NOT EXISTS idx_type ON clipboard_items(type);
            "#,
        )?;
        Ok(())
    }

    /// Insert an item and return the id the store assigned to it.
    /// Any `id` already present on `item` is ignored.
    pub fn insert_item(&mut self, item: &ClipboardItem) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO clipboard_items (content, timestamp, type, category, source, is_code, language)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.content,
                item.timestamp,
                item.item_type,
                item.category,
                item.source,
                item.is_code,
                item.language,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent capture whose content is exactly `content`
    pub fn latest_with_content(&self, content: &str) -> Result<Option<PriorCapture>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp FROM clipboard_items
             WHERE content = ?1
             ORDER BY timestamp DESC
             LIMIT 1",
        )?;

        let result = stmt.query_row(params![content], |row| {
            Ok(PriorCapture {
                id: row.get(0)?,
                timestamp: row.get(1)?,
            })
        });

        match result {
            Ok(prior) => Ok(Some(prior)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Filtered history, newest first, capped at [`HISTORY_LIMIT`]
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<ClipboardItem>, StorageError> {
        if filter.is_empty() {
            return self.recent_items(HISTORY_LIMIT);
        }

        let mut sql = format!("SELECT {} FROM clipboard_items WHERE 1=1", ITEM_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(item_type) = filter.item_type() {
            values.push(Value::Text(item_type.to_string()));
            sql.push_str(&format!(" AND type = ?{}", values.len()));
        }
        if let Some(category) = filter.category() {
            values.push(Value::Text(category.to_string()));
            sql.push_str(&format!(" AND category = ?{}", values.len()));
        }
        if let Some(is_code) = filter.is_code {
            values.push(Value::Integer(is_code as i64));
            sql.push_str(&format!(" AND is_code = ?{}", values.len()));
        }
        if let Some(language) = filter.language() {
            values.push(Value::Text(language.to_string()));
            sql.push_str(&format!(" AND language = ?{}", values.len()));
        }
        if let Some(search) = filter.search() {
            values.push(Value::Text(format!("%{}%", escape_like(search))));
            sql.push_str(&format!(" AND content LIKE ?{} ESCAPE '\\'", values.len()));
        }

        values.push(Value::Integer(HISTORY_LIMIT as i64));
        sql.push_str(&format!(" ORDER BY timestamp DESC LIMIT ?{}", values.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), item_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// The `limit` newest items, newest first
    pub fn recent_items(&self, limit: u32) -> Result<Vec<ClipboardItem>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM clipboard_items ORDER BY timestamp DESC LIMIT ?1",
            ITEM_COLUMNS
        ))?;

        let rows = stmt.query_map(params![limit as i64], item_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let (item_count, code_count, newest_timestamp) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_code), 0), MAX(timestamp) FROM clipboard_items",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, Option<i64>>(2)?)),
        )?;

        Ok(StorageStats {
            item_count: item_count as usize,
            code_count: code_count as usize,
            newest_timestamp,
        })
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ClipboardItem> {
    Ok(ClipboardItem {
        id: Some(row.get(0)?),
        content: row.get(1)?,
        timestamp: row.get(2)?,
        item_type: row.get(3)?,
        category: row.get(4)?,
        source: row.get(5)?,
        is_code: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
        language: row.get(7)?,
    })
}

/// Escape LIKE wildcards so `search` is matched literally
fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone)]
pub struct StorageStats {
    pub item_count: usize,
    pub code_count: usize,
    pub newest_timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(storage: &mut Storage, content: &str, item_type: ItemType, category: &str, ts: i64) -> i64 {
        let item = ClipboardItem::new(content, item_type, ts).with_category(category);
        storage.insert_item(&item).unwrap()
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut storage = Storage::open_in_memory().unwrap();
        let item = ClipboardItem::new("SELECT 1", ItemType::Code, 1_000)
            .with_category("development")
            .with_language("sql");

        let id = storage.insert_item(&item).unwrap();
        let recent = storage.recent_items(1).unwrap();

        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, Some(id));
        assert_eq!(recent[0].content, "SELECT 1");
        assert_eq!(recent[0].item_type, ItemType::Code);
        assert_eq!(recent[0].language.as_deref(), Some("sql"));
        assert!(recent[0].is_code);
    }

    #[test]
    fn test_ids_are_store_assigned() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut item = ClipboardItem::new("a", ItemType::Text, 1);
        item.id = Some(999);

        let first = storage.insert_item(&item).unwrap();
        let second = storage.insert_item(&item).unwrap();
        assert_ne!(first, 999);
        assert!(second > first);
    }

    #[test]
    fn test_latest_with_content_picks_newest() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, "same", ItemType::Text, "snippet", 100);
        let newest = seed(&mut storage, "same", ItemType::Text, "snippet", 300);
        seed(&mut storage, "same", ItemType::Text, "snippet", 200);
        seed(&mut storage, "other", ItemType::Text, "snippet", 900);

        let prior = storage.latest_with_content("same").unwrap().unwrap();
        assert_eq!(prior.id, newest);
        assert_eq!(prior.timestamp, 300);

        assert!(storage.latest_with_content("missing").unwrap().is_none());
    }

    #[test]
    fn test_history_filters_are_conjunctive() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, "https://a.com", ItemType::Url, "web", 1);
        seed(&mut storage, "hello", ItemType::Text, "snippet", 2);
        seed(&mut storage, "https://b.com", ItemType::Url, "bookmark", 3);
        seed(&mut storage, "https://c.com", ItemType::Url, "web", 4);

        let filter = HistoryFilter {
            item_type: Some("url".to_string()),
            category: Some("web".to_string()),
            ..Default::default()
        };
        let items = storage.history(&filter).unwrap();

        let contents: Vec<_> = items.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["https://c.com", "https://a.com"]);
    }

    #[test]
    fn test_history_search_is_literal_substring() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, "100% done", ItemType::Text, "snippet", 1);
        seed(&mut storage, "100 items", ItemType::Text, "snippet", 2);
        seed(&mut storage, "snake_case", ItemType::Text, "snippet", 3);
        seed(&mut storage, "snakeXcase", ItemType::Text, "snippet", 4);

        let percent = HistoryFilter {
            search: Some("0%".to_string()),
            ..Default::default()
        };
        let items = storage.history(&percent).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "100% done");

        let underscore = HistoryFilter {
            search: Some("e_c".to_string()),
            ..Default::default()
        };
        let items = storage.history(&underscore).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "snake_case");
    }

    #[test]
    fn test_history_ignores_blank_search() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, "one", ItemType::Text, "snippet", 1);
        seed(&mut storage, "two", ItemType::Text, "snippet", 2);

        let filter = HistoryFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(storage.history(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_history_is_capped_and_newest_first() {
        let mut storage = Storage::open_in_memory().unwrap();
        for ts in 0..60 {
            seed(&mut storage, &format!("item {}", ts), ItemType::Text, "snippet", ts);
        }

        let items = storage.history(&HistoryFilter::default()).unwrap();
        assert_eq!(items.len(), HISTORY_LIMIT as usize);
        assert_eq!(items[0].timestamp, 59);
        assert!(items.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_is_code_filter() {
        let mut storage = Storage::open_in_memory().unwrap();
        storage
            .insert_item(&ClipboardItem::new("def f(): pass", ItemType::Code, 1).with_language("python"))
            .unwrap();
        seed(&mut storage, "plain", ItemType::Text, "snippet", 2);

        let filter = HistoryFilter {
            is_code: Some(false),
            ..Default::default()
        };
        let items = storage.history(&filter).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "plain");
    }

    #[test]
    fn test_schema_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("clipstack.db");

        {
            let mut storage = Storage::open(&path).unwrap();
            seed(&mut storage, "kept", ItemType::Text, "snippet", 1);
        }

        let storage = Storage::open(&path).unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.newest_timestamp, Some(1));
    }

    #[test]
    fn test_stats_on_empty_store() {
        let storage = Storage::open_in_memory().unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.item_count, 0);
        assert_eq!(stats.code_count, 0);
        assert_eq!(stats.newest_timestamp, None);
    }
}
