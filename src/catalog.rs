use std::path::Path;

use rusqlite::{Connection, params};

use crate::error::Result;

/// SQLite-backed library index. One connection, shared by the navigation
/// queries and the read-state mutators via method impls in their modules.
pub struct Catalog {
    pub(crate) conn: Connection,
}

impl Catalog {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        let catalog = Catalog { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let catalog = Catalog { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS folders (
                path TEXT PRIMARY KEY,
                folder TEXT NOT NULL,
                sort_key TEXT NOT NULL,
                current TEXT,
                first_picture TEXT,
                total_count INTEGER NOT NULL DEFAULT 0,
                seen_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_folders_parent
                ON folders(folder, sort_key);

            CREATE TABLE IF NOT EXISTS pictures (
                path TEXT PRIMARY KEY,
                folder TEXT NOT NULL,
                sort_key TEXT NOT NULL,
                seen INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_pictures_folder
                ON pictures(folder, sort_key);

            CREATE TABLE IF NOT EXISTS bookmarks (
                path TEXT PRIMARY KEY
            );",
        )?;
        Ok(())
    }

    /// Insert or refresh a folder row. `current`, `first_picture` and the
    /// counters survive a rescan; the scan recomputes them afterwards.
    pub fn upsert_folder(&self, path: &str, folder: &str, sort_key: &str) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO folders (path, folder, sort_key)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET
                folder = excluded.folder,
                sort_key = excluded.sort_key",
        )?;
        stmt.execute(params![path, folder, sort_key])?;
        Ok(())
    }

    /// Insert or refresh a picture row, preserving its `seen` flag.
    pub fn upsert_picture(&self, path: &str, folder: &str, sort_key: &str) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO pictures (path, folder, sort_key)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET
                folder = excluded.folder,
                sort_key = excluded.sort_key",
        )?;
        stmt.execute(params![path, folder, sort_key])?;
        Ok(())
    }

    pub fn folder_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM folders")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn picture_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM pictures")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn delete_folder(&self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM folders WHERE path = ?1", params![path])?;
        Ok(())
    }

    pub fn delete_picture(&self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM pictures WHERE path = ?1", params![path])?;
        Ok(())
    }
}

/// Turn a folder path into a `LIKE … ESCAPE '\'` prefix pattern. Wildcard
/// characters in folder names must not widen the match.
pub(crate) fn like_prefix(path: &str) -> String {
    let mut pattern = String::with_capacity(path.len() + 1);
    for c in path.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_picture_preserves_seen_flag() {
        let cat = Catalog::in_memory().unwrap();
        cat.upsert_picture("/a/p.jpg", "/a/", "p.jpg").unwrap();
        cat.conn
            .execute("UPDATE pictures SET seen = 1 WHERE path = '/a/p.jpg'", [])
            .unwrap();

        cat.upsert_picture("/a/p.jpg", "/a/", "p2key").unwrap();

        let (sort_key, seen): (String, bool) = cat
            .conn
            .query_row(
                "SELECT sort_key, seen FROM pictures WHERE path = '/a/p.jpg'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(sort_key, "p2key");
        assert!(seen);
    }

    #[test]
    fn upsert_folder_preserves_counters() {
        let cat = Catalog::in_memory().unwrap();
        cat.upsert_folder("/a/", "/", "a").unwrap();
        cat.conn
            .execute(
                "UPDATE folders SET total_count = 5, seen_count = 3, current = '/a/p.jpg'
                 WHERE path = '/a/'",
                [],
            )
            .unwrap();

        cat.upsert_folder("/a/", "/", "newkey").unwrap();

        let (total, seen, current): (i64, i64, Option<String>) = cat
            .conn
            .query_row(
                "SELECT total_count, seen_count, current FROM folders WHERE path = '/a/'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((total, seen), (5, 3));
        assert_eq!(current.as_deref(), Some("/a/p.jpg"));
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("/a/"), "/a/%");
        assert_eq!(like_prefix("/100%_done\\/"), "/100\\%\\_done\\\\/%");
    }
}
