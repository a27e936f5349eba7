//! Read-state mutators. Every multi-statement mutation runs inside one
//! transaction so a crash cannot leave the picture rows and the folder
//! counters disagreeing. Folder arguments are trailing-separator
//! normalized before any prefix match, so `/a/` can never bleed into
//! `/ab/`.
//!
//! Each mutator reports whether anything observable changed; the HTTP
//! layer bumps the modification counter on that signal, after commit.

use rusqlite::{OptionalExtension, Transaction, params};

use crate::catalog::{Catalog, like_prefix};
use crate::error::Result;
use crate::uripath;

fn bump_ancestors(tx: &Transaction, folders: &[String], delta: i64) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "UPDATE folders SET seen_count = seen_count + ?2 WHERE path = ?1",
    )?;
    for folder in folders {
        stmt.execute(params![folder, delta])?;
    }
    Ok(())
}

impl Catalog {
    /// Record `path` as the most recently viewed picture of its folder,
    /// marking it seen on first view and rippling the +1 up the ancestor
    /// chain. `None` if the picture is not indexed (no-op).
    pub fn set_latest_picture(&mut self, path: &str) -> Result<Option<String>> {
        let tx = self.conn.transaction()?;
        let seen: Option<bool> = tx
            .query_row(
                "SELECT seen FROM pictures WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        let Some(seen) = seen else {
            return Ok(None);
        };

        let folder = uripath::parent_folder(path);
        if !seen {
            // The picture's own folder plus every ancestor up to the root.
            bump_ancestors(&tx, &uripath::ancestors(path), 1)?;
            tx.execute(
                "UPDATE pictures SET seen = 1 WHERE path = ?1",
                params![path],
            )?;
        }
        tx.execute(
            "UPDATE folders SET current = ?1 WHERE path = ?2",
            params![path, folder],
        )?;
        tx.commit()?;
        Ok(Some(uripath::encode(&folder)))
    }

    /// Mark every picture in the subtree seen. Ancestors outside the
    /// subtree get the incremental delta; inside it the counters are
    /// forced to `seen_count = total_count`, which also repairs any prior
    /// drift. Returns the number of pictures flipped; zero means nothing
    /// was written.
    pub fn mark_folder_read(&mut self, path: &str) -> Result<usize> {
        let folder = uripath::normalize_folder(path);
        let pattern = like_prefix(&folder);
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE pictures SET seen = 1
             WHERE seen = 0 AND folder LIKE ?1 ESCAPE '\\'",
            params![pattern],
        )?;
        if changed > 0 {
            bump_ancestors(&tx, &uripath::ancestors(&folder), changed as i64)?;
            tx.execute(
                "UPDATE folders SET seen_count = total_count
                 WHERE path LIKE ?1 ESCAPE '\\'",
                params![pattern],
            )?;
        }
        tx.commit()?;
        Ok(changed)
    }

    /// Inverse of [`mark_folder_read`]. Also clears the subtree's
    /// `current` pointers: a last-viewed cursor is meaningless once
    /// nothing is seen.
    pub fn mark_folder_unread(&mut self, path: &str) -> Result<usize> {
        let folder = uripath::normalize_folder(path);
        let pattern = like_prefix(&folder);
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE pictures SET seen = 0
             WHERE seen = 1 AND folder LIKE ?1 ESCAPE '\\'",
            params![pattern],
        )?;
        if changed > 0 {
            bump_ancestors(&tx, &uripath::ancestors(&folder), -(changed as i64))?;
            tx.execute(
                "UPDATE folders SET seen_count = 0, current = NULL
                 WHERE path LIKE ?1 ESCAPE '\\'",
                params![pattern],
            )?;
        }
        tx.commit()?;
        Ok(changed)
    }

    /// Idempotent bookmark insert. False when the bookmark already existed.
    pub fn add_bookmark(&self, path: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO bookmarks (path) VALUES (?1)
             ON CONFLICT(path) DO NOTHING",
            params![path],
        )?;
        Ok(changed > 0)
    }

    /// Idempotent bookmark delete. False when there was nothing to remove.
    pub fn remove_bookmark(&self, path: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM bookmarks WHERE path = ?1", params![path])?;
        Ok(changed > 0)
    }
}
