//! Reconciles a walker pass into catalog rows: sort-key assignment,
//! folder/picture upserts, pruning of rows whose files disappeared, and a
//! full recompute of every folder's cover and counters. The recompute also
//! repairs any counter drift left behind by interrupted writes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::params;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::uripath;
use crate::walker::Walk;

/// Width digit runs are padded to. Keys are opaque downstream; equal keys
/// (e.g. `007` vs `7`) just fall back to the path tie-break.
const NUMERIC_PAD: usize = 12;

/// Sort key for an entry name: lowercased, digit runs left-padded so that
/// `page2` orders before `page10`.
pub(crate) fn sort_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut digits = String::new();
    for c in name.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        flush_digits(&mut key, &mut digits);
        key.extend(c.to_lowercase());
    }
    flush_digits(&mut key, &mut digits);
    key
}

fn flush_digits(key: &mut String, digits: &mut String) {
    if digits.is_empty() {
        return;
    }
    for _ in digits.len()..NUMERIC_PAD {
        key.push('0');
    }
    key.push_str(digits);
    digits.clear();
}

/// Walk `root` and bring the catalog in line with the filesystem. Seen
/// flags, current pointers and bookmarks survive; rows whose files are
/// gone get pruned, and the aggregates are recomputed at the end.
pub fn scan(cat: &Catalog, root: &Path) -> Result<()> {
    let mut seen_folders = HashSet::new();
    let mut seen_pictures = HashSet::new();
    seen_folders.insert("/".to_string());
    // Empty parent keeps the root out of its own child listing.
    cat.upsert_folder("/", "", "")?;

    let mut walk = Walk::new(root);
    while let Some(batch) = walk.next_batch()? {
        log::debug!(
            "scan batch: {} entries, {} directories queued",
            batch.entries.len(),
            batch.queue_len
        );
        for entry in batch.entries {
            let abs = format!("/{}", entry.path);
            let name = uripath::basename(&abs).to_string();
            if entry.is_file {
                let folder = uripath::parent_folder(&abs);
                cat.upsert_picture(&abs, &folder, &sort_key(&name))?;
                seen_pictures.insert(abs);
            } else {
                let folder_path = uripath::normalize_folder(&abs);
                let parent = uripath::parent_folder(&folder_path);
                cat.upsert_folder(&folder_path, &parent, &sort_key(&name))?;
                seen_folders.insert(folder_path);
            }
        }
    }

    let mut pruned = 0usize;
    for path in cat.folder_paths()? {
        if !seen_folders.contains(&path) {
            cat.delete_folder(&path)?;
            pruned += 1;
        }
    }
    for path in cat.picture_paths()? {
        if !seen_pictures.contains(&path) {
            cat.delete_picture(&path)?;
            pruned += 1;
        }
    }

    refresh_aggregates(cat)?;
    log::info!(
        "scan done: {} folders, {} pictures, {} rows pruned",
        seen_folders.len(),
        seen_pictures.len(),
        pruned
    );
    Ok(())
}

/// Recompute `first_picture`, `total_count` and `seen_count` for every
/// folder from the picture rows, and drop dangling `current` pointers.
/// This is the source-of-truth pass; the incremental mutators only keep
/// the counters current between scans.
pub fn refresh_aggregates(cat: &Catalog) -> Result<()> {
    let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
    for path in cat.folder_paths()? {
        totals.insert(path, (0, 0));
    }

    let mut first_pictures: HashMap<String, String> = HashMap::new();
    {
        let mut stmt = cat.conn.prepare_cached(
            "SELECT path, folder, seen FROM pictures
             ORDER BY folder, sort_key, path",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;
        for row in rows {
            let (path, folder, seen) = row?;
            first_pictures.entry(folder.clone()).or_insert(path);
            for affected in std::iter::once(folder.clone()).chain(uripath::ancestors(&folder)) {
                if let Some(counts) = totals.get_mut(&affected) {
                    counts.0 += 1;
                    if seen {
                        counts.1 += 1;
                    }
                }
            }
        }
    }

    let mut update = cat.conn.prepare_cached(
        "UPDATE folders
         SET first_picture = ?2, total_count = ?3, seen_count = ?4
         WHERE path = ?1",
    )?;
    for (path, (total, seen)) in &totals {
        let first = first_pictures.get(path).map(|s| s.as_str());
        update.execute(params![path, first, total, seen])?;
    }

    cat.conn.execute(
        "UPDATE folders SET current = NULL
         WHERE current IS NOT NULL
           AND current NOT IN (SELECT path FROM pictures)",
        [],
    )?;
    Ok(())
}
