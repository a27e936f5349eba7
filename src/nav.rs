//! Navigation queries over the catalog: child folders, sibling stepping
//! under the `(sort_key, path)` total order, pictures, bookmarks, and the
//! composed listing the HTTP layer ships to the client.
//!
//! Absence is a value everywhere here. Stepping past the first or last
//! sibling returns `None`, never an error.

use rusqlite::params;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::uripath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    fn comparer(self) -> &'static str {
        match self {
            Direction::Next => ">",
            Direction::Prev => "<",
        }
    }

    fn order(self) -> &'static str {
        match self {
            Direction::Next => "ASC",
            Direction::Prev => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Only folders with unseen pictures (`total_count > seen_count`).
    Unread,
}

/// Compact folder reference used for next/prev links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderSummary {
    pub name: String,
    pub path: String,
    pub cover: Option<String>,
}

/// A folder row with its parent and raw sort key, as needed to issue
/// directional queries from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderDetail {
    pub name: String,
    pub path: String,
    pub parent: String,
    pub sort_key: String,
    pub cover: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildFolder {
    pub name: String,
    pub path: String,
    pub cover: Option<String>,
    pub total_count: i64,
    pub total_seen: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Picture {
    pub name: String,
    pub path: String,
    pub index: usize,
    pub seen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bookmark {
    pub name: String,
    pub path: String,
    pub folder: String,
}

/// Bookmarks of one containing folder. `name` carries the raw folder path,
/// `path` its encoded form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmarkFolder {
    pub name: String,
    pub path: String,
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub name: String,
    pub path: String,
    pub parent: String,
    pub cover: Option<String>,
    pub next: Option<FolderSummary>,
    pub next_unread: Option<FolderSummary>,
    pub prev: Option<FolderSummary>,
    pub prev_unread: Option<FolderSummary>,
    pub children: Vec<ChildFolder>,
    pub pictures: Vec<Picture>,
    pub bookmarks: Vec<BookmarkFolder>,
    pub mod_count: u64,
}

fn cover(current: Option<String>, first_picture: Option<String>) -> Option<String> {
    uripath::encode_opt(current.or(first_picture).as_deref())
}

impl Catalog {
    /// Immediate children of `path`, ordered by `(sort_key, path)`.
    pub fn child_folders(&self, path: &str) -> Result<Vec<ChildFolder>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, current, first_picture, total_count, seen_count
             FROM folders
             WHERE folder = ?1
             ORDER BY sort_key, path",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            let child_path: String = row.get(0)?;
            let current: Option<String> = row.get(1)?;
            let first: Option<String> = row.get(2)?;
            Ok(ChildFolder {
                name: uripath::basename(&child_path).to_string(),
                path: uripath::encode(&child_path),
                cover: cover(current, first),
                total_count: row.get(3)?,
                total_seen: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Exact folder lookup; `None` when the path is not indexed.
    pub fn get_folder(&self, path: &str) -> Result<Option<FolderDetail>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, folder, sort_key, current, first_picture
             FROM folders
             WHERE path = ?1
             LIMIT 1",
        )?;
        let folder = stmt
            .query_row(params![path], |row| {
                let folder_path: String = row.get(0)?;
                let parent: String = row.get(1)?;
                let current: Option<String> = row.get(3)?;
                let first: Option<String> = row.get(4)?;
                Ok(FolderDetail {
                    name: uripath::basename(&folder_path).to_string(),
                    path: uripath::encode(&folder_path),
                    parent: uripath::encode(&parent),
                    sort_key: row.get(2)?,
                    cover: cover(current, first),
                })
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(folder)
    }

    /// Nearest sibling of `path` in the given direction under the total
    /// order `(sort_key, path)`. Two candidates: same sort key with the
    /// path breaking the tie, then the next distinct sort key. The
    /// same-key candidate always lies closer, so it wins when both exist.
    /// `None` means the first or last sibling was reached.
    pub fn directional_folder(
        &self,
        path: &str,
        sort_key: &str,
        direction: Direction,
        scope: Scope,
    ) -> Result<Option<FolderSummary>> {
        let parent = uripath::parent_folder(path);
        let cmp = direction.comparer();
        let ord = direction.order();
        let unread = match scope {
            Scope::All => "",
            Scope::Unread => "AND total_count > seen_count",
        };

        let same_key = format!(
            "SELECT path, current, first_picture FROM folders
             WHERE folder = ?1 AND sort_key = ?2 AND path {cmp} ?3 {unread}
             ORDER BY path {ord}
             LIMIT 1"
        );
        if let Some(found) = self.directional_row(&same_key, params![parent, sort_key, path])? {
            return Ok(Some(found));
        }

        let next_key = format!(
            "SELECT path, current, first_picture FROM folders
             WHERE folder = ?1 AND sort_key {cmp} ?2 {unread}
             ORDER BY sort_key {ord}, path {ord}
             LIMIT 1"
        );
        self.directional_row(&next_key, params![parent, sort_key])
    }

    fn directional_row(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<FolderSummary>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let row = stmt
            .query_row(params, |row| {
                let folder_path: String = row.get(0)?;
                let current: Option<String> = row.get(1)?;
                let first: Option<String> = row.get(2)?;
                Ok(FolderSummary {
                    name: uripath::basename(&folder_path).to_string(),
                    path: uripath::encode(&folder_path),
                    cover: cover(current, first),
                })
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(row)
    }

    pub fn next_folder(&self, path: &str, sort_key: &str) -> Result<Option<FolderSummary>> {
        self.directional_folder(path, sort_key, Direction::Next, Scope::All)
    }

    pub fn previous_folder(&self, path: &str, sort_key: &str) -> Result<Option<FolderSummary>> {
        self.directional_folder(path, sort_key, Direction::Prev, Scope::All)
    }

    /// Pictures directly in `path`, ordered by `(sort_key, path)` with the
    /// position index baked in.
    pub fn pictures(&self, path: &str) -> Result<Vec<Picture>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, seen FROM pictures
             WHERE folder = ?1
             ORDER BY sort_key, path",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            let pic_path: String = row.get(0)?;
            let seen: bool = row.get(1)?;
            Ok((pic_path, seen))
        })?;
        let mut pictures = Vec::new();
        for (index, row) in rows.enumerate() {
            let (pic_path, seen) = row?;
            pictures.push(Picture {
                name: uripath::stem(&pic_path).to_string(),
                path: uripath::encode(&pic_path),
                index,
                seen,
            });
        }
        Ok(pictures)
    }

    /// All bookmarks, grouped per containing folder. The group boundary is
    /// detected on folder change, so the ORDER BY is load-bearing.
    pub fn bookmarks(&self) -> Result<Vec<BookmarkFolder>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT pictures.path, pictures.folder
             FROM bookmarks
             JOIN pictures ON pictures.path = bookmarks.path
             JOIN folders ON folders.path = pictures.folder
             ORDER BY folders.path, folders.sort_key, pictures.sort_key, pictures.path",
        )?;
        let rows = stmt.query_map([], |row| {
            let pic_path: String = row.get(0)?;
            let folder: String = row.get(1)?;
            Ok((pic_path, folder))
        })?;

        let mut results: Vec<BookmarkFolder> = Vec::new();
        for row in rows {
            let (pic_path, folder) = row?;
            if results.last().map(|g| g.name.as_str()) != Some(folder.as_str()) {
                results.push(BookmarkFolder {
                    name: folder.clone(),
                    path: uripath::encode(&folder),
                    bookmarks: Vec::new(),
                });
            }
            let group = results.last_mut().unwrap();
            group.bookmarks.push(Bookmark {
                name: uripath::basename(&pic_path).to_string(),
                path: uripath::encode(&pic_path),
                folder: uripath::encode(&folder),
            });
        }
        Ok(results)
    }

    /// The full read-only view for one folder, or `None` if the folder
    /// itself is absent. Empty sub-results are valid.
    pub fn listing(&self, path: &str, mod_count: u64) -> Result<Option<Listing>> {
        let Some(folder) = self.get_folder(path)? else {
            return Ok(None);
        };
        let next = self.next_folder(path, &folder.sort_key)?;
        let next_unread =
            self.directional_folder(path, &folder.sort_key, Direction::Next, Scope::Unread)?;
        let prev = self.previous_folder(path, &folder.sort_key)?;
        let prev_unread =
            self.directional_folder(path, &folder.sort_key, Direction::Prev, Scope::Unread)?;
        let children = self.child_folders(path)?;
        let pictures = self.pictures(path)?;
        let bookmarks = self.bookmarks()?;
        Ok(Some(Listing {
            name: folder.name,
            path: folder.path,
            parent: folder.parent,
            cover: folder.cover,
            next,
            next_unread,
            prev,
            prev_unread,
            children,
            pictures,
            bookmarks,
            mod_count,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rusqlite::params;

    /// Catalog with three siblings under the root: `/a/` (key 1), `/b/`
    /// and `/c/` (both key 2, tie broken by path), plus a nested `/a/sub/`.
    pub(crate) fn seeded() -> Catalog {
        let cat = Catalog::in_memory().unwrap();
        cat.upsert_folder("/", "", "").unwrap();
        cat.upsert_folder("/a/", "/", "1").unwrap();
        cat.upsert_folder("/b/", "/", "2").unwrap();
        cat.upsert_folder("/c/", "/", "2").unwrap();
        cat.upsert_folder("/a/sub/", "/a/", "sub").unwrap();
        for (path, folder, key) in [
            ("/a/pic1.jpg", "/a/", "pic000001"),
            ("/a/pic2.jpg", "/a/", "pic000002"),
            ("/a/sub/deep.png", "/a/sub/", "deep"),
            ("/b/one.jpg", "/b/", "one"),
            ("/b/two.jpg", "/b/", "two"),
            ("/c/lone.gif", "/c/", "lone"),
        ] {
            cat.upsert_picture(path, folder, key).unwrap();
        }
        crate::scan::refresh_aggregates(&cat).unwrap();
        cat
    }

    fn mark_seen(cat: &Catalog, path: &str) {
        cat.conn
            .execute("UPDATE pictures SET seen = 1 WHERE path = ?1", params![path])
            .unwrap();
        crate::scan::refresh_aggregates(cat).unwrap();
    }

    #[test]
    fn child_folders_are_sorted_and_counted() {
        let cat = seeded();
        let children = cat.child_folders("/").unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let a = &children[0];
        assert_eq!(a.path, "/a/");
        assert_eq!(a.total_count, 3); // two direct plus one nested
        assert_eq!(a.total_seen, 0);
        assert_eq!(a.cover.as_deref(), Some("/a/pic1.jpg"));
    }

    #[test]
    fn get_folder_misses_return_none() {
        let cat = seeded();
        assert!(cat.get_folder("/nope/").unwrap().is_none());

        let a = cat.get_folder("/a/").unwrap().unwrap();
        assert_eq!(a.name, "a");
        assert_eq!(a.parent, "/");
        assert_eq!(a.sort_key, "1");
    }

    #[test]
    fn directional_steps_through_distinct_sort_keys() {
        let cat = seeded();
        let next = cat.next_folder("/a/", "1").unwrap().unwrap();
        assert_eq!(next.name, "b");
        let prev = cat.previous_folder("/b/", "2").unwrap().unwrap();
        assert_eq!(prev.name, "a");
    }

    #[test]
    fn directional_breaks_sort_key_ties_by_path() {
        let cat = seeded();
        // /b/ and /c/ share sort key 2.
        let next = cat.next_folder("/b/", "2").unwrap().unwrap();
        assert_eq!(next.name, "c");
        let prev = cat.previous_folder("/c/", "2").unwrap().unwrap();
        assert_eq!(prev.name, "b");
    }

    #[test]
    fn directional_is_antisymmetric() {
        let cat = seeded();
        for (path, key) in [("/a/", "1"), ("/b/", "2")] {
            let next = cat.next_folder(path, key).unwrap().unwrap();
            let next_raw = crate::uripath::decode(&next.path);
            let next_key = cat.get_folder(&next_raw).unwrap().unwrap().sort_key;
            let back = cat.previous_folder(&next_raw, &next_key).unwrap().unwrap();
            assert_eq!(crate::uripath::decode(&back.path), path);
        }
    }

    #[test]
    fn ends_of_the_row_return_none() {
        let cat = seeded();
        assert!(cat.previous_folder("/a/", "1").unwrap().is_none());
        assert!(cat.next_folder("/c/", "2").unwrap().is_none());
    }

    #[test]
    fn unread_scope_skips_fully_read_folders() {
        let cat = seeded();
        mark_seen(&cat, "/b/one.jpg");
        mark_seen(&cat, "/b/two.jpg");

        let next_any = cat.next_folder("/a/", "1").unwrap().unwrap();
        assert_eq!(next_any.name, "b");

        let next_unread = cat
            .directional_folder("/a/", "1", Direction::Next, Scope::Unread)
            .unwrap()
            .unwrap();
        assert_eq!(next_unread.name, "c");
    }

    #[test]
    fn pictures_carry_position_indexes() {
        let cat = seeded();
        let pics = cat.pictures("/a/").unwrap();
        assert_eq!(pics.len(), 2);
        assert_eq!(pics[0].name, "pic1");
        assert_eq!(pics[0].index, 0);
        assert_eq!(pics[1].name, "pic2");
        assert_eq!(pics[1].index, 1);
        assert!(!pics[0].seen);
    }

    #[test]
    fn bookmarks_group_by_folder_in_order() {
        let cat = seeded();
        for path in ["/b/two.jpg", "/a/pic1.jpg", "/a/pic2.jpg"] {
            cat.conn
                .execute("INSERT INTO bookmarks (path) VALUES (?1)", params![path])
                .unwrap();
        }

        let groups = cat.bookmarks().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "/a/");
        assert_eq!(groups[0].bookmarks.len(), 2);
        assert_eq!(groups[0].bookmarks[0].name, "pic1.jpg");
        assert_eq!(groups[1].name, "/b/");
        assert_eq!(groups[1].bookmarks[0].path, "/b/two.jpg");
    }

    #[test]
    fn stale_bookmarks_are_filtered_by_the_join() {
        let cat = seeded();
        cat.conn
            .execute("INSERT INTO bookmarks (path) VALUES ('/gone/x.jpg')", [])
            .unwrap();
        assert!(cat.bookmarks().unwrap().is_empty());
    }

    #[test]
    fn listing_composes_the_whole_view() {
        let cat = seeded();
        let listing = cat.listing("/a/", 42).unwrap().unwrap();
        assert_eq!(listing.name, "a");
        assert_eq!(listing.parent, "/");
        assert_eq!(listing.next.as_ref().unwrap().name, "b");
        assert!(listing.prev.is_none());
        assert_eq!(listing.children.len(), 1);
        assert_eq!(listing.pictures.len(), 2);
        assert_eq!(listing.mod_count, 42);

        assert!(cat.listing("/missing/", 0).unwrap().is_none());
    }

    #[test]
    fn listing_serializes_with_camel_case_keys() {
        let cat = seeded();
        let listing = cat.listing("/a/", 7).unwrap().unwrap();
        let json = serde_json::to_value(&listing).unwrap();
        assert!(json.get("nextUnread").is_some());
        assert!(json.get("modCount").is_some());
        assert_eq!(json["children"][0]["totalCount"], 3);
    }
}
