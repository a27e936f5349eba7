use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::uripath;

/// Extensions accepted into the library, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 11] = [
    "jpg", "jpeg", "png", "webp", "gif", "svg", "tif", "tiff", "bmp", "jfif", "jpe",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Path relative to the walk root, `/`-separated.
    pub path: String,
    pub is_file: bool,
}

#[derive(Debug)]
pub struct Batch {
    /// One listed directory's accepted entries, in filesystem listing
    /// order. Callers needing a stable order sort downstream.
    pub entries: Vec<Entry>,
    /// Directories still queued after this one, for progress reporting.
    pub queue_len: usize,
}

/// Breadth-first walk over a picture library. One directory is listed per
/// [`Walk::next_batch`] call; accepted subdirectories are enqueued before
/// the batch is returned, so memory is bounded by the frontier width. A
/// listing error aborts the whole walk.
pub struct Walk {
    root: PathBuf,
    queue: VecDeque<String>,
}

impl Walk {
    pub fn new(root: &Path) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back("/".to_string());
        Walk {
            root: root.to_path_buf(),
            queue,
        }
    }

    /// Next per-directory batch, or `Ok(None)` once the queue is drained.
    pub fn next_batch(&mut self) -> Result<Option<Batch>> {
        let Some(current) = self.queue.pop_front() else {
            return Ok(None);
        };

        let dir = self.root.join(current.trim_start_matches('/'));
        let mut entries = Vec::new();
        for item in fs::read_dir(&dir)? {
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            let is_dir = item.file_type()?.is_dir();
            let accepted = if is_dir {
                !name.starts_with('.')
            } else {
                has_image_extension(&name)
            };
            if !accepted {
                continue;
            }
            let path = uripath::join(&current, &name);
            if is_dir {
                self.queue.push_back(path.clone());
            }
            entries.push(Entry {
                path,
                is_file: !is_dir,
            });
        }

        Ok(Some(Batch {
            entries,
            queue_len: self.queue.len(),
        }))
    }
}

fn has_image_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn filters_and_walks_breadth_first() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "img.jpg", "x");
        write(root, "note.txt", "x");
        write(root, ".git/HEAD", "x");
        write(root, "sub/pic.png", "x");

        let mut walk = Walk::new(root);

        let first = walk.next_batch().unwrap().unwrap();
        let got: HashSet<Entry> = first.entries.into_iter().collect();
        let want: HashSet<Entry> = [
            Entry {
                path: "img.jpg".into(),
                is_file: true,
            },
            Entry {
                path: "sub".into(),
                is_file: false,
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(got, want);
        assert_eq!(first.queue_len, 1);

        let second = walk.next_batch().unwrap().unwrap();
        assert_eq!(
            second.entries,
            vec![Entry {
                path: "sub/pic.png".into(),
                is_file: true,
            }]
        );
        assert_eq!(second.queue_len, 0);

        assert!(walk.next_batch().unwrap().is_none());
    }

    #[test]
    fn deeper_levels_come_after_shallower_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "a/one.jpg", "x");
        write(root, "b/two.jpg", "x");
        write(root, "a/nested/three.jpg", "x");

        let mut walk = Walk::new(root);
        let mut listed = Vec::new();
        while let Some(batch) = walk.next_batch().unwrap() {
            let dirs: Vec<String> = batch
                .entries
                .iter()
                .filter(|e| !e.is_file)
                .map(|e| e.path.clone())
                .collect();
            listed.push(dirs);
        }

        // Root lists a and b; both siblings are expanded before a/nested.
        assert_eq!(listed.len(), 4);
        let mut first_level = listed[0].clone();
        first_level.sort();
        assert_eq!(first_level, vec!["a", "b"]);
        assert!(listed[1..3].iter().flatten().any(|d| d == "a/nested"));
        assert!(listed[3].is_empty());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_image_extension("COVER.JPG"));
        assert!(has_image_extension("scan.TiFf"));
        assert!(!has_image_extension("notes.txt"));
        assert!(!has_image_extension("noextension"));
        assert!(!has_image_extension(".jpg"));
    }

    #[test]
    fn listing_error_aborts_the_walk() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");
        let mut walk = Walk::new(&missing);
        assert!(walk.next_batch().is_err());
    }
}
