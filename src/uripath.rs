//! Virtual path helpers. Every path stored in the catalog is absolute,
//! `/`-separated, and folder paths always carry a trailing `/` so that
//! prefix matches cannot leak into siblings (`/a/` vs `/ab/`).
//!
//! Paths crossing the API boundary are percent-encoded segment by segment,
//! keeping `/` as the hierarchy separator.

/// Characters left verbatim by `encodeURIComponent`, which the web client
/// uses for the reverse direction.
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')'
        )
}

fn encode_segment(seg: &str) -> String {
    let mut out = String::with_capacity(seg.len());
    for &b in seg.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_segment(seg: &str) -> String {
    let bytes = seg.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode each `/`-delimited segment independently.
pub fn encode(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode`]. Malformed escapes pass through literally.
pub fn decode(path: &str) -> String {
    path.split('/')
        .map(decode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

pub fn encode_opt(path: Option<&str>) -> Option<String> {
    match path {
        Some(p) if !p.is_empty() => Some(encode(p)),
        _ => None,
    }
}

/// Join a walker-relative path onto the virtual root. `""` and `"/"` both
/// mean the root itself.
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Force the trailing separator onto a folder path.
pub fn normalize_folder(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Containing folder of a path, trailing-separator form. The parent of the
/// root is the root itself.
pub fn parent_folder(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// Last path segment, ignoring a trailing separator.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Basename with the extension stripped, for picture display names.
pub fn stem(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Folder chain from a path's container up to and including the root:
/// `/a/b/pic.jpg` yields `["/a/b/", "/a/", "/"]`, and a folder argument
/// yields only its strict ancestors.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut parent = path.to_string();
    while parent != "/" {
        parent = parent_folder(&parent);
        results.push(parent.clone());
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_separators_and_escapes_segments() {
        assert_eq!(encode("/a b/c#d.jpg"), "/a%20b/c%23d.jpg");
        assert_eq!(encode("/plain/path.png"), "/plain/path.png");
    }

    #[test]
    fn decode_reverses_encode() {
        let raw = "/göteborg/100% done/pic 1.jpg";
        assert_eq!(decode(&encode(raw)), raw);
    }

    #[test]
    fn decode_tolerates_malformed_escapes() {
        assert_eq!(decode("/a%2/b%"), "/a%2/b%");
    }

    #[test]
    fn encode_opt_maps_missing_to_none() {
        assert_eq!(encode_opt(None), None);
        assert_eq!(encode_opt(Some("")), None);
        assert_eq!(encode_opt(Some("/a b/")), Some("/a%20b/".to_string()));
    }

    #[test]
    fn parent_of_nested_paths() {
        assert_eq!(parent_folder("/a/b/pic.jpg"), "/a/b/");
        assert_eq!(parent_folder("/a/b/"), "/a/");
        assert_eq!(parent_folder("/a/"), "/");
        assert_eq!(parent_folder("/"), "/");
    }

    #[test]
    fn ancestors_reach_the_root() {
        assert_eq!(ancestors("/a/b/pic.jpg"), vec!["/a/b/", "/a/", "/"]);
        assert_eq!(ancestors("/a/b/"), vec!["/a/", "/"]);
        assert_eq!(ancestors("/"), Vec::<String>::new());
    }

    #[test]
    fn basename_and_stem() {
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(basename("/a/pic.tar.jpg"), "pic.tar.jpg");
        assert_eq!(stem("/a/pic.tar.jpg"), "pic.tar");
        assert_eq!(stem("/a/.hidden"), ".hidden");
    }

    #[test]
    fn join_treats_root_as_empty_prefix() {
        assert_eq!(join("/", "img.jpg"), "img.jpg");
        assert_eq!(join("sub", "pic.png"), "sub/pic.png");
    }
}
