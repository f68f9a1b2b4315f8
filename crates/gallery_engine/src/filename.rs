use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::resolve::ResolveError;

/// File name a picture is saved under: the last non-empty path segment,
/// percent-decoded, with characters no file system accepts replaced by `_`.
pub fn picture_file_name(url: &Url) -> Result<String, ResolveError> {
    let path = url.path();
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let mut name: String = decoded
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    if name.trim_matches('.').is_empty() {
        return Err(ResolveError::NoFileName(path.to_string()));
    }
    if is_reserved_windows_name(&name) {
        name.insert(0, '_');
    }
    Ok(name)
}

/// First path that does not exist yet: `path` itself, then `stem(1).ext`,
/// `stem(2).ext`, and so on.
pub fn unique_name(path: &Path) -> PathBuf {
    unique_name_with(path, |candidate| candidate.exists())
}

/// Like [`unique_name`], but `taken` decides which candidates are in use.
pub fn unique_name_with(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut counter = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}({counter}){extension}"));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn name_is_last_path_segment() {
        assert_eq!(picture_file_name(&url("http://h/a/b/pic.jpg")).unwrap(), "pic.jpg");
        assert_eq!(picture_file_name(&url("http://h/a/pic.jpg?w=200")).unwrap(), "pic.jpg");
        assert_eq!(picture_file_name(&url("http://h/a/my%20pic.jpg")).unwrap(), "my pic.jpg");
        assert_eq!(picture_file_name(&url("http://h/a/dir/")).unwrap(), "dir");
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(picture_file_name(&url("http://h/a%2Fb.jpg")).unwrap(), "a_b.jpg");
        assert_eq!(picture_file_name(&url("http://h/x%3Ay.jpg")).unwrap(), "x_y.jpg");
        assert_eq!(picture_file_name(&url("http://h/con.jpg")).unwrap(), "_con.jpg");
    }

    #[test]
    fn empty_path_has_no_name() {
        assert_eq!(
            picture_file_name(&url("http://h/")).unwrap_err(),
            ResolveError::NoFileName("/".into())
        );
        assert!(picture_file_name(&url("http://h")).is_err());
    }

    #[test]
    fn unique_name_counts_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pic.jpg");
        assert_eq!(unique_name(&target), target);

        fs::write(&target, b"x").unwrap();
        assert_eq!(unique_name(&target), dir.path().join("pic(1).jpg"));

        fs::write(dir.path().join("pic(1).jpg"), b"x").unwrap();
        assert_eq!(unique_name(&target), dir.path().join("pic(2).jpg"));
    }

    #[test]
    fn unique_name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("README");
        fs::write(&target, b"x").unwrap();
        assert_eq!(unique_name(&target), dir.path().join("README(1)"));
    }

    #[test]
    fn reserved_names_are_skipped() {
        let reserved: HashSet<PathBuf> = ["a.jpg", "a(1).jpg"].iter().map(PathBuf::from).collect();
        let name = unique_name_with(Path::new("a.jpg"), |p| reserved.contains(p));
        assert_eq!(name, PathBuf::from("a(2).jpg"));
    }
}
