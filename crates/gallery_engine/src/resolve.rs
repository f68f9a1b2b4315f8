use url::{ParseError, Url};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid picture URL {reference:?}: {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: ParseError,
    },
    #[error("cannot load picture {0:?}: its URL is relative and no base URL was given")]
    MissingBase(String),
    #[error("cannot determine picture name from path '{0}'")]
    NoFileName(String),
}

/// Resolve `reference` against `base`. Absolute references are returned
/// unchanged; relative ones need a base. A scheme-relative `//host/path`
/// takes the base scheme and its own host.
pub fn resolve(base: Option<&Url>, reference: &str) -> Result<Url, ResolveError> {
    let reference = reference.trim();
    let invalid = |source: ParseError| ResolveError::InvalidReference {
        reference: reference.to_string(),
        source,
    };
    match Url::parse(reference) {
        Ok(absolute) => Ok(absolute),
        Err(ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) if reference.starts_with("//") => base.join(reference).map_err(invalid),
            Some(base) => Ok(join_url(base, reference)),
            None => Err(ResolveError::MissingBase(reference.to_string())),
        },
        Err(source) => Err(invalid(source)),
    }
}

/// Join a relative reference onto `base`, keeping the base scheme and host.
///
/// - `/dir/file` replaces the base path entirely;
/// - against `/base/index` the reference lands next to `index`;
/// - against `/base/` it lands inside `base`.
///
/// Query and fragment of either side are dropped.
pub fn join_url(base: &Url, reference: &str) -> Url {
    let reference_path = strip_query_and_fragment(reference);
    let base_path = base.path();

    let path = if reference_path.starts_with('/') {
        clean_path(reference_path)
    } else if !base_path.ends_with('/') {
        clean_path(&format!("{}/{}", parent_dir(base_path), reference_path))
    } else {
        clean_path(&format!("{base_path}/{reference_path}"))
    };

    let mut joined = base.clone();
    joined.set_path(&path);
    joined.set_query(None);
    joined.set_fragment(None);
    let _ = joined.set_username("");
    let _ = joined.set_password(None);
    joined
}

fn strip_query_and_fragment(reference: &str) -> &str {
    match reference.find(['?', '#']) {
        Some(index) => &reference[..index],
        None => reference,
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &path[..index],
    }
}

/// Lexical cleanup of a rooted path: collapses `//`, drops `.`, applies `..`
/// and removes any trailing slash.
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(value: &str) -> Url {
        Url::parse(value).unwrap()
    }

    #[test]
    fn joins_follow_directory_rules() {
        let cases = [
            ("http://localhost", "dir/file", "http://localhost/dir/file"),
            ("http://localhost/", "file", "http://localhost/file"),
            ("http://localhost/base", "file", "http://localhost/file"),
            ("http://localhost/base/", "file", "http://localhost/base/file"),
            ("http://localhost/base", "/file", "http://localhost/file"),
            ("http://localhost/base/", "/dir/file", "http://localhost/dir/file"),
            ("http://localhost/base/index", "/dir/file", "http://localhost/dir/file"),
            ("http://localhost/base/index", "dir/file", "http://localhost/base/dir/file"),
            ("http://h/base/index", "dir/file", "http://h/base/dir/file"),
            ("http://h/base/", "/dir/file", "http://h/dir/file"),
            ("http://h/base", "/file", "http://h/file"),
        ];
        for (index, (base, reference, expected)) in cases.iter().enumerate() {
            let joined = join_url(&url(base), reference);
            assert_eq!(
                joined.as_str(),
                *expected,
                "case {}: joining {base:?} with {reference:?}",
                index + 1
            );
        }
    }

    #[test]
    fn join_keeps_port_and_drops_query() {
        let joined = join_url(&url("https://user:pw@h:8443/a/page.html?x=1#top"), "img/p.jpg?size=big");
        assert_eq!(joined.as_str(), "https://h:8443/a/img/p.jpg");
    }

    #[test]
    fn join_normalises_dot_segments() {
        let joined = join_url(&url("http://h/a/b/index.html"), "../images/./p.jpg");
        assert_eq!(joined.as_str(), "http://h/a/images/p.jpg");
        let joined = join_url(&url("http://h/a/"), "../../../p.jpg");
        assert_eq!(joined.as_str(), "http://h/p.jpg");
    }

    #[test]
    fn absolute_references_are_untouched() {
        let base = url("http://h/base/");
        let resolved = resolve(Some(&base), "https://cdn.example.com/x/y.jpg?v=2").unwrap();
        assert_eq!(resolved.as_str(), "https://cdn.example.com/x/y.jpg?v=2");
        let resolved = resolve(None, "http://other/p.jpg").unwrap();
        assert_eq!(resolved.as_str(), "http://other/p.jpg");
    }

    #[test]
    fn scheme_relative_references_keep_their_host() {
        let cases = [
            ("http://h/base/index", "//cdn.example.com/x.jpg", "http://cdn.example.com/x.jpg"),
            ("https://h/", "//cdn.example.com:8080/a/../b.jpg", "https://cdn.example.com:8080/b.jpg"),
        ];
        for (base, reference, expected) in cases {
            let resolved = resolve(Some(&url(base)), reference).unwrap();
            assert_eq!(resolved.as_str(), expected, "resolving {reference:?} against {base:?}");
        }
        assert_eq!(
            resolve(None, "//cdn.example.com/x.jpg").unwrap_err(),
            ResolveError::MissingBase("//cdn.example.com/x.jpg".into())
        );
    }

    #[test]
    fn relative_reference_without_base_is_an_error() {
        assert_eq!(
            resolve(None, "data/p.jpg").unwrap_err(),
            ResolveError::MissingBase("data/p.jpg".into())
        );
    }

    #[test]
    fn unparsable_reference_is_an_error() {
        let err = resolve(Some(&url("http://h/")), "http://[::1").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidReference { .. }));
    }
}
