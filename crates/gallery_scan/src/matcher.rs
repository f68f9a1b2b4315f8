use std::sync::Arc;

use regex::bytes::{Captures, Regex};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

/// Matcher description as it appears in the configuration file:
/// `{"type": "regex", "match": "...", "attribute": ""}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatcherSpec {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "match", default)]
    pub pattern: String,
    #[serde(default)]
    pub attribute: String,
}

impl MatcherSpec {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            kind: "regex".to_string(),
            pattern: pattern.into(),
            attribute: String::new(),
        }
    }

    pub fn selector(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            kind: "selector".to_string(),
            pattern: selector.into(),
            attribute: attribute.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Regex,
    Selector,
}

impl MatcherKind {
    /// `regex*` selects the pattern matcher, `sel*` and `css*` the structural one.
    pub fn from_type(value: &str) -> Result<Self, MatcherError> {
        let lower = value.trim().to_ascii_lowercase();
        if lower.starts_with("regex") {
            Ok(MatcherKind::Regex)
        } else if lower.starts_with("sel") || lower.starts_with("css") {
            Ok(MatcherKind::Selector)
        } else {
            Err(MatcherError::UnknownType(value.to_string()))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("unknown matcher type {0:?} (expected regex, selector or css)")]
    UnknownType(String),
    #[error("cannot compile regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot parse selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("no source bound to matcher")]
    Unbound,
}

/// Extracts strings from a bound document, either with a regular expression
/// or with a CSS selector plus attribute name.
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex(RegexMatcher),
    Selector(SelectorMatcher),
}

impl Matcher {
    /// Build a matcher from its configuration. An empty pattern means the
    /// matcher is not configured and yields `Ok(None)`.
    pub fn from_spec(spec: &MatcherSpec) -> Result<Option<Self>, MatcherError> {
        if spec.pattern.trim().is_empty() {
            return Ok(None);
        }
        let matcher = match MatcherKind::from_type(&spec.kind)? {
            MatcherKind::Regex => Matcher::Regex(RegexMatcher::compile(&spec.pattern)?),
            MatcherKind::Selector => {
                Matcher::Selector(SelectorMatcher::compile(&spec.pattern, &spec.attribute)?)
            }
        };
        Ok(Some(matcher))
    }

    pub fn kind(&self) -> MatcherKind {
        match self {
            Matcher::Regex(_) => MatcherKind::Regex,
            Matcher::Selector(_) => MatcherKind::Selector,
        }
    }

    pub fn bind_source(&mut self, source: &[u8]) -> Result<(), MatcherError> {
        match self {
            Matcher::Regex(m) => m.bind_source(source),
            Matcher::Selector(m) => m.bind_source(source),
        }
    }

    pub fn find_first(&self) -> Result<Option<String>, MatcherError> {
        match self {
            Matcher::Regex(m) => m.find_first(),
            Matcher::Selector(m) => m.find_first(),
        }
    }

    pub fn find_all(&self) -> Result<Vec<String>, MatcherError> {
        match self {
            Matcher::Regex(m) => m.find_all(),
            Matcher::Selector(m) => m.find_all(),
        }
    }
}

impl From<RegexMatcher> for Matcher {
    fn from(matcher: RegexMatcher) -> Self {
        Matcher::Regex(matcher)
    }
}

impl From<SelectorMatcher> for Matcher {
    fn from(matcher: SelectorMatcher) -> Self {
        Matcher::Selector(matcher)
    }
}

/// Returns the first capture group of each match, or the whole match when the
/// pattern declares no group.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    pattern: Regex,
    source: Option<Arc<[u8]>>,
}

impl RegexMatcher {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            source: None,
        }
    }

    pub fn compile(pattern: &str) -> Result<Self, MatcherError> {
        let compiled = Regex::new(pattern).map_err(|source| MatcherError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::new(compiled))
    }

    pub fn bind_source(&mut self, source: &[u8]) -> Result<(), MatcherError> {
        self.source = Some(Arc::from(source));
        Ok(())
    }

    pub fn find_first(&self) -> Result<Option<String>, MatcherError> {
        let source = self.source()?;
        Ok(self.pattern.captures(source).map(|caps| extract(&caps)))
    }

    pub fn find_all(&self) -> Result<Vec<String>, MatcherError> {
        let source = self.source()?;
        Ok(self
            .pattern
            .captures_iter(source)
            .map(|caps| extract(&caps))
            .collect())
    }

    fn source(&self) -> Result<&[u8], MatcherError> {
        self.source.as_deref().ok_or(MatcherError::Unbound)
    }
}

fn extract(captures: &Captures<'_>) -> String {
    let found = if captures.len() >= 2 {
        captures.get(1)
    } else {
        captures.get(0)
    };
    found
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Returns the `attribute` value of every element matching a CSS selector.
/// With an empty attribute name the element's outer HTML is returned instead.
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    selector: Selector,
    attribute: String,
    source: Option<Arc<str>>,
}

impl SelectorMatcher {
    pub fn new(selector: Selector, attribute: impl Into<String>) -> Self {
        Self {
            selector,
            attribute: attribute.into(),
            source: None,
        }
    }

    pub fn compile(selector: &str, attribute: &str) -> Result<Self, MatcherError> {
        let parsed = Selector::parse(selector).map_err(|err| MatcherError::InvalidSelector {
            selector: selector.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self::new(parsed, attribute.trim()))
    }

    pub fn bind_source(&mut self, source: &[u8]) -> Result<(), MatcherError> {
        // The HTML parser is lenient; anything that is not UTF-8 is replaced
        // rather than rejected.
        let text = String::from_utf8_lossy(source);
        self.source = Some(Arc::from(text.into_owned()));
        Ok(())
    }

    pub fn find_first(&self) -> Result<Option<String>, MatcherError> {
        let document = self.document()?;
        Ok(document
            .select(&self.selector)
            .find_map(|element| self.extract(element)))
    }

    pub fn find_all(&self) -> Result<Vec<String>, MatcherError> {
        let document = self.document()?;
        Ok(document
            .select(&self.selector)
            .filter_map(|element| self.extract(element))
            .collect())
    }

    fn document(&self) -> Result<Html, MatcherError> {
        let source = self.source.as_deref().ok_or(MatcherError::Unbound)?;
        Ok(Html::parse_document(source))
    }

    fn extract(&self, element: ElementRef<'_>) -> Option<String> {
        if self.attribute.is_empty() {
            return Some(element.html());
        }
        element.value().attr(&self.attribute).map(str::to_string)
    }
}
