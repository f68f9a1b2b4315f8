use std::fmt;
use std::str::FromStr;

use crate::matcher::{MatcherError, RegexMatcher, SelectorMatcher};
use crate::profile::{Pacing, Profile};

/// Comment left by most gallery generators: `<!-- Generated by X -->`.
pub const GENERATED_BY_PATTERN: &str = r"<!--\s*Generated by\s*(.*?)\s*-->";

// Built-in scanners run after any configured profile.
const ANCHOR_HREF_PRIORITY: i64 = 1_000_000;
const LIST_ITEM_PRIORITY: i64 = 1_000_001;

/// Which set of profiles detection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannerType {
    /// Configured profiles, then every built-in scanner.
    #[default]
    AutoDetect,
    /// Configured profiles only.
    ConfigProfiles,
    /// `<a href="...jpg">` links only.
    AnchorHref,
    /// `<li><img src="...jpg"></li>` items only.
    ListItem,
}

impl ScannerType {
    pub const ALL: [ScannerType; 4] = [
        ScannerType::AutoDetect,
        ScannerType::ConfigProfiles,
        ScannerType::AnchorHref,
        ScannerType::ListItem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScannerType::AutoDetect => "AutoDetect",
            ScannerType::ConfigProfiles => "ConfigProfiles",
            ScannerType::AnchorHref => "AnchorHREF",
            ScannerType::ListItem => "ListItem",
        }
    }

    /// Profiles to run for this scanner type, configured ones first.
    pub fn profiles(self, configured: &[Profile]) -> Result<Vec<Profile>, MatcherError> {
        let mut profiles = Vec::new();
        if matches!(self, ScannerType::AutoDetect | ScannerType::ConfigProfiles) {
            profiles.extend_from_slice(configured);
        }
        if matches!(self, ScannerType::AutoDetect | ScannerType::AnchorHref) {
            profiles.push(anchor_href_profile()?);
        }
        if matches!(self, ScannerType::AutoDetect | ScannerType::ListItem) {
            profiles.push(list_item_profile()?);
        }
        Ok(profiles)
    }
}

impl fmt::Display for ScannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gallery type {0:?}")]
pub struct UnknownScannerType(pub String);

impl FromStr for ScannerType {
    type Err = UnknownScannerType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ScannerType::ALL
            .into_iter()
            .find(|scanner| scanner.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownScannerType(value.to_string()))
    }
}

/// Links to JPEG pictures: `<a href="data/images/picture.jpg">`.
pub fn anchor_href_profile() -> Result<Profile, MatcherError> {
    let image = SelectorMatcher::compile(r#"a[href$="jpg" i], a[href$="jpeg" i]"#, "href")?;
    Ok(Profile::new(ScannerType::AnchorHref.name(), ANCHOR_HREF_PRIORITY, image)
        .with_generator(RegexMatcher::compile(GENERATED_BY_PATTERN)?)
        .with_pacing(Pacing::POLITE)
        .as_fallback())
}

/// JPEG pictures shown directly inside list items:
/// `<li><img src="data1/images/picture002.jpg"/></li>`.
pub fn list_item_profile() -> Result<Profile, MatcherError> {
    let image = SelectorMatcher::compile(r#"li > img[src$="jpg" i], li > img[src$="jpeg" i]"#, "src")?;
    Ok(Profile::new(ScannerType::ListItem.name(), LIST_ITEM_PRIORITY, image)
        .with_generator(RegexMatcher::compile(GENERATED_BY_PATTERN)?)
        .with_pacing(Pacing::POLITE)
        .as_fallback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_names_round_trip_case_insensitively() {
        assert_eq!("AnchorHREF".parse::<ScannerType>().unwrap(), ScannerType::AnchorHref);
        assert_eq!("anchorhref".parse::<ScannerType>().unwrap(), ScannerType::AnchorHref);
        assert_eq!("listitem".parse::<ScannerType>().unwrap(), ScannerType::ListItem);
        assert_eq!(
            "Flickr".parse::<ScannerType>().unwrap_err(),
            UnknownScannerType("Flickr".into())
        );
        assert_eq!(ScannerType::default().to_string(), "AutoDetect");
    }

    #[test]
    fn builtin_patterns_compile() {
        anchor_href_profile().unwrap();
        list_item_profile().unwrap();
    }

    #[test]
    fn scanner_type_selects_profile_lists() {
        let configured = vec![Profile::new(
            "Custom",
            10,
            RegexMatcher::compile("x").unwrap(),
        )];
        let names = |scanner: ScannerType| -> Vec<String> {
            scanner
                .profiles(&configured)
                .unwrap()
                .into_iter()
                .map(|p| p.name)
                .collect()
        };
        assert_eq!(names(ScannerType::AutoDetect), vec!["Custom", "AnchorHREF", "ListItem"]);
        assert_eq!(names(ScannerType::ConfigProfiles), vec!["Custom"]);
        assert_eq!(names(ScannerType::AnchorHref), vec!["AnchorHREF"]);
        assert_eq!(names(ScannerType::ListItem), vec!["ListItem"]);
    }
}
