//! JSON configuration file: browser header groups and detection profiles.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gallery_engine::BrowserHeaders;
use gallery_scan::{Profile, ProfileSpec};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub browser: BrowserHeaders,
    pub profiles: Vec<ProfileSpec>,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid configuration {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compile every profile; the first invalid one aborts with its name.
    pub fn compile_profiles(&self) -> Result<Vec<Profile>> {
        self.profiles
            .iter()
            .map(|spec| Profile::from_spec(spec).map_err(anyhow::Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_engine::HeaderGroup;
    use gallery_scan::Pacing;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "browser": {
            "default": {"headers": {"User-Agent": "Mozilla/5.0", "Accept-Language": "en"}},
            "picture": {"headers": {"Accept": "image/webp,*/*"}}
        },
        "profiles": [
            {
                "priority": 10,
                "name": "WOWSlider",
                "detectGenerator": {"type": "regexp", "match": "<!--\\s*Generated by (WOWSlider[^-]*?)\\s*-->"},
                "detectGallery": {"type": "css", "match": "div#wowslider-container1", "attribute": "id"},
                "detectImage": {"type": "regexp", "match": "<a href=\"([^\"]+\\.jpg)\""},
                "minWait": 500,
                "maxWait": 1500
            },
            {
                "priority": 20,
                "name": "Fast CDN",
                "detectImage": {"type": "selector", "match": "img.full", "attribute": "src"},
                "parallel": 6
            }
        ]
    }"#;

    #[test]
    fn sample_configuration_loads() {
        let config = Configuration::parse(SAMPLE).unwrap();
        assert_eq!(
            config.browser.picture,
            HeaderGroup::from_pairs([("Accept", "image/webp,*/*")])
        );
        assert_eq!(config.browser.html, HeaderGroup::default());

        let profiles = config.compile_profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "WOWSlider");
        assert_eq!(
            profiles[0].pacing,
            Pacing {
                min_wait_ms: 500,
                max_wait_ms: 1500,
                parallelism: 1
            }
        );
        assert_eq!(profiles[1].pacing, Pacing::parallel(6));
    }

    #[test]
    fn empty_document_is_an_empty_configuration() {
        assert_eq!(Configuration::parse("{}").unwrap(), Configuration::default());
    }

    #[test]
    fn invalid_profile_names_the_culprit() {
        let config = Configuration::parse(
            r#"{"profiles": [{"name": "Broken", "detectImage": {"type": "regexp", "match": "(unclosed"}}]}"#,
        )
        .unwrap();
        let err = config.compile_profiles().unwrap_err();
        assert!(format!("{err:#}").contains("Broken"), "{err:#}");
    }

    #[test]
    fn missing_image_matcher_is_rejected() {
        let config = Configuration::parse(r#"{"profiles": [{"name": "NoImages", "priority": 1}]}"#)
            .unwrap();
        assert!(config.compile_profiles().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read configuration"));
    }
}
