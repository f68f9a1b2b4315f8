//! Browser-like request headers, assembled per request from configured groups.
use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, REFERER};
use serde::Deserialize;
use url::Url;

/// A named set of header values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeaderGroup {
    pub headers: BTreeMap<String, String>,
}

impl HeaderGroup {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            headers: pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }
}

/// Header groups from the `browser` section of the configuration.
///
/// `http2` is accepted for configuration compatibility but never applied;
/// protocol negotiation is left to the HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrowserHeaders {
    pub default: HeaderGroup,
    pub http: HeaderGroup,
    pub https: HeaderGroup,
    pub http2: HeaderGroup,
    pub html: HeaderGroup,
    pub picture: HeaderGroup,
}

/// What a request is fetching; selects the role header group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Html,
    Picture,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid header name {0:?}")]
    InvalidName(String),
    #[error("invalid value for header {0:?}")]
    InvalidValue(String),
}

/// Validated header groups plus the per-run referer and credentials.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    default: HeaderMap,
    http: HeaderMap,
    https: HeaderMap,
    html: HeaderMap,
    picture: HeaderMap,
    referer: Option<HeaderValue>,
    authorization: Option<HeaderValue>,
}

impl RequestHeaders {
    /// Basic authentication is only sent when both `user` and `password`
    /// are non-empty.
    pub fn new(
        browser: &BrowserHeaders,
        referer: Option<&str>,
        user: &str,
        password: &str,
    ) -> Result<Self, HeaderError> {
        let referer = referer
            .filter(|referer| !referer.is_empty())
            .map(|referer| header_value(REFERER.as_str(), referer))
            .transpose()?;
        let authorization = if !user.is_empty() && !password.is_empty() {
            let token = STANDARD.encode(format!("{user}:{password}"));
            let mut value = header_value(AUTHORIZATION.as_str(), &format!("Basic {token}"))?;
            value.set_sensitive(true);
            Some(value)
        } else {
            None
        };
        Ok(Self {
            default: compile(&browser.default)?,
            http: compile(&browser.http)?,
            https: compile(&browser.https)?,
            html: compile(&browser.html)?,
            picture: compile(&browser.picture)?,
            referer,
            authorization,
        })
    }

    /// Headers for one request. Later layers override earlier ones with the
    /// same name: default, then scheme, then role, then referer, then
    /// authorization.
    pub fn for_request(&self, url: &Url, role: Role) -> HeaderMap {
        let mut merged = self.default.clone();
        let scheme = match url.scheme() {
            "http" => Some(&self.http),
            "https" => Some(&self.https),
            _ => None,
        };
        if let Some(scheme) = scheme {
            overlay(&mut merged, scheme);
        }
        overlay(
            &mut merged,
            match role {
                Role::Html => &self.html,
                Role::Picture => &self.picture,
            },
        );
        if let Some(referer) = &self.referer {
            merged.insert(REFERER, referer.clone());
        }
        if let Some(authorization) = &self.authorization {
            merged.insert(AUTHORIZATION, authorization.clone());
        }
        merged
    }
}

fn compile(group: &HeaderGroup) -> Result<HeaderMap, HeaderError> {
    let mut map = HeaderMap::with_capacity(group.headers.len());
    for (name, value) in &group.headers {
        let header = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| HeaderError::InvalidName(name.clone()))?;
        map.insert(header, header_value(name, value)?);
    }
    Ok(map)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HeaderError> {
    HeaderValue::from_str(value).map_err(|_| HeaderError::InvalidValue(name.to_string()))
}

fn overlay(target: &mut HeaderMap, layer: &HeaderMap) {
    for (name, value) in layer {
        target.insert(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn browser() -> BrowserHeaders {
        BrowserHeaders {
            default: HeaderGroup::from_pairs([
                ("User-Agent", "Mozilla/5.0"),
                ("Accept", "*/*"),
                ("Accept-Language", "en"),
            ]),
            http: HeaderGroup::from_pairs([("Upgrade-Insecure-Requests", "1")]),
            https: HeaderGroup::from_pairs([("Accept-Language", "en-GB")]),
            html: HeaderGroup::from_pairs([("Accept", "text/html")]),
            picture: HeaderGroup::from_pairs([("Accept", "image/webp,*/*"), ("Referer", "http://x/")]),
            ..BrowserHeaders::default()
        }
    }

    fn get<'a>(map: &'a HeaderMap, name: &str) -> Option<&'a str> {
        map.get(name).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn layers_override_in_order() {
        let headers = RequestHeaders::new(&browser(), None, "", "").unwrap();
        let url = Url::parse("https://gallery.test/a.jpg").unwrap();

        let picture = headers.for_request(&url, Role::Picture);
        assert_eq!(get(&picture, "user-agent"), Some("Mozilla/5.0"));
        assert_eq!(get(&picture, "accept-language"), Some("en-GB"));
        assert_eq!(get(&picture, "accept"), Some("image/webp,*/*"));
        assert_eq!(get(&picture, "upgrade-insecure-requests"), None);

        let html = headers.for_request(&url, Role::Html);
        assert_eq!(get(&html, "accept"), Some("text/html"));
    }

    #[test]
    fn scheme_group_follows_url() {
        let headers = RequestHeaders::new(&browser(), None, "", "").unwrap();
        let url = Url::parse("http://gallery.test/a.jpg").unwrap();
        let merged = headers.for_request(&url, Role::Html);
        assert_eq!(get(&merged, "upgrade-insecure-requests"), Some("1"));
        assert_eq!(get(&merged, "accept-language"), Some("en"));
    }

    #[test]
    fn referer_overrides_configured_value() {
        let headers =
            RequestHeaders::new(&browser(), Some("http://gallery.test/index.html"), "", "")
                .unwrap();
        let url = Url::parse("http://gallery.test/a.jpg").unwrap();
        let merged = headers.for_request(&url, Role::Picture);
        assert_eq!(get(&merged, "referer"), Some("http://gallery.test/index.html"));
    }

    #[test]
    fn basic_auth_needs_user_and_password() {
        let url = Url::parse("http://gallery.test/a.jpg").unwrap();

        let headers = RequestHeaders::new(&browser(), None, "alice", "secret").unwrap();
        let merged = headers.for_request(&url, Role::Picture);
        assert_eq!(get(&merged, "authorization"), Some("Basic YWxpY2U6c2VjcmV0"));

        let headers = RequestHeaders::new(&browser(), None, "alice", "").unwrap();
        assert!(headers.for_request(&url, Role::Picture).get(AUTHORIZATION).is_none());
        let headers = RequestHeaders::new(&browser(), None, "", "secret").unwrap();
        assert!(headers.for_request(&url, Role::Picture).get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let mut config = BrowserHeaders::default();
        config.default = HeaderGroup::from_pairs([("Bad Name", "x")]);
        assert_eq!(
            RequestHeaders::new(&config, None, "", "").unwrap_err(),
            HeaderError::InvalidName("Bad Name".into())
        );

        let mut config = BrowserHeaders::default();
        config.html = HeaderGroup::from_pairs([("Accept", "line\nbreak")]);
        assert_eq!(
            RequestHeaders::new(&config, None, "", "").unwrap_err(),
            HeaderError::InvalidValue("Accept".into())
        );
    }

    #[test]
    fn browser_section_deserializes() {
        let json = r#"{
            "default": {"headers": {"User-Agent": "Test/1.0"}},
            "picture": {"headers": {"Accept": "image/*"}}
        }"#;
        let parsed: BrowserHeaders = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.default, HeaderGroup::from_pairs([("User-Agent", "Test/1.0")]));
        assert_eq!(parsed.picture, HeaderGroup::from_pairs([("Accept", "image/*")]));
        assert_eq!(parsed.https, HeaderGroup::default());
    }
}
