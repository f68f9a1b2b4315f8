use serde::Deserialize;

use crate::matcher::{Matcher, MatcherError, MatcherSpec};

/// Profile entry of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSpec {
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detect_generator: Option<MatcherSpec>,
    #[serde(default)]
    pub detect_gallery: Option<MatcherSpec>,
    #[serde(default)]
    pub detect_image: Option<MatcherSpec>,
    #[serde(default)]
    pub min_wait: u64,
    #[serde(default)]
    pub max_wait: u64,
    #[serde(default)]
    pub parallel: usize,
}

/// Retrieval hints carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    pub parallelism: usize,
}

impl Pacing {
    /// One request at a time, waiting between one and three seconds.
    pub const POLITE: Pacing = Pacing {
        min_wait_ms: 1000,
        max_wait_ms: 3000,
        parallelism: 1,
    };

    pub fn parallel(workers: usize) -> Self {
        Self {
            min_wait_ms: 0,
            max_wait_ms: 0,
            parallelism: workers.max(1),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::POLITE
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile {profile:?} has no image matcher (detectImage)")]
    MissingImageMatcher { profile: String },
    #[error("profile {profile:?}, {field}: {source}")]
    Matcher {
        profile: String,
        field: &'static str,
        #[source]
        source: MatcherError,
    },
}

/// Named, prioritised set of matchers used to recognise a gallery and list
/// its pictures.
#[derive(Debug, Clone)]
pub struct Profile {
    pub priority: i64,
    pub name: String,
    pub generator: Option<Matcher>,
    pub gallery: Option<Matcher>,
    pub image: Matcher,
    pub pacing: Pacing,
    /// When set, this profile's pictures are kept even below the plausibility
    /// threshold if nothing else convinces.
    pub fallback: bool,
}

impl Profile {
    pub fn new(name: impl Into<String>, priority: i64, image: impl Into<Matcher>) -> Self {
        Self {
            priority,
            name: name.into(),
            generator: None,
            gallery: None,
            image: image.into(),
            pacing: Pacing::default(),
            fallback: false,
        }
    }

    pub fn with_generator(mut self, matcher: impl Into<Matcher>) -> Self {
        self.generator = Some(matcher.into());
        self
    }

    pub fn with_gallery(mut self, matcher: impl Into<Matcher>) -> Self {
        self.gallery = Some(matcher.into());
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Compile a configured profile. Every matcher is validated here so a
    /// broken pattern is reported at load time.
    pub fn from_spec(spec: &ProfileSpec) -> Result<Self, ProfileError> {
        let compile = |field: &'static str, matcher: &Option<MatcherSpec>| {
            matcher
                .as_ref()
                .map(Matcher::from_spec)
                .transpose()
                .map(Option::flatten)
                .map_err(|source| ProfileError::Matcher {
                    profile: spec.name.clone(),
                    field,
                    source,
                })
        };

        let generator = compile("detectGenerator", &spec.detect_generator)?;
        let gallery = compile("detectGallery", &spec.detect_gallery)?;
        let image = compile("detectImage", &spec.detect_image)?.ok_or_else(|| {
            ProfileError::MissingImageMatcher {
                profile: spec.name.clone(),
            }
        })?;

        Ok(Self {
            priority: spec.priority,
            name: spec.name.clone(),
            generator,
            gallery,
            image,
            // a maximum at or below the minimum means no wait
            pacing: Pacing {
                min_wait_ms: spec.min_wait,
                max_wait_ms: spec.max_wait.max(spec.min_wait),
                parallelism: spec.parallel.max(1),
            },
            fallback: false,
        })
    }

    /// Bind a copy of this profile's matchers to `document`.
    pub fn scan(&self, document: &[u8]) -> Result<ProfileScan<'_>, MatcherError> {
        let bind = |matcher: &Matcher| -> Result<Matcher, MatcherError> {
            let mut bound = matcher.clone();
            bound.bind_source(document)?;
            Ok(bound)
        };
        Ok(ProfileScan {
            profile: self,
            generator: self.generator.as_ref().map(bind).transpose()?,
            gallery: self.gallery.as_ref().map(bind).transpose()?,
            image: bind(&self.image)?,
        })
    }
}

/// A profile's matchers bound to one document.
#[derive(Debug)]
pub struct ProfileScan<'p> {
    profile: &'p Profile,
    generator: Option<Matcher>,
    gallery: Option<Matcher>,
    image: Matcher,
}

impl<'p> ProfileScan<'p> {
    pub fn profile(&self) -> &'p Profile {
        self.profile
    }

    /// Whether the profile can positively recognise its gallery type.
    pub fn has_detection(&self) -> bool {
        self.gallery.is_some()
    }

    /// True when the gallery matcher finds something, or when there is no
    /// gallery matcher at all.
    pub fn is_match(&self) -> Result<bool, MatcherError> {
        match &self.gallery {
            Some(gallery) => Ok(gallery
                .find_first()?
                .is_some_and(|found| !found.is_empty())),
            None => Ok(true),
        }
    }

    /// Name of the software that generated the gallery, if recognisable.
    pub fn generated_by(&self) -> Result<Option<String>, MatcherError> {
        match &self.generator {
            Some(generator) => Ok(generator.find_first()?.filter(|name| !name.is_empty())),
            None => Ok(None),
        }
    }

    pub fn images(&self) -> Result<Vec<String>, MatcherError> {
        self.image.find_all()
    }
}
