use gallery_logging::{gallery_debug, gallery_info};

use crate::matcher::MatcherError;
use crate::profile::Profile;

/// A profile must find more pictures than this to be trusted.
pub const MIN_PLAUSIBLE_IMAGES: usize = 3;

#[derive(Debug, Clone)]
pub struct DetectionResult<'p> {
    pub profile: &'p Profile,
    pub generator: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("profile {profile:?}: {source}")]
pub struct DetectError {
    pub profile: String,
    #[source]
    pub source: MatcherError,
}

/// Try `profiles` in ascending priority order and return the first one that
/// recognises `document` and lists more than [`MIN_PLAUSIBLE_IMAGES`] pictures.
///
/// Profiles sharing a priority are tried in input order, but once a priority
/// has been tried the scan moves strictly above it, so only the first profile
/// of a priority ever runs. When no profile is convincing, the pictures of the
/// last fallback profile tried are returned whatever their number. `Ok(None)`
/// means nothing was found.
pub fn detect<'p>(
    document: &[u8],
    profiles: &'p [Profile],
) -> Result<Option<DetectionResult<'p>>, DetectError> {
    let mut candidates: Vec<&Profile> = profiles.iter().collect();
    // stable: equal priorities keep input order
    candidates.sort_by_key(|profile| profile.priority);

    let mut floor: Option<i64> = None;
    let mut fallback: Option<DetectionResult<'p>> = None;
    for profile in candidates {
        if floor.is_some_and(|floor| profile.priority <= floor) {
            continue;
        }
        floor = Some(profile.priority);

        gallery_debug!("detect profile {:?} (priority {})", profile.name, profile.priority);
        let Some(result) = try_profile(profile, document).map_err(|source| DetectError {
            profile: profile.name.clone(),
            source,
        })?
        else {
            continue;
        };
        if result.images.len() > MIN_PLAUSIBLE_IMAGES {
            gallery_info!(
                "profile {:?} found {} pictures",
                profile.name,
                result.images.len()
            );
            return Ok(Some(result));
        }
        gallery_debug!(
            "profile {:?}: only {} pictures, trying next",
            profile.name,
            result.images.len()
        );
        if profile.fallback {
            fallback = Some(result);
        }
    }

    match fallback {
        Some(result) if !result.images.is_empty() => {
            gallery_info!(
                "keeping {} pictures found by {:?}",
                result.images.len(),
                result.profile.name
            );
            Ok(Some(result))
        }
        _ => {
            gallery_debug!("no profile found more than {} pictures", MIN_PLAUSIBLE_IMAGES);
            Ok(None)
        }
    }
}

/// Run one recognised profile; `None` when its gallery matcher does not fire.
fn try_profile<'p>(
    profile: &'p Profile,
    document: &[u8],
) -> Result<Option<DetectionResult<'p>>, MatcherError> {
    let scan = profile.scan(document)?;
    if !scan.is_match()? {
        gallery_debug!("profile {:?}: gallery not recognised", profile.name);
        return Ok(None);
    }
    Ok(Some(DetectionResult {
        profile,
        images: scan.images()?,
        generator: scan.generated_by()?,
    }))
}
