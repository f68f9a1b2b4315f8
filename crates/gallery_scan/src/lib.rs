//! Gallery scanning: pure detection of picture references inside an HTML page.
mod builtin;
mod detect;
mod matcher;
mod profile;

pub use builtin::{
    anchor_href_profile, list_item_profile, ScannerType, UnknownScannerType,
    GENERATED_BY_PATTERN,
};
pub use detect::{detect, DetectError, DetectionResult, MIN_PLAUSIBLE_IMAGES};
pub use matcher::{
    Matcher, MatcherError, MatcherKind, MatcherSpec, RegexMatcher, SelectorMatcher,
};
pub use profile::{Pacing, Profile, ProfileError, ProfileScan, ProfileSpec};
