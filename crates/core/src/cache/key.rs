use serde::{Deserialize, Serialize};
use std::fmt;

use crate::track::TrackDescriptor;

/// Fixed marker mixed into every key, matching the `audio` suffix of the
/// search query.
pub const QUERY_MARKER: &str = "audio";

/// Stable cache key for a track query.
///
/// MD5 hex digest of the lowercase, whitespace-collapsed `artist title audio`
/// string. The same pair always yields the same key across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for an artist/title pair.
    pub fn from_parts(artist: &str, title: &str) -> Self {
        let normalized = format!(
            "{} {} {}",
            normalize(artist),
            normalize(title),
            QUERY_MARKER
        );
        Self(format!("{:x}", md5::compute(normalized.as_bytes())))
    }

    /// Derives the key for a track.
    pub fn for_track(track: &TrackDescriptor) -> Self {
        Self::from_parts(&track.artist, &track.title)
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable() {
        // Fixed digest: changing it invalidates every existing cache file.
        let key = CacheKey::from_parts("Daft Punk", "Digital Love");
        assert_eq!(key.as_str(), "b2b1491dfd77a2f4da996bf0ffc4ed51");
        assert_eq!(key.as_str().len(), 32);
    }

    #[test]
    fn test_key_ignores_case_and_spacing() {
        let a = CacheKey::from_parts("Daft Punk", "Digital Love");
        let b = CacheKey::from_parts("  DAFT   punk ", "digital\tlove");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_tracks() {
        let a = CacheKey::from_parts("Daft Punk", "Digital Love");
        let b = CacheKey::from_parts("Daft Punk", "One More Time");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_for_track() {
        let track = TrackDescriptor::new("Digital Love", "Daft Punk", "Discovery");
        assert_eq!(
            CacheKey::for_track(&track),
            CacheKey::from_parts("Daft Punk", "Digital Love")
        );
    }
}
