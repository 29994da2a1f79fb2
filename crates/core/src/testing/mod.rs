//! Testing utilities and mock implementations of every collaborator trait.
//!
//! The mocks run the whole pipeline against a temporary directory without
//! network access or external tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use steep_core::testing::{fixtures, MockCatalog, MockFetcher, MockSearch};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_tracks(fixtures::sample_tracks(3)).await;
//!
//! let fetcher = MockFetcher::new();
//! fetcher.fail_locator("https://source.test/1").await;
//! ```

mod mock_catalog;
mod mock_fetcher;
mod mock_normalizer;
mod mock_search;
mod mock_tag_writer;

pub use mock_catalog::{MockCatalog, MockGenreLookup};
pub use mock_fetcher::MockFetcher;
pub use mock_normalizer::MockNormalizer;
pub use mock_search::MockSearch;
pub use mock_tag_writer::{MockTagWriter, RecordedTagWrite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::searcher::SourceCandidate;
    use crate::track::TrackDescriptor;

    /// A well-formed playlist reference.
    pub const PLAYLIST_REF: &str = "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M";

    /// Create a track with an album named after the artist.
    pub fn track(title: &str, artist: &str) -> TrackDescriptor {
        TrackDescriptor::new(title, artist, format!("{} Greatest Hits", artist))
    }

    /// `count` distinct tracks.
    pub fn sample_tracks(count: usize) -> Vec<TrackDescriptor> {
        (1..=count)
            .map(|i| track(&format!("Track {}", i), &format!("Artist {}", i)))
            .collect()
    }

    /// Locator the mock search hands out for `track` when configured with
    /// [`candidate_for`].
    pub fn locator_for(track: &TrackDescriptor) -> String {
        format!(
            "https://source.test/{}",
            track.search_query().replace(' ', "+")
        )
    }

    /// Single-candidate search result for `track`.
    pub fn candidate_for(track: &TrackDescriptor) -> Vec<SourceCandidate> {
        vec![SourceCandidate::new(locator_for(track))]
    }
}
