//! Track model and output naming.
//!
//! A `TrackDescriptor` is produced once by the catalog and then only read. The
//! `OutputLayout` is the single place where on-disk names are derived, so the
//! existence check and the final write can never disagree.

mod layout;
mod types;

pub use layout::{
    sanitize_component, sanitize_title, OutputLayout, UNKNOWN_FOLDER, UNTITLED, WORK_DIR_NAME,
};
pub use types::{OutputFormat, ParseEnumError, SortKey, TrackDescriptor, TrackTags};
