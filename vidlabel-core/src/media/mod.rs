//! Video entities and their probed metadata.
//!
//! `Video` carries identity, a write-once metadata cache and the labels
//! accumulated since the last flush. `MediaContext` bundles the collaborators
//! needed to read a video's metadata.

pub mod context;
pub mod metadata;
pub mod video;

pub use context::MediaContext;
pub use metadata::VideoMetadata;
pub use video::{
    FilterFragment, FlagFragment, MediaSource, NameFragment, Operation, PendingLabels, Video,
};
