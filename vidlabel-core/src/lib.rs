//! Core library for label-and-flush video processing on top of ffmpeg and ffprobe.
//!
//! Operations such as crop, trim, resize, blur, bitrate and frame-rate changes
//! are accumulated on each video as labels and executed later as a single
//! ffmpeg invocation per video, with deterministic output names. Videos can
//! come from a local directory or an object-storage prefix, and results can
//! be uploaded back.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use vidlabel_core::config::CoreConfigBuilder;
//! use vidlabel_core::external::{CrateFfprobeExecutor, SidecarSpawner};
//! use vidlabel_core::processing::{Processor, Resolution};
//! use std::path::Path;
//!
//! let config = CoreConfigBuilder::from_env().build();
//! let mut processor = Processor::new(config, SidecarSpawner, CrateFfprobeExecutor::new());
//!
//! let videos = processor.load_local(Path::new("/path/to/videos")).unwrap();
//! let labeler = processor.labeler();
//! let videos = labeler.crop(videos, 0, 0, 640, 360);
//! let videos = labeler.change_resolution(videos, Resolution::P360);
//! let mut videos = labeler.grayscale(videos);
//! drop(labeler);
//!
//! let outcome = processor.flush(&mut videos, Some(Path::new("/path/to/out"))).unwrap();
//! println!("{}", outcome.describe());
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod media;
pub mod processing;
pub mod storage;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder};
pub use discovery::find_processable_files;
pub use error::{CoreError, CoreResult};
pub use external::check_dependency;
pub use media::{MediaSource, Video, VideoMetadata};
pub use processing::{FlushOutcome, LabelOp, Processor, Resolution};
pub use storage::{FsObjectStore, ObjectStore, StorageError};
#[cfg(feature = "s3")]
pub use storage::S3ObjectStore;
pub use utils::{format_bytes, format_duration};
