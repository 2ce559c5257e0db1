//! Stamp a date/time parsed from each file name, and optionally a fixed GPS position, into the
//! Exif metadata of PNG and JPEG images.

#![forbid(unsafe_code)]

pub mod batch;
pub mod container;
pub mod error;
pub mod exif;
pub mod jfif;
pub mod parse;
pub mod png;
pub mod stamp;
pub mod timestamp;
pub mod version;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use batch::{process_directory, BatchSummary};
pub use container::ContainerFormat;
pub use error::{Error, Result};
pub use exif::MetadataBlock;
pub use jfif::JPEGFile;
pub use png::PNGFile;
pub use stamp::{stamp_image, StampOptions};
pub use timestamp::{FilenameTimestampParser, TimestampParser};
