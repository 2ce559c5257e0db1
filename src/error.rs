use std::path::{Path, PathBuf};

/// Every failure that can abort a stamping run. None of them are recovered from: the first error
/// stops the batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("unable to parse a date/time from {0:?}")]
    Timestamp(String),
    #[error("{} is not a readable image: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("malformed image metadata: {0}")]
    Metadata(String),
    #[error("unable to encode image: {0}")]
    Encode(String),
    #[error("coordinate ({latitude}, {longitude}) is outside of latitude (-90, 90) / longitude (-180, 180)")]
    CoordinateRange { latitude: f64, longitude: f64 },
    #[error("unable to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
    #[error("there was an i/o error {0} at {}", .1.display())]
    Io(std::io::Error, Box<Path>),
    #[error("error from the image crate: {0}")]
    Image(#[from] image::ImageError),
    #[error("serde error {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Attach the path of the file being read to a codec-level error, turning it into the
    /// `Decode` error reported to the user.
    pub(crate) fn decoding(self, path: &Path) -> Self {
        match self {
            Error::Metadata(reason) | Error::Encode(reason) => Error::Decode {
                path: path.to_path_buf(),
                reason,
            },
            Error::Image(e) => Error::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            e => e,
        }
    }

    /// Same as [`Error::decoding`], for failures while producing the new file contents.
    pub(crate) fn writing(self, path: &Path) -> Self {
        match self {
            Error::Metadata(reason) | Error::Encode(reason) => Error::Write {
                path: path.to_path_buf(),
                reason,
            },
            Error::Image(e) => Error::Write {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            e => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::Error;
    use std::path::Path;

    #[test]
    fn test_codec_errors_pick_up_the_path() {
        let path = Path::new("photos/IMG_1.jpg");

        match Error::Metadata("bad IFD".into()).decoding(path) {
            Error::Decode { path: p, reason } => {
                assert_eq!(p, path);
                assert_eq!(reason, "bad IFD");
            }
            other => panic!("unexpected {:?}", other),
        }

        match Error::Encode("too large".into()).writing(path) {
            Error::Write { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected {:?}", other),
        }

        // Errors that already say what went wrong are left alone
        match Error::Timestamp("IMG_final".into()).decoding(path) {
            Error::Timestamp(name) => assert_eq!(name, "IMG_final"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
