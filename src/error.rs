#[cfg(feature = "tensorflow")]
use tensorflow::Status;
use image::ImageError;
use thiserror::Error;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug, Error)]
pub enum LprErrorKind {
    #[error("could not load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("could not read image from {}: {source}", path.display())]
    ImageRead { path: PathBuf, #[source] source: ImageError },
    #[error("could not write image to {}: {source}", path.display())]
    ImageWrite { path: PathBuf, #[source] source: ImageError },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error(transparent)]
    IOError(#[from] IOError),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn model_load(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self(LprErrorKind::ModelLoad { path: path.as_ref().to_path_buf(), reason: reason.to_string() })
    }

    pub fn image_read(path: impl AsRef<Path>, source: ImageError) -> Self {
        Self(LprErrorKind::ImageRead { path: path.as_ref().to_path_buf(), source })
    }

    pub fn image_write(path: impl AsRef<Path>, source: ImageError) -> Self {
        Self(LprErrorKind::ImageWrite { path: path.as_ref().to_path_buf(), source })
    }

    /// File a ModelLoad error is about.
    pub fn model_path(&self) -> Option<&Path> {
        match &self.0 {
            LprErrorKind::ModelLoad { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn is_model_load(&self) -> bool {
        matches!(self.0, LprErrorKind::ModelLoad { .. })
    }

    pub fn is_image_read(&self) -> bool {
        matches!(self.0, LprErrorKind::ImageRead { .. })
    }
}

impl<T> From<T> for LprError
where T: Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.kind(), f)
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.kind().source()
    }
}

// graph import failures are mapped to ModelLoad at the call site, so a bare
// Status only ever comes from a session run
#[cfg(feature = "tensorflow")]
impl From<Status> for LprErrorKind {
    fn from(e: Status) -> Self {
        Self::Inference(e.to_string())
    }
}
