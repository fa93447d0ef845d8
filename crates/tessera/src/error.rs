use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::geom;

/// Result type for tessera operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    #[error("invalid argument: {0}")]
    /// A dead handle, a structural violation, or an unusable parameter.
    /// Rejected before any mutation.
    InvalidArgument(String),

    #[error("invalid area: {w}x{h}")]
    /// A window or node with a zero dimension.
    InvalidArea {
        /// Requested width.
        w: u32,
        /// Requested height.
        h: u32,
    },

    #[error("resource failure: {0}")]
    /// The native layer could not allocate a window or surface.
    ResourceFailure(String),

    #[error("not found: {0}")]
    /// A node or window that is not where the caller said it was.
    NotFound(String),

    #[error("config: {0}")]
    /// Configuration could not be parsed.
    Config(String),

    #[error("backend: {0}")]
    /// Any other native-layer failure.
    Backend(String),

    #[error("io: {0}")]
    /// Writing diagnostic output failed.
    Io(String),
}

impl From<geom::Error> for Error {
    fn from(e: geom::Error) -> Self {
        match e {
            geom::Error::Empty { w, h } => Self::InvalidArea { w, h },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
