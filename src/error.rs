//! Error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no compute device available: {0}")]
    DeviceUnavailable(String),

    #[error("kernel failed: {0}")]
    KernelError(String),

    #[error("video encoding failed ({status}): {output}")]
    EncodingFailed { status: String, output: String },

    #[error("image store failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<A> = std::result::Result<A, Error>;

pub(crate) fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfiguration(message.into())
}
