use std::fmt;

use thiserror::Error;

use crate::shaders::ShaderGenError;

/// Failure reported by a [`crate::hal::Device`] while creating an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    OutOfHostMemory,
    OutOfDeviceMemory,
    InvalidHandle,
    Unsupported(&'static str),
    Internal(&'static str),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::OutOfHostMemory => write!(f, "out of host memory"),
            BackendError::OutOfDeviceMemory => write!(f, "out of device memory"),
            BackendError::InvalidHandle => write!(f, "invalid handle"),
            BackendError::Unsupported(what) => write!(f, "unsupported: {what}"),
            BackendError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Error)]
pub enum UtilsError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("shader generation failed: {0}")]
    ShaderGen(#[from] ShaderGenError),
}

pub type Result<T> = std::result::Result<T, UtilsError>;
