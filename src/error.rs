use thiserror::Error;

/// Errors raised by the viewport engine.
///
/// Only `InvalidDimensions` is ever returned to the host. The other kinds are
/// recovered locally (logged and dropped) and exist so the failure paths have
/// a name in logs and region-source signatures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Region decode failed: {0}")]
    DecodeFailed(String),

    #[error("No image bound to the viewport")]
    GeometryUninitialized,

    #[error("Malformed gesture: {0}")]
    MalformedGesture(&'static str),
}

pub type Result<T> = std::result::Result<T, ViewError>;
