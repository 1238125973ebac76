//! Crate error type

use thiserror::Error;

use crate::category::CategoryError;
use crate::config::ConfigError;
use crate::gpu::GpuError;

/// Result alias used by frame-level operations
pub type FogResult<T> = Result<T, FogError>;

/// Errors that abort a frame or a setup step
#[derive(Error, Debug)]
pub enum FogError {
    /// GPU resource or dispatch failure
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Category membership or record failure
    #[error("Category error: {0}")]
    Category(#[from] CategoryError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
