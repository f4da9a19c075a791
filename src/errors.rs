//! Error Types
//!
//! This module defines the error types used by the scattering stage.
//!
//! # Overview
//!
//! The main error type [`ScatteringError`] covers the failure modes of the pass
//! and of the backends that consume its command buffers:
//! - Phase-order violations (Execute without Setup / Configure)
//! - Missing or double-booked render targets
//! - Material and sub-pass lookup failures
//! - Configuration loading errors
//!
//! A missing effect state is **not** an error: the pass logs once and
//! degrades to a no-op.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_scattering::errors::{ScatteringError, Result};
//!
//! fn render() -> Result<()> {
//!     queue.render_frame(&mut ctx, &rendering_data)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::render::{MaterialId, TargetId, TemporaryTargetId};

/// The main error type for the scattering stage.
#[derive(Error, Debug)]
pub enum ScatteringError {
    // ========================================================================
    // Phase Ordering
    // ========================================================================
    /// `execute` was called without a `setup` for the current frame.
    #[error("{pass}: execute called before setup for this frame")]
    PassNotSetUp {
        /// Name of the offending pass
        pass: &'static str,
    },

    /// `execute` was called without a `configure` for the current frame.
    #[error("{pass}: execute called before configure for this frame")]
    PassNotConfigured {
        /// Name of the offending pass
        pass: &'static str,
    },

    // ========================================================================
    // Render Targets
    // ========================================================================
    /// A blit or release referenced a target the backend does not know.
    #[error("Render target not found: {0:?}")]
    TargetNotFound(TargetId),

    /// A temporary target was requested while one with the same id is live.
    #[error("Temporary target {0:?} is already allocated")]
    TemporaryTargetInUse(TemporaryTargetId),

    /// A temporary target was released without a matching allocation.
    #[error("Temporary target {0:?} was not allocated")]
    TemporaryTargetNotAllocated(TemporaryTargetId),

    /// The backend cannot read and write the same target in one blit.
    #[error("Blit reads and writes the same target: {0:?}")]
    SameTargetBlit(TargetId),

    /// The backend cannot render into the requested format.
    #[error("Unsupported target format: {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    // ========================================================================
    // Materials
    // ========================================================================
    /// The material id was never registered with the backend.
    #[error("Material not found: {0:?}")]
    MaterialNotFound(MaterialId),

    /// The material has no technique at the requested sub-pass index.
    #[error("Material {material:?} has no sub-pass {subpass}")]
    InvalidSubpass {
        /// Material that was asked for the sub-pass
        material: MaterialId,
        /// The missing sub-pass index
        subpass: u32,
    },

    /// Uniform data does not match the layout the material expects.
    #[error("Material {material:?} expects {expected} uniform bytes, got {actual}")]
    UniformSizeMismatch {
        /// Material receiving the uniforms
        material: MaterialId,
        /// Byte size of the material's uniform block
        expected: usize,
        /// Byte size that was supplied
        actual: usize,
    },

    /// Depth data does not cover the camera target.
    #[error("Depth buffer holds {actual} texels, camera target needs {expected}")]
    DepthSizeMismatch {
        /// Texel count of the camera target
        expected: usize,
        /// Texel count that was supplied
        actual: usize,
    },

    // ========================================================================
    // Configuration
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, ScatteringError>`.
pub type Result<T> = std::result::Result<T, ScatteringError>;
