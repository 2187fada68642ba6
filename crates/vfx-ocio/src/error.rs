//! Error types for op construction, optimization and execution.
//!
//! This module provides error handling for:
//! - Parameter validation at finalize time
//! - Misuse of the op contract (combining without checking first)
//! - Inversions and combinations a kind does not support
//! - Pixel buffers that disagree with the CPU processor
//! - LUT file decoding and processor configuration files

use std::path::PathBuf;
use thiserror::Error;

use crate::ops::OpKind;

/// Result type for OCIO operations.
pub type OcioResult<T> = Result<T, OcioError>;

/// Errors that can occur during OCIO operations.
#[derive(Debug, Error)]
pub enum OcioError {
    /// Parameter data is malformed or out of range.
    #[error("{kind} validation failed: {reason}")]
    Validation {
        /// Kind of op whose data failed.
        kind: OpKind,
        /// What is wrong with it.
        reason: String,
    },

    /// An op method was called outside its contract.
    ///
    /// Raised when `combine_with` is invoked on a pair for which
    /// `can_combine_with` is false, or when a renderer is requested from an
    /// op that has not been finalized. Indicates a caller bug.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The kind cannot perform the requested inversion or combination.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Pixel buffer does not match what the CPU processor expects.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Pixel buffer description is inconsistent.
    #[error("invalid pixel buffer: {0}")]
    Core(#[from] vfx_core::Error),

    /// LUT decoding or construction error.
    #[error("LUT error: {0}")]
    Lut(#[from] vfx_lut::LutError),

    /// LUT file referenced by a file transform does not exist.
    #[error("LUT file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// I/O error reading configuration or LUT files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OcioError {
    /// Shorthand for a [`OcioError::Validation`] error.
    pub(crate) fn validation(kind: OpKind, reason: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            reason: reason.into(),
        }
    }
}
