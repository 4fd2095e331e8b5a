// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape and payload handling.

use crate::Shape;

/// Errors that can occur while combining shapes or reading tensor payloads.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The element count or byte size of a shape does not fit in `usize`.
    #[error("shape {shape} is too large to address")]
    TooLarge { shape: Shape },

    /// Two shapes cannot be combined by the requested rule.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The payload's data type cannot be read the requested way.
    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },
}
