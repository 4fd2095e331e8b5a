// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model-tree persistence.

/// Errors that can occur when reading or writing a model tree.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The model file could not be read or written.
    #[error("model file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The model JSON is malformed.
    #[error("failed to parse model: {0}")]
    Json(#[from] serde_json::Error),

    /// The protobuf bytes are malformed.
    #[error("failed to decode protobuf model: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The model uses a feature the tree does not represent.
    #[error("unsupported model content: {0}")]
    Unsupported(String),
}
