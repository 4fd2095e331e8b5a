// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for operator inference and IR construction.

use crate::ops::OpKind;
use tensor_core::TensorError;

/// Coarse classification shared by every error in the translation stack.
///
/// Each crate keeps its own error enum; `kind()` on any of them maps onto
/// this taxonomy so callers can branch without matching nested variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedType,
    UnsupportedOperator,
    AttributeMissing,
    AttributeTypeMismatch,
    UnsupportedAttributeValue,
    ShapeMismatch,
    RankMismatch,
    TypeMismatch,
    ArityMismatch,
    OutOfOrderReference,
    DanglingOutput,
    CyclicGraph,
    DuplicateName,
    UnknownTensor,
    UnresolvedShape,
    InvalidPayload,
    Config,
    Execution,
}

impl ErrorKind {
    /// Returns a stable label for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedType => "unsupported_type",
            Self::UnsupportedOperator => "unsupported_operator",
            Self::AttributeMissing => "attribute_missing",
            Self::AttributeTypeMismatch => "attribute_type_mismatch",
            Self::UnsupportedAttributeValue => "unsupported_attribute_value",
            Self::ShapeMismatch => "shape_mismatch",
            Self::RankMismatch => "rank_mismatch",
            Self::TypeMismatch => "type_mismatch",
            Self::ArityMismatch => "arity_mismatch",
            Self::OutOfOrderReference => "out_of_order_reference",
            Self::DanglingOutput => "dangling_output",
            Self::CyclicGraph => "cyclic_graph",
            Self::DuplicateName => "duplicate_name",
            Self::UnknownTensor => "unknown_tensor",
            Self::UnresolvedShape => "unresolved_shape",
            Self::InvalidPayload => "invalid_payload",
            Self::Config => "config",
            Self::Execution => "execution",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a single operator's validation or shape inference.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    /// Wrong number of inputs for the operator.
    #[error("{op} expects {expected} input(s), got {actual}")]
    Arity {
        op: OpKind,
        expected: String,
        actual: usize,
    },

    /// Dimensions disagree where the operator requires agreement.
    #[error("{op}: shape mismatch: {detail}")]
    ShapeMismatch { op: OpKind, detail: String },

    /// An input has a rank the operator cannot accept.
    #[error("{op}: rank mismatch: {detail}")]
    RankMismatch { op: OpKind, detail: String },

    /// Element types disagree or are not accepted by the operator.
    #[error("{op}: type mismatch: {detail}")]
    TypeMismatch { op: OpKind, detail: String },

    /// A parameter value is outside what the operator defines.
    #[error("{op}: invalid parameter: {detail}")]
    InvalidParam { op: OpKind, detail: String },
}

impl OpError {
    pub(crate) fn shape(op: OpKind, detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            op,
            detail: detail.into(),
        }
    }

    pub(crate) fn rank(op: OpKind, detail: impl Into<String>) -> Self {
        Self::RankMismatch {
            op,
            detail: detail.into(),
        }
    }

    pub(crate) fn dtype(op: OpKind, detail: impl Into<String>) -> Self {
        Self::TypeMismatch {
            op,
            detail: detail.into(),
        }
    }

    pub(crate) fn param(op: OpKind, detail: impl Into<String>) -> Self {
        Self::InvalidParam {
            op,
            detail: detail.into(),
        }
    }

    /// Wraps a broadcasting failure from the shape model.
    pub(crate) fn broadcast(op: OpKind, err: TensorError) -> Self {
        Self::shape(op, err.to_string())
    }

    /// Returns the operator this error was raised for.
    pub fn op(&self) -> OpKind {
        match self {
            Self::Arity { op, .. }
            | Self::ShapeMismatch { op, .. }
            | Self::RankMismatch { op, .. }
            | Self::TypeMismatch { op, .. }
            | Self::InvalidParam { op, .. } => *op,
        }
    }

    /// Maps this error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Arity { .. } => ErrorKind::ArityMismatch,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::RankMismatch { .. } => ErrorKind::RankMismatch,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidParam { .. } => ErrorKind::UnsupportedAttributeValue,
        }
    }
}

/// Errors that can occur while building or walking a [`crate::ModelGraph`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A node failed operator validation or inference.
    #[error("node '{node}': {source}")]
    InvalidNode {
        node: String,
        #[source]
        source: OpError,
    },

    /// A handle does not refer to a tensor of this graph.
    #[error("unknown tensor handle #{0}")]
    UnknownTensor(usize),

    /// A tensor or node name is already taken.
    #[error("duplicate name '{name}'")]
    DuplicateName { name: String },

    /// The number of requested output names differs from what the operator produces.
    #[error("node '{node}' produces {expected} output(s), {actual} name(s) given")]
    OutputCount {
        node: String,
        expected: usize,
        actual: usize,
    },

    /// The graph was finished without any declared output.
    #[error("graph '{0}' declares no outputs")]
    NoOutputs(String),

    /// Nodes remain after topological ordering.
    #[error("graph contains a cycle ({remaining} node(s) unordered)")]
    CyclicGraph { remaining: usize },
}

impl GraphError {
    /// Maps this error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidNode { source, .. } => source.kind(),
            Self::UnknownTensor(_) => ErrorKind::UnknownTensor,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::OutputCount { .. } => ErrorKind::ArityMismatch,
            Self::NoOutputs(_) => ErrorKind::DanglingOutput,
            Self::CyclicGraph { .. } => ErrorKind::CyclicGraph,
        }
    }
}
