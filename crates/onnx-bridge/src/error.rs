// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for import, export and the builder boundary.

use model_ir::{ErrorKind, GraphError};
use onnx_proto::DataType;
use tensor_core::{DType, Shape};

/// Errors that can occur while translating between model trees and graphs.
///
/// Every variant names the node or tensor it concerns. Errors are terminal
/// for the call that raised them; no partially translated graph or model
/// is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// An element-type code outside the supported catalog.
    #[error("tensor '{tensor}': unsupported element type {}", type_label(*.code))]
    UnsupportedType { code: i32, tensor: String },

    /// The operator is unknown, in a foreign domain, or refused by the runtime.
    #[error("node '{node}': unsupported operator '{op_type}': {detail}")]
    UnsupportedOperator {
        node: String,
        op_type: String,
        detail: String,
    },

    /// A required attribute is absent.
    #[error("node '{node}': missing required attribute '{attribute}'")]
    AttributeMissing { node: String, attribute: String },

    /// An attribute carries the wrong payload type.
    #[error("node '{node}': attribute '{attribute}' must be {expected}, found {actual}")]
    AttributeTypeMismatch {
        node: String,
        attribute: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An attribute (or folded operand) holds a value outside what is supported.
    #[error("node '{node}': unsupported value for '{attribute}': {detail}")]
    UnsupportedAttributeValue {
        node: String,
        attribute: String,
        detail: String,
    },

    /// A node lists the wrong number of inputs or outputs.
    #[error("node '{node}': {detail}")]
    Arity { node: String, detail: String },

    /// A node consumes a value that is not yet defined.
    #[error("node '{node}': input '{tensor}' {detail}")]
    OutOfOrderReference {
        node: String,
        tensor: String,
        detail: &'static str,
    },

    /// A declared graph output is never produced.
    #[error("graph output '{name}' is not produced by any node, input or initializer")]
    DanglingOutput { name: String },

    /// A name is defined twice.
    #[error("'{name}' is defined more than once")]
    DuplicateName { name: String },

    /// A graph input's shape cannot be made concrete.
    #[error("tensor '{tensor}': unresolved shape: {detail}")]
    UnresolvedShape { tensor: String, detail: String },

    /// A declared shape disagrees with the inferred one.
    #[error("tensor '{tensor}': declared shape {declared} but inferred {inferred}")]
    DeclaredShapeMismatch {
        tensor: String,
        declared: String,
        inferred: Shape,
    },

    /// A declared element type disagrees with the inferred one.
    #[error("tensor '{tensor}': declared type {} but inferred {inferred}", type_label(*.declared))]
    DeclaredTypeMismatch {
        tensor: String,
        declared: i32,
        inferred: DType,
    },

    /// Embedded tensor data is inconsistent with its declared type and dims.
    #[error("tensor '{tensor}': invalid payload: {detail}")]
    InvalidPayload { tensor: String, detail: String },

    /// Graph construction or ordering failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The runtime refused or failed to execute a graph.
    #[error("runtime '{runtime}' failed: {detail}")]
    Execution { runtime: String, detail: String },
}

fn type_label(code: i32) -> String {
    match DataType::from_code(code) {
        Some(dt) => format!("{dt} ({code})"),
        None => format!("code {code}"),
    }
}

impl TranslateError {
    /// Maps this error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::UnsupportedOperator { .. } => ErrorKind::UnsupportedOperator,
            Self::AttributeMissing { .. } => ErrorKind::AttributeMissing,
            Self::AttributeTypeMismatch { .. } => ErrorKind::AttributeTypeMismatch,
            Self::UnsupportedAttributeValue { .. } => ErrorKind::UnsupportedAttributeValue,
            Self::Arity { .. } => ErrorKind::ArityMismatch,
            Self::OutOfOrderReference { .. } => ErrorKind::OutOfOrderReference,
            Self::DanglingOutput { .. } => ErrorKind::DanglingOutput,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::UnresolvedShape { .. } => ErrorKind::UnresolvedShape,
            Self::DeclaredShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::DeclaredTypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            Self::Graph(e) => e.kind(),
            Self::Config(_) => ErrorKind::Config,
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }

    pub(crate) fn unsupported_value(
        node: &str,
        attribute: &str,
        detail: impl Into<String>,
    ) -> Self {
        Self::UnsupportedAttributeValue {
            node: node.to_string(),
            attribute: attribute.to_string(),
            detail: detail.into(),
        }
    }
}
