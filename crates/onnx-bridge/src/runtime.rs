// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution backend boundary.
//!
//! The translator never computes tensors. A [`Runtime`] is consulted while
//! importing (can it run this operator on this element type?) and handed
//! the finished graph by [`crate::GraphHandler::run`].

use crate::TranslateError;
use model_ir::{Complete, ModelGraph, OpKind};
use tensor_core::DType;

/// An opaque tensor-execution backend.
pub trait Runtime {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Returns `true` if the backend can execute `kind` on `dtype` data.
    fn supports(&self, kind: OpKind, dtype: DType) -> bool;

    /// Executes a finished graph.
    fn execute(&self, graph: &ModelGraph<Complete>) -> Result<(), TranslateError>;
}

/// A runtime that accepts every operator and executes nothing.
///
/// Used for pure translation, where no backend is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRuntime;

impl Runtime for NullRuntime {
    fn name(&self) -> &str {
        "null"
    }

    fn supports(&self, _kind: OpKind, _dtype: DType) -> bool {
        true
    }

    fn execute(&self, graph: &ModelGraph<Complete>) -> Result<(), TranslateError> {
        tracing::debug!(graph = graph.name(), nodes = graph.num_nodes(), "null runtime: nothing to execute");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_runtime_supports_everything() {
        let rt = NullRuntime;
        assert_eq!(rt.name(), "null");
        for kind in OpKind::ALL {
            assert!(rt.supports(kind, DType::U32));
        }
    }
}
