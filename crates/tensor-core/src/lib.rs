// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! The type and shape model shared by the graph IR and the ONNX bridge.
//!
//! This crate provides:
//! - [`DType`]: the element types the execution backends accept.
//! - [`Shape`]: ordered, non-negative dimension sizes with an explicit rank,
//!   plus the right-aligned broadcasting rule ([`broadcast_shape`]).
//! - [`Tensor`]: owned constant payloads (initializers, folded operands).
//!
//! # Design Goals
//! - Shapes are a semantic type, never a loose list, so rank mistakes are
//!   caught before anything reaches a kernel.
//! - Clean error types via `thiserror`.

mod dtype;
mod error;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use shape::{broadcast_shape, shape_equal, Shape};
pub use tensor::Tensor;
