// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-proto
//!
//! The ONNX model tree as plain serde structs: [`ModelProto`],
//! [`GraphProto`], [`NodeProto`], [`AttributeProto`], [`TensorProto`] and
//! [`ValueInfoProto`], plus the [`DataType`] element codes.
//!
//! Trees persist either in the format's protobuf encoding (`.onnx` files)
//! or as JSON ([`ModelProto::from_file`], [`ModelProto::write_file`]).
//! The [`helper`] module mirrors the format's reference constructors.

mod data_type;
mod error;
pub mod helper;
mod model;
mod wire;

pub use data_type::DataType;
pub use error::ProtoError;
pub use model::{
    is_default_domain, AttributeProto, AttributeValue, Dimension, GraphProto, ModelProto,
    NodeProto, OperatorSetIdProto, TensorProto, ValueInfoProto,
};
