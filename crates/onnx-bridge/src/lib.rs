// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-bridge
//!
//! Bidirectional translation between ONNX model trees ([`onnx_proto`]) and
//! the typed computation graph of [`model_ir`].
//!
//! - [`import`]: model tree to a finished graph, with every value's type inferred
//! - [`export`]: finished graph to a model tree for a chosen opset
//! - [`GraphHandler`]: build a graph operator by operator, then materialize it
//!
//! Translation is pure. A [`Runtime`] only answers capability queries and
//! receives finished graphs.

mod codec;
pub mod config;
mod error;
mod exporter;
mod handler;
mod importer;
mod naming;
mod payload;
mod runtime;
mod translator;
mod types;

pub use config::{BridgeConfig, ExportConfig, ImportConfig, SUPPORTED_OPSETS};
pub use error::TranslateError;
pub use exporter::export;
pub use handler::{GraphHandler, Handle};
pub use importer::import;
pub use payload::{tensor_from_proto, tensor_to_proto};
pub use runtime::{NullRuntime, Runtime};
pub use translator::Translator;
pub use types::{data_type_of, element_type_of};
