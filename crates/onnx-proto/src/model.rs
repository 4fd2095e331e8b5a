// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The interchange model tree.
//!
//! Field names follow the format's message definitions so that a tree
//! dumped from any other toolchain maps one-to-one. Besides the protobuf
//! encoding, trees persist as JSON:
//!
//! ```json
//! {
//!   "ir_version": 8,
//!   "opset_import": [{ "domain": "", "version": 18 }],
//!   "graph": {
//!     "name": "relu",
//!     "node": [{ "op_type": "Relu", "input": ["x"], "output": ["y"] }],
//!     "input": [{ "name": "x", "elem_type": 1, "shape": [1, 8] }],
//!     "output": [{ "name": "y", "elem_type": 1, "shape": [1, 8] }]
//!   }
//! }
//! ```

use crate::ProtoError;
use std::path::Path;

/// Top-level model.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelProto {
    #[serde(default)]
    pub ir_version: i64,
    #[serde(default)]
    pub producer_name: String,
    #[serde(default)]
    pub producer_version: String,
    #[serde(default)]
    pub opset_import: Vec<OperatorSetIdProto>,
    pub graph: GraphProto,
}

impl ModelProto {
    /// Loads a model from `path`.
    ///
    /// Files ending in `.onnx` are decoded as protobuf, anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ProtoError> {
        if is_protobuf_path(path) {
            Self::decode_protobuf(&std::fs::read(path)?)
        } else {
            Self::from_json(&std::fs::read_to_string(path)?)
        }
    }

    /// Parses a model from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        let model: Self = serde_json::from_str(json)?;
        Ok(model)
    }

    /// Serializes the model to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the model to `path`, choosing the encoding as [`Self::from_file`] does.
    pub fn write_file(&self, path: &Path) -> Result<(), ProtoError> {
        if is_protobuf_path(path) {
            std::fs::write(path, self.encode_protobuf())?;
        } else {
            std::fs::write(path, self.to_json()?)?;
        }
        Ok(())
    }

    /// Version of the default operator set, if imported.
    ///
    /// The default domain is spelled either `""` or `"ai.onnx"`.
    pub fn default_opset(&self) -> Option<i64> {
        self.opset_import
            .iter()
            .find(|o| is_default_domain(&o.domain))
            .map(|o| o.version)
    }
}

fn is_protobuf_path(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("onnx"))
}

/// Returns `true` for the two spellings of the default operator domain.
pub fn is_default_domain(domain: &str) -> bool {
    domain.is_empty() || domain == "ai.onnx"
}

/// An imported operator set.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct OperatorSetIdProto {
    #[serde(default)]
    pub domain: String,
    pub version: i64,
}

/// A computation graph.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GraphProto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub node: Vec<NodeProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initializer: Vec<TensorProto>,
    #[serde(default)]
    pub input: Vec<ValueInfoProto>,
    #[serde(default)]
    pub output: Vec<ValueInfoProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_info: Vec<ValueInfoProto>,
}

impl GraphProto {
    /// Finds an initializer by name.
    pub fn initializer(&self, name: &str) -> Option<&TensorProto> {
        self.initializer.iter().find(|t| t.name == name)
    }
}

/// One operator invocation. An empty input name marks an omitted optional input.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeProto {
    #[serde(default)]
    pub name: String,
    pub op_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute: Vec<AttributeProto>,
}

impl NodeProto {
    /// Finds an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attribute.iter().find(|a| a.name == name)
    }
}

/// A named attribute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeProto {
    pub name: String,
    pub value: AttributeValue,
}

/// Attribute payloads. Graph-valued and sparse attributes are not modelled.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(TensorProto),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl AttributeValue {
    /// Returns the `AttributeType` name of this payload.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "FLOAT",
            Self::Int(_) => "INT",
            Self::String(_) => "STRING",
            Self::Tensor(_) => "TENSOR",
            Self::Floats(_) => "FLOATS",
            Self::Ints(_) => "INTS",
            Self::Strings(_) => "STRINGS",
        }
    }
}

impl AttributeProto {
    pub fn float(name: &str, v: f32) -> Self {
        Self::new(name, AttributeValue::Float(v))
    }

    pub fn int(name: &str, v: i64) -> Self {
        Self::new(name, AttributeValue::Int(v))
    }

    pub fn string(name: &str, v: &str) -> Self {
        Self::new(name, AttributeValue::String(v.to_string()))
    }

    pub fn tensor(name: &str, v: TensorProto) -> Self {
        Self::new(name, AttributeValue::Tensor(v))
    }

    pub fn floats(name: &str, v: &[f32]) -> Self {
        Self::new(name, AttributeValue::Floats(v.to_vec()))
    }

    pub fn ints(name: &str, v: &[i64]) -> Self {
        Self::new(name, AttributeValue::Ints(v.to_vec()))
    }

    pub fn strings(name: &str, v: &[&str]) -> Self {
        Self::new(name, AttributeValue::Strings(v.iter().map(|s| s.to_string()).collect()))
    }

    fn new(name: &str, value: AttributeValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// A tensor with embedded data.
///
/// Data lives either in `raw_data` (little-endian, densely packed) or in the
/// typed field matching `data_type`: `float_data` for FLOAT, `int32_data` for
/// every type of 32 bits or less except FLOAT, `int64_data`, `double_data`,
/// `uint64_data` (UINT32 and UINT64).
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TensorProto {
    #[serde(default)]
    pub name: String,
    pub data_type: i32,
    #[serde(default)]
    pub dims: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub float_data: Vec<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int32_data: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int64_data: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub double_data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uint64_data: Vec<u64>,
}

/// A dimension: concrete or a named symbol.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Value(i64),
    Param(String),
}

/// Name, element type and (optional) shape of a value.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ValueInfoProto {
    pub name: String,
    #[serde(default)]
    pub elem_type: i32,
    /// `None` when the shape is unknown; `Some(vec![])` is a scalar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<Dimension>>,
}
