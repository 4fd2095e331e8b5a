// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Protobuf wire encoding of the model tree.
//!
//! The messages below cover the subset of the format's schema the tree
//! models; unknown fields are skipped on decode. Graph-valued and sparse
//! attributes, string tensors and externally stored tensor data are
//! rejected.

use crate::model::{
    AttributeProto, AttributeValue, Dimension, GraphProto, ModelProto, NodeProto,
    OperatorSetIdProto, TensorProto, ValueInfoProto,
};
use crate::ProtoError;
use prost::Message;

mod pb {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct ModelProto {
        #[prost(int64, tag = "1")]
        pub ir_version: i64,
        #[prost(message, repeated, tag = "8")]
        pub opset_import: Vec<OperatorSetIdProto>,
        #[prost(string, tag = "2")]
        pub producer_name: String,
        #[prost(string, tag = "3")]
        pub producer_version: String,
        #[prost(message, optional, tag = "7")]
        pub graph: Option<GraphProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct OperatorSetIdProto {
        #[prost(string, tag = "1")]
        pub domain: String,
        #[prost(int64, tag = "2")]
        pub version: i64,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct GraphProto {
        #[prost(message, repeated, tag = "1")]
        pub node: Vec<NodeProto>,
        #[prost(string, tag = "2")]
        pub name: String,
        #[prost(message, repeated, tag = "5")]
        pub initializer: Vec<TensorProto>,
        #[prost(message, repeated, tag = "11")]
        pub input: Vec<ValueInfoProto>,
        #[prost(message, repeated, tag = "12")]
        pub output: Vec<ValueInfoProto>,
        #[prost(message, repeated, tag = "13")]
        pub value_info: Vec<ValueInfoProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct NodeProto {
        #[prost(string, repeated, tag = "1")]
        pub input: Vec<String>,
        #[prost(string, repeated, tag = "2")]
        pub output: Vec<String>,
        #[prost(string, tag = "3")]
        pub name: String,
        #[prost(string, tag = "4")]
        pub op_type: String,
        #[prost(string, tag = "7")]
        pub domain: String,
        #[prost(message, repeated, tag = "5")]
        pub attribute: Vec<AttributeProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct AttributeProto {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(int32, tag = "20")]
        pub r#type: i32,
        #[prost(float, tag = "2")]
        pub f: f32,
        #[prost(int64, tag = "3")]
        pub i: i64,
        #[prost(bytes = "vec", tag = "4")]
        pub s: Vec<u8>,
        #[prost(message, optional, tag = "5")]
        pub t: Option<TensorProto>,
        #[prost(float, repeated, packed = "false", tag = "7")]
        pub floats: Vec<f32>,
        #[prost(int64, repeated, packed = "false", tag = "8")]
        pub ints: Vec<i64>,
        #[prost(bytes = "vec", repeated, tag = "9")]
        pub strings: Vec<Vec<u8>>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct TensorProto {
        #[prost(int64, repeated, packed = "false", tag = "1")]
        pub dims: Vec<i64>,
        #[prost(int32, tag = "2")]
        pub data_type: i32,
        #[prost(float, repeated, tag = "4")]
        pub float_data: Vec<f32>,
        #[prost(int32, repeated, tag = "5")]
        pub int32_data: Vec<i32>,
        #[prost(int64, repeated, tag = "7")]
        pub int64_data: Vec<i64>,
        #[prost(string, tag = "8")]
        pub name: String,
        #[prost(bytes = "vec", tag = "9")]
        pub raw_data: Vec<u8>,
        #[prost(double, repeated, tag = "10")]
        pub double_data: Vec<f64>,
        #[prost(uint64, repeated, tag = "11")]
        pub uint64_data: Vec<u64>,
        #[prost(int32, tag = "14")]
        pub data_location: i32,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct ValueInfoProto {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(message, optional, tag = "2")]
        pub r#type: Option<TypeProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct TypeProto {
        #[prost(message, optional, tag = "1")]
        pub tensor_type: Option<TensorTypeProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct TensorTypeProto {
        #[prost(int32, tag = "1")]
        pub elem_type: i32,
        #[prost(message, optional, tag = "2")]
        pub shape: Option<TensorShapeProto>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct TensorShapeProto {
        #[prost(message, repeated, tag = "1")]
        pub dim: Vec<Dimension>,
    }

    #[derive(Clone, PartialEq, Message)]
    pub struct Dimension {
        #[prost(oneof = "DimValue", tags = "1, 2")]
        pub value: Option<DimValue>,
    }

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum DimValue {
        #[prost(int64, tag = "1")]
        Value(i64),
        #[prost(string, tag = "2")]
        Param(String),
    }
}

// AttributeProto.AttributeType codes.
const ATTR_FLOAT: i32 = 1;
const ATTR_INT: i32 = 2;
const ATTR_STRING: i32 = 3;
const ATTR_TENSOR: i32 = 4;
const ATTR_FLOATS: i32 = 6;
const ATTR_INTS: i32 = 7;
const ATTR_STRINGS: i32 = 8;

// TensorProto.DataLocation.EXTERNAL
const LOCATION_EXTERNAL: i32 = 1;

impl ModelProto {
    /// Decodes a model from protobuf bytes.
    pub fn decode_protobuf(bytes: &[u8]) -> Result<Self, ProtoError> {
        let model = pb::ModelProto::decode(bytes)?;
        model_from_wire(model)
    }

    /// Encodes the model as protobuf bytes.
    pub fn encode_protobuf(&self) -> Vec<u8> {
        model_to_wire(self).encode_to_vec()
    }
}

fn unsupported(detail: impl Into<String>) -> ProtoError {
    ProtoError::Unsupported(detail.into())
}

fn utf8(bytes: Vec<u8>, what: &str) -> Result<String, ProtoError> {
    String::from_utf8(bytes).map_err(|_| unsupported(format!("{what} is not valid UTF-8")))
}

fn model_from_wire(m: pb::ModelProto) -> Result<ModelProto, ProtoError> {
    let graph = m.graph.ok_or_else(|| unsupported("model has no graph"))?;
    Ok(ModelProto {
        ir_version: m.ir_version,
        producer_name: m.producer_name,
        producer_version: m.producer_version,
        opset_import: m
            .opset_import
            .into_iter()
            .map(|o| OperatorSetIdProto {
                domain: o.domain,
                version: o.version,
            })
            .collect(),
        graph: graph_from_wire(graph)?,
    })
}

fn graph_from_wire(g: pb::GraphProto) -> Result<GraphProto, ProtoError> {
    Ok(GraphProto {
        name: g.name,
        node: g.node.into_iter().map(node_from_wire).collect::<Result<_, _>>()?,
        initializer: g
            .initializer
            .into_iter()
            .map(tensor_from_wire)
            .collect::<Result<_, _>>()?,
        input: g.input.into_iter().map(value_info_from_wire).collect(),
        output: g.output.into_iter().map(value_info_from_wire).collect(),
        value_info: g.value_info.into_iter().map(value_info_from_wire).collect(),
    })
}

fn node_from_wire(n: pb::NodeProto) -> Result<NodeProto, ProtoError> {
    Ok(NodeProto {
        name: n.name,
        op_type: n.op_type,
        domain: n.domain,
        input: n.input,
        output: n.output,
        attribute: n
            .attribute
            .into_iter()
            .map(attribute_from_wire)
            .collect::<Result<_, _>>()?,
    })
}

fn attribute_from_wire(a: pb::AttributeProto) -> Result<AttributeProto, ProtoError> {
    // Writers older than the `type` field leave it unset; infer from content.
    let kind = match a.r#type {
        0 if !a.ints.is_empty() => ATTR_INTS,
        0 if !a.floats.is_empty() => ATTR_FLOATS,
        0 if !a.strings.is_empty() => ATTR_STRINGS,
        0 if a.t.is_some() => ATTR_TENSOR,
        0 if !a.s.is_empty() => ATTR_STRING,
        0 if a.f != 0.0 => ATTR_FLOAT,
        0 => ATTR_INT,
        k => k,
    };
    let what = format!("attribute '{}'", a.name);
    let value = match kind {
        ATTR_FLOAT => AttributeValue::Float(a.f),
        ATTR_INT => AttributeValue::Int(a.i),
        ATTR_STRING => AttributeValue::String(utf8(a.s, &what)?),
        ATTR_TENSOR => {
            let t = a.t.ok_or_else(|| unsupported(format!("{what} has no tensor")))?;
            AttributeValue::Tensor(tensor_from_wire(t)?)
        }
        ATTR_FLOATS => AttributeValue::Floats(a.floats),
        ATTR_INTS => AttributeValue::Ints(a.ints),
        ATTR_STRINGS => AttributeValue::Strings(
            a.strings
                .into_iter()
                .map(|s| utf8(s, &what))
                .collect::<Result<_, _>>()?,
        ),
        k => return Err(unsupported(format!("{what} has unsupported type code {k}"))),
    };
    Ok(AttributeProto { name: a.name, value })
}

fn tensor_from_wire(t: pb::TensorProto) -> Result<TensorProto, ProtoError> {
    if t.data_location == LOCATION_EXTERNAL {
        return Err(unsupported(format!(
            "tensor '{}' stores its data externally",
            t.name
        )));
    }
    Ok(TensorProto {
        name: t.name,
        data_type: t.data_type,
        dims: t.dims,
        raw_data: t.raw_data,
        float_data: t.float_data,
        int32_data: t.int32_data,
        int64_data: t.int64_data,
        double_data: t.double_data,
        uint64_data: t.uint64_data,
    })
}

fn value_info_from_wire(v: pb::ValueInfoProto) -> ValueInfoProto {
    let tensor = v.r#type.and_then(|t| t.tensor_type);
    let elem_type = tensor.as_ref().map_or(0, |t| t.elem_type);
    let shape = tensor.and_then(|t| t.shape).map(|s| {
        s.dim
            .into_iter()
            .map(|d| match d.value {
                Some(pb::DimValue::Value(v)) => Dimension::Value(v),
                Some(pb::DimValue::Param(p)) => Dimension::Param(p),
                None => Dimension::Param(String::new()),
            })
            .collect()
    });
    ValueInfoProto {
        name: v.name,
        elem_type,
        shape,
    }
}

fn model_to_wire(m: &ModelProto) -> pb::ModelProto {
    pb::ModelProto {
        ir_version: m.ir_version,
        opset_import: m
            .opset_import
            .iter()
            .map(|o| pb::OperatorSetIdProto {
                domain: o.domain.clone(),
                version: o.version,
            })
            .collect(),
        producer_name: m.producer_name.clone(),
        producer_version: m.producer_version.clone(),
        graph: Some(graph_to_wire(&m.graph)),
    }
}

fn graph_to_wire(g: &GraphProto) -> pb::GraphProto {
    pb::GraphProto {
        node: g.node.iter().map(node_to_wire).collect(),
        name: g.name.clone(),
        initializer: g.initializer.iter().map(tensor_to_wire).collect(),
        input: g.input.iter().map(value_info_to_wire).collect(),
        output: g.output.iter().map(value_info_to_wire).collect(),
        value_info: g.value_info.iter().map(value_info_to_wire).collect(),
    }
}

fn node_to_wire(n: &NodeProto) -> pb::NodeProto {
    pb::NodeProto {
        input: n.input.clone(),
        output: n.output.clone(),
        name: n.name.clone(),
        op_type: n.op_type.clone(),
        domain: n.domain.clone(),
        attribute: n.attribute.iter().map(attribute_to_wire).collect(),
    }
}

fn attribute_to_wire(a: &AttributeProto) -> pb::AttributeProto {
    let mut out = pb::AttributeProto {
        name: a.name.clone(),
        ..Default::default()
    };
    match &a.value {
        AttributeValue::Float(v) => {
            out.r#type = ATTR_FLOAT;
            out.f = *v;
        }
        AttributeValue::Int(v) => {
            out.r#type = ATTR_INT;
            out.i = *v;
        }
        AttributeValue::String(v) => {
            out.r#type = ATTR_STRING;
            out.s = v.as_bytes().to_vec();
        }
        AttributeValue::Tensor(t) => {
            out.r#type = ATTR_TENSOR;
            out.t = Some(tensor_to_wire(t));
        }
        AttributeValue::Floats(v) => {
            out.r#type = ATTR_FLOATS;
            out.floats = v.clone();
        }
        AttributeValue::Ints(v) => {
            out.r#type = ATTR_INTS;
            out.ints = v.clone();
        }
        AttributeValue::Strings(v) => {
            out.r#type = ATTR_STRINGS;
            out.strings = v.iter().map(|s| s.as_bytes().to_vec()).collect();
        }
    }
    out
}

fn tensor_to_wire(t: &TensorProto) -> pb::TensorProto {
    pb::TensorProto {
        dims: t.dims.clone(),
        data_type: t.data_type,
        float_data: t.float_data.clone(),
        int32_data: t.int32_data.clone(),
        int64_data: t.int64_data.clone(),
        name: t.name.clone(),
        raw_data: t.raw_data.clone(),
        double_data: t.double_data.clone(),
        uint64_data: t.uint64_data.clone(),
        data_location: 0,
    }
}

fn value_info_to_wire(v: &ValueInfoProto) -> pb::ValueInfoProto {
    let shape = v.shape.as_ref().map(|dims| pb::TensorShapeProto {
        dim: dims
            .iter()
            .map(|d| pb::Dimension {
                value: Some(match d {
                    Dimension::Value(v) => pb::DimValue::Value(*v),
                    Dimension::Param(p) => pb::DimValue::Param(p.clone()),
                }),
            })
            .collect(),
    });
    pb::ValueInfoProto {
        name: v.name.clone(),
        r#type: Some(pb::TypeProto {
            tensor_type: Some(pb::TensorTypeProto {
                elem_type: v.elem_type,
                shape,
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{
        make_graph, make_model, make_node, make_tensor_f32, make_tensor_i64, make_tensor_value_info,
    };
    use crate::DataType;

    fn sample() -> ModelProto {
        let mut input = make_tensor_value_info("x", DataType::Float, &[1, 3, 4, 4]);
        input.shape = Some(vec![Dimension::Param("batch".into()), Dimension::Value(3)]);
        make_model(make_graph(
            vec![
                make_node(
                    "Conv",
                    &["x", "w"],
                    &["c"],
                    "conv",
                    vec![
                        AttributeProto::ints("kernel_shape", &[3, 3]),
                        AttributeProto::string("auto_pad", "SAME_UPPER"),
                    ],
                ),
                make_node(
                    "LeakyRelu",
                    &["c"],
                    &["y"],
                    "act",
                    vec![
                        AttributeProto::float("alpha", 0.1),
                        AttributeProto::floats("scales", &[0.5, 2.0]),
                        AttributeProto::strings("tags", &["a", "b"]),
                        AttributeProto::tensor("value", make_tensor_i64("v", &[2], &[4, -1])),
                    ],
                ),
            ],
            "wire",
            vec![input],
            vec![make_tensor_value_info("y", DataType::Float, &[1, 3, 4, 4])],
            vec![make_tensor_f32("w", &[3, 3, 1, 1], &[0.25; 9])],
        ))
    }

    #[test]
    fn test_protobuf_roundtrip() {
        let m = sample();
        let bytes = m.encode_protobuf();
        assert_eq!(ModelProto::decode_protobuf(&bytes).unwrap(), m);
    }

    #[test]
    fn test_untyped_attributes_inferred() {
        let node = pb::NodeProto {
            op_type: "Flatten".into(),
            attribute: vec![
                pb::AttributeProto {
                    name: "axis".into(),
                    i: 2,
                    ..Default::default()
                },
                pb::AttributeProto {
                    name: "perm".into(),
                    ints: vec![1, 0],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let n = node_from_wire(node).unwrap();
        assert_eq!(n.attribute[0].value, AttributeValue::Int(2));
        assert_eq!(n.attribute[1].value, AttributeValue::Ints(vec![1, 0]));
    }

    #[test]
    fn test_packed_and_unpacked_dims() {
        // dims = [2, 3] written packed, as some writers do.
        let packed = [0x0a, 0x02, 0x02, 0x03, 0x10, 0x07];
        let t = tensor_from_wire(pb::TensorProto::decode(&packed[..]).unwrap()).unwrap();
        assert_eq!(t.dims, vec![2, 3]);
        assert_eq!(t.data_type, 7);

        let unpacked = [0x08, 0x02, 0x08, 0x03, 0x10, 0x07];
        let t = tensor_from_wire(pb::TensorProto::decode(&unpacked[..]).unwrap()).unwrap();
        assert_eq!(t.dims, vec![2, 3]);
    }

    #[test]
    fn test_graph_attribute_rejected() {
        let a = pb::AttributeProto {
            name: "then_branch".into(),
            r#type: 5,
            ..Default::default()
        };
        let err = attribute_from_wire(a).unwrap_err();
        assert!(matches!(err, ProtoError::Unsupported(_)));
        assert!(err.to_string().contains("then_branch"));
    }

    #[test]
    fn test_external_data_rejected() {
        let t = pb::TensorProto {
            name: "w".into(),
            data_location: LOCATION_EXTERNAL,
            ..Default::default()
        };
        assert!(matches!(tensor_from_wire(t), Err(ProtoError::Unsupported(_))));
    }

    #[test]
    fn test_missing_graph() {
        let bytes = pb::ModelProto {
            ir_version: 8,
            ..Default::default()
        }
        .encode_to_vec();
        let err = ModelProto::decode_protobuf(&bytes).unwrap_err();
        assert!(err.to_string().contains("no graph"));
    }

    #[test]
    fn test_truncated_bytes() {
        let bytes = sample().encode_protobuf();
        let err = ModelProto::decode_protobuf(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, ProtoError::Decode(_)));
    }
}
