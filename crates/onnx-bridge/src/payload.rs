// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion between embedded [`TensorProto`] data and [`Tensor`].

use crate::types::{data_type_of, element_type_named};
use crate::TranslateError;
use onnx_proto::TensorProto;
use tensor_core::{DType, Shape, Tensor};

/// Decodes an embedded tensor.
///
/// `raw_data` wins when present. Otherwise the typed field matching the
/// element type is read: `int32_data` carries every type of 32 bits or
/// less other than FLOAT (half floats as their bit patterns), `uint64_data`
/// carries UINT32 and UINT64.
pub fn tensor_from_proto(proto: &TensorProto) -> Result<Tensor, TranslateError> {
    let name = proto.name.as_str();
    let dtype = element_type_named(proto.data_type, name)?;
    let dims = proto
        .dims
        .iter()
        .map(|&d| {
            usize::try_from(d).map_err(|_| invalid(name, format!("negative dimension {d}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let shape = Shape::new(dims);
    let count = shape
        .checked_num_elements()
        .ok_or_else(|| invalid(name, format!("shape {shape} has too many elements")))?;

    let bytes = if !proto.raw_data.is_empty() {
        proto.raw_data.clone()
    } else {
        typed_bytes(proto, dtype, count)?
    };
    Tensor::from_bytes(shape, dtype, bytes).map_err(|e| invalid(name, e.to_string()))
}

fn typed_bytes(proto: &TensorProto, dtype: DType, count: usize) -> Result<Vec<u8>, TranslateError> {
    let name = proto.name.as_str();
    let check = |field: &str, len: usize| {
        if len == count {
            Ok(())
        } else {
            Err(invalid(
                name,
                format!("{field} holds {len} value(s), shape needs {count}"),
            ))
        }
    };
    let bytes = match dtype {
        DType::F32 => {
            check("float_data", proto.float_data.len())?;
            proto.float_data.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DType::F64 => {
            check("double_data", proto.double_data.len())?;
            proto.double_data.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DType::I64 => {
            check("int64_data", proto.int64_data.len())?;
            proto.int64_data.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DType::U64 => {
            check("uint64_data", proto.uint64_data.len())?;
            proto.uint64_data.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DType::U32 => {
            check("uint64_data", proto.uint64_data.len())?;
            let mut out = Vec::with_capacity(count * 4);
            for &v in &proto.uint64_data {
                let v = u32::try_from(v)
                    .map_err(|_| invalid(name, format!("value {v} does not fit UINT32")))?;
                out.extend_from_slice(&v.to_le_bytes());
            }
            out
        }
        DType::I32 => {
            check("int32_data", proto.int32_data.len())?;
            proto.int32_data.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DType::I8 | DType::U8 | DType::Bool => {
            check("int32_data", proto.int32_data.len())?;
            proto.int32_data.iter().map(|&v| v as u8).collect()
        }
        DType::I16 | DType::U16 | DType::F16 | DType::BF16 => {
            check("int32_data", proto.int32_data.len())?;
            proto
                .int32_data
                .iter()
                .flat_map(|&v| (v as u16).to_le_bytes())
                .collect()
        }
    };
    Ok(bytes)
}

/// Encodes a tensor as `raw_data`.
pub fn tensor_to_proto(name: &str, tensor: &Tensor) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        data_type: data_type_of(tensor.dtype()),
        dims: tensor.shape().dims().iter().map(|&d| d as i64).collect(),
        raw_data: tensor.as_bytes().to_vec(),
        ..Default::default()
    }
}

/// Builds a rank-0 tensor of `dtype` holding `value`.
///
/// Used for legacy float attributes (Pad `value`, Clip `min`/`max`) that
/// later opsets carry as typed operands. Returns `None` for half-precision
/// types, which have no lossless conversion here.
pub fn scalar_like(value: f64, dtype: DType) -> Option<Tensor> {
    let bytes: Vec<u8> = match dtype {
        DType::F32 => (value as f32).to_le_bytes().to_vec(),
        DType::F64 => value.to_le_bytes().to_vec(),
        DType::I8 => vec![value as i8 as u8],
        DType::U8 => vec![value as u8],
        DType::Bool => vec![u8::from(value != 0.0)],
        DType::I16 => (value as i16).to_le_bytes().to_vec(),
        DType::U16 => (value as u16).to_le_bytes().to_vec(),
        DType::I32 => (value as i32).to_le_bytes().to_vec(),
        DType::U32 => (value as u32).to_le_bytes().to_vec(),
        DType::I64 => (value as i64).to_le_bytes().to_vec(),
        DType::U64 => (value as u64).to_le_bytes().to_vec(),
        DType::F16 | DType::BF16 => return None,
    };
    Tensor::from_bytes(Shape::scalar(), dtype, bytes).ok()
}

fn invalid(tensor: &str, detail: String) -> TranslateError {
    TranslateError::InvalidPayload {
        tensor: tensor.to_string(),
        detail,
    }
}
