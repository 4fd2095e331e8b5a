// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mapping between interchange element codes and [`DType`].

use crate::TranslateError;
use onnx_proto::DataType;
use tensor_core::DType;

/// Maps a `TensorProto.DataType` code onto the element-type catalog.
///
/// STRING, the complex types, the 8-bit and 4-bit float/int formats and
/// UNDEFINED have no counterpart and fail with `UnsupportedType`.
pub fn element_type_of(data_type: i32) -> Result<DType, TranslateError> {
    element_type_named(data_type, "")
}

/// [`element_type_of`] with the tensor name recorded in the error.
pub fn element_type_named(data_type: i32, tensor: &str) -> Result<DType, TranslateError> {
    let dtype = match DataType::from_code(data_type) {
        Some(DataType::Float) => DType::F32,
        Some(DataType::Uint8) => DType::U8,
        Some(DataType::Int8) => DType::I8,
        Some(DataType::Uint16) => DType::U16,
        Some(DataType::Int16) => DType::I16,
        Some(DataType::Int32) => DType::I32,
        Some(DataType::Int64) => DType::I64,
        Some(DataType::Bool) => DType::Bool,
        Some(DataType::Float16) => DType::F16,
        Some(DataType::Double) => DType::F64,
        Some(DataType::Uint32) => DType::U32,
        Some(DataType::Uint64) => DType::U64,
        Some(DataType::Bfloat16) => DType::BF16,
        _ => {
            return Err(TranslateError::UnsupportedType {
                code: data_type,
                tensor: tensor.to_string(),
            })
        }
    };
    Ok(dtype)
}

/// Inverse of [`element_type_of`].
pub fn data_type_of(dtype: DType) -> i32 {
    let dt = match dtype {
        DType::F32 => DataType::Float,
        DType::U8 => DataType::Uint8,
        DType::I8 => DataType::Int8,
        DType::U16 => DataType::Uint16,
        DType::I16 => DataType::Int16,
        DType::I32 => DataType::Int32,
        DType::I64 => DataType::Int64,
        DType::Bool => DataType::Bool,
        DType::F16 => DataType::Float16,
        DType::F64 => DataType::Double,
        DType::U32 => DataType::Uint32,
        DType::U64 => DataType::Uint64,
        DType::BF16 => DataType::Bfloat16,
    };
    dt.code()
}
