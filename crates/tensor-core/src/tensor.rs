// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Constant tensor payloads.

use crate::{DType, Shape, TensorError};

/// An owned, n-dimensional constant stored in contiguous memory.
///
/// `Tensor` carries the embedded data of initializers and folded operands
/// (reshape targets, slice bounds, pad amounts). The translation layer never
/// computes on it beyond reading small index vectors.
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a flat little-endian byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Vec<u8>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            data: vec![0u8; size],
        }
    }

    /// Creates a tensor from raw little-endian bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        let expected = shape
            .checked_size_bytes(dtype)
            .ok_or_else(|| TensorError::TooLarge { shape: shape.clone() })?;
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, dtype, data })
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.to_f64_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(shape, DType::F32, data)
    }

    /// Creates a tensor from a slice of `i64` values.
    pub fn from_i64(shape: Shape, values: &[i64]) -> Result<Self, TensorError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(shape, DType::I64, data)
    }

    /// Creates a 1-D `i64` tensor holding `values`.
    pub fn vector_i64(values: &[i64]) -> Self {
        Self {
            shape: Shape::vector(values.len()),
            dtype: DType::I64,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    /// Creates a rank-0 `f32` tensor.
    pub fn scalar_f32(value: f32) -> Self {
        Self {
            shape: Shape::scalar(),
            dtype: DType::F32,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the tensor holds exactly one element.
    pub fn is_scalar_like(&self) -> bool {
        self.shape.num_elements() == 1
    }

    /// Reads the elements as `i64`, widening from any integer type.
    ///
    /// Shape-like operands in the interchange format are normally `int64`,
    /// but older exporters emit `int32` and hand-written models use the
    /// unsigned types. `u64` values above `i64::MAX` wrap.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>, TensorError> {
        let width = self.dtype.size_bytes();
        let read = |c: &[u8]| -> i64 {
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(c);
            match self.dtype {
                DType::I8 => i64::from(c[0] as i8),
                DType::I16 => i64::from(i16::from_le_bytes([c[0], c[1]])),
                DType::I32 => i64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])),
                _ => i64::from_le_bytes(buf),
            }
        };
        match self.dtype {
            DType::I8
            | DType::I16
            | DType::I32
            | DType::I64
            | DType::U8
            | DType::U16
            | DType::U32
            | DType::U64 => Ok(self.data.chunks_exact(width).map(read).collect()),
            dtype => Err(TensorError::UnsupportedDType {
                op: "to_i64_vec",
                dtype,
            }),
        }
    }

    /// Reads the elements as `f64`.
    ///
    /// Supports the 32/64-bit float types and every integer type;
    /// half-precision and boolean payloads are not decoded here.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, TensorError> {
        let values = match self.dtype {
            DType::F32 => self
                .data
                .chunks_exact(4)
                .map(|c| f64::from(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                .collect(),
            DType::F64 => self
                .data
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
            DType::F16 | DType::BF16 | DType::Bool => {
                return Err(TensorError::UnsupportedDType {
                    op: "to_f64_vec",
                    dtype: self.dtype,
                })
            }
            _ => self.to_i64_vec()?.into_iter().map(|v| v as f64).collect(),
        };
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        assert_eq!(t.size_bytes(), 24);
        assert_eq!(t.shape(), &Shape::matrix(2, 3));
        assert_eq!(t.dtype(), DType::F32);
        assert!(t.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_f32() {
        let data = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let t = Tensor::from_f32(Shape::matrix(2, 3), &data).unwrap();
        assert_eq!(t.size_bytes(), 24);
        assert_eq!(t.to_f64_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_f32_count_mismatch() {
        let result = Tensor::from_f32(Shape::vector(4), &[1.0, 2.0]);
        assert_eq!(
            result.unwrap_err(),
            TensorError::BufferSizeMismatch {
                expected: 16,
                actual: 8
            }
        );
    }

    #[test]
    fn test_from_bytes_size_mismatch() {
        let result = Tensor::from_bytes(Shape::matrix(2, 3), DType::F32, vec![0u8; 10]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_bytes_overflowing_shape() {
        let shape = Shape::new(vec![1 << 40, 1 << 40]);
        let err = Tensor::from_bytes(shape, DType::I64, vec![]).unwrap_err();
        assert!(matches!(err, TensorError::TooLarge { .. }));
    }

    #[test]
    fn test_i64_roundtrip() {
        let t = Tensor::vector_i64(&[5, 3, -1, i64::MAX]);
        assert_eq!(t.shape(), &Shape::vector(4));
        assert_eq!(t.to_i64_vec().unwrap(), vec![5, 3, -1, i64::MAX]);
    }

    #[test]
    fn test_i32_widens() {
        let bytes: Vec<u8> = [7i32, -2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let t = Tensor::from_bytes(Shape::vector(2), DType::I32, bytes).unwrap();
        assert_eq!(t.to_i64_vec().unwrap(), vec![7, -2]);
    }

    #[test]
    fn test_unsigned_widens() {
        let bytes: Vec<u8> = [2u32, 9].iter().flat_map(|v| v.to_le_bytes()).collect();
        let t = Tensor::from_bytes(Shape::vector(2), DType::U32, bytes).unwrap();
        assert_eq!(t.to_i64_vec().unwrap(), vec![2, 9]);
        let t = Tensor::from_bytes(Shape::vector(2), DType::I8, vec![0xff, 3]).unwrap();
        assert_eq!(t.to_i64_vec().unwrap(), vec![-1, 3]);
    }

    #[test]
    fn test_float_payload_is_not_an_index() {
        let t = Tensor::scalar_f32(0.5);
        assert!(t.is_scalar_like());
        assert!(matches!(
            t.to_i64_vec(),
            Err(TensorError::UnsupportedDType { dtype: DType::F32, .. })
        ));
    }
}
