// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and broadcasting.

use crate::TensorError;
use std::fmt;

/// Describes the dimensionality of a tensor.
///
/// A shape is an ordered sequence of non-negative dimension sizes with an
/// explicit rank. Zero-sized dimensions are legal (an empty slice produces
/// one); rank 0 denotes a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1. Shapes that come from
    /// untrusted input go through [`Shape::checked_num_elements`] first.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the element count, or `None` if it does not fit in `usize`.
    ///
    /// A zero-sized dimension makes the count zero regardless of the rest.
    pub fn checked_num_elements(&self) -> Option<usize> {
        if self.dims.contains(&0) {
            return Some(0);
        }
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Like [`Shape::size_bytes`], or `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    /// Consumes the shape and returns its dimensions.
    pub fn into_dims(self) -> Vec<usize> {
        self.dims
    }

    /// Broadcasts two shapes with the multidirectional rule.
    ///
    /// Dimensions are aligned from the trailing edge. A size-1 dimension
    /// stretches to match the other operand, missing leading dimensions
    /// count as 1, and any other disagreement fails.
    pub fn broadcast(&self, other: &Shape) -> Result<Shape, TensorError> {
        let rank = self.rank().max(other.rank());
        let mut dims = vec![0usize; rank];
        for (i, out) in dims.iter_mut().enumerate() {
            let a = padded_dim(&self.dims, rank, i);
            let b = padded_dim(&other.dims, rank, i);
            *out = if a == b || b == 1 {
                a
            } else if a == 1 {
                b
            } else {
                return Err(TensorError::ShapeMismatch {
                    op: "broadcast",
                    lhs: self.clone(),
                    rhs: other.clone(),
                });
            };
        }
        Ok(Shape::new(dims))
    }

    /// Returns `true` if `self` can be stretched to exactly `target`.
    ///
    /// This is the unidirectional rule used for bias operands: the result
    /// of broadcasting must equal `target` itself.
    pub fn broadcasts_to(&self, target: &Shape) -> bool {
        matches!(self.broadcast(target), Ok(ref s) if s == target)
    }
}

/// Dimension `i` of `dims` when right-aligned to `rank`, padding with 1.
fn padded_dim(dims: &[usize], rank: usize, i: usize) -> usize {
    let offset = rank - dims.len();
    if i < offset {
        1
    } else {
        dims[i - offset]
    }
}

/// Dimension-wise equality of two fully concrete shapes.
pub fn shape_equal(a: &Shape, b: &Shape) -> bool {
    a.dims == b.dims
}

/// Free-function form of [`Shape::broadcast`].
pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape, TensorError> {
    a.broadcast(b)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}
