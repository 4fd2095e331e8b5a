// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The closed operator catalog and its shape/type inference rules.
//!
//! Every operator the IR understands is a variant of [`Operator`], carrying a
//! typed parameter record. [`Operator::infer`] is the single inference entry
//! point used by both the graph builder and the importer, so a graph built by
//! hand and one parsed from an interchange model agree on every shape.

mod conv;
mod elementwise;
mod gather;
mod layout;
mod matmul;
mod norm;
mod pool;
mod reduce;

pub use conv::{AutoPad, ConvParams};
pub use elementwise::{BinaryOp, ClipParams, UnaryOp};
pub use gather::GatherParams;
pub use layout::{PadMode, PadParams, ReshapeParams, SliceParams, SliceRange};
pub use matmul::GemmParams;
pub use norm::BatchNormParams;
pub use pool::PoolParams;
pub use reduce::{ReduceOp, ReduceParams};

use crate::OpError;
use tensor_core::{DType, Shape};

/// Element type and concrete shape of a value flowing through the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TensorType {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorType {
    pub fn new(dtype: DType, shape: impl Into<Shape>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }

    /// Returns the rank of the shape.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the dimensions.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }
}

impl std::fmt::Display for TensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.dtype, self.shape)
    }
}

/// Operator kinds, named as the interchange format names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Conv,
    Gemm,
    MatMul,
    BatchNormalization,
    MaxPool,
    AveragePool,
    GlobalAveragePool,
    GlobalMaxPool,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Relu,
    Sigmoid,
    Tanh,
    Abs,
    Identity,
    Softmax,
    Flatten,
    Reshape,
    Concat,
    Gather,
    GatherElements,
    ReduceMean,
    ReduceMax,
    ReduceMin,
    ReduceSum,
    Slice,
    Pad,
    Where,
    Clip,
}

impl OpKind {
    /// Every supported kind, in catalog order.
    pub const ALL: [OpKind; 32] = [
        Self::Conv,
        Self::Gemm,
        Self::MatMul,
        Self::BatchNormalization,
        Self::MaxPool,
        Self::AveragePool,
        Self::GlobalAveragePool,
        Self::GlobalMaxPool,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Pow,
        Self::Relu,
        Self::Sigmoid,
        Self::Tanh,
        Self::Abs,
        Self::Identity,
        Self::Softmax,
        Self::Flatten,
        Self::Reshape,
        Self::Concat,
        Self::Gather,
        Self::GatherElements,
        Self::ReduceMean,
        Self::ReduceMax,
        Self::ReduceMin,
        Self::ReduceSum,
        Self::Slice,
        Self::Pad,
        Self::Where,
        Self::Clip,
    ];

    /// Returns the interchange `op_type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conv => "Conv",
            Self::Gemm => "Gemm",
            Self::MatMul => "MatMul",
            Self::BatchNormalization => "BatchNormalization",
            Self::MaxPool => "MaxPool",
            Self::AveragePool => "AveragePool",
            Self::GlobalAveragePool => "GlobalAveragePool",
            Self::GlobalMaxPool => "GlobalMaxPool",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::Div => "Div",
            Self::Pow => "Pow",
            Self::Relu => "Relu",
            Self::Sigmoid => "Sigmoid",
            Self::Tanh => "Tanh",
            Self::Abs => "Abs",
            Self::Identity => "Identity",
            Self::Softmax => "Softmax",
            Self::Flatten => "Flatten",
            Self::Reshape => "Reshape",
            Self::Concat => "Concat",
            Self::Gather => "Gather",
            Self::GatherElements => "GatherElements",
            Self::ReduceMean => "ReduceMean",
            Self::ReduceMax => "ReduceMax",
            Self::ReduceMin => "ReduceMin",
            Self::ReduceSum => "ReduceSum",
            Self::Slice => "Slice",
            Self::Pad => "Pad",
            Self::Where => "Where",
            Self::Clip => "Clip",
        }
    }

    /// Looks up a kind by its exact `op_type` string.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }

    /// Returns the accepted range of runtime (non-folded) inputs.
    ///
    /// Operands the interchange format passes as constant inputs but the IR
    /// stores as parameters (reshape targets, slice bounds, pad amounts,
    /// clip bounds, reduce axes) are not counted.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Conv | Self::Gemm => (2, 3),
            Self::MatMul | Self::Gather | Self::GatherElements => (2, 2),
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Pow => (2, 2),
            Self::BatchNormalization => (5, 5),
            Self::Where => (3, 3),
            Self::Concat => (1, usize::MAX),
            _ => (1, 1),
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully parameterized operator.
///
/// Parameters are stored in the interchange format's own conventions
/// (begin-then-end pad order, signed axes, half-open slice bounds) so that
/// export is a direct re-encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Conv(ConvParams),
    Gemm(GemmParams),
    MatMul,
    BatchNormalization(BatchNormParams),
    MaxPool(PoolParams),
    AveragePool(PoolParams),
    GlobalAveragePool,
    GlobalMaxPool,
    Binary(BinaryOp),
    Unary(UnaryOp),
    Softmax { axis: i64 },
    Flatten { axis: i64 },
    Reshape(ReshapeParams),
    Concat { axis: i64 },
    Gather(GatherParams),
    GatherElements(GatherParams),
    Reduce(ReduceParams),
    Slice(SliceParams),
    Pad(PadParams),
    Where,
    Clip(ClipParams),
}

impl Operator {
    /// Returns the catalog kind of this operator.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Conv(_) => OpKind::Conv,
            Self::Gemm(_) => OpKind::Gemm,
            Self::MatMul => OpKind::MatMul,
            Self::BatchNormalization(_) => OpKind::BatchNormalization,
            Self::MaxPool(_) => OpKind::MaxPool,
            Self::AveragePool(_) => OpKind::AveragePool,
            Self::GlobalAveragePool => OpKind::GlobalAveragePool,
            Self::GlobalMaxPool => OpKind::GlobalMaxPool,
            Self::Binary(op) => op.kind(),
            Self::Unary(op) => op.kind(),
            Self::Softmax { .. } => OpKind::Softmax,
            Self::Flatten { .. } => OpKind::Flatten,
            Self::Reshape(_) => OpKind::Reshape,
            Self::Concat { .. } => OpKind::Concat,
            Self::Gather(_) => OpKind::Gather,
            Self::GatherElements(_) => OpKind::GatherElements,
            Self::Reduce(p) => p.op.kind(),
            Self::Slice(_) => OpKind::Slice,
            Self::Pad(_) => OpKind::Pad,
            Self::Where => OpKind::Where,
            Self::Clip(_) => OpKind::Clip,
        }
    }

    /// Checks the input count against [`OpKind::arity`].
    pub fn check_arity(&self, actual: usize) -> Result<(), OpError> {
        let op = self.kind();
        let (min, max) = op.arity();
        if actual < min || actual > max {
            let expected = if min == max {
                min.to_string()
            } else if max == usize::MAX {
                format!("at least {min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(OpError::Arity {
                op,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Infers output types from input types.
    ///
    /// Inference is deterministic: the same operator and inputs always
    /// produce the same outputs or the same error.
    pub fn infer(&self, inputs: &[TensorType]) -> Result<Vec<TensorType>, OpError> {
        self.check_arity(inputs.len())?;
        let out = match self {
            Self::Conv(p) => conv::infer(p, inputs)?,
            Self::Gemm(p) => matmul::infer_gemm(p, inputs)?,
            Self::MatMul => matmul::infer_matmul(inputs)?,
            Self::BatchNormalization(p) => norm::infer(p, inputs)?,
            Self::MaxPool(p) => pool::infer(OpKind::MaxPool, p, inputs)?,
            Self::AveragePool(p) => pool::infer(OpKind::AveragePool, p, inputs)?,
            Self::GlobalAveragePool => pool::infer_global(OpKind::GlobalAveragePool, inputs)?,
            Self::GlobalMaxPool => pool::infer_global(OpKind::GlobalMaxPool, inputs)?,
            Self::Binary(op) => elementwise::infer_binary(*op, inputs)?,
            Self::Unary(_) => inputs[0].clone(),
            Self::Softmax { axis } => {
                normalize_axis(OpKind::Softmax, *axis, inputs[0].rank())?;
                inputs[0].clone()
            }
            Self::Flatten { axis } => layout::infer_flatten(*axis, inputs)?,
            Self::Reshape(p) => layout::infer_reshape(p, inputs)?,
            Self::Concat { axis } => layout::infer_concat(*axis, inputs)?,
            Self::Gather(p) => gather::infer_gather(p, inputs)?,
            Self::GatherElements(p) => gather::infer_gather_elements(p, inputs)?,
            Self::Reduce(p) => reduce::infer(p, inputs)?,
            Self::Slice(p) => layout::infer_slice(p, inputs)?,
            Self::Pad(p) => layout::infer_pad(p, inputs)?,
            Self::Where => elementwise::infer_where(inputs)?,
            Self::Clip(p) => elementwise::infer_clip(p, inputs)?,
        };
        Ok(vec![out])
    }
}

/// Normalizes `axis` into `0..rank`, accepting negative values from the back.
pub fn normalize_axis(op: OpKind, axis: i64, rank: usize) -> Result<usize, OpError> {
    let r = rank as i64;
    if axis < -r || axis >= r {
        return Err(OpError::param(
            op,
            format!("axis {axis} out of range for rank {rank}"),
        ));
    }
    Ok(if axis < 0 { axis + r } else { axis } as usize)
}

/// Like [`normalize_axis`] but also accepts `axis == rank`.
pub(crate) fn normalize_axis_inclusive(op: OpKind, axis: i64, rank: usize) -> Result<usize, OpError> {
    let r = rank as i64;
    if axis < -r || axis > r {
        return Err(OpError::param(
            op,
            format!("axis {axis} out of range [-{rank}, {rank}]"),
        ));
    }
    Ok(if axis < 0 { axis + r } else { axis } as usize)
}

/// Normalizes a list of axes and rejects duplicates.
pub(crate) fn normalize_axes(op: OpKind, axes: &[i64], rank: usize) -> Result<Vec<usize>, OpError> {
    let mut out = Vec::with_capacity(axes.len());
    for &axis in axes {
        let a = normalize_axis(op, axis, rank)?;
        if out.contains(&a) {
            return Err(OpError::param(op, format!("axis {axis} listed twice")));
        }
        out.push(a);
    }
    Ok(out)
}

/// Fails unless all inputs share one element type.
pub(crate) fn same_dtype(op: OpKind, inputs: &[&TensorType]) -> Result<DType, OpError> {
    let first = inputs[0].dtype;
    for t in &inputs[1..] {
        if t.dtype != first {
            return Err(OpError::dtype(
                op,
                format!("operands are {first} and {}", t.dtype),
            ));
        }
    }
    Ok(first)
}
