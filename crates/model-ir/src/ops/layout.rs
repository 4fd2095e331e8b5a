// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Data-movement operators: Flatten, Reshape, Concat, Slice, Pad.

use super::{normalize_axes, normalize_axis, normalize_axis_inclusive, OpKind, TensorType};
use crate::OpError;
use tensor_core::{Shape, Tensor};

/// Reshape target, folded from the constant `shape` operand.
///
/// `0` copies the corresponding input dim (or means a literal zero when
/// `allowzero` is set); a single `-1` is inferred from the element count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReshapeParams {
    pub shape: Vec<i64>,
    pub allowzero: bool,
}

impl ReshapeParams {
    /// Resolves the target against an input shape.
    pub fn resolve(&self, input: &Shape) -> Result<Shape, OpError> {
        let op = OpKind::Reshape;
        let total = element_count(op, input)?;
        let mut dims = Vec::with_capacity(self.shape.len());
        let mut inferred = None;
        for (i, &d) in self.shape.iter().enumerate() {
            match d {
                -1 if inferred.is_some() => {
                    return Err(OpError::param(op, "more than one -1 in target shape"));
                }
                -1 => {
                    inferred = Some(i);
                    dims.push(1);
                }
                0 if self.allowzero => dims.push(0),
                0 => match input.dim(i) {
                    Some(copied) => dims.push(copied),
                    None => {
                        return Err(OpError::param(
                            op,
                            format!("target dim {i} copies a dim the input {input} does not have"),
                        ))
                    }
                },
                d if d < 0 => {
                    return Err(OpError::param(op, format!("invalid target dim {d}")));
                }
                d => dims.push(d as usize),
            }
        }
        if self.allowzero && inferred.is_some() && dims.contains(&0) {
            return Err(OpError::param(op, "-1 cannot be combined with a literal 0"));
        }

        if let Some(i) = inferred {
            let known = element_count(op, &Shape::new(dims.clone()))?;
            if known == 0 || total % known != 0 {
                return Err(OpError::shape(
                    op,
                    format!("cannot reshape {input} ({total} elements) to {:?}", self.shape),
                ));
            }
            dims[i] = total / known;
        }
        let out = Shape::new(dims);
        let count = element_count(op, &out)?;
        if count != total {
            return Err(OpError::shape(
                op,
                format!("cannot reshape {input} ({total} elements) to {out} ({count} elements)"),
            ));
        }
        Ok(out)
    }
}

/// Element count of `shape`, failing when it does not fit in `usize`.
fn element_count(op: OpKind, shape: &Shape) -> Result<usize, OpError> {
    shape
        .checked_num_elements()
        .ok_or_else(|| OpError::shape(op, format!("{shape} has too many elements")))
}

/// One resolved slice axis: `len` elements starting at `start`, `step` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub axis: usize,
    pub start: i64,
    pub step: i64,
    pub len: usize,
}

impl SliceRange {
    /// Inclusive `(first, last)` indices, or `None` for an empty range.
    pub fn closed(&self) -> Option<(i64, i64)> {
        if self.len == 0 {
            return None;
        }
        Some((self.start, self.start + (self.len as i64 - 1) * self.step))
    }
}

/// Slice bounds folded from the constant `starts/ends/axes/steps` operands.
///
/// Ranges are half-open `[start, end)`; empty `axes` means `0..starts.len()`
/// and empty `steps` means all ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SliceParams {
    pub starts: Vec<i64>,
    pub ends: Vec<i64>,
    pub axes: Vec<i64>,
    pub steps: Vec<i64>,
}

impl SliceParams {
    /// Resolves each listed axis with the interchange clamping rules.
    pub fn resolve(&self, input: &Shape) -> Result<Vec<SliceRange>, OpError> {
        let op = OpKind::Slice;
        let n = self.starts.len();
        if self.ends.len() != n {
            return Err(OpError::param(
                op,
                format!("{n} starts but {} ends", self.ends.len()),
            ));
        }
        let axes = if self.axes.is_empty() {
            (0..n as i64).collect::<Vec<_>>()
        } else if self.axes.len() == n {
            self.axes.clone()
        } else {
            return Err(OpError::param(op, format!("{n} starts but {} axes", self.axes.len())));
        };
        let axes = normalize_axes(op, &axes, input.rank())?;
        let steps = if self.steps.is_empty() {
            vec![1; n]
        } else if self.steps.len() == n {
            self.steps.clone()
        } else {
            return Err(OpError::param(op, format!("{n} starts but {} steps", self.steps.len())));
        };

        let mut ranges = Vec::with_capacity(n);
        for i in 0..n {
            let step = steps[i];
            if step == 0 {
                return Err(OpError::param(op, "step must be non-zero"));
            }
            let axis = axes[i];
            let dim = input.dims()[axis] as i64;
            let clamp = |v: i64, lo: i64, hi: i64| {
                let v = if v < 0 { v.saturating_add(dim) } else { v };
                // not `clamp`: `hi < lo` on an empty axis walked backwards
                v.max(lo).min(hi)
            };
            let (start, end) = if step > 0 {
                (clamp(self.starts[i], 0, dim), clamp(self.ends[i], 0, dim))
            } else {
                (clamp(self.starts[i], 0, dim - 1), clamp(self.ends[i], -1, dim - 1))
            };
            // start and end are clamped to [-1, dim], so the span cannot overflow
            let span = if step > 0 { end - start } else { start - end };
            let len = if span <= 0 {
                0
            } else {
                (span as u64).div_ceil(step.unsigned_abs()) as usize
            };
            ranges.push(SliceRange {
                axis,
                start,
                step,
                len,
            });
        }
        Ok(ranges)
    }

    /// Converts the half-open ranges to inclusive `(first, last)` bounds,
    /// in the order the axes are listed.
    ///
    /// Backends that express slices as closed intervals consume this
    /// instead of re-deriving the clamping rules.
    pub fn closed_bounds(&self, input: &Shape) -> Result<Vec<Option<(i64, i64)>>, OpError> {
        Ok(self.resolve(input)?.iter().map(SliceRange::closed).collect())
    }
}

/// Padding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PadMode {
    #[default]
    Constant,
    Reflect,
    Edge,
}

impl PadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Reflect => "reflect",
            Self::Edge => "edge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "constant" => Some(Self::Constant),
            "reflect" => Some(Self::Reflect),
            "edge" => Some(Self::Edge),
            _ => None,
        }
    }
}

/// Pad amounts folded from the constant `pads` operand, as
/// `[x1_begin, x2_begin, ..., x1_end, x2_end, ...]` over `axes` (all axes
/// when empty). Negative amounts crop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PadParams {
    pub pads: Vec<i64>,
    pub mode: PadMode,
    pub constant_value: Option<Tensor>,
    pub axes: Vec<i64>,
}

pub(super) fn infer_flatten(axis: i64, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let x = &inputs[0];
    let axis = normalize_axis_inclusive(OpKind::Flatten, axis, x.rank())?;
    let (outer, inner) = x.dims().split_at(axis);
    let outer = element_count(OpKind::Flatten, &Shape::from(outer))?;
    let inner = element_count(OpKind::Flatten, &Shape::from(inner))?;
    Ok(TensorType::new(x.dtype, [outer, inner]))
}

pub(super) fn infer_reshape(p: &ReshapeParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let x = &inputs[0];
    Ok(TensorType::new(x.dtype, p.resolve(&x.shape)?))
}

pub(super) fn infer_concat(axis: i64, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Concat;
    let first = &inputs[0];
    let rank = first.rank();
    let axis = normalize_axis(op, axis, rank)?;
    let mut dims = first.dims().to_vec();
    for t in &inputs[1..] {
        if t.dtype != first.dtype {
            return Err(OpError::dtype(op, format!("operands are {} and {}", first.dtype, t.dtype)));
        }
        if t.rank() != rank {
            return Err(OpError::rank(
                op,
                format!("{} and {} differ in rank", first.shape, t.shape),
            ));
        }
        for (i, (&a, &b)) in first.dims().iter().zip(t.dims()).enumerate() {
            if i != axis && a != b {
                return Err(OpError::shape(
                    op,
                    format!("{} and {} differ outside axis {axis}", first.shape, t.shape),
                ));
            }
        }
        dims[axis] = dims[axis].checked_add(t.dims()[axis]).ok_or_else(|| {
            OpError::shape(op, format!("concatenated axis {axis} is too large"))
        })?;
    }
    Ok(TensorType::new(first.dtype, Shape::new(dims)))
}

pub(super) fn infer_slice(p: &SliceParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let x = &inputs[0];
    let mut dims = x.dims().to_vec();
    for range in p.resolve(&x.shape)? {
        dims[range.axis] = range.len;
    }
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}

pub(super) fn infer_pad(p: &PadParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Pad;
    let x = &inputs[0];
    let rank = x.rank();
    let axes = if p.axes.is_empty() {
        (0..rank).collect()
    } else {
        normalize_axes(op, &p.axes, rank)?
    };
    let n = axes.len();
    if p.pads.len() != 2 * n {
        return Err(OpError::param(
            op,
            format!("pads has {} values, expected {}", p.pads.len(), 2 * n),
        ));
    }
    if let Some(value) = &p.constant_value {
        if value.dtype() != x.dtype {
            return Err(OpError::dtype(
                op,
                format!("constant_value is {} but input is {}", value.dtype(), x.dtype),
            ));
        }
    }

    let mut dims = x.dims().to_vec();
    for (i, &axis) in axes.iter().enumerate() {
        let padded = i64::try_from(dims[axis])
            .ok()
            .and_then(|d| d.checked_add(p.pads[i])?.checked_add(p.pads[i + n]))
            .ok_or_else(|| {
                OpError::param(
                    op,
                    format!(
                        "pads ({}, {}) on axis {axis} of {} overflow",
                        p.pads[i],
                        p.pads[i + n],
                        x.shape
                    ),
                )
            })?;
        if padded < 0 {
            return Err(OpError::shape(
                op,
                format!("padding axis {axis} of {} yields {padded}", x.shape),
            ));
        }
        dims[axis] = padded as usize;
    }
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}
