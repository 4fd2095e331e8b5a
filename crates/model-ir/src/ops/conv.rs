// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution and the sliding-window arithmetic shared with pooling.

use super::{OpKind, TensorType};
use crate::OpError;
use tensor_core::Shape;

/// Automatic padding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoPad {
    /// Explicit `pads` are used.
    #[default]
    NotSet,
    /// No padding.
    Valid,
    /// Output is `ceil(in / stride)`; odd padding goes at the end.
    SameUpper,
    /// Output is `ceil(in / stride)`; odd padding goes at the beginning.
    SameLower,
}

impl AutoPad {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "NOTSET",
            Self::Valid => "VALID",
            Self::SameUpper => "SAME_UPPER",
            Self::SameLower => "SAME_LOWER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NOTSET" | "" => Some(Self::NotSet),
            "VALID" => Some(Self::Valid),
            "SAME_UPPER" => Some(Self::SameUpper),
            "SAME_LOWER" => Some(Self::SameLower),
            _ => None,
        }
    }
}

/// Convolution parameters.
///
/// Empty vectors mean "use the default": kernel from the weight, zero pads,
/// unit strides and dilations. `pads` is `[x1_begin, x2_begin, ..., x1_end,
/// x2_end, ...]` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvParams {
    pub kernel_shape: Vec<usize>,
    pub pads: Vec<usize>,
    pub strides: Vec<usize>,
    pub dilations: Vec<usize>,
    pub group: usize,
    pub auto_pad: AutoPad,
}

impl Default for ConvParams {
    fn default() -> Self {
        Self {
            kernel_shape: Vec::new(),
            pads: Vec::new(),
            strides: Vec::new(),
            dilations: Vec::new(),
            group: 1,
            auto_pad: AutoPad::NotSet,
        }
    }
}

/// Resolved per-axis window configuration.
#[derive(Debug, Clone)]
pub(crate) struct Window {
    pub kernel: Vec<usize>,
    pub pads: Vec<usize>,
    pub strides: Vec<usize>,
    pub dilations: Vec<usize>,
    pub auto_pad: AutoPad,
    pub ceil_mode: bool,
}

impl Window {
    /// Fills defaults and validates lengths against the spatial rank.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        op: OpKind,
        spatial: usize,
        kernel: Vec<usize>,
        pads: &[usize],
        strides: &[usize],
        dilations: &[usize],
        auto_pad: AutoPad,
        ceil_mode: bool,
    ) -> Result<Self, OpError> {
        if kernel.len() != spatial {
            return Err(OpError::rank(
                op,
                format!("kernel has {} dims, input has {spatial} spatial dims", kernel.len()),
            ));
        }
        if kernel.contains(&0) {
            return Err(OpError::param(op, "kernel dimensions must be positive"));
        }
        let pads = match pads.len() {
            0 => vec![0; 2 * spatial],
            n if n == 2 * spatial => pads.to_vec(),
            n => {
                return Err(OpError::param(
                    op,
                    format!("pads has {n} values, expected {}", 2 * spatial),
                ))
            }
        };
        let strides = per_axis(op, "strides", strides, spatial)?;
        let dilations = per_axis(op, "dilations", dilations, spatial)?;
        Ok(Self {
            kernel,
            pads,
            strides,
            dilations,
            auto_pad,
            ceil_mode,
        })
    }

    /// Computes the output spatial dims for the given input spatial dims.
    pub fn output_dims(&self, op: OpKind, input: &[usize]) -> Result<Vec<usize>, OpError> {
        let spatial = input.len();
        let mut out = Vec::with_capacity(spatial);
        for i in 0..spatial {
            let dim = match self.auto_pad {
                AutoPad::SameUpper | AutoPad::SameLower => input[i].div_ceil(self.strides[i]),
                AutoPad::Valid => window_output(
                    op,
                    input[i],
                    self.kernel[i],
                    0,
                    0,
                    self.strides[i],
                    self.dilations[i],
                    self.ceil_mode,
                )?,
                AutoPad::NotSet => window_output(
                    op,
                    input[i],
                    self.kernel[i],
                    self.pads[i],
                    self.pads[i + spatial],
                    self.strides[i],
                    self.dilations[i],
                    self.ceil_mode,
                )?,
            };
            out.push(dim);
        }
        Ok(out)
    }
}

fn per_axis(op: OpKind, what: &str, values: &[usize], spatial: usize) -> Result<Vec<usize>, OpError> {
    let values = if values.is_empty() {
        vec![1; spatial]
    } else if values.len() == spatial {
        values.to_vec()
    } else {
        return Err(OpError::param(
            op,
            format!("{what} has {} values, expected {spatial}", values.len()),
        ));
    };
    if values.contains(&0) {
        return Err(OpError::param(op, format!("{what} must be positive")));
    }
    Ok(values)
}

/// Output length of one sliding-window axis.
///
/// `floor((in + pb + pe - d*(k-1) - 1) / s) + 1`, or the ceiling variant
/// where a window starting entirely inside the end padding is dropped.
#[allow(clippy::too_many_arguments)]
pub(crate) fn window_output(
    op: OpKind,
    input: usize,
    kernel: usize,
    pad_begin: usize,
    pad_end: usize,
    stride: usize,
    dilation: usize,
    ceil_mode: bool,
) -> Result<usize, OpError> {
    let effective = dilation
        .checked_mul(kernel - 1)
        .and_then(|e| e.checked_add(1))
        .ok_or_else(|| {
            OpError::param(op, format!("dilation {dilation} over kernel {kernel} overflows"))
        })?;
    let padded = input
        .checked_add(pad_begin)
        .and_then(|p| p.checked_add(pad_end))
        .ok_or_else(|| {
            OpError::param(op, format!("pads ({pad_begin}, {pad_end}) on input {input} overflow"))
        })?;
    if padded < effective {
        return Err(OpError::shape(
            op,
            format!("window of extent {effective} exceeds padded input {padded}"),
        ));
    }
    let span = padded - effective;
    if !ceil_mode {
        return Ok(span / stride + 1);
    }
    let last = span.div_ceil(stride);
    // the window at `last` must start inside the input or the begin padding
    match last.checked_mul(stride) {
        Some(start) if start < input + pad_begin => Ok(last + 1),
        _ => Ok(last),
    }
}

pub(super) fn infer(p: &ConvParams, inputs: &[TensorType]) -> Result<TensorType, OpError> {
    let op = OpKind::Conv;
    let (x, w) = (&inputs[0], &inputs[1]);
    if x.rank() < 3 {
        return Err(OpError::rank(op, format!("input {} needs rank >= 3", x.shape)));
    }
    if w.rank() != x.rank() {
        return Err(OpError::rank(
            op,
            format!("weight {} does not match input rank {}", w.shape, x.rank()),
        ));
    }
    super::same_dtype(op, &[x, w])?;
    if p.group == 0 {
        return Err(OpError::param(op, "group must be positive"));
    }

    let (xd, wd) = (x.dims(), w.dims());
    let (channels, filters) = (xd[1], wd[0]);
    if wd[1].checked_mul(p.group) != Some(channels) {
        return Err(OpError::shape(
            op,
            format!(
                "input has {channels} channels, weight expects {} x group {}",
                wd[1], p.group
            ),
        ));
    }
    if filters % p.group != 0 {
        return Err(OpError::shape(
            op,
            format!("{filters} filters not divisible by group {}", p.group),
        ));
    }

    let spatial = x.rank() - 2;
    let kernel = wd[2..].to_vec();
    if !p.kernel_shape.is_empty() && p.kernel_shape != kernel {
        return Err(OpError::shape(
            op,
            format!("kernel_shape {:?} disagrees with weight {}", p.kernel_shape, w.shape),
        ));
    }
    let window = Window::resolve(op, spatial, kernel, &p.pads, &p.strides, &p.dilations, p.auto_pad, false)?;

    if let Some(b) = inputs.get(2) {
        super::same_dtype(op, &[x, b])?;
        if b.dims() != [filters] {
            return Err(OpError::shape(
                op,
                format!("bias {} must be [{filters}]", b.shape),
            ));
        }
    }

    let mut dims = vec![xd[0], filters];
    dims.extend(window.output_dims(op, &xd[2..])?);
    Ok(TensorType::new(x.dtype, Shape::new(dims)))
}

#[cfg(test)]
mod tests {
    use super::super::Operator;
    use super::*;
    use crate::ErrorKind;
    use tensor_core::DType;

    fn conv(p: ConvParams, x: &[usize], w: &[usize]) -> Result<Vec<TensorType>, OpError> {
        Operator::Conv(p).infer(&[
            TensorType::new(DType::F32, x),
            TensorType::new(DType::F32, w),
        ])
    }

    #[test]
    fn test_conv_pads_strides_dilations() {
        let p = ConvParams {
            pads: vec![1, 1, 1, 1],
            strides: vec![2, 1],
            dilations: vec![1, 2],
            ..Default::default()
        };
        let out = conv(p, &[1, 3, 4, 4], &[2, 3, 3, 3]).unwrap();
        assert_eq!(out[0].shape, Shape::from([1, 2, 2, 2]));
    }

    #[test]
    fn test_conv_defaults() {
        let out = conv(ConvParams::default(), &[1, 3, 5, 5], &[8, 3, 3, 3]).unwrap();
        assert_eq!(out[0].shape, Shape::from([1, 8, 3, 3]));
    }

    #[test]
    fn test_conv_same_upper() {
        let p = ConvParams {
            strides: vec![2, 2],
            auto_pad: AutoPad::SameUpper,
            ..Default::default()
        };
        let out = conv(p, &[1, 3, 7, 8], &[4, 3, 3, 3]).unwrap();
        assert_eq!(out[0].shape, Shape::from([1, 4, 4, 4]));
    }

    #[test]
    fn test_conv_grouped() {
        let p = ConvParams {
            group: 2,
            ..Default::default()
        };
        let out = conv(p.clone(), &[1, 4, 6, 6], &[6, 2, 3, 3]).unwrap();
        assert_eq!(out[0].shape, Shape::from([1, 6, 4, 4]));
        let err = conv(p, &[1, 4, 6, 6], &[6, 4, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_conv_bias_shape() {
        let inputs = [
            TensorType::new(DType::F32, [1, 3, 4, 4]),
            TensorType::new(DType::F32, [2, 3, 3, 3]),
            TensorType::new(DType::F32, [3]),
        ];
        let err = Operator::Conv(ConvParams::default()).infer(&inputs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_conv_rank_mismatch() {
        let err = conv(ConvParams::default(), &[3, 4], &[2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RankMismatch);
    }

    #[test]
    fn test_conv_zero_stride_rejected() {
        let p = ConvParams {
            strides: vec![0, 1],
            ..Default::default()
        };
        let err = conv(p, &[1, 3, 4, 4], &[2, 3, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);
    }

    #[test]
    fn test_kernel_larger_than_input() {
        let err = conv(ConvParams::default(), &[1, 1, 2, 2], &[1, 1, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_oversized_attributes_rejected() {
        let p = ConvParams {
            dilations: vec![usize::MAX, 1],
            ..Default::default()
        };
        let err = conv(p, &[1, 3, 4, 4], &[2, 3, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);

        let p = ConvParams {
            pads: vec![usize::MAX, 0, 1, 0],
            ..Default::default()
        };
        let err = conv(p, &[1, 3, 4, 4], &[2, 3, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAttributeValue);

        let p = ConvParams {
            group: usize::MAX,
            ..Default::default()
        };
        let err = conv(p, &[1, 3, 4, 4], &[2, 3, 3, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_window_ceil_mode() {
        // 6 - 3 = 3, 3 / 2 = 1.5
        assert_eq!(window_output(OpKind::MaxPool, 6, 3, 0, 0, 2, 1, false).unwrap(), 2);
        assert_eq!(window_output(OpKind::MaxPool, 6, 3, 0, 0, 2, 1, true).unwrap(), 3);
        // a fourth window would start inside the end padding
        assert_eq!(window_output(OpKind::MaxPool, 5, 2, 0, 2, 2, 1, true).unwrap(), 3);
    }

    #[test]
    fn test_auto_pad_names() {
        assert_eq!(AutoPad::from_name("SAME_LOWER"), Some(AutoPad::SameLower));
        assert_eq!(AutoPad::from_name("SAME"), None);
        assert_eq!(AutoPad::Valid.as_str(), "VALID");
    }
}
