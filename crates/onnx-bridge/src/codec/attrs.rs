// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed attribute access for decoders and attribute builders for encoders.

use crate::TranslateError;
use onnx_proto::{AttributeProto, AttributeValue};
use tracing::warn;

/// Read-only view of a node's attributes that reports errors against the node.
pub(crate) struct Attributes<'a> {
    node: &'a str,
    attrs: &'a [AttributeProto],
}

impl<'a> Attributes<'a> {
    pub(crate) fn new(node: &'a str, attrs: &'a [AttributeProto]) -> Self {
        Self { node, attrs }
    }

    /// Logs every attribute not in `known`. Unknown attributes are ignored.
    pub(crate) fn warn_unknown(&self, op_type: &str, known: &[&str]) {
        for attr in self.attrs {
            if !known.contains(&attr.name.as_str()) {
                warn!(
                    node = self.node,
                    attribute = %attr.name,
                    "ignoring attribute unknown to {op_type}"
                );
            }
        }
    }

    fn get(&self, name: &str) -> Option<&'a AttributeValue> {
        self.attrs.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    fn mismatch(&self, name: &str, expected: &'static str, actual: &AttributeValue) -> TranslateError {
        TranslateError::AttributeTypeMismatch {
            node: self.node.to_string(),
            attribute: name.to_string(),
            expected,
            actual: actual.type_name(),
        }
    }

    fn missing(&self, name: &str) -> TranslateError {
        TranslateError::AttributeMissing {
            node: self.node.to_string(),
            attribute: name.to_string(),
        }
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub(crate) fn int(&self, name: &str) -> Result<Option<i64>, TranslateError> {
        match self.get(name) {
            None => Ok(None),
            Some(AttributeValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(name, "INT", other)),
        }
    }

    pub(crate) fn int_or(&self, name: &str, default: i64) -> Result<i64, TranslateError> {
        Ok(self.int(name)?.unwrap_or(default))
    }

    pub(crate) fn require_int(&self, name: &str) -> Result<i64, TranslateError> {
        self.int(name)?.ok_or_else(|| self.missing(name))
    }

    pub(crate) fn float(&self, name: &str) -> Result<Option<f32>, TranslateError> {
        match self.get(name) {
            None => Ok(None),
            Some(AttributeValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(name, "FLOAT", other)),
        }
    }

    pub(crate) fn float_or(&self, name: &str, default: f32) -> Result<f32, TranslateError> {
        Ok(self.float(name)?.unwrap_or(default))
    }

    pub(crate) fn ints(&self, name: &str) -> Result<Option<&'a [i64]>, TranslateError> {
        match self.get(name) {
            None => Ok(None),
            Some(AttributeValue::Ints(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(self.mismatch(name, "INTS", other)),
        }
    }

    pub(crate) fn require_ints(&self, name: &str) -> Result<&'a [i64], TranslateError> {
        self.ints(name)?.ok_or_else(|| self.missing(name))
    }

    pub(crate) fn string(&self, name: &str) -> Result<Option<&'a str>, TranslateError> {
        match self.get(name) {
            None => Ok(None),
            Some(AttributeValue::String(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(self.mismatch(name, "STRING", other)),
        }
    }

    /// Reads a 0/1 integer flag.
    pub(crate) fn flag(&self, name: &str, default: bool) -> Result<bool, TranslateError> {
        match self.int(name)? {
            None => Ok(default),
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(v) => Err(TranslateError::unsupported_value(
                self.node,
                name,
                format!("expected 0 or 1, got {v}"),
            )),
        }
    }

    /// Reads a list of sizes that must all be `>= 1` (strides, dilations, kernels).
    pub(crate) fn positive_sizes(&self, name: &str) -> Result<Vec<usize>, TranslateError> {
        self.sizes(name, 1)
    }

    /// Reads a list of sizes that must all be `>= 0` (pads).
    pub(crate) fn sizes_or_empty(&self, name: &str) -> Result<Vec<usize>, TranslateError> {
        self.sizes(name, 0)
    }

    fn sizes(&self, name: &str, min: i64) -> Result<Vec<usize>, TranslateError> {
        let Some(values) = self.ints(name)? else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|&v| {
                if v < min {
                    Err(TranslateError::unsupported_value(
                        self.node,
                        name,
                        format!("{values:?} contains {v}, values must be >= {min}"),
                    ))
                } else {
                    Ok(v as usize)
                }
            })
            .collect()
    }
}

/// Accumulates encoded attributes, skipping values equal to their default.
#[derive(Default)]
pub(crate) struct AttrBuilder {
    attrs: Vec<AttributeProto>,
}

impl AttrBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn int(mut self, name: &str, value: i64) -> Self {
        self.attrs.push(AttributeProto::int(name, value));
        self
    }

    pub(crate) fn int_unless(self, name: &str, value: i64, default: i64) -> Self {
        if value == default {
            self
        } else {
            self.int(name, value)
        }
    }

    pub(crate) fn flag_unless(self, name: &str, value: bool, default: bool) -> Self {
        self.int_unless(name, i64::from(value), i64::from(default))
    }

    pub(crate) fn float(mut self, name: &str, value: f32) -> Self {
        self.attrs.push(AttributeProto::float(name, value));
        self
    }

    pub(crate) fn float_unless(self, name: &str, value: f32, default: f32) -> Self {
        if value == default {
            self
        } else {
            self.float(name, value)
        }
    }

    pub(crate) fn ints(mut self, name: &str, values: &[i64]) -> Self {
        self.attrs.push(AttributeProto::ints(name, values));
        self
    }

    /// Emits `values` unless empty.
    pub(crate) fn sizes(self, name: &str, values: &[usize]) -> Self {
        if values.is_empty() {
            self
        } else {
            let v: Vec<i64> = values.iter().map(|&x| x as i64).collect();
            self.ints(name, &v)
        }
    }

    pub(crate) fn string_unless(mut self, name: &str, value: &str, default: &str) -> Self {
        if value != default {
            self.attrs.push(AttributeProto::string(name, value));
        }
        self
    }

    pub(crate) fn build(self) -> Vec<AttributeProto> {
        self.attrs
    }
}
