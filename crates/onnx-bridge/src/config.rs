// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Translation settings loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! [import]
//! verify_declared_shapes = true
//! default_opset = 18
//!
//! [import.symbolic_dims]
//! batch = 1
//!
//! [export]
//! opset_version = 18
//! ir_version = 8
//! producer_name = "onnx-bridge"
//! emit_intermediate_value_info = true
//! ```

use crate::TranslateError;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

/// Operator-set versions the exporter can target.
pub const SUPPORTED_OPSETS: RangeInclusive<i64> = 13..=21;

/// Settings for both translation directions.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Importer settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Check declared output / value_info types and shapes against inference.
    pub verify_declared_shapes: bool,
    /// Opset assumed when a model imports no default-domain operator set.
    pub default_opset: i64,
    /// Concrete sizes for symbolic input dims (e.g. `batch = 1`).
    pub symbolic_dims: BTreeMap<String, usize>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            verify_declared_shapes: true,
            default_opset: 18,
            symbolic_dims: BTreeMap::new(),
        }
    }
}

/// Exporter settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default-domain operator-set version to target.
    pub opset_version: i64,
    pub ir_version: i64,
    pub producer_name: String,
    /// Annotate every intermediate value, not just inputs and outputs.
    pub emit_intermediate_value_info: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            opset_version: 18,
            ir_version: 8,
            producer_name: "onnx-bridge".to_string(),
            emit_intermediate_value_info: true,
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TranslateError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TranslateError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, TranslateError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| TranslateError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, TranslateError> {
        toml::to_string_pretty(self)
            .map_err(|e| TranslateError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), TranslateError> {
        if !SUPPORTED_OPSETS.contains(&self.export.opset_version) {
            return Err(TranslateError::Config(format!(
                "export.opset_version {} outside supported range {}..={}",
                self.export.opset_version,
                SUPPORTED_OPSETS.start(),
                SUPPORTED_OPSETS.end()
            )));
        }
        if self.export.ir_version < 3 {
            return Err(TranslateError::Config(format!(
                "export.ir_version {} is too old",
                self.export.ir_version
            )));
        }
        if self.import.default_opset < 1 {
            return Err(TranslateError::Config(format!(
                "import.default_opset must be positive, got {}",
                self.import.default_opset
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::ErrorKind;

    #[test]
    fn test_default() {
        let c = BridgeConfig::default();
        assert!(c.import.verify_declared_shapes);
        assert_eq!(c.export.opset_version, 18);
        assert_eq!(c.export.producer_name, "onnx-bridge");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
[import]
verify_declared_shapes = false

[import.symbolic_dims]
batch = 4

[export]
opset_version = 13
emit_intermediate_value_info = false
"#;
        let c = BridgeConfig::from_toml(toml).unwrap();
        assert!(!c.import.verify_declared_shapes);
        assert_eq!(c.import.default_opset, 18);
        assert_eq!(c.import.symbolic_dims.get("batch"), Some(&4));
        assert_eq!(c.export.opset_version, 13);
        assert_eq!(c.export.ir_version, 8);
        assert!(!c.export.emit_intermediate_value_info);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(BridgeConfig::from_toml("").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let mut c = BridgeConfig::default();
        c.import.symbolic_dims.insert("seq".into(), 128);
        let toml = c.to_toml().unwrap();
        assert_eq!(BridgeConfig::from_toml(&toml).unwrap(), c);
    }

    #[test]
    fn test_rejects_unsupported_opset() {
        let err = BridgeConfig::from_toml("[export]\nopset_version = 9\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("opset_version 9"));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(BridgeConfig::from_toml("[export\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_file(Path::new("/nonexistent/bridge.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
