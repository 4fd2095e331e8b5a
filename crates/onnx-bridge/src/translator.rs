// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One entry point bundling a validated configuration with a runtime.

use crate::config::BridgeConfig;
use crate::handler::GraphHandler;
use crate::runtime::{NullRuntime, Runtime};
use crate::{exporter, importer, TranslateError};
use model_ir::{Complete, ModelGraph};
use onnx_proto::ModelProto;

static NULL: NullRuntime = NullRuntime;

/// Translates in both directions under one configuration.
pub struct Translator<'r> {
    config: BridgeConfig,
    runtime: &'r dyn Runtime,
}

impl<'r> Translator<'r> {
    /// Validates `config` and binds it to `runtime`.
    pub fn new(config: BridgeConfig, runtime: &'r dyn Runtime) -> Result<Self, TranslateError> {
        config.validate()?;
        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn import(&self, model: &ModelProto) -> Result<ModelGraph<Complete>, TranslateError> {
        importer::import(model, &self.config.import, self.runtime)
    }

    pub fn export(&self, graph: &ModelGraph<Complete>) -> Result<ModelProto, TranslateError> {
        exporter::export(graph, &self.config.export)
    }

    /// Starts a frontend graph that exports with this translator's settings.
    pub fn handler(&self, name: &str) -> GraphHandler<'r> {
        GraphHandler::new(name, self.runtime, self.config.export.clone())
    }
}

impl Translator<'static> {
    /// Default configuration, no backend.
    pub fn with_defaults() -> Self {
        Self {
            config: BridgeConfig::default(),
            runtime: &NULL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::ErrorKind;

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = BridgeConfig::default();
        config.export.opset_version = 99;
        let err = Translator::new(config, &NullRuntime).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_handler_uses_export_settings() {
        let mut config = BridgeConfig::default();
        config.export.opset_version = 14;
        let t = Translator::new(config, &NullRuntime).unwrap();
        let mut h = t.handler("g");
        let x = h.tensor(&[3], 1).unwrap();
        let y = h.relu(x, None).unwrap();
        h.mark_output(y).unwrap();
        let m = h.materialize().unwrap();
        assert_eq!(m.default_opset(), Some(14));

        let back = t.import(&m).unwrap();
        assert_eq!(back.num_nodes(), 1);
    }

    #[test]
    fn test_defaults() {
        let t = Translator::with_defaults();
        assert_eq!(t.config().export.opset_version, 18);
    }
}
