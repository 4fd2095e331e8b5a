// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-bridge convert`: import, then export under the export settings.

use anyhow::Context;
use onnx_bridge::{BridgeConfig, NullRuntime, Translator};
use onnx_proto::ModelProto;
use std::path::PathBuf;
use tracing::info;

pub fn execute(
    mut config: BridgeConfig,
    input: PathBuf,
    output: PathBuf,
    opset: Option<i64>,
) -> anyhow::Result<()> {
    if let Some(v) = opset {
        config.export.opset_version = v;
    }
    let translator = Translator::new(config, &NullRuntime)?;

    let proto = ModelProto::from_file(&input)
        .with_context(|| format!("failed to read model from '{}'", input.display()))?;
    let graph = translator
        .import(&proto)
        .with_context(|| format!("failed to import '{}'", input.display()))?;
    let exported = translator.export(&graph)?;
    exported
        .write_file(&output)
        .with_context(|| format!("failed to write '{}'", output.display()))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        opset = translator.config().export.opset_version,
        "converted"
    );
    println!(
        "  {} -> {} ({} nodes, opset {})",
        input.display(),
        output.display(),
        exported.graph.node.len(),
        translator.config().export.opset_version
    );
    Ok(())
}
