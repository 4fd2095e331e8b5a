// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-bridge inspect`: import a model and print the inferred graph.

use anyhow::Context;
use onnx_bridge::{BridgeConfig, NullRuntime, Translator};
use onnx_proto::ModelProto;
use std::path::PathBuf;

pub fn execute(config: BridgeConfig, model: PathBuf) -> anyhow::Result<()> {
    let proto = ModelProto::from_file(&model)
        .with_context(|| format!("failed to read model from '{}'", model.display()))?;
    let translator = Translator::new(config, &NullRuntime)?;
    let graph = translator
        .import(&proto)
        .with_context(|| format!("failed to import '{}'", model.display()))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Producer: {} {}", proto.producer_name, proto.producer_version);
    match proto.default_opset() {
        Some(v) => println!("  Opset:    {v}"),
        None => println!("  Opset:    (none, assumed {})", translator.config().import.default_opset),
    }
    println!("  {}", graph.summary());
    println!();

    // ── Inputs / outputs ───────────────────────────────────────
    for (label, ids) in [("Input", graph.inputs()), ("Output", graph.outputs())] {
        for &id in ids {
            let def = graph.tensor(id)?;
            println!(
                "  {:<7} {:<30} {}",
                label,
                truncate(def.name.as_deref().unwrap_or("-"), 30),
                def.ty
            );
        }
    }
    println!();

    // ── Nodes ──────────────────────────────────────────────────
    println!("  {:<4} {:<30} {:<20} {}", "Idx", "Name", "Op", "Output");
    println!("  {}", "-".repeat(82));
    for (idx, id) in graph.topological_order()?.into_iter().enumerate() {
        let node = graph
            .node(id)
            .with_context(|| format!("node #{} missing from graph", id.index()))?;
        let outputs: Vec<String> = node
            .outputs
            .iter()
            .map(|&o| graph.tensor_type(o).map(|t| t.to_string()))
            .collect::<Result<_, _>>()?;
        println!(
            "  {:<4} {:<30} {:<20} {}",
            idx,
            truncate(node.name.as_deref().unwrap_or("-"), 30),
            node.kind().as_str(),
            outputs.join(", "),
        );
    }
    println!();

    // ── Operator histogram ─────────────────────────────────────
    println!("  Operators:");
    for (kind, count) in graph.op_histogram() {
        println!("   {:<20} {count}", kind.as_str());
    }
    Ok(())
}

/// Truncates a string to `max_len` characters with an ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
