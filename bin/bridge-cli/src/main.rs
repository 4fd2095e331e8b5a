// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-bridge
//!
//! Command-line interface for translating models between the ONNX model
//! tree (`.onnx` protobuf or JSON) and the typed graph IR.
//!
//! ## Usage
//! ```bash
//! # Import a model and print its inferred graph
//! onnx-bridge inspect --model ./model.onnx
//!
//! # Re-export a model for another opset
//! onnx-bridge convert --input ./model.onnx --output ./model-13.json --opset 13
//!
//! # Print the effective configuration
//! onnx-bridge --config ./bridge.toml config
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "onnx-bridge",
    about = "Translate ONNX model trees to and from a typed graph IR",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a model and print its nodes with inferred types.
    Inspect {
        /// Path to the model file.
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Import a model and export it again.
    Convert {
        /// Model to read.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the exported model.
        #[arg(short, long)]
        output: PathBuf,

        /// Target opset (overrides the configuration file).
        #[arg(long)]
        opset: Option<i64>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { model } => commands::inspect::execute(config, model),
        Commands::Convert {
            input,
            output,
            opset,
        } => commands::convert::execute(config, input, output, opset),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
