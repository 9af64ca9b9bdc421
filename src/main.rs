// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-destructure CLI - compile destructuring patterns and inspect the
//! emitted bytecode
//!
//! Input is JSON: one compile unit or a list of them. Each unit is compiled,
//! disassembled and, with `--run`, executed on a fresh VM.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use serde::Deserialize;
use spacey_destructure::compiler::{Bytecode, CompileUnit, compile_batch};
use spacey_destructure::{CompileOptions, VM};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "spacey-destructure",
    about = "Compile binding and destructuring patterns to Spacey bytecode",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// JSON file with compile units (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Compile as strict mode code
    #[arg(long)]
    strict: bool,

    /// Never resolve targets ahead of their property keys
    #[arg(long)]
    no_hoist: bool,

    /// Always guard array patterns with an iterator-close handler
    #[arg(long)]
    no_elide: bool,

    /// Execute each unit and print bindings and effects
    #[arg(short, long)]
    run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Many(Vec<CompileUnit>),
    One(Box<CompileUnit>),
}

impl Input {
    fn into_units(self) -> Vec<CompileUnit> {
        match self {
            Input::Many(units) => units,
            Input::One(unit) => vec![*unit],
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "spacey_destructure=debug"
    } else {
        "spacey_destructure=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let text = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };
    let units = serde_json::from_str::<Input>(&text)
        .context("input is not a compile unit or a list of compile units")?
        .into_units();

    let options = CompileOptions {
        strict: cli.strict,
        hoist_references: !cli.no_hoist,
        elide_close_guards: !cli.no_elide,
    };

    let mut failures = 0;
    for (index, (unit, result)) in units.iter().zip(compile_batch(&units, &options)).enumerate() {
        let label = unit.name.clone().unwrap_or_else(|| format!("unit {}", index));
        println!("{} {}", "==".dimmed(), label.white().bold());

        let bytecode = match result {
            Ok(bytecode) => bytecode,
            Err(e) => {
                eprintln!("{}: {}", "Compile error".red().bold(), e);
                failures += 1;
                continue;
            }
        };
        print_disassembly(&bytecode);

        if cli.run && !run_unit(&bytecode) {
            failures += 1;
        }
        println!();
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_disassembly(bytecode: &Bytecode) {
    println!(
        "{}",
        format!(
            "; {} instructions, {} temporaries{}",
            bytecode.instructions.len(),
            bytecode.temporaries,
            if bytecode.strict { ", strict" } else { "" }
        )
        .dimmed()
    );
    for (index, instruction) in bytecode.instructions.iter().enumerate() {
        let operand = instruction
            .operand
            .as_ref()
            .map(|operand| bytecode.describe_operand(operand))
            .unwrap_or_default();
        println!(
            "{:>4}  {:<22} {}",
            index.dimmed(),
            instruction.opcode.name().cyan(),
            operand.yellow()
        );
    }
}

/// Runs one chunk on a fresh VM. Returns false if it threw.
fn run_unit(bytecode: &Bytecode) -> bool {
    let mut vm = VM::new();
    let outcome = vm.execute(bytecode);

    println!("{}", "bindings:".white().bold());
    for (name, value) in vm.bindings() {
        println!("    {} = {}", name.green(), vm.render(&value));
    }
    println!("{}", "effects:".white().bold());
    for effect in vm.effect_log() {
        println!("    {}", effect.dimmed());
    }

    match outcome {
        Ok(_) => true,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            false
        }
    }
}
