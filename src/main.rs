/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use gridasm::bindings::CallBindingRegistry;
use gridasm::isa::Isa;
use gridasm::{CompilationInput, compile};
use std::fs;
use std::path::PathBuf;

#[derive(clap_parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Linked program (IR + layout) as produced by the front end
    #[clap(short, long)]
    input: PathBuf,
    /// Where to write the program artifact
    #[clap(short, long)]
    output: PathBuf,
    /// Pretty-print the artifact JSON
    #[clap(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let opts: Opts = Opts::parse();

    let input_text = fs::read_to_string(&opts.input)
        .with_context(|| format!("Failed to read input file: {}", opts.input.display()))?;
    let input: CompilationInput =
        serde_json::from_str(&input_text).context("Failed to parse compilation input")?;

    let isa = Isa::default();
    let registry = CallBindingRegistry::new();
    let program_artifact = compile(&input, &isa, &registry)?;

    let artifact_json = if opts.pretty {
        serde_json::to_string_pretty(&program_artifact)?
    } else {
        serde_json::to_string(&program_artifact)?
    };
    fs::write(&opts.output, artifact_json)?;
    println!(
        "Successfully compiled {} to {} (program {})",
        opts.input.display(),
        opts.output.display(),
        program_artifact.program_id
    );

    Ok(())
}
