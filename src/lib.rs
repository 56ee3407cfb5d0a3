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

pub mod artifact;
pub mod bindings;
pub mod emission;
pub mod emitter;
pub mod errors;
pub mod ir;
pub mod isa;
pub mod layout;
pub mod molecule;
pub mod runtime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use artifact::ProgramArtifact;
use bindings::CallBindingRegistry;
use emission::{EmissionRegistry, LinkingContext};
use emitter::Emitter;
use ir::IrProgram;
use isa::Isa;
use layout::LayoutResult;

// Everything the back end needs from the front end and the layout pass:
// the linked IR, the address-to-coordinate assignment, and the tables
// carried through to the artifact verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationInput {
    pub ir: IrProgram,
    pub layout: LayoutResult,
    pub sources: BTreeMap<String, Vec<String>>,
    pub register_alias_map: BTreeMap<String, String>,
    pub proc_name_to_param_names: BTreeMap<String, Vec<String>>,
}

pub fn compile(
    input: &CompilationInput,
    isa: &Isa,
    registry: &CallBindingRegistry,
) -> Result<ProgramArtifact> {
    let mut ctx = LinkingContext::new(isa);

    let rewritten = EmissionRegistry::standard()
        .rewrite(input.ir.clone(), &mut ctx)
        .context("Failed during IR rewriting stage")?;

    let artifact = Emitter::new(isa, &input.layout)
        .emit(&rewritten, &ctx.pending_bindings, registry, input)
        .context("Failed during cell emission stage")?;

    Ok(artifact)
}
