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

use crate::ir::SourceInfo;
use crate::layout::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// One source token, recorded for editors and debuggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub kind: String,
}

// The immutable output bundle of a compilation. Every coordinate-keyed map
// is a BTreeMap, so iteration follows lexicographic coordinate order by
// construction; rebuilding from the same inputs yields the same iteration
// order and the same program_id. Consumers that hash or checkpoint rely on
// this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramArtifact {
    pub program_id: String,
    pub sources: BTreeMap<String, Vec<String>>,
    pub machine_code_layout: BTreeMap<Coord, i32>,
    pub initial_objects: BTreeMap<Coord, i32>,
    pub source_map: BTreeMap<i64, SourceInfo>,
    pub call_site_bindings: BTreeMap<i64, Vec<i32>>,
    pub relative_coord_to_linear_address: BTreeMap<Coord, i64>,
    pub linear_address_to_coord: BTreeMap<i64, Coord>,
    pub label_address_to_name: BTreeMap<i64, String>,
    pub register_alias_map: BTreeMap<String, String>,
    pub proc_name_to_param_names: BTreeMap<String, Vec<String>>,
    pub token_map: BTreeMap<String, Vec<TokenSpan>>,
    pub token_lookup: BTreeMap<String, TokenSpan>,
    pub source_line_to_instructions: BTreeMap<String, BTreeMap<usize, Vec<i64>>>,
}

impl ProgramArtifact {
    // Best-effort reverse lookup used for call-stack debugging.
    pub fn label_name_at_coord(&self, coord: &Coord) -> Option<&str> {
        let address = self.relative_coord_to_linear_address.get(coord)?;
        self.label_address_to_name
            .get(address)
            .map(|name| name.as_str())
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

// Stable 64-bit FNV-1a over the sorted code map. Component counts are
// mixed in so coordinates of different arity cannot alias.
pub fn compute_program_id(machine_code_layout: &BTreeMap<Coord, i32>) -> String {
    let mut hash = FNV_OFFSET;
    let mut feed = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    };
    for (coord, cell) in machine_code_layout {
        feed(coord.components().len() as u8);
        for component in coord.components() {
            for byte in component.to_le_bytes() {
                feed(byte);
            }
        }
        for byte in cell.to_le_bytes() {
            feed(byte);
        }
    }
    format!("{:016x}", hash)
}
