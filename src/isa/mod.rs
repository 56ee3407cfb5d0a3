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

pub mod conditionals;

use std::collections::HashMap;

// Register IDs live in disjoint contiguous ranges: data registers start at
// 0, procedure registers at PR_BASE, formal-parameter registers at
// FPR_BASE. The range magnitudes come from the runtime configuration.
pub const PR_BASE: i32 = 1000;
pub const FPR_BASE: i32 = 2000;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub num_data_registers: usize,
    pub num_proc_registers: usize,
    pub num_formal_param_registers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            num_data_registers: 8,
            num_proc_registers: 8,
            num_formal_param_registers: 8,
        }
    }
}

// Shape of one instruction argument. Register and literal arguments occupy
// one cell; vector and label arguments occupy one cell per world axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Register,
    Literal,
    Vector,
    Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub argument_types: Vec<ArgKind>,
}

use ArgKind::{Label, Literal, Register, Vector};

// Static opcode table: (name, id, argument kinds). IDs are the cell values
// written for opcodes and must stay stable across releases.
const INSTRUCTION_SET: &[(&str, i32, &[ArgKind])] = &[
    ("NOP", 0, &[]),
    ("ADDR", 1, &[Register, Register]),
    ("ADDI", 2, &[Register, Literal]),
    ("SUBR", 3, &[Register, Register]),
    ("SUBI", 4, &[Register, Literal]),
    ("MULR", 5, &[Register, Register]),
    ("MULI", 6, &[Register, Literal]),
    ("SETI", 7, &[Register, Literal]),
    ("SETR", 8, &[Register, Register]),
    ("SETV", 9, &[Register, Vector]),
    ("PUSH", 10, &[Register]),
    ("POP", 11, &[Register]),
    ("PUSI", 12, &[Literal]),
    ("PUSV", 13, &[Vector]),
    ("JMPI", 15, &[Label]),
    ("JMPR", 16, &[Register]),
    ("CALL", 17, &[Label]),
    ("RET", 18, &[]),
    // conditionals: each skips the next instruction unless its predicate
    // holds; negated forms pair up per the conditionals table
    ("IFR", 20, &[Register, Register]),
    ("INR", 21, &[Register, Register]),
    ("IFI", 22, &[Register, Literal]),
    ("INI", 23, &[Register, Literal]),
    ("IFS", 24, &[Register]),
    ("INS", 25, &[Register]),
    ("LTR", 26, &[Register, Register]),
    ("GETR", 27, &[Register, Register]),
    ("LTI", 28, &[Register, Literal]),
    ("GETI", 29, &[Register, Literal]),
    ("GTR", 30, &[Register, Register]),
    ("LETR", 31, &[Register, Register]),
    ("GTI", 32, &[Register, Literal]),
    ("LETI", 33, &[Register, Literal]),
    ("IFTR", 34, &[Register, Register]),
    ("INTR", 35, &[Register, Register]),
    ("IFTI", 36, &[Register, Literal]),
    ("INTI", 37, &[Register, Literal]),
    ("IFMR", 38, &[Register]),
    ("INMR", 39, &[Register]),
    ("IFMI", 40, &[Vector]),
    ("INMI", 41, &[Vector]),
    ("IFPR", 42, &[Register]),
    ("INPR", 43, &[Register]),
    ("IFPI", 44, &[Vector]),
    ("INPI", 45, &[Vector]),
    ("IFVR", 46, &[Register, Register]),
    ("INVR", 47, &[Register, Register]),
];

pub struct Isa {
    config: RuntimeConfig,
    id_by_name: HashMap<&'static str, i32>,
    name_by_id: HashMap<i32, &'static str>,
    signature_by_id: HashMap<i32, Signature>,
}

impl Isa {
    pub fn new(config: RuntimeConfig) -> Self {
        let mut id_by_name = HashMap::new();
        let mut name_by_id = HashMap::new();
        let mut signature_by_id = HashMap::new();
        for (name, id, kinds) in INSTRUCTION_SET {
            id_by_name.insert(*name, *id);
            name_by_id.insert(*id, *name);
            signature_by_id.insert(
                *id,
                Signature {
                    argument_types: kinds.to_vec(),
                },
            );
        }
        Isa {
            config,
            id_by_name,
            name_by_id,
            signature_by_id,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn get_instruction_id_by_name(&self, name: &str) -> Option<i32> {
        self.id_by_name.get(name).copied()
    }

    pub fn get_instruction_name_by_id(&self, id: i32) -> Option<&'static str> {
        self.name_by_id.get(&id).copied()
    }

    pub fn get_signature_by_id(&self, id: i32) -> Option<&Signature> {
        self.signature_by_id.get(&id)
    }

    // Cells occupied by one instruction in a world with the given number of
    // axes: the opcode cell plus the cells of each argument.
    pub fn cell_length_of(&self, id: i32, dimensions: usize) -> i64 {
        let mut length: i64 = 1;
        if let Some(signature) = self.get_signature_by_id(id) {
            for kind in &signature.argument_types {
                length += match kind {
                    ArgKind::Register | ArgKind::Literal => 1,
                    ArgKind::Vector | ArgKind::Label => dimensions as i64,
                };
            }
        }
        length
    }

    // Maps a textual register token (%DR3, %PR0, %FPR7) to its numeric ID.
    // Returns None for unknown families and out-of-range indices.
    pub fn resolve_register_token(&self, token: &str) -> Option<i32> {
        let body = token.strip_prefix('%')?.to_ascii_uppercase();
        let (family, base, count) = if let Some(rest) = body.strip_prefix("FPR") {
            (rest, FPR_BASE, self.config.num_formal_param_registers)
        } else if let Some(rest) = body.strip_prefix("PR") {
            (rest, PR_BASE, self.config.num_proc_registers)
        } else if let Some(rest) = body.strip_prefix("DR") {
            (rest, 0, self.config.num_data_registers)
        } else {
            return None;
        };
        let index = family.parse::<usize>().ok()?;
        if index >= count {
            return None;
        }
        Some(base + index as i32)
    }
}

impl Default for Isa {
    fn default() -> Self {
        Isa::new(RuntimeConfig::default())
    }
}

// Canonical token for a formal-parameter register, used when synthesising
// marshalling instructions.
pub fn fpr_token(index: usize) -> String {
    format!("%FPR{}", index)
}
