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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Where an IR item came from. Carried through every rewrite, never invented
// or dropped; instructions inserted by a rewrite inherit the source of the
// item that caused them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file_name: String,
    pub line_number: usize,
    pub column_number: usize,
    pub line_content: String,
}

impl SourceInfo {
    pub fn new(file_name: &str, line_number: usize) -> Self {
        SourceInfo {
            file_name: file_name.to_string(),
            line_number,
            column_number: 1,
            line_content: String::new(),
        }
    }
}

// Represents all possible forms an argument to an instruction can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Reg(String),            // e.g. %DR0, %PR1, %FPR0
    Imm(i64),               // untyped integer immediate
    TypedImm(String, i64),  // immediate carrying a molecule type tag
    Vec(Vec<i32>),          // literal vector, one component per world axis
    LabelRef(String),       // unresolved label, becomes a delta vector
}

// Value of a directive argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrValue {
    Int(i64),
    Str(String),
    List(Vec<IrValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: String,
    pub operands: Vec<Operand>,
    // Actual arguments of a CALL, classified by pass style. Empty on every
    // other opcode.
    pub ref_operands: Vec<Operand>,
    pub val_operands: Vec<Operand>,
    pub source: SourceInfo,
}

impl Instruction {
    pub fn new(opcode: &str, operands: Vec<Operand>, source: SourceInfo) -> Self {
        Instruction {
            opcode: opcode.to_string(),
            operands,
            ref_operands: vec![],
            val_operands: vec![],
            source,
        }
    }

    pub fn call(
        operands: Vec<Operand>,
        ref_operands: Vec<Operand>,
        val_operands: Vec<Operand>,
        source: SourceInfo,
    ) -> Self {
        Instruction {
            opcode: "CALL".to_string(),
            operands,
            ref_operands,
            val_operands,
            source,
        }
    }

    pub fn is_call(&self) -> bool {
        self.opcode == "CALL"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub namespace: String,
    pub name: String,
    pub args: BTreeMap<String, IrValue>,
    pub source: SourceInfo,
}

impl Directive {
    pub fn new(namespace: &str, name: &str, source: SourceInfo) -> Self {
        Directive {
            namespace: namespace.to_string(),
            name: name.to_string(),
            args: BTreeMap::new(),
            source,
        }
    }

    pub fn with_arg(mut self, key: &str, value: IrValue) -> Self {
        self.args.insert(key.to_string(), value);
        self
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace == namespace && self.name == name
    }

    pub fn int_arg(&self, key: &str) -> Option<i64> {
        match self.args.get(key) {
            Some(IrValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    // Collects a list-of-strings argument, e.g. the actuals of call_with.
    pub fn str_list_arg(&self, key: &str) -> Option<Vec<String>> {
        match self.args.get(key) {
            Some(IrValue::List(values)) => {
                let mut out = Vec::with_capacity(values.len());
                for value in values {
                    match value {
                        IrValue::Str(s) => out.push(s.clone()),
                        _ => return None,
                    }
                }
                Some(out)
            }
            _ => None,
        }
    }
}

// One element of the linked intermediate stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrItem {
    Instruction(Instruction),
    Directive(Directive),
    LabelDef { name: String, source: SourceInfo },
}

impl IrItem {
    pub fn source(&self) -> &SourceInfo {
        match self {
            IrItem::Instruction(ins) => &ins.source,
            IrItem::Directive(dir) => &dir.source,
            IrItem::LabelDef { source, .. } => source,
        }
    }
}

// The linked program, in emission order. Order is significant: directives
// bracket procedure bodies and call sites.
pub type IrProgram = Vec<IrItem>;
