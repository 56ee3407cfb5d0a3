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

use crate::CompilationInput;
use crate::artifact::{ProgramArtifact, TokenSpan, compute_program_id};
use crate::bindings::CallBindingRegistry;
use crate::emission::PendingBinding;
use crate::errors::CompileError;
use crate::ir::{Instruction, IrItem, Operand, SourceInfo};
use crate::isa::Isa;
use crate::layout::{Coord, LayoutResult};
use crate::molecule::{Molecule, MoleculeType};
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};

// Walks the rewritten IR in order and encodes every instruction and
// operand as a typed cell at the coordinate the layout pass assigned to
// its linear address. Any gap between the IR and the layout (missing
// coordinate, unknown opcode or register, unresolvable label) aborts the
// compilation with a source-located error.
pub struct Emitter<'a> {
    isa: &'a Isa,
    layout: &'a LayoutResult,
}

impl<'a> Emitter<'a> {
    pub fn new(isa: &'a Isa, layout: &'a LayoutResult) -> Self {
        Emitter { isa, layout }
    }

    pub fn emit(
        &self,
        items: &[IrItem],
        pending_bindings: &[PendingBinding],
        registry: &CallBindingRegistry,
        input: &CompilationInput,
    ) -> Result<ProgramArtifact, CompileError> {
        let pending: HashMap<usize, &[i32]> = pending_bindings
            .iter()
            .map(|binding| (binding.call_index, binding.reg_ids.as_slice()))
            .collect();

        let mut machine_code_layout: BTreeMap<Coord, i32> = BTreeMap::new();
        let mut call_site_bindings: BTreeMap<i64, Vec<i32>> = BTreeMap::new();
        let mut source_line_to_instructions: BTreeMap<String, BTreeMap<usize, Vec<i64>>> =
            BTreeMap::new();
        let mut address: i64 = 0;
        let mut call_index = 0;

        for item in items {
            let ins = match item {
                IrItem::Instruction(ins) => ins,
                // directives and label definitions occupy no cells
                _ => continue,
            };

            let opcode_id = self
                .isa
                .get_instruction_id_by_name(&ins.opcode)
                .ok_or_else(|| CompileError::UnknownOpcode {
                    file: ins.source.file_name.clone(),
                    line: ins.source.line_number,
                    opcode: ins.opcode.clone(),
                })?;
            let opcode_coord = self.coord_at(address, &ins.source)?.clone();
            trace!(
                "emit {} at address {} coord {}",
                ins.opcode, address, opcode_coord
            );
            machine_code_layout.insert(
                opcode_coord.clone(),
                Molecule::new(MoleculeType::Code, opcode_id as i64).to_int(),
            );

            if ins.is_call() {
                if let Some(reg_ids) = pending.get(&call_index).copied() {
                    registry.register_for_linear_address(address, reg_ids);
                    registry.register_for_absolute_coord(&opcode_coord, reg_ids);
                    call_site_bindings.insert(address, reg_ids.to_vec());
                }
                call_index += 1;
            }

            source_line_to_instructions
                .entry(ins.source.file_name.clone())
                .or_default()
                .entry(ins.source.line_number)
                .or_default()
                .push(address);

            address += 1;
            address = self.emit_operands(
                ins,
                &opcode_coord,
                address,
                &mut machine_code_layout,
            )?;
        }

        let initial_objects = self.encode_initial_objects()?;
        let program_id = compute_program_id(&machine_code_layout);
        debug!(
            "emitted {} cells, {} call sites, program {}",
            machine_code_layout.len(),
            call_site_bindings.len(),
            program_id
        );

        let linear_address_to_coord: BTreeMap<i64, Coord> = self
            .layout
            .linear_address_to_coord
            .iter()
            .map(|(addr, coord)| (*addr, coord.clone()))
            .collect();
        let relative_coord_to_linear_address: BTreeMap<Coord, i64> = linear_address_to_coord
            .iter()
            .map(|(addr, coord)| (coord.clone(), *addr))
            .collect();

        // sorted label names, so a shared address resolves the same way on
        // every build
        let mut label_address_to_name: BTreeMap<i64, String> = BTreeMap::new();
        let sorted_labels: BTreeMap<&String, &i64> = self.layout.label_to_address.iter().collect();
        for (name, addr) in sorted_labels {
            label_address_to_name.insert(*addr, name.clone());
        }

        let (token_map, token_lookup) = build_token_tables(items);

        Ok(ProgramArtifact {
            program_id,
            sources: input.sources.clone(),
            machine_code_layout,
            initial_objects,
            source_map: self
                .layout
                .source_map
                .iter()
                .map(|(addr, info)| (*addr, info.clone()))
                .collect(),
            call_site_bindings,
            relative_coord_to_linear_address,
            linear_address_to_coord,
            label_address_to_name,
            register_alias_map: input.register_alias_map.clone(),
            proc_name_to_param_names: input.proc_name_to_param_names.clone(),
            token_map,
            token_lookup,
            source_line_to_instructions,
        })
    }

    fn emit_operands(
        &self,
        ins: &Instruction,
        opcode_coord: &Coord,
        mut address: i64,
        machine_code_layout: &mut BTreeMap<Coord, i32>,
    ) -> Result<i64, CompileError> {
        for operand in &ins.operands {
            match operand {
                Operand::Vec(components) => {
                    for component in components {
                        let coord = self.coord_at(address, &ins.source)?.clone();
                        machine_code_layout.insert(
                            coord,
                            Molecule::new(MoleculeType::Data, *component as i64).to_int(),
                        );
                        address += 1;
                    }
                }
                Operand::LabelRef(name) => {
                    let delta = self.label_delta(name, opcode_coord, &ins.source)?;
                    for component in delta {
                        let coord = self.coord_at(address, &ins.source)?.clone();
                        machine_code_layout.insert(
                            coord,
                            Molecule::new(MoleculeType::Data, component as i64).to_int(),
                        );
                        address += 1;
                    }
                }
                Operand::Reg(token) => {
                    let reg_id = self.isa.resolve_register_token(token).ok_or_else(|| {
                        CompileError::UnknownRegister {
                            file: ins.source.file_name.clone(),
                            line: ins.source.line_number,
                            register: token.clone(),
                        }
                    })?;
                    let coord = self.coord_at(address, &ins.source)?.clone();
                    machine_code_layout.insert(
                        coord,
                        Molecule::new(MoleculeType::Data, reg_id as i64).to_int(),
                    );
                    address += 1;
                }
                Operand::Imm(value) => {
                    let coord = self.coord_at(address, &ins.source)?.clone();
                    machine_code_layout
                        .insert(coord, Molecule::new(MoleculeType::Data, *value).to_int());
                    address += 1;
                }
                Operand::TypedImm(type_name, value) => {
                    let molecule_type = MoleculeType::from_name(type_name).ok_or_else(|| {
                        CompileError::UnknownMoleculeType {
                            file: ins.source.file_name.clone(),
                            line: ins.source.line_number,
                            type_name: type_name.clone(),
                        }
                    })?;
                    let coord = self.coord_at(address, &ins.source)?.clone();
                    machine_code_layout
                        .insert(coord, Molecule::new(molecule_type, *value).to_int());
                    address += 1;
                }
            }
        }
        Ok(address)
    }

    // Last-resort label resolution: anything still symbolic at this point
    // must be present in the layout's label table.
    fn label_delta(
        &self,
        label: &str,
        opcode_coord: &Coord,
        source: &SourceInfo,
    ) -> Result<Vec<i32>, CompileError> {
        let target_address = self.layout.label_to_address.get(label).ok_or_else(|| {
            CompileError::UnresolvedLabel {
                file: source.file_name.clone(),
                line: source.line_number,
                label: label.to_string(),
            }
        })?;
        let target_coord = self.coord_at(*target_address, source)?;

        // legacy programs mix coordinate arities; the shorter side pads
        // with zeros
        let origin = opcode_coord.components();
        let target = target_coord.components();
        let dimensions = origin.len().max(target.len());
        let mut delta = Vec::with_capacity(dimensions);
        for axis in 0..dimensions {
            let from = origin.get(axis).copied().unwrap_or(0);
            let to = target.get(axis).copied().unwrap_or(0);
            delta.push(to - from);
        }
        Ok(delta)
    }

    fn coord_at(&self, address: i64, source: &SourceInfo) -> Result<&Coord, CompileError> {
        self.layout
            .coord_of(address)
            .ok_or_else(|| CompileError::MissingCoordinate {
                file: source.file_name.clone(),
                line: source.line_number,
                address,
            })
    }

    fn encode_initial_objects(&self) -> Result<BTreeMap<Coord, i32>, CompileError> {
        let mut initial_objects = BTreeMap::new();
        for (coord, placed) in &self.layout.initial_world_objects {
            let molecule_type = MoleculeType::from_name(&placed.type_name).ok_or_else(|| {
                CompileError::UnknownMoleculeType {
                    file: placed.source.file_name.clone(),
                    line: placed.source.line_number,
                    type_name: placed.type_name.clone(),
                }
            })?;
            initial_objects.insert(
                coord.clone(),
                Molecule::new(molecule_type, placed.value).to_int(),
            );
        }
        Ok(initial_objects)
    }
}

fn build_token_tables(
    items: &[IrItem],
) -> (
    BTreeMap<String, Vec<TokenSpan>>,
    BTreeMap<String, TokenSpan>,
) {
    let mut token_map: BTreeMap<String, Vec<TokenSpan>> = BTreeMap::new();
    let mut token_lookup: BTreeMap<String, TokenSpan> = BTreeMap::new();

    for item in items {
        let (text, kind) = match item {
            IrItem::Instruction(ins) => (ins.opcode.clone(), "instruction"),
            IrItem::Directive(dir) => (format!("{}.{}", dir.namespace, dir.name), "directive"),
            IrItem::LabelDef { name, .. } => (name.clone(), "label"),
        };
        let source = item.source();
        let span = TokenSpan {
            text,
            line: source.line_number,
            column: source.column_number,
            kind: kind.to_string(),
        };
        token_lookup.insert(
            format!(
                "{}:{}:{}",
                source.file_name, source.line_number, source.column_number
            ),
            span.clone(),
        );
        token_map
            .entry(source.file_name.clone())
            .or_default()
            .push(span);
    }
    for spans in token_map.values_mut() {
        spans.sort_by_key(|span| (span.line, span.column));
    }
    (token_map, token_lookup)
}
