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

use crate::emission::{EmissionRule, LinkingContext};
use crate::errors::CompileError;
use crate::ir::{Instruction, IrItem, Operand, SourceInfo};
use crate::isa::fpr_token;

// Hard ceiling on procedure arity, matching the number of formal-parameter
// registers the register file reserves.
const MAX_ARITY: i64 = 8;

// Synthesises the callee half of the calling convention around procedure
// bodies bracketed by core.proc_enter / core.proc_exit:
//
//   prolog: arity POPs into %FPR{k-1}..%FPR0 (copy-in from the data stack)
//   epilog: arity PUSHes of %FPR0..%FPR{k-1} before each RET (copy-out)
//
// The directives themselves are preserved so downstream passes and the
// runtime retain procedure identity. Body instructions are never
// reordered, dropped, or coalesced.
pub struct ProcedureMarshallingRule;

impl EmissionRule for ProcedureMarshallingRule {
    fn apply(
        &self,
        items: &[IrItem],
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError> {
        let max_fprs = ctx.isa.config().num_formal_param_registers as i64;
        let mut output = Vec::with_capacity(items.len());
        let mut index = 0;

        while index < items.len() {
            let item = &items[index];
            let enter = match item {
                IrItem::Directive(dir) if dir.is("core", "proc_enter") => dir.clone(),
                _ => {
                    output.push(item.clone());
                    index += 1;
                    continue;
                }
            };

            let arity = enter
                .int_arg("arity")
                .unwrap_or(0)
                .clamp(0, MAX_ARITY.min(max_fprs)) as usize;

            // collect the body up to the matching proc_exit
            let mut body: Vec<IrItem> = Vec::new();
            let mut exit_dir = None;
            let mut cursor = index + 1;
            while cursor < items.len() {
                match &items[cursor] {
                    IrItem::Directive(dir) if dir.is("core", "proc_exit") => {
                        exit_dir = Some(dir.clone());
                        break;
                    }
                    IrItem::Directive(dir) if dir.is("core", "proc_enter") => {
                        return Err(CompileError::NestedProcedure {
                            file: dir.source.file_name.clone(),
                            line: dir.source.line_number,
                        });
                    }
                    other => body.push(other.clone()),
                }
                cursor += 1;
            }
            let exit_dir = exit_dir.ok_or(CompileError::UnterminatedProcedure {
                file: enter.source.file_name.clone(),
                line: enter.source.line_number,
            })?;

            output.push(IrItem::Directive(enter.clone()));

            // prolog: pop actuals into the formal-parameter registers in
            // reverse so %FPR0 ends up holding the first parameter
            for i in (0..arity).rev() {
                output.push(pop_fpr(i, &enter.source));
            }

            let mut saw_ret = false;
            for body_item in body {
                if let IrItem::Instruction(ins) = &body_item {
                    if ins.opcode == "RET" {
                        saw_ret = true;
                        for i in 0..arity {
                            output.push(push_fpr(i, &ins.source));
                        }
                    }
                }
                output.push(body_item);
            }

            // a body without RET still pushes its parameters back, but no
            // RET is synthesised: falling off the end is the programmer's
            // own choice
            if !saw_ret {
                for i in 0..arity {
                    output.push(push_fpr(i, &exit_dir.source));
                }
            }

            output.push(IrItem::Directive(exit_dir));
            index = cursor + 1;
        }

        Ok(output)
    }
}

fn pop_fpr(index: usize, source: &SourceInfo) -> IrItem {
    IrItem::Instruction(Instruction::new(
        "POP",
        vec![Operand::Reg(fpr_token(index))],
        source.clone(),
    ))
}

fn push_fpr(index: usize, source: &SourceInfo) -> IrItem {
    IrItem::Instruction(Instruction::new(
        "PUSH",
        vec![Operand::Reg(fpr_token(index))],
        source.clone(),
    ))
}
