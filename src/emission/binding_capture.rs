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

use crate::emission::{EmissionRule, LinkingContext, PendingBinding};
use crate::errors::CompileError;
use crate::ir::{Instruction, IrItem, Operand};
use log::debug;

// These rules run before the marshalling rewrites touch the CALL sites, so
// they see the original operand structure. They leave the item stream
// untouched and only append pending bindings; the emitter writes them into
// the call-binding registry once layout addresses are known. Malformed
// call sites are skipped, never fatal.

// Captures the register actuals of classified REF/VAL calls. REFs come
// before VALs, matching the order the callee prolog materialises formal
// parameters in.
pub struct RefValBindingRule;

impl EmissionRule for RefValBindingRule {
    fn apply(
        &self,
        items: &[IrItem],
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError> {
        let mut call_index = 0;
        for item in items {
            let call = match item {
                IrItem::Instruction(ins) if ins.is_call() => ins,
                _ => continue,
            };
            if !call.ref_operands.is_empty() || !call.val_operands.is_empty() {
                if let Some(reg_ids) = actual_register_ids(call, ctx) {
                    if !reg_ids.is_empty() {
                        ctx.pending_bindings.push(PendingBinding {
                            call_index,
                            reg_ids,
                        });
                    }
                }
            }
            call_index += 1;
        }
        Ok(items.to_vec())
    }
}

fn actual_register_ids(call: &Instruction, ctx: &LinkingContext) -> Option<Vec<i32>> {
    let mut reg_ids = Vec::new();
    for operand in call.ref_operands.iter().chain(call.val_operands.iter()) {
        if let Operand::Reg(token) = operand {
            match ctx.isa.resolve_register_token(token) {
                Some(id) => reg_ids.push(id),
                None => {
                    debug!(
                        "skipping binding capture for call at {}:{}: bad register {}",
                        call.source.file_name, call.source.line_number, token
                    );
                    return None;
                }
            }
        }
    }
    Some(reg_ids)
}

// Captures the actuals of the legacy core.call_with directive for the CALL
// that immediately follows it.
pub struct CallWithBindingRule;

impl EmissionRule for CallWithBindingRule {
    fn apply(
        &self,
        items: &[IrItem],
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError> {
        let mut call_index = 0;
        let mut index = 0;
        while index < items.len() {
            match &items[index] {
                IrItem::Directive(dir) if dir.is("core", "call_with") => {
                    if let Some(IrItem::Instruction(call)) = items.get(index + 1) {
                        if call.is_call() {
                            if let Some(actuals) = dir.str_list_arg("actuals") {
                                let mut reg_ids = Vec::with_capacity(actuals.len());
                                let mut resolved = true;
                                for token in &actuals {
                                    match ctx.isa.resolve_register_token(token) {
                                        Some(id) => reg_ids.push(id),
                                        None => {
                                            debug!(
                                                "skipping call_with binding at {}:{}: bad register {}",
                                                dir.source.file_name,
                                                dir.source.line_number,
                                                token
                                            );
                                            resolved = false;
                                            break;
                                        }
                                    }
                                }
                                if resolved && !reg_ids.is_empty() {
                                    ctx.pending_bindings.push(PendingBinding {
                                        call_index,
                                        reg_ids,
                                    });
                                }
                            }
                        }
                    }
                }
                IrItem::Instruction(ins) if ins.is_call() => {
                    call_index += 1;
                }
                _ => {}
            }
            index += 1;
        }
        Ok(items.to_vec())
    }
}
