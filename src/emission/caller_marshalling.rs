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
use crate::ir::{Instruction, IrItem, Operand};
use crate::isa::conditionals;
use log::debug;

// Emits the caller half of the calling convention at each CALL site.
// Three shapes are handled:
//
//   (a) CALL with classified REF/VAL operands: push VALs then REFs (each
//       block last-to-first), the CALL itself, then pop REFs back in
//       forward order. VALs stay for the callee; with REFs pushed last
//       they land in the lowest formal-parameter registers, so REF
//       parameters come first at the language level.
//   (b) conditional immediately followed by a CALL: the pair becomes a
//       branch around the whole marshalling block, using the negated
//       conditional and a fresh label.
//   (c) legacy core.call_with directive before a CALL: push/pop every
//       actual around the CALL.
//
// A plain CALL with no actuals passes through unchanged.
pub struct CallerMarshallingRule;

impl EmissionRule for CallerMarshallingRule {
    fn apply(
        &self,
        items: &[IrItem],
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError> {
        let mut output = Vec::with_capacity(items.len());
        let mut index = 0;

        while index < items.len() {
            match &items[index] {
                IrItem::Directive(dir) if dir.is("core", "call_with") => {
                    match call_at(items, index + 1) {
                        Some(call) => {
                            let actuals = dir.str_list_arg("actuals").unwrap_or_default();
                            for actual in &actuals {
                                output.push(stack_op("PUSH", actual, call));
                            }
                            output.push(IrItem::Instruction(call.clone()));
                            for actual in actuals.iter().rev() {
                                output.push(stack_op("POP", actual, call));
                            }
                            index += 2;
                        }
                        None => {
                            // legacy directive with nothing to apply to
                            debug!(
                                "dropping call_with directive without a CALL at {}:{}",
                                dir.source.file_name, dir.source.line_number
                            );
                            index += 1;
                        }
                    }
                }
                IrItem::Instruction(cond)
                    if conditionals::is_conditional(&cond.opcode)
                        && call_at(items, index + 1).is_some() =>
                {
                    let call = call_at(items, index + 1).unwrap();
                    // safe: is_conditional guarantees a table entry
                    let negated = conditionals::negate(&cond.opcode).unwrap();
                    let label = ctx.fresh_safe_label();

                    // predicate false: the negated form skips the jump and
                    // the call runs; predicate true for the negated form
                    // jumps past the entire push/call/pop block
                    output.push(IrItem::Instruction(Instruction::new(
                        negated,
                        cond.operands.clone(),
                        cond.source.clone(),
                    )));
                    output.push(IrItem::Instruction(Instruction::new(
                        "JMPI",
                        vec![Operand::LabelRef(label.clone())],
                        cond.source.clone(),
                    )));
                    marshal_call(call, &mut output);
                    output.push(IrItem::LabelDef {
                        name: label,
                        source: call.source.clone(),
                    });
                    index += 2;
                }
                IrItem::Instruction(call) if call.is_call() => {
                    marshal_call(call, &mut output);
                    index += 1;
                }
                other => {
                    output.push(other.clone());
                    index += 1;
                }
            }
        }

        Ok(output)
    }
}

fn call_at(items: &[IrItem], index: usize) -> Option<&Instruction> {
    match items.get(index) {
        Some(IrItem::Instruction(ins)) if ins.is_call() => Some(ins),
        _ => None,
    }
}

fn stack_op(opcode: &str, register: &str, call: &Instruction) -> IrItem {
    IrItem::Instruction(Instruction::new(
        opcode,
        vec![Operand::Reg(register.to_string())],
        call.source.clone(),
    ))
}

fn marshal_call(call: &Instruction, output: &mut Vec<IrItem>) {
    // VALs first so the REF block ends up on top of the stack
    for val in call.val_operands.iter().rev() {
        let item = match val {
            Operand::Imm(_) => Instruction::new("PUSI", vec![val.clone()], call.source.clone()),
            Operand::LabelRef(_) => {
                Instruction::new("PUSV", vec![val.clone()], call.source.clone())
            }
            // type tag kept on the pushed cell for display and debugging
            Operand::TypedImm(_, _) => {
                Instruction::new("PUSI", vec![val.clone()], call.source.clone())
            }
            other => Instruction::new("PUSH", vec![other.clone()], call.source.clone()),
        };
        output.push(IrItem::Instruction(item));
    }
    for reference in call.ref_operands.iter().rev() {
        output.push(IrItem::Instruction(Instruction::new(
            "PUSH",
            vec![reference.clone()],
            call.source.clone(),
        )));
    }

    output.push(IrItem::Instruction(call.clone()));

    // REF registers observe the callee's final values; VALs end their life
    // at the callee boundary and are not popped here
    for reference in &call.ref_operands {
        output.push(IrItem::Instruction(Instruction::new(
            "POP",
            vec![reference.clone()],
            call.source.clone(),
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Directive, IrValue, SourceInfo};
    use crate::isa::Isa;

    fn src(line: usize) -> SourceInfo {
        SourceInfo::new("caller.s", line)
    }

    fn plain_call(reference: &[&str], value: &[Operand]) -> IrItem {
        IrItem::Instruction(Instruction::call(
            vec![Operand::LabelRef("P".to_string())],
            reference
                .iter()
                .map(|r| Operand::Reg(r.to_string()))
                .collect(),
            value.to_vec(),
            src(5),
        ))
    }

    fn shape(items: &[IrItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                IrItem::Instruction(ins) => ins.opcode.clone(),
                IrItem::Directive(dir) => dir.name.clone(),
                IrItem::LabelDef { name, .. } => format!("{}:", name),
            })
            .collect()
    }

    #[test]
    fn ref_operand_is_pushed_and_popped() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let out = CallerMarshallingRule
            .apply(&[plain_call(&["%DR3"], &[])], &mut ctx)
            .unwrap();
        assert_eq!(shape(&out), vec!["PUSH", "CALL", "POP"]);
        match (&out[0], &out[2]) {
            (IrItem::Instruction(push), IrItem::Instruction(pop)) => {
                assert_eq!(push.operands, vec![Operand::Reg("%DR3".to_string())]);
                assert_eq!(pop.operands, vec![Operand::Reg("%DR3".to_string())]);
            }
            _ => panic!("unexpected rewrite shape"),
        }
    }

    #[test]
    fn val_immediate_is_pushed_not_popped() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let out = CallerMarshallingRule
            .apply(&[plain_call(&[], &[Operand::Imm(7)])], &mut ctx)
            .unwrap();
        assert_eq!(shape(&out), vec!["PUSI", "CALL"]);
        match &out[0] {
            IrItem::Instruction(pusi) => assert_eq!(pusi.operands, vec![Operand::Imm(7)]),
            _ => panic!("expected PUSI"),
        }
    }

    #[test]
    fn val_label_uses_pusv_and_typed_imm_keeps_its_tag() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let call = plain_call(
            &[],
            &[
                Operand::LabelRef("TABLE".to_string()),
                Operand::TypedImm("ENERGY".to_string(), 50),
            ],
        );
        let out = CallerMarshallingRule.apply(&[call], &mut ctx).unwrap();
        // VALs are processed last-to-first
        assert_eq!(shape(&out), vec!["PUSI", "PUSV", "CALL"]);
        match &out[0] {
            IrItem::Instruction(pusi) => {
                assert_eq!(
                    pusi.operands,
                    vec![Operand::TypedImm("ENERGY".to_string(), 50)]
                );
            }
            _ => panic!("expected PUSI"),
        }
    }

    #[test]
    fn refs_are_pushed_after_vals_and_restored_in_forward_order() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let call = plain_call(&["%DR1", "%DR2"], &[Operand::Imm(9)]);
        let out = CallerMarshallingRule.apply(&[call], &mut ctx).unwrap();
        assert_eq!(
            shape(&out),
            vec!["PUSI", "PUSH", "PUSH", "CALL", "POP", "POP"]
        );
        match (&out[1], &out[2], &out[4], &out[5]) {
            (
                IrItem::Instruction(push2),
                IrItem::Instruction(push1),
                IrItem::Instruction(pop1),
                IrItem::Instruction(pop2),
            ) => {
                assert_eq!(push2.operands, vec![Operand::Reg("%DR2".to_string())]);
                assert_eq!(push1.operands, vec![Operand::Reg("%DR1".to_string())]);
                assert_eq!(pop1.operands, vec![Operand::Reg("%DR1".to_string())]);
                assert_eq!(pop2.operands, vec![Operand::Reg("%DR2".to_string())]);
            }
            _ => panic!("unexpected rewrite shape"),
        }
    }

    #[test]
    fn conditional_call_branches_around_the_block() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let cond = IrItem::Instruction(Instruction::new(
            "IFR",
            vec![
                Operand::Reg("%DR0".to_string()),
                Operand::Reg("%DR1".to_string()),
            ],
            src(4),
        ));
        let out = CallerMarshallingRule
            .apply(&[cond, plain_call(&["%DR2"], &[])], &mut ctx)
            .unwrap();
        assert_eq!(
            shape(&out),
            vec!["INR", "JMPI", "PUSH", "CALL", "POP", "_safe_call_0:"]
        );
        match &out[1] {
            IrItem::Instruction(jmp) => {
                assert_eq!(
                    jmp.operands,
                    vec![Operand::LabelRef("_safe_call_0".to_string())]
                );
            }
            _ => panic!("expected JMPI"),
        }
    }

    #[test]
    fn safe_call_labels_are_unique_within_a_pipeline() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let cond = |line| {
            IrItem::Instruction(Instruction::new(
                "LTR",
                vec![
                    Operand::Reg("%DR0".to_string()),
                    Operand::Reg("%DR1".to_string()),
                ],
                src(line),
            ))
        };
        let out = CallerMarshallingRule
            .apply(
                &[
                    cond(1),
                    plain_call(&[], &[]),
                    cond(3),
                    plain_call(&[], &[]),
                ],
                &mut ctx,
            )
            .unwrap();
        let labels: Vec<&String> = out
            .iter()
            .filter_map(|item| match item {
                IrItem::LabelDef { name, .. } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["_safe_call_0", "_safe_call_1"]);
    }

    #[test]
    fn call_with_pushes_forward_and_pops_reverse() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let dir = IrItem::Directive(
            Directive::new("core", "call_with", src(2)).with_arg(
                "actuals",
                IrValue::List(vec![
                    IrValue::Str("%DR0".to_string()),
                    IrValue::Str("%DR1".to_string()),
                ]),
            ),
        );
        let out = CallerMarshallingRule
            .apply(&[dir, plain_call(&[], &[])], &mut ctx)
            .unwrap();
        assert_eq!(shape(&out), vec!["PUSH", "PUSH", "CALL", "POP", "POP"]);
        match (&out[0], &out[3]) {
            (IrItem::Instruction(push0), IrItem::Instruction(pop1)) => {
                assert_eq!(push0.operands, vec![Operand::Reg("%DR0".to_string())]);
                assert_eq!(pop1.operands, vec![Operand::Reg("%DR1".to_string())]);
            }
            _ => panic!("unexpected rewrite shape"),
        }
    }

    #[test]
    fn stray_call_with_is_dropped() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let dir = IrItem::Directive(
            Directive::new("core", "call_with", src(2))
                .with_arg("actuals", IrValue::List(vec![IrValue::Str("%DR0".into())])),
        );
        let nop = IrItem::Instruction(Instruction::new("NOP", vec![], src(3)));
        let out = CallerMarshallingRule.apply(&[dir, nop], &mut ctx).unwrap();
        assert_eq!(shape(&out), vec!["NOP"]);
    }

    #[test]
    fn plain_call_passes_through() {
        let isa = Isa::default();
        let mut ctx = LinkingContext::new(&isa);
        let out = CallerMarshallingRule
            .apply(&[plain_call(&[], &[])], &mut ctx)
            .unwrap();
        assert_eq!(shape(&out), vec!["CALL"]);
    }
}
