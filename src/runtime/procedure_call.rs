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

use crate::artifact::ProgramArtifact;
use crate::bindings::CallBindingResolver;
use crate::isa::FPR_BASE;
use crate::layout::Coord;
use crate::runtime::{
    CALL_STACK_MAX_DEPTH, CALL_STACK_OVERFLOW, CALL_STACK_UNDERFLOW, Environment, Organism,
    ProcFrame,
};
use log::trace;
use std::collections::BTreeMap;

// Everything a CALL or RET needs to touch: the issuing organism, the
// world's coordinate arithmetic, and the performance-mode switch that
// suppresses best-effort debug lookups.
pub struct ExecutionContext<'a> {
    pub organism: &'a mut Organism,
    pub environment: &'a Environment,
    pub performance_mode: bool,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(organism: &'a mut Organism, environment: &'a Environment) -> Self {
        ExecutionContext {
            organism,
            environment,
            performance_mode: false,
        }
    }
}

pub struct ProcedureCallHandler;

impl ProcedureCallHandler {
    // Executes CALL: resolves the call-site binding, computes the return
    // address past the operand cells, snapshots PRs and FPRs, pushes the
    // frame, copies actuals into the formal-parameter registers, and
    // redirects the instruction pointer to the target.
    pub fn execute_call(
        ctx: &mut ExecutionContext,
        target_delta: &[i32],
        resolver: &CallBindingResolver,
        artifact: Option<&ProgramArtifact>,
    ) {
        if ctx.organism.call_stack.len() >= CALL_STACK_MAX_DEPTH {
            ctx.organism.instruction_failed(CALL_STACK_OVERFLOW);
            return;
        }

        let pre_fetch_ip = ctx.organism.ip.clone();
        let bindings = resolver
            .resolve(&Coord::new(pre_fetch_ip.clone()))
            .unwrap_or_default();

        let mut fpr_bindings = BTreeMap::new();
        let fpr_count = ctx.organism.formal_param_registers.len();
        for (index, reg_id) in bindings.iter().enumerate().take(fpr_count) {
            fpr_bindings.insert(FPR_BASE + index as i32, *reg_id);
        }

        // the CALL occupies its opcode cell plus one cell per world axis;
        // returning must land just past the operand vector no matter how
        // the callee redirects afterwards
        let mut return_ip = pre_fetch_ip.clone();
        let cell_count = 1 + ctx.environment.dimensions();
        for _ in 0..cell_count {
            return_ip = ctx
                .environment
                .next_position(&return_ip, &ctx.organism.dv);
        }

        let target_ip = ctx
            .environment
            .target_coordinate(&ctx.organism.origin, target_delta);

        let proc_name = if ctx.performance_mode {
            String::new()
        } else {
            artifact
                .and_then(|a| a.label_name_at_coord(&Coord::new(target_delta.to_vec())))
                .unwrap_or("?")
                .to_string()
        };
        trace!(
            "call {} at {:?} -> {:?}, {} bound actuals",
            proc_name,
            pre_fetch_ip,
            target_ip,
            bindings.len()
        );

        let frame = ProcFrame {
            proc_name,
            absolute_return_ip: return_ip,
            saved_prs: ctx.organism.proc_registers.clone(),
            saved_fprs: ctx.organism.formal_param_registers.clone(),
            fpr_bindings,
        };
        ctx.organism.call_stack.push(frame);

        // copy-in: formal parameters observe the caller registers as of
        // the call
        for (index, reg_id) in bindings.iter().enumerate().take(fpr_count) {
            if let Some(value) = ctx.organism.read_register(*reg_id) {
                ctx.organism.formal_param_registers[index] = value;
            }
        }

        ctx.organism.ip = target_ip;
        ctx.organism.skip_ip_advance = true;
    }

    // Executes RET: pops the frame, restores the procedure registers, and
    // jumps back. Formal-parameter registers are not restored; the callee
    // epilog already pushed them to the data stack for the caller's pops.
    pub fn execute_return(ctx: &mut ExecutionContext) {
        let frame = match ctx.organism.call_stack.pop() {
            Some(frame) => frame,
            None => {
                ctx.organism.instruction_failed(CALL_STACK_UNDERFLOW);
                return;
            }
        };
        trace!("return from {} to {:?}", frame.proc_name, frame.absolute_return_ip);
        ctx.organism.proc_registers = frame.saved_prs;
        ctx.organism.ip = frame.absolute_return_ip;
        ctx.organism.skip_ip_advance = true;
    }
}
