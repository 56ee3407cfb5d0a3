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

pub mod binding_capture;
pub mod caller_marshalling;
pub mod procedure_marshalling;

use crate::errors::CompileError;
use crate::ir::IrItem;
use crate::isa::Isa;

use binding_capture::{CallWithBindingRule, RefValBindingRule};
use caller_marshalling::CallerMarshallingRule;
use procedure_marshalling::ProcedureMarshallingRule;

// Register bindings captured for one call site, keyed by the CALL's
// occurrence index in IR order. Rules run before the layout pass assigns
// addresses, so the emitter performs the actual registry writes once it
// knows where each CALL landed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBinding {
    pub call_index: usize,
    pub reg_ids: Vec<i32>,
}

// Shared state of one emission pipeline invocation.
pub struct LinkingContext<'a> {
    pub isa: &'a Isa,
    pub pending_bindings: Vec<PendingBinding>,
    next_safe_label: usize,
}

impl<'a> LinkingContext<'a> {
    pub fn new(isa: &'a Isa) -> Self {
        LinkingContext {
            isa,
            pending_bindings: Vec::new(),
            next_safe_label: 0,
        }
    }

    // Fresh label for branch-around rewrites. The counter is scoped to this
    // pipeline invocation so rebuilding a program yields identical labels.
    pub fn fresh_safe_label(&mut self) -> String {
        let label = format!("_safe_call_{}", self.next_safe_label);
        self.next_safe_label += 1;
        label
    }
}

// One pure IR-to-IR transformation step. Rules are composed in a fixed
// order; each sees the output of the previous one.
pub trait EmissionRule {
    fn apply(
        &self,
        items: &[IrItem],
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError>;
}

pub struct EmissionRegistry {
    rules: Vec<Box<dyn EmissionRule>>,
}

impl EmissionRegistry {
    // The standard pipeline. Binding capture runs first: marshalling
    // consumes the call_with directive and brackets the CALL, so captures
    // must see the original operand structure.
    pub fn standard() -> Self {
        EmissionRegistry {
            rules: vec![
                Box::new(CallWithBindingRule),
                Box::new(RefValBindingRule),
                Box::new(ProcedureMarshallingRule),
                Box::new(CallerMarshallingRule),
            ],
        }
    }

    pub fn rewrite(
        &self,
        items: Vec<IrItem>,
        ctx: &mut LinkingContext,
    ) -> Result<Vec<IrItem>, CompileError> {
        let mut current = items;
        for rule in &self.rules {
            current = rule.apply(&current, ctx)?;
        }
        Ok(current)
    }
}
