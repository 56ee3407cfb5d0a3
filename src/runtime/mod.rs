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

pub mod procedure_call;

use crate::isa::{FPR_BASE, PR_BASE, RuntimeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CALL_STACK_MAX_DEPTH: usize = 128;

pub const CALL_STACK_OVERFLOW: &str = "Call stack overflow";
pub const CALL_STACK_UNDERFLOW: &str = "Call stack underflow (RET without CALL)";

// A register or stack slot holds whichever shape was last written to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegisterValue {
    Scalar(i64),
    Vector(Vec<i32>),
}

impl Default for RegisterValue {
    fn default() -> Self {
        RegisterValue::Scalar(0)
    }
}

// One entry of the call stack. A frame is either fully pushed or not
// pushed at all; fpr_bindings maps formal-parameter register IDs to the
// caller registers they were populated from, for debuggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcFrame {
    pub proc_name: String,
    pub absolute_return_ip: Vec<i32>,
    pub saved_prs: Vec<RegisterValue>,
    pub saved_fprs: Vec<RegisterValue>,
    pub fpr_bindings: BTreeMap<i32, i32>,
}

// Coordinate arithmetic of the world the organisms live in. Axes wrap
// when the world is toroidal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub shape: Vec<i32>,
    pub toroidal: bool,
}

impl Environment {
    pub fn new(shape: Vec<i32>) -> Self {
        Environment {
            shape,
            toroidal: true,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.shape.len()
    }

    fn wrap_axis(&self, axis: usize, value: i32) -> i32 {
        let extent = self.shape.get(axis).copied().unwrap_or(0);
        if !self.toroidal || extent <= 0 {
            return value;
        }
        value.rem_euclid(extent)
    }

    // The cell one step along the direction vector.
    pub fn next_position(&self, coord: &[i32], direction: &[i32]) -> Vec<i32> {
        let mut next = Vec::with_capacity(coord.len());
        for axis in 0..coord.len() {
            let step = direction.get(axis).copied().unwrap_or(0);
            next.push(self.wrap_axis(axis, coord[axis] + step));
        }
        next
    }

    // Program-relative target addressing: origin plus delta, wrapped.
    pub fn target_coordinate(&self, origin: &[i32], delta: &[i32]) -> Vec<i32> {
        let dimensions = origin.len().max(delta.len());
        let mut target = Vec::with_capacity(dimensions);
        for axis in 0..dimensions {
            let from = origin.get(axis).copied().unwrap_or(0);
            let step = delta.get(axis).copied().unwrap_or(0);
            target.push(self.wrap_axis(axis, from + step));
        }
        target
    }
}

// Per-organism execution state: register files, stacks, and the
// instruction pointer with its direction vector. Nothing here is shared
// between organisms.
#[derive(Debug, Clone)]
pub struct Organism {
    pub ip: Vec<i32>,
    pub dv: Vec<i32>,
    pub origin: Vec<i32>,
    pub data_registers: Vec<RegisterValue>,
    pub proc_registers: Vec<RegisterValue>,
    pub formal_param_registers: Vec<RegisterValue>,
    pub data_stack: Vec<RegisterValue>,
    pub call_stack: Vec<ProcFrame>,
    pub failure_reason: Option<String>,
    pub skip_ip_advance: bool,
}

impl Organism {
    pub fn new(config: &RuntimeConfig, origin: Vec<i32>) -> Self {
        let dimensions = origin.len();
        let mut dv = vec![0; dimensions];
        if dimensions > 0 {
            dv[0] = 1;
        }
        Organism {
            ip: origin.clone(),
            dv,
            origin,
            data_registers: vec![RegisterValue::default(); config.num_data_registers],
            proc_registers: vec![RegisterValue::default(); config.num_proc_registers],
            formal_param_registers: vec![
                RegisterValue::default();
                config.num_formal_param_registers
            ],
            data_stack: Vec::new(),
            call_stack: Vec::new(),
            failure_reason: None,
            skip_ip_advance: false,
        }
    }

    fn file_and_slot(&self, reg_id: i32) -> Option<(&[RegisterValue], usize)> {
        if reg_id >= FPR_BASE {
            Some((&self.formal_param_registers, (reg_id - FPR_BASE) as usize))
        } else if reg_id >= PR_BASE {
            Some((&self.proc_registers, (reg_id - PR_BASE) as usize))
        } else if reg_id >= 0 {
            Some((&self.data_registers, reg_id as usize))
        } else {
            None
        }
    }

    pub fn read_register(&self, reg_id: i32) -> Option<RegisterValue> {
        let (file, slot) = self.file_and_slot(reg_id)?;
        file.get(slot).cloned()
    }

    pub fn write_register(&mut self, reg_id: i32, value: RegisterValue) -> bool {
        let slot_info = match self.file_and_slot(reg_id) {
            Some((_, slot)) => slot,
            None => return false,
        };
        let file = if reg_id >= FPR_BASE {
            &mut self.formal_param_registers
        } else if reg_id >= PR_BASE {
            &mut self.proc_registers
        } else {
            &mut self.data_registers
        };
        match file.get_mut(slot_info) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    // Records the failure and halts further progress for this tick; the
    // world as a whole keeps running.
    pub fn instruction_failed(&mut self, reason: &str) {
        self.failure_reason = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_position_wraps_on_toroidal_worlds() {
        let env = Environment::new(vec![10, 10]);
        assert_eq!(env.next_position(&[9, 0], &[1, 0]), vec![0, 0]);
        assert_eq!(env.next_position(&[0, 0], &[-1, 0]), vec![9, 0]);
        assert_eq!(env.next_position(&[4, 5], &[0, 1]), vec![4, 6]);
    }

    #[test]
    fn target_coordinate_pads_shorter_deltas() {
        let env = Environment::new(vec![100, 100]);
        assert_eq!(env.target_coordinate(&[10, 5], &[4]), vec![14, 5]);
    }

    #[test]
    fn register_files_are_disjoint() {
        let config = RuntimeConfig::default();
        let mut organism = Organism::new(&config, vec![0, 0]);
        organism.write_register(3, RegisterValue::Scalar(42));
        organism.write_register(PR_BASE, RegisterValue::Scalar(7));
        organism.write_register(FPR_BASE + 1, RegisterValue::Vector(vec![1, 2]));

        assert_eq!(organism.read_register(3), Some(RegisterValue::Scalar(42)));
        assert_eq!(
            organism.read_register(PR_BASE),
            Some(RegisterValue::Scalar(7))
        );
        assert_eq!(
            organism.read_register(FPR_BASE + 1),
            Some(RegisterValue::Vector(vec![1, 2]))
        );
        assert_eq!(organism.read_register(FPR_BASE + 100), None);
        assert_eq!(organism.read_register(-1), None);
    }
}
