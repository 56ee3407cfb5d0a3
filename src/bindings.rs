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
use crate::layout::Coord;
use crate::runtime::Environment;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

// Maps call sites to the caller register IDs providing actuals. The
// compiler writes entries, executing organisms read them; both maps store
// and hand out copies so no caller can alias the stored state. Call sites
// are keyed twice: by linear address (stable tooling handle) and by
// absolute grid coordinate (robust against FORK-style code duplication).
#[derive(Debug, Default)]
pub struct CallBindingRegistry {
    by_linear_address: RwLock<HashMap<i64, Vec<i32>>>,
    by_absolute_coord: RwLock<HashMap<Coord, Vec<i32>>>,
}

impl CallBindingRegistry {
    pub fn new() -> Self {
        CallBindingRegistry::default()
    }

    // Process-wide instance for hosts that cannot plumb an owned registry
    // through. Tests must call clear_all between cases.
    pub fn global() -> &'static CallBindingRegistry {
        static GLOBAL: OnceLock<CallBindingRegistry> = OnceLock::new();
        GLOBAL.get_or_init(CallBindingRegistry::new)
    }

    pub fn register_for_linear_address(&self, address: i64, reg_ids: &[i32]) {
        self.by_linear_address
            .write()
            .unwrap()
            .insert(address, reg_ids.to_vec());
    }

    pub fn register_for_absolute_coord(&self, coord: &Coord, reg_ids: &[i32]) {
        self.by_absolute_coord
            .write()
            .unwrap()
            .insert(coord.clone(), reg_ids.to_vec());
    }

    pub fn get_for_linear_address(&self, address: i64) -> Option<Vec<i32>> {
        self.by_linear_address.read().unwrap().get(&address).cloned()
    }

    pub fn get_for_absolute_coord(&self, coord: &Coord) -> Option<Vec<i32>> {
        self.by_absolute_coord.read().unwrap().get(coord).cloned()
    }

    // Test isolation only; not meant to run concurrently with other calls.
    pub fn clear_all(&self) {
        self.by_linear_address.write().unwrap().clear();
        self.by_absolute_coord.write().unwrap().clear();
    }
}

// Registers a compiled program's call-site bindings at the world position
// the program was placed at. Compiling registers origin-zero coordinates
// already; placements elsewhere (spawn, FORK) go through here.
pub fn register_program_bindings(
    artifact: &ProgramArtifact,
    origin: &[i32],
    environment: &Environment,
    registry: &CallBindingRegistry,
) {
    for (address, reg_ids) in &artifact.call_site_bindings {
        if let Some(relative) = artifact.linear_address_to_coord.get(address) {
            let absolute = environment.target_coordinate(origin, relative.components());
            registry.register_for_absolute_coord(&Coord::new(absolute), reg_ids);
        }
    }
}

// Resolves the binding for the CALL the organism is about to execute,
// keyed by the pre-fetch instruction pointer. Never consults source text;
// a program rewritten at runtime keeps working as long as its cells moved
// with their registrations.
pub struct CallBindingResolver<'a> {
    registry: &'a CallBindingRegistry,
}

impl<'a> CallBindingResolver<'a> {
    pub fn new(registry: &'a CallBindingRegistry) -> Self {
        CallBindingResolver { registry }
    }

    pub fn resolve(&self, pre_fetch_ip: &Coord) -> Option<Vec<i32>> {
        self.registry.get_for_absolute_coord(pre_fetch_ip)
    }
}
