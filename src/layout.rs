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

use crate::ir::SourceInfo;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

// A grid coordinate with structural equality and lexicographic ordering.
// Keying maps by value instead of by reference keeps artifact iteration
// deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord(pub Vec<i32>);

impl Coord {
    pub fn new(components: Vec<i32>) -> Self {
        Coord(components)
    }

    pub fn components(&self) -> &[i32] {
        &self.0
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<i32>> for Coord {
    fn from(components: Vec<i32>) -> Self {
        Coord(components)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("|"))
    }
}

// Coordinates serialize as their "c0|c1|...|cn-1" key so that
// coordinate-keyed maps become plain JSON objects.
impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut components = Vec::new();
        for part in text.split('|') {
            let component = part
                .parse::<i32>()
                .map_err(|_| D::Error::custom(format!("bad coordinate component: {}", part)))?;
            components.push(component);
        }
        Ok(Coord(components))
    }
}

// A molecule pre-placed in the world by the front end (e.g. seeded energy),
// carried through to the artifact next to the code cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedMolecule {
    pub type_name: String,
    pub value: i64,
    pub source: SourceInfo,
}

// Output of the external coordinate-layout pass: every linear address the
// emitter will visit already has a grid coordinate, and every label an
// address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    pub linear_address_to_coord: HashMap<i64, Coord>,
    pub relative_coord_to_linear_address: HashMap<String, i64>,
    pub label_to_address: HashMap<String, i64>,
    pub source_map: HashMap<i64, SourceInfo>,
    pub initial_world_objects: HashMap<Coord, PlacedMolecule>,
}

impl LayoutResult {
    pub fn coord_of(&self, address: i64) -> Option<&Coord> {
        self.linear_address_to_coord.get(&address)
    }
}
