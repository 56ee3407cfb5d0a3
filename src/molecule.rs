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

// An atomic cell value packs a 2-bit type code and a 30-bit signed scalar
// into one i32. The layout is part of the VM contract and must not change.
const VALUE_BITS: u32 = 30;
const VALUE_MASK: i32 = (1 << VALUE_BITS) - 1;
const SIGN_BIT: i32 = 1 << (VALUE_BITS - 1);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoleculeType {
    Code,
    Data,
    Energy,
    Structure,
}

impl MoleculeType {
    pub fn code(&self) -> i32 {
        match self {
            MoleculeType::Code => 0,
            MoleculeType::Data => 1,
            MoleculeType::Energy => 2,
            MoleculeType::Structure => 3,
        }
    }

    pub fn from_code(code: i32) -> MoleculeType {
        match code & 0b11 {
            0 => MoleculeType::Code,
            1 => MoleculeType::Data,
            2 => MoleculeType::Energy,
            _ => MoleculeType::Structure,
        }
    }

    pub fn from_name(name: &str) -> Option<MoleculeType> {
        match name {
            "CODE" => Some(MoleculeType::Code),
            "DATA" => Some(MoleculeType::Data),
            "ENERGY" => Some(MoleculeType::Energy),
            "STRUCTURE" => Some(MoleculeType::Structure),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MoleculeType::Code => "CODE",
            MoleculeType::Data => "DATA",
            MoleculeType::Energy => "ENERGY",
            MoleculeType::Structure => "STRUCTURE",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Molecule {
    pub molecule_type: MoleculeType,
    pub value: i64,
}

impl Molecule {
    pub fn new(molecule_type: MoleculeType, value: i64) -> Self {
        Molecule {
            molecule_type,
            value,
        }
    }

    // Canonical cell encoding. Scalars outside the 30-bit range are
    // truncated to it.
    pub fn to_int(&self) -> i32 {
        (self.molecule_type.code() << VALUE_BITS) | (self.value as i32 & VALUE_MASK)
    }

    pub fn from_int(raw: i32) -> Molecule {
        let code = ((raw as u32) >> VALUE_BITS) as i32;
        let mut value = raw & VALUE_MASK;
        if value & SIGN_BIT != 0 {
            value |= !VALUE_MASK;
        }
        Molecule {
            molecule_type: MoleculeType::from_code(code),
            value: value as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_types() {
        for ty in [
            MoleculeType::Code,
            MoleculeType::Data,
            MoleculeType::Energy,
            MoleculeType::Structure,
        ] {
            let mol = Molecule::new(ty, 1234);
            assert_eq!(Molecule::from_int(mol.to_int()), mol);
        }
    }

    #[test]
    fn round_trips_negative_scalars() {
        let mol = Molecule::new(MoleculeType::Data, -5);
        let decoded = Molecule::from_int(mol.to_int());
        assert_eq!(decoded.value, -5);
        assert_eq!(decoded.molecule_type, MoleculeType::Data);
    }

    #[test]
    fn empty_cell_is_code_zero() {
        let decoded = Molecule::from_int(0);
        assert_eq!(decoded.molecule_type, MoleculeType::Code);
        assert_eq!(decoded.value, 0);
    }

    #[test]
    fn resolves_type_names() {
        assert_eq!(MoleculeType::from_name("ENERGY"), Some(MoleculeType::Energy));
        assert_eq!(MoleculeType::from_name("PLASMA"), None);
    }
}
