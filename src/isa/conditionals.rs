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

// Conditional opcodes and their negations. Each conditional skips the next
// instruction when its predicate fails; the negated form skips when it
// holds. The pairing is an involution: negate(negate(op)) == op.
const CONDITIONAL_PAIRS: &[(&str, &str)] = &[
    ("IFR", "INR"),
    ("IFI", "INI"),
    ("IFS", "INS"),
    ("LTR", "GETR"),
    ("LTI", "GETI"),
    ("GTR", "LETR"),
    ("GTI", "LETI"),
    ("IFTR", "INTR"),
    ("IFTI", "INTI"),
    ("IFMR", "INMR"),
    ("IFMI", "INMI"),
    ("IFPR", "INPR"),
    ("IFPI", "INPI"),
    ("IFVR", "INVR"),
];

pub fn is_conditional(opcode: &str) -> bool {
    CONDITIONAL_PAIRS
        .iter()
        .any(|(a, b)| *a == opcode || *b == opcode)
}

pub fn negate(opcode: &str) -> Option<&'static str> {
    for (a, b) in CONDITIONAL_PAIRS {
        if *a == opcode {
            return Some(b);
        }
        if *b == opcode {
            return Some(a);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_an_involution() {
        for (a, b) in CONDITIONAL_PAIRS {
            assert_eq!(negate(a), Some(*b));
            assert_eq!(negate(negate(a).unwrap()), Some(*a));
            assert!(is_conditional(a));
            assert!(is_conditional(negate(a).unwrap()));
        }
    }

    #[test]
    fn non_conditionals_have_no_negation() {
        assert_eq!(negate("ADDR"), None);
        assert!(!is_conditional("CALL"));
    }
}
