use thiserror::Error;

// Fatal compilation errors. Every variant is located at the source line of
// the IR item that triggered it; the emitter stops at the first one.
#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("[ERROR] {file}:{line}: unknown opcode \"{opcode}\"")]
    UnknownOpcode {
        file: String,
        line: usize,
        opcode: String,
    },

    #[error("[ERROR] {file}:{line}: unknown register token \"{register}\"")]
    UnknownRegister {
        file: String,
        line: usize,
        register: String,
    },

    #[error("[ERROR] {file}:{line}: unknown molecule type \"{type_name}\"")]
    UnknownMoleculeType {
        file: String,
        line: usize,
        type_name: String,
    },

    #[error("[ERROR] {file}:{line}: no coordinate laid out for address {address}")]
    MissingCoordinate {
        file: String,
        line: usize,
        address: i64,
    },

    #[error("[ERROR] {file}:{line}: unresolved label \"{label}\"")]
    UnresolvedLabel {
        file: String,
        line: usize,
        label: String,
    },

    #[error("[ERROR] {file}:{line}: nested procedure definitions are not supported")]
    NestedProcedure { file: String, line: usize },

    #[error("[ERROR] {file}:{line}: procedure entry has no matching exit directive")]
    UnterminatedProcedure { file: String, line: usize },
}
