// obcsim-compiler/src/codegen/mod.rs
// Renders a validated configuration into the two generated C/C++ files.

pub mod header;
pub mod sequence;

use crate::config::{Configuration, SequenceKind};

pub const HEADER_FILE_NAME: &str = "obcsim_configuration.hpp";
pub const SOURCE_FILE_NAME: &str = "obcsim_configuration.cpp";

/// The two generated text artifacts. Both are rendered in memory before
/// anything touches the filesystem, so a failed run can never leave one file
/// without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub header: String,
    pub source: String,
}

/// Render both artifacts. Only a [`Configuration`] can reach this point, and
/// those exist only after the full validation pass, so every rendering rule
/// may assume a consistent model. Iteration follows command insertion order
/// and action order, making the output byte-identical across runs.
pub fn emit(config: &Configuration) -> Artifacts {
    Artifacts {
        header: header::emit(config),
        source: sequence::emit(config),
    }
}

/// Macro name holding a command's opcode.
pub(crate) fn opcode_macro(name: &str) -> String {
    format!("MSP_OP_{}", name)
}

/// Buffer holding a command's default payload. The `cmd_` prefix keeps these
/// disjoint from the per-invocation buffers.
pub(crate) fn command_buffer_name(name: &str) -> String {
    format!("data_cmd_{}", name)
}

/// Buffer holding one invocation's inline payload, named after the sequence
/// and the action's position in it.
pub(crate) fn invocation_buffer_name(kind: SequenceKind, index: usize) -> String {
    format!("data_seq_{}_{}", kind.name(), index)
}
