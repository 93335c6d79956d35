//! Instruction stream decoding.
use crate::chunk::CodeChunk;
use crate::opcode::{self, Opcode};
use crate::term::{Term, TermDecoder};
use crate::{Diagnostic, Result};

/// The information fields at the start of the `"Code"` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CodeHeader {
    /// Length of the information fields that follow this one.
    pub info_size: u32,

    /// Instruction set version.
    pub version: u32,

    /// The highest opcode used in the code section.
    pub opcode_max: u32,

    /// The number of labels.
    pub label_count: u32,

    /// The number of functions.
    pub function_count: u32,
}
impl CodeHeader {
    /// The `info_size` of the four fields this crate knows about.
    pub const KNOWN_INFO_SIZE: usize = 16;
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Instruction {
    pub opcode: Opcode,

    /// Absolute offset of the opcode byte.
    pub offset: usize,

    /// Exactly `opcode.arity` operands.
    pub args: Vec<Term>,

    pub diagnostic: Option<Diagnostic>,
}

/// Decodes every instruction of a code chunk, in stream order.
///
/// Fails with `TruncatedInstruction` if an operand runs past the end of
/// the chunk. Opcodes missing from the opcode table do not fail the walk;
/// they decode with no operands and carry a [`Diagnostic`].
pub fn decode_instructions(code: &CodeChunk) -> Result<Vec<Instruction>> {
    let mut decoder = TermDecoder::new(code.header.id, &code.bytecode, code.bytecode_offset);
    let mut instructions = Vec::new();
    while !decoder.is_empty() {
        instructions.push(decode_instruction(&mut decoder)?);
    }
    Ok(instructions)
}

fn decode_instruction(decoder: &mut TermDecoder) -> Result<Instruction> {
    let offset = decoder.offset();
    let id = decoder.read_u8()?;
    let opcode = opcode::find(id);
    let diagnostic = opcode
        .is_unknown()
        .then_some(Diagnostic::UnknownOpcode { id, offset });

    let mut args = Vec::with_capacity(opcode.arity);
    for _ in 0..opcode.arity {
        args.push(decoder.decode_term()?);
    }
    Ok(Instruction {
        opcode,
        offset,
        args,
        diagnostic,
    })
}
