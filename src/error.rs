use std::io::Error as IoError;
use std::str::Utf8Error;

use crate::bytes_to_str;
use crate::chunk::Id as ChunkId;

/// Errors that abort the decoding of a BEAM module.
///
/// Offsets are absolute positions in the (decompressed) input buffer.
#[derive(Debug, ::thiserror::Error)]
pub enum Error {
    #[error("Error::Io")]
    Io(#[from] IoError),

    #[error(
        "Error::InvalidString: id - {}, offset - {}",
        bytes_to_str(.id),
        .offset
    )]
    InvalidString {
        id: ChunkId,
        offset: usize,
        #[source]
        source: Utf8Error,
    },

    #[error(
        "Error::UnexpectedChunk: id - {}, offset - {}, expected - {}",
        bytes_to_str(.id),
        .offset,
        .expected
    )]
    UnexpectedChunk {
        id: ChunkId,
        offset: usize,
        expected: &'static str,
    },

    #[error("Error::MalformedContainer: offset - {}, reason - {}", .offset, .reason)]
    MalformedContainer { offset: usize, reason: &'static str },

    #[error(
        "Error::TruncatedChunk: id - {}, offset - {}, needed - {}, available - {}",
        bytes_to_str(.id),
        .offset,
        .needed,
        .available
    )]
    TruncatedChunk {
        id: ChunkId,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error(
        "Error::BadAtomIndex: id - {}, offset - {}, index - {}, atoms - {}",
        bytes_to_str(.id),
        .offset,
        .index,
        .atoms
    )]
    BadAtomIndex {
        id: ChunkId,
        offset: usize,
        index: u32,
        atoms: usize,
    },

    #[error(
        "Error::UnsupportedTermForm: id - {}, offset - {}, byte - {:#04x}",
        bytes_to_str(.id),
        .offset,
        .byte
    )]
    UnsupportedTermForm {
        id: ChunkId,
        offset: usize,
        byte: u8,
    },

    #[error(
        "Error::TruncatedInstruction: id - {}, offset - {}",
        bytes_to_str(.id),
        .offset
    )]
    TruncatedInstruction { id: ChunkId, offset: usize },
}

/// A non-fatal condition found while walking the instruction stream.
///
/// Decoding continues after a diagnostic, but everything following it may
/// be desynchronized: an unknown opcode is given arity 0, so any operands
/// it really has are read as the next opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ::thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Diagnostic {
    #[error("Diagnostic::UnknownOpcode: id - {}, offset - {}", .id, .offset)]
    UnknownOpcode { id: u8, offset: usize },
}
