//! This crate decodes compiled Erlang/Elixir BEAM modules into a queryable,
//! immutable representation: the atom table, resolved imports and exports,
//! the decoded instruction stream and the chunks it does not interpret.
//!
//! # Examples
//!
//! Decodes a module and lists its exported functions:
//!
//! ```no_run
//! use beam_code::Module;
//!
//! let module = Module::from_file("demo.beam").unwrap();
//! for export in &module.exports {
//!     println!("{}/{} -> label {}", export.function, export.arity, export.label);
//! }
//! ```
//!
//! Collects the ID of every chunk in a BEAM file without interpreting them:
//!
//! ```no_run
//! use beam_code::RawBeamFile;
//! use beam_code::chunk::Chunk;
//!
//! let beam = RawBeamFile::from_file("demo.beam").unwrap();
//! let ids = beam.chunks.iter().map(|c| *c.id()).collect::<Vec<_>>();
//! assert_eq!(b"AtU8", &ids[0]);
//! ```
pub mod chunk;
pub mod code;
pub mod opcode;
pub mod parts;
pub mod term;

mod beam_file;
mod error;
mod module;

pub use beam_file::BeamFile;
pub use code::{CodeHeader, Instruction};
pub use error::{Diagnostic, Error};
pub use module::{AtomTable, Module};
pub use opcode::Opcode;
pub use parts::{ExportEntry, ImportEntry};
pub use term::{Tag, Term};

pub type RawBeamFile = BeamFile<chunk::RawChunk>;
pub type StandardBeamFile = BeamFile<chunk::StandardChunk>;

pub type Result<T> = std::result::Result<T, Error>;

fn bytes_to_str(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes)
        .map(|x| format!("b{:?}", x))
        .unwrap_or(format!("{:?}", bytes))
}
