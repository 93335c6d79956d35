use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::chunk::{self, AtomChunk, ExpTChunk, ImpTChunk, StandardChunk};
use crate::code::{self, CodeHeader, Instruction};
use crate::parts::{AtomId, ExportEntry, ImportEntry};
use crate::{Diagnostic, Error, Result, StandardBeamFile};

/// The atoms of a module, addressed by 1-based index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AtomTable {
    atoms: Vec<String>,
}
impl AtomTable {
    pub fn new(atoms: Vec<String>) -> Self {
        AtomTable { atoms }
    }

    /// Returns the atom at `index`; index 0 is reserved and never resolves.
    pub fn get(&self, index: AtomId) -> Option<&str> {
        let index = (index as usize).checked_sub(1)?;
        self.atoms.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.atoms.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.atoms
    }
}
impl From<AtomChunk> for AtomTable {
    fn from(chunk: AtomChunk) -> Self {
        AtomTable::new(chunk.atoms.into_iter().map(|a| a.name).collect())
    }
}

/// A decoded BEAM module.
///
/// Built in a single pass over the input and never modified afterwards.
///
/// ```no_run
/// use beam_code::Module;
///
/// let module = Module::from_file("demo.beam").unwrap();
/// println!("module {:?}", module.module_name());
/// for instruction in &module.instructions {
///     println!("{} {:?}", instruction.opcode.name, instruction.args);
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Module {
    pub atoms: AtomTable,
    pub imports: Vec<ImportEntry>,
    pub exports: Vec<ExportEntry>,
    pub code_header: Option<CodeHeader>,
    pub instructions: Vec<Instruction>,

    /// Chunks this crate does not interpret, keyed by identifier.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_opaque"))]
    pub opaque: BTreeMap<chunk::Id, Vec<u8>>,
}
impl Module {
    /// Decodes a module held entirely in `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let beam = StandardBeamFile::from_bytes(bytes)?;
        Self::from_beam(beam)
    }

    /// Reads and decodes a module; gzip-compressed files are accepted.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let beam = StandardBeamFile::from_file(path)?;
        Self::from_beam(beam)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let beam = StandardBeamFile::from_reader(reader)?;
        Self::from_beam(beam)
    }

    /// Resolves the symbol tables and decodes the code of dispatched chunks.
    pub fn from_beam(beam: StandardBeamFile) -> Result<Self> {
        let mut atoms = None;
        let mut imports = None;
        let mut exports = None;
        let mut code_chunk = None;
        let mut opaque = BTreeMap::new();
        for chunk in beam.chunks {
            match chunk {
                StandardChunk::Atom(c) => atoms = Some(c),
                StandardChunk::ImpT(c) => imports = Some(c),
                StandardChunk::ExpT(c) => exports = Some(c),
                StandardChunk::Code(c) => code_chunk = Some(c),
                StandardChunk::Opaque(c) => {
                    opaque.insert(c.id, c.data);
                }
            }
        }

        let atoms = atoms.map(AtomTable::from).unwrap_or_default();
        let imports = match imports {
            Some(c) => resolve_imports(&atoms, &c)?,
            None => Vec::new(),
        };
        let exports = match exports {
            Some(c) => resolve_exports(&atoms, &c)?,
            None => Vec::new(),
        };
        let (code_header, instructions) = match code_chunk {
            Some(c) => (Some(c.info), code::decode_instructions(&c)?),
            None => (None, Vec::new()),
        };

        Ok(Module {
            atoms,
            imports,
            exports,
            code_header,
            instructions,
            opaque,
        })
    }

    /// The name of the module: by convention, the first atom.
    pub fn module_name(&self) -> Option<&str> {
        self.atoms.get(1)
    }

    /// The atom at 1-based `index`.
    pub fn atom(&self, index: AtomId) -> Option<&str> {
        self.atoms.get(index)
    }

    pub fn opaque_chunk(&self, id: &chunk::Id) -> Option<&[u8]> {
        self.opaque.get(id).map(Vec::as_slice)
    }

    /// Every non-fatal condition met while decoding the code, in stream order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.instructions
            .iter()
            .filter_map(|i| i.diagnostic.as_ref())
    }
}

/// Writes opaque chunk ids as strings, since text formats only take string keys.
#[cfg(feature = "serde")]
fn serialize_opaque<S>(
    opaque: &BTreeMap<chunk::Id, Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_map(
        opaque
            .iter()
            .map(|(id, data)| (String::from_utf8_lossy(id), data)),
    )
}

fn resolve(atoms: &AtomTable, id: chunk::Id, offset: usize, index: AtomId) -> Result<String> {
    atoms
        .get(index)
        .map(str::to_string)
        .ok_or_else(|| Error::BadAtomIndex {
            id,
            offset,
            index,
            atoms: atoms.len(),
        })
}

fn resolve_imports(atoms: &AtomTable, chunk: &ImpTChunk) -> Result<Vec<ImportEntry>> {
    let id = chunk.header.id;
    chunk
        .imports
        .iter()
        .enumerate()
        .map(|(i, import)| {
            let entry = chunk.header.offset + 4 + i * ImpTChunk::ENTRY_SIZE;
            Ok(ImportEntry {
                module: resolve(atoms, id, entry, import.module)?,
                function: resolve(atoms, id, entry + 4, import.function)?,
                arity: import.arity,
            })
        })
        .collect()
}

fn resolve_exports(atoms: &AtomTable, chunk: &ExpTChunk) -> Result<Vec<ExportEntry>> {
    let id = chunk.header.id;
    chunk
        .exports
        .iter()
        .enumerate()
        .map(|(i, export)| {
            let entry = chunk.header.offset + 4 + i * ExpTChunk::ENTRY_SIZE;
            Ok(ExportEntry {
                function: resolve(atoms, id, entry, export.function)?,
                arity: export.arity,
                label: export.label,
            })
        })
        .collect()
}
