pub type AtomId = u32;
pub type Arity = u32;
pub type ExternalTermFormatBinary = Vec<u8>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: String,
}

/// An `ImpT` entry as stored in the file: atom indices, not names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Import {
    pub module: AtomId,
    pub function: AtomId,
    pub arity: Arity,
}

/// An `ExpT` entry as stored in the file: atom index, not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export {
    pub function: AtomId,
    pub arity: Arity,
    pub label: u32,
}

/// An imported function with its module and function atoms resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImportEntry {
    pub module: String,
    pub function: String,
    pub arity: Arity,
}

/// An exported function with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportEntry {
    pub function: String,
    pub arity: Arity,
    pub label: u32,
}
