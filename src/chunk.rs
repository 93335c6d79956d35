//! The `Chunk` trait and the chunks this crate decodes structurally.
//!
//! Only the atom table (`Atom`/`AtU8`), the code (`Code`), the import table
//! (`ImpT`) and the export table (`ExpT`) are interpreted. Every other chunk
//! is kept verbatim as an opaque [`RawChunk`].
//!
//! # Reference
//! - [BEAM File Format][BEAM]
//! - [`beam_lib`](http://erlang.org/doc/man/beam_lib.html)
//!
//! [BEAM]: http://rnyingma.synrc.com/publications/cat/Functional%20Languages/Erlang/BEAM.pdf
use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use libflate::zlib;
use std::io::{Cursor, Read};
use std::str;

use crate::code::CodeHeader;
use crate::parts;
use crate::{Error, Result};

/// The identifier which indicates the type of a chunk.
pub type Id = [u8; 4];

pub const ATOM: Id = *b"Atom";
pub const ATU8: Id = *b"AtU8";
pub const CODE: Id = *b"Code";
pub const IMPT: Id = *b"ImpT";
pub const EXPT: Id = *b"ExpT";
pub const STRT: Id = *b"StrT";
pub const LITT: Id = *b"LitT";
pub const LOCT: Id = *b"LocT";
pub const FUNT: Id = *b"FunT";
pub const ATTR: Id = *b"Attr";
pub const CINF: Id = *b"CInf";
pub const DBGI: Id = *b"Dbgi";
pub const DOCS: Id = *b"Docs";
pub const EXDP: Id = *b"ExDp";
pub const LINE: Id = *b"Line";
pub const ABST: Id = *b"Abst";

/// Size in bytes of a chunk header (identifier and data size).
pub const HEADER_SIZE: usize = 8;

/// Number of zero bytes that follow `data_size` bytes of chunk data.
pub fn padding_size(data_size: u32) -> u32 {
    (4 - data_size % 4) % 4
}

/// The part every chunk shares: where it came from and how big it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The identifier of the chunk.
    pub id: Id,

    /// Absolute offset of the chunk data (just past the 8-byte header).
    pub offset: usize,

    /// The declared data size, padding excluded.
    pub size: u32,
}

/// The `Chunk` trait represents a type of chunk in a BEAM file.
pub trait Chunk {
    /// Returns the identifier of the chunk.
    fn id(&self) -> &Id;

    /// Reads one chunk (header, data and padding) from `cursor`.
    ///
    /// `cursor` must be positioned over the whole input buffer so that the
    /// offsets recorded in chunks and errors are absolute.
    fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self>
    where
        Self: Sized,
    {
        let buf: &[u8] = *cursor.get_ref();
        let start = cursor.position() as usize;
        if buf.len().saturating_sub(start) < HEADER_SIZE {
            return Err(Error::MalformedContainer {
                offset: start,
                reason: "trailing bytes are shorter than a chunk header",
            });
        }

        let mut id = [0; 4];
        cursor.read_exact(&mut id)?;
        let size = cursor.read_u32::<BigEndian>()?;
        let header = Header {
            id,
            offset: start + HEADER_SIZE,
            size,
        };

        let needed = size as usize + padding_size(size) as usize;
        let available = buf.len() - header.offset;
        if needed > available {
            return Err(Error::TruncatedChunk {
                id,
                offset: start,
                needed,
                available,
            });
        }
        let data = &buf[header.offset..header.offset + size as usize];
        cursor.set_position((header.offset + needed) as u64);

        Self::decode_data(header, data)
    }

    /// Interprets the data of the chunk described by `header`.
    ///
    /// NOTICE: `data` has no chunk header and no padding.
    fn decode_data(header: Header, data: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// A raw representation of a chunk.
///
/// This implementation does not interpret the data of a chunk
/// at the time of reading it from a BEAM file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// The identifier of the chunk.
    pub id: Id,

    /// Absolute offset of `data` in the input buffer.
    pub offset: usize,

    /// The bare data of the chunk.
    pub data: Vec<u8>,
}
impl RawChunk {
    /// Number of padding bytes that followed the data in the container.
    pub fn padding(&self) -> usize {
        padding_size(self.data.len() as u32) as usize
    }
}
impl Chunk for RawChunk {
    fn id(&self) -> &Id {
        &self.id
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        Ok(RawChunk {
            id: header.id,
            offset: header.offset,
            data: data.to_vec(),
        })
    }
}

/// A representation of the `"Atom"` and `"AtU8"` chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomChunk {
    pub header: Header,

    /// The list of atoms contained in a BEAM file, in table order.
    ///
    /// The first atom is the name of the module.
    pub atoms: Vec<parts::Atom>,
}
impl AtomChunk {
    /// Whether or not this chunk contains UTF-8 atoms.
    pub fn is_unicode(&self) -> bool {
        self.header.id == ATU8
    }
}
impl Chunk for AtomChunk {
    fn id(&self) -> &Id {
        &self.header.id
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        // This chunk can be either Atom (Latin-1) or AtU8
        let unicode = match header.id {
            ATU8 => true,
            ATOM => false,
            _ => return Err(aux::unexpected(header, "atom table")),
        };
        let mut reader = aux::DataReader::new(header, data);
        let count = reader.read_u32()? as usize;
        let mut atoms = Vec::with_capacity(count.min(data.len()));
        for _ in 0..count {
            let len = reader.read_u8()? as usize;
            let offset = reader.offset();
            let bytes = reader.read_bytes(len)?;

            let name = if unicode {
                str::from_utf8(bytes)
                    .map_err(|source| Error::InvalidString {
                        id: header.id,
                        offset,
                        source,
                    })?
                    .to_string()
            } else {
                bytes.iter().map(|&b| char::from(b)).collect()
            };
            atoms.push(parts::Atom { name });
        }
        Ok(AtomChunk { header, atoms })
    }
}

/// A representation of the `"Code"` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    pub header: Header,

    /// The information fields that precede the code.
    pub info: CodeHeader,

    /// Absolute offset of the first byte of `bytecode`.
    pub bytecode_offset: usize,

    /// The byte code.
    pub bytecode: Vec<u8>,
}
impl Chunk for CodeChunk {
    fn id(&self) -> &Id {
        &self.header.id
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        if header.id != CODE {
            return Err(aux::unexpected(header, "code"));
        }
        let mut reader = aux::DataReader::new(header, data);
        let info = CodeHeader {
            info_size: reader.read_u32()?,
            version: reader.read_u32()?,
            opcode_max: reader.read_u32()?,
            label_count: reader.read_u32()?,
            function_count: reader.read_u32()?,
        };

        // Newer compilers may append fields to the sub-header; `info_size`
        // counts every header byte after itself.
        let extra = (info.info_size as usize).saturating_sub(CodeHeader::KNOWN_INFO_SIZE);
        reader.read_bytes(extra)?;

        let bytecode_offset = reader.offset();
        let bytecode = reader.rest().to_vec();
        Ok(CodeChunk {
            header,
            info,
            bytecode_offset,
            bytecode,
        })
    }
}

/// A representation of the `"ImpT"` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpTChunk {
    pub header: Header,

    /// The list of imported functions, with unresolved atom indices.
    pub imports: Vec<parts::Import>,
}
impl ImpTChunk {
    /// Size in bytes of one table entry.
    pub const ENTRY_SIZE: usize = 12;
}
impl Chunk for ImpTChunk {
    fn id(&self) -> &Id {
        &self.header.id
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        if header.id != IMPT {
            return Err(aux::unexpected(header, "import table"));
        }
        let mut reader = aux::DataReader::new(header, data);
        let count = reader.read_u32()? as usize;
        reader.require(count.saturating_mul(Self::ENTRY_SIZE))?;
        let mut imports = Vec::with_capacity(count);
        for _ in 0..count {
            imports.push(parts::Import {
                module: reader.read_u32()?,
                function: reader.read_u32()?,
                arity: reader.read_u32()?,
            });
        }
        Ok(ImpTChunk { header, imports })
    }
}

/// A representation of the `"ExpT"` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpTChunk {
    pub header: Header,

    /// The list of exported functions, with unresolved atom indices.
    pub exports: Vec<parts::Export>,
}
impl ExpTChunk {
    /// Size in bytes of one table entry.
    pub const ENTRY_SIZE: usize = 12;
}
impl Chunk for ExpTChunk {
    fn id(&self) -> &Id {
        &self.header.id
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        if header.id != EXPT {
            return Err(aux::unexpected(header, "export table"));
        }
        let mut reader = aux::DataReader::new(header, data);
        let count = reader.read_u32()? as usize;
        reader.require(count.saturating_mul(Self::ENTRY_SIZE))?;
        let mut exports = Vec::with_capacity(count);
        for _ in 0..count {
            exports.push(parts::Export {
                function: reader.read_u32()?,
                arity: reader.read_u32()?,
                label: reader.read_u32()?,
            });
        }
        Ok(ExpTChunk { header, exports })
    }
}

/// A chunk routed by its identifier.
///
/// ```no_run
/// use beam_code::BeamFile;
/// use beam_code::chunk::{Chunk, StandardChunk};
///
/// let beam = BeamFile::<StandardChunk>::from_file("demo.beam").unwrap();
/// assert_eq!(b"AtU8", beam.chunks.iter().nth(0).map(|c| c.id()).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StandardChunk {
    Atom(AtomChunk),
    Code(CodeChunk),
    ImpT(ImpTChunk),
    ExpT(ExpTChunk),
    Opaque(RawChunk),
}
impl Chunk for StandardChunk {
    fn id(&self) -> &Id {
        use self::StandardChunk::*;
        match *self {
            Atom(ref c) => c.id(),
            Code(ref c) => c.id(),
            ImpT(ref c) => c.id(),
            ExpT(ref c) => c.id(),
            Opaque(ref c) => c.id(),
        }
    }
    fn decode_data(header: Header, data: &[u8]) -> Result<Self> {
        use self::StandardChunk::*;
        match header.id {
            ATOM | ATU8 => Ok(Atom(AtomChunk::decode_data(header, data)?)),
            CODE => Ok(Code(CodeChunk::decode_data(header, data)?)),
            IMPT => Ok(ImpT(ImpTChunk::decode_data(header, data)?)),
            EXPT => Ok(ExpT(ExpTChunk::decode_data(header, data)?)),
            _ => Ok(Opaque(RawChunk::decode_data(header, data)?)),
        }
    }
}

/// Splits the data of a `"LitT"` chunk into its literals.
///
/// Each literal is returned as it is stored: a term in the
/// [External Term Format](http://erlang.org/doc/apps/erts/erl_ext_dist.html),
/// which this crate does not decode. The table is zlib-compressed unless its
/// declared uncompressed size is zero.
pub fn literals(data: &[u8]) -> Result<Vec<parts::ExternalTermFormatBinary>> {
    let mut reader = Cursor::new(data);
    let uncompressed_size = reader.read_u32::<BigEndian>()?;
    let literals = if uncompressed_size == 0 {
        aux::split_literals(reader)?
    } else {
        aux::split_literals(zlib::Decoder::new(reader)?)?
    };
    Ok(literals)
}

mod aux {
    use super::*;
    use byteorder::BigEndian;
    use byteorder::ReadBytesExt;
    use std::io::{self, Cursor, Read};

    pub fn unexpected(header: Header, expected: &'static str) -> Error {
        Error::UnexpectedChunk {
            id: header.id,
            offset: header.offset,
            expected,
        }
    }

    /// Reads big-endian fields from the data of one chunk, reporting
    /// overruns as `TruncatedChunk` at absolute offsets.
    pub struct DataReader<'a> {
        header: Header,
        cursor: Cursor<&'a [u8]>,
    }
    impl<'a> DataReader<'a> {
        pub fn new(header: Header, data: &'a [u8]) -> Self {
            DataReader {
                header,
                cursor: Cursor::new(data),
            }
        }

        pub fn offset(&self) -> usize {
            self.header.offset + self.cursor.position() as usize
        }

        fn remaining(&self) -> usize {
            self.cursor.get_ref().len() - self.cursor.position() as usize
        }

        pub fn require(&self, needed: usize) -> Result<()> {
            let available = self.remaining();
            if needed > available {
                return Err(Error::TruncatedChunk {
                    id: self.header.id,
                    offset: self.offset(),
                    needed,
                    available,
                });
            }
            Ok(())
        }

        pub fn read_u8(&mut self) -> Result<u8> {
            self.require(1)?;
            Ok(self.cursor.read_u8()?)
        }

        pub fn read_u32(&mut self) -> Result<u32> {
            self.require(4)?;
            Ok(self.cursor.read_u32::<BigEndian>()?)
        }

        pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
            self.require(len)?;
            let data: &'a [u8] = *self.cursor.get_ref();
            let start = self.cursor.position() as usize;
            self.cursor.set_position((start + len) as u64);
            Ok(&data[start..start + len])
        }

        pub fn rest(&mut self) -> &'a [u8] {
            let len = self.remaining();
            let data: &'a [u8] = *self.cursor.get_ref();
            let start = self.cursor.position() as usize;
            self.cursor.set_position((start + len) as u64);
            &data[start..]
        }
    }

    pub fn split_literals<R: Read>(mut reader: R) -> io::Result<Vec<Vec<u8>>> {
        let count = reader.read_u32::<BigEndian>()? as usize;
        let mut literals = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let size = reader.read_u32::<BigEndian>()? as u64;
            let mut buf = Vec::new();
            (&mut reader).take(size).read_to_end(&mut buf)?;
            if buf.len() as u64 != size {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            literals.push(buf);
        }
        Ok(literals)
    }
}
