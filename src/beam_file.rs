use byteorder::{BigEndian, ReadBytesExt};
use libflate::gzip;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, trace};

use crate::bytes_to_str;
use crate::chunk::Chunk;
use crate::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A BEAM File
///
/// ```no_run
/// use beam_code::BeamFile;
/// use beam_code::chunk::{Chunk, RawChunk};
///
/// let beam = BeamFile::<RawChunk>::from_file("demo.beam").unwrap();
/// assert_eq!(b"AtU8", beam.chunks.iter().nth(0).map(|c| c.id()).unwrap());
/// ```
#[derive(Debug)]
pub struct BeamFile<C> {
    /// The body length recorded in the envelope. It is not checked
    /// against the actual buffer.
    pub declared_size: u32,

    pub chunks: Vec<C>,
}
impl<C: Chunk> BeamFile<C> {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading BEAM file");
        let f = File::open(path)?;
        Self::from_reader(f)
    }

    /// Reads the whole of `reader`, inflating it first if it is gzip-compressed.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        debug!(size = buf.len(), "read BEAM data");

        if buf.starts_with(&GZIP_MAGIC) {
            let inflated = gunzip(&buf)?;
            debug!(
                compressed = buf.len(),
                size = inflated.len(),
                "inflated gzip-compressed BEAM data"
            );
            buf = inflated;
        }

        let beam = Self::from_bytes(&buf)?;
        for chunk in &beam.chunks {
            trace!(id = %bytes_to_str(chunk.id()), "chunk");
        }
        Ok(beam)
    }

    /// Splits `bytes` into its chunks.
    ///
    /// The chunks, with their headers and padding, must account for every
    /// byte after the 12-byte envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Header::SIZE {
            return Err(Error::MalformedContainer {
                offset: 0,
                reason: "shorter than the 12-byte envelope",
            });
        }

        let mut cursor = Cursor::new(bytes);
        let expected = Header::new(0);
        let header = Header::from_reader(&mut cursor)?;
        if header.magic_number != expected.magic_number {
            return Err(Error::MalformedContainer {
                offset: 0,
                reason: r#"magic number is not b"FOR1""#,
            });
        }
        if header.type_id != expected.type_id {
            return Err(Error::MalformedContainer {
                offset: 8,
                reason: r#"form type is not b"BEAM""#,
            });
        }

        let mut chunks = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            chunks.push(C::decode(&mut cursor)?);
        }
        Ok(BeamFile {
            declared_size: header.payload_size,
            chunks,
        })
    }
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = gzip::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

struct Header {
    magic_number: [u8; 4],
    payload_size: u32,
    type_id: [u8; 4],
}
impl Header {
    const SIZE: usize = 12;

    fn new(payload_size: u32) -> Self {
        Header {
            magic_number: *b"FOR1",
            payload_size,
            type_id: *b"BEAM",
        }
    }
    fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut header = Self::new(0);
        reader.read_exact(&mut header.magic_number)?;
        header.payload_size = reader.read_u32::<BigEndian>()?;
        reader.read_exact(&mut header.type_id)?;
        Ok(header)
    }
}
