//! Compact term decoding.
//!
//! Instruction operands are encoded as variable-width tagged values. The
//! low three bits of the first byte select the tag; for the seven basic
//! tags the remaining bits say how the value is stored:
//!
//! ```text
//! vvvv 0 ttt                 4-bit value in the high nibble
//! vvv 01 ttt  cccccccc       value = (c << 3) | vvv
//! nnn 11 ttt  b0 .. bn+1     value = b0 + b1 * 256 + ..., n + 2 bytes
//! 111 11 ttt  ...            arbitrary precision integer (unsupported)
//! ```
//!
//! Tag `0b111` introduces an extended term selected by the high nibble of
//! the first byte, whose components are themselves compact terms.
use byteorder::ReadBytesExt;
use std::io::Cursor;

use crate::chunk::{self, Id as ChunkId};
use crate::{Error, Result};

const TAG_MASK: u8 = 0b111;
const SIZE_BIT: u8 = 0b1000;
const LONG_BIT: u8 = 0b1_0000;
const HUGE_PREFIX: u8 = 0b1_1111;

const EXT_LIST: u8 = 0x17;
const EXT_FLOAT_REGISTER: u8 = 0x27;
const EXT_ALLOC_LIST: u8 = 0x37;
const EXT_LITERAL: u8 = 0x47;
const EXT_TYPED_REGISTER: u8 = 0x57;

/// Extended terms never nest deeper than this in compiler output.
const MAX_NESTING: usize = 8;

/// The kind of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Tag {
    Literal,
    Integer,
    Atom,
    XRegister,
    YRegister,
    Label,
    Character,
    FloatRegister,
    List,
    AllocList,
    ExtendedLiteral,
    TypedRegister,
}
impl Tag {
    fn from_basic(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Tag::Literal),
            1 => Some(Tag::Integer),
            2 => Some(Tag::Atom),
            3 => Some(Tag::XRegister),
            4 => Some(Tag::YRegister),
            5 => Some(Tag::Label),
            6 => Some(Tag::Character),
            _ => None,
        }
    }

    /// Whether this tag comes from the extended (`0b111`) space.
    pub fn is_extended(self) -> bool {
        matches!(
            self,
            Tag::FloatRegister
                | Tag::List
                | Tag::AllocList
                | Tag::ExtendedLiteral
                | Tag::TypedRegister
        )
    }
}

/// One decoded operand.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Term {
    pub tag: Tag,

    /// Absolute offset of the first byte of the term.
    pub offset: usize,

    /// Every byte the term consumed, nested terms included.
    pub bytes: Vec<u8>,

    /// The resolved number.
    ///
    /// For basic tags this is the encoded value. For `FloatRegister`,
    /// `ExtendedLiteral` and `TypedRegister` it is the register or literal
    /// index; for `List` and `AllocList` it is the element count.
    pub value: Option<i64>,

    /// Nested terms of an extended term.
    ///
    /// `List`: the elements. `AllocList`: flattened `(kind, amount)` pairs.
    /// `FloatRegister` and `ExtendedLiteral`: the index term.
    /// `TypedRegister`: the register term followed by the type index term.
    pub elements: Vec<Term>,
}
impl Term {
    /// Number of bytes the term consumed.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Decodes compact terms from a slice of an instruction stream.
#[derive(Debug)]
pub struct TermDecoder<'a> {
    id: ChunkId,
    cursor: Cursor<&'a [u8]>,
    base: usize,
    depth: usize,
}
impl<'a> TermDecoder<'a> {
    /// Makes a decoder over `bytes` of chunk `id`, whose first byte is at
    /// absolute offset `base`.
    pub fn new(id: ChunkId, bytes: &'a [u8], base: usize) -> Self {
        TermDecoder {
            id,
            cursor: Cursor::new(bytes),
            base,
            depth: 0,
        }
    }

    /// Absolute offset of the next byte to be read.
    pub fn offset(&self) -> usize {
        self.base + self.cursor.position() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let (id, offset) = (self.id, self.offset());
        self.cursor
            .read_u8()
            .map_err(|_| Error::TruncatedInstruction { id, offset })
    }

    /// Decodes the term at the current position.
    pub fn decode_term(&mut self) -> Result<Term> {
        let start = self.cursor.position() as usize;
        let b = self.read_u8()?;
        let (tag, value, elements) = match Tag::from_basic(b & TAG_MASK) {
            Some(tag) => (tag, Some(self.read_value(b)?), Vec::new()),
            None => {
                if self.depth == MAX_NESTING {
                    return Err(Error::UnsupportedTermForm {
                        id: self.id,
                        offset: self.base + start,
                        byte: b,
                    });
                }
                self.depth += 1;
                let extended = self.decode_extended(b);
                self.depth -= 1;
                extended?
            }
        };

        let end = self.cursor.position() as usize;
        Ok(Term {
            tag,
            offset: self.base + start,
            bytes: self.cursor.get_ref()[start..end].to_vec(),
            value,
            elements,
        })
    }

    fn read_value(&mut self, b: u8) -> Result<i64> {
        if b & SIZE_BIT == 0 {
            return Ok(i64::from(b >> 4));
        }
        if b & LONG_BIT == 0 {
            let c = self.read_u8()?;
            return Ok((i64::from(c) << 3) | i64::from(b >> 5));
        }
        if b >> 3 == HUGE_PREFIX {
            return Err(Error::UnsupportedTermForm {
                id: self.id,
                offset: self.offset() - 1,
                byte: b,
            });
        }

        let len = usize::from(b >> 5) + 2;
        let mut value = 0u64;
        for i in 0..len {
            value |= u64::from(self.read_u8()?) << (8 * i);
        }
        Ok(value as i64)
    }

    fn decode_extended(&mut self, b: u8) -> Result<(Tag, Option<i64>, Vec<Term>)> {
        let offset = self.offset() - 1;
        match b {
            EXT_LIST => {
                let len = self.read_count(offset, b)?;
                let elements = self.decode_terms(len)?;
                Ok((Tag::List, Some(len as i64), elements))
            }
            EXT_FLOAT_REGISTER => {
                let index = self.decode_term()?;
                Ok((Tag::FloatRegister, index.value, vec![index]))
            }
            EXT_ALLOC_LIST => {
                let count = self.read_count(offset, b)?;
                let elements = self.decode_terms(count.saturating_mul(2))?;
                Ok((Tag::AllocList, Some(count as i64), elements))
            }
            EXT_LITERAL => {
                let index = self.decode_term()?;
                Ok((Tag::ExtendedLiteral, index.value, vec![index]))
            }
            EXT_TYPED_REGISTER => {
                let register = self.decode_term()?;
                let type_index = self.decode_term()?;
                Ok((
                    Tag::TypedRegister,
                    register.value,
                    vec![register, type_index],
                ))
            }
            _ => Err(Error::UnsupportedTermForm {
                id: self.id,
                offset,
                byte: b,
            }),
        }
    }

    /// Reads the length term that follows a list or allocation list header.
    fn read_count(&mut self, offset: usize, b: u8) -> Result<usize> {
        let term = self.decode_term()?;
        match term.value {
            Some(n) if n >= 0 && !term.tag.is_extended() => Ok(n as usize),
            _ => Err(Error::UnsupportedTermForm {
                id: self.id,
                offset,
                byte: b,
            }),
        }
    }

    fn decode_terms(&mut self, count: usize) -> Result<Vec<Term>> {
        // Each term takes at least one byte.
        let remaining = self.cursor.get_ref().len() - self.cursor.position() as usize;
        let mut terms = Vec::with_capacity(count.min(remaining));
        for _ in 0..count {
            terms.push(self.decode_term()?);
        }
        Ok(terms)
    }
}

/// Decodes the single term at the start of `bytes`, an operand taken from
/// a `"Code"` chunk.
///
/// ```
/// use beam_code::term::{self, Tag};
///
/// let term = term::decode(&[0x08, 0x03]).unwrap();
/// assert_eq!(Tag::Literal, term.tag);
/// assert_eq!(Some(24), term.value);
/// assert_eq!(2, term.size());
/// ```
pub fn decode(bytes: &[u8]) -> Result<Term> {
    TermDecoder::new(chunk::CODE, bytes, 0).decode_term()
}
