// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The parser's single error taxonomy.

use core::fmt;

use crate::types::SectionId;

/// Every fault the reader, parser, or constant-expression sub-parser can
/// raise. Any occurrence is fatal to the enclosing event stream: there is no
/// partial recovery from malformed input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The buffer was exhausted mid-decode.
    UnexpectedEnd {
        /// Offset at which the read was attempted.
        offset: usize,
    },
    /// The 4-byte magic did not read `\0asm`.
    InvalidMagic {
        /// The 4 bytes actually read, as a little-endian `u32`.
        found: u32,
    },
    /// The format version was not 1.
    UnsupportedVersion {
        /// The version actually read.
        found: u32,
    },
    /// A LEB128-encoded integer exceeded its width cap, or its terminating
    /// byte had bits set inconsistent with the value's declared width.
    VarIntTooLarge {
        /// Offset of the first byte of the offending encoding.
        offset: usize,
    },
    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8 {
        /// Offset of the first byte of the string payload.
        offset: usize,
    },
    /// A value-type tag byte did not match any known encoding.
    InvalidValType {
        /// The offending byte.
        found: u8,
        /// Offset at which it was read.
        offset: usize,
    },
    /// A function type's tag byte was not `0x60`.
    InvalidFuncTypeTag {
        /// The offending byte.
        found: u8,
        /// Offset at which it was read.
        offset: usize,
    },
    /// A block type's encoding was neither `0x40`, a value type, nor a valid
    /// signed type index.
    InvalidBlockType {
        /// Offset at which the block type was read.
        offset: usize,
    },
    /// A `Limits` encoding had reserved flag bits set, or `max < min`, or
    /// either bound exceeded the page-space cap.
    InvalidLimits {
        /// Offset of the flags byte.
        offset: usize,
    },
    /// An import/export descriptor kind byte was not 0..=3.
    InvalidExternalKind {
        /// The offending byte.
        found: u8,
        /// Offset at which it was read.
        offset: usize,
    },
    /// A section id byte fell outside 0..=12.
    UnknownSection {
        /// The offending id byte.
        found: u8,
        /// Offset at which it was read.
        offset: usize,
    },
    /// A section's decoded body consumed a different number of bytes than
    /// its declared length.
    SectionSizeMismatch {
        /// The section whose body was mis-sized.
        id: SectionId,
        /// The declared length.
        expected: u32,
        /// The number of bytes actually consumed.
        actual: u32,
    },
    /// An opcode encountered inside a constant initializer expression was
    /// not one of the five legal const opcodes (or `end`).
    InvalidOpcode {
        /// The offending opcode byte.
        found: u8,
        /// Offset at which it was read.
        offset: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEnd { offset } => {
                write!(f, "unexpected end of buffer at offset {offset:#x}")
            }
            Error::InvalidMagic { found } => {
                write!(f, "invalid magic: expected \\0asm, found {found:#010x}")
            }
            Error::UnsupportedVersion { found } => {
                write!(f, "unsupported version: expected 1, found {found:#010x}")
            }
            Error::VarIntTooLarge { offset } => {
                write!(f, "LEB128 integer too large at offset {offset:#x}")
            }
            Error::InvalidUtf8 { offset } => {
                write!(f, "invalid UTF-8 string at offset {offset:#x}")
            }
            Error::InvalidValType { found, offset } => {
                write!(f, "invalid value type {found:#04x} at offset {offset:#x}")
            }
            Error::InvalidFuncTypeTag { found, offset } => write!(
                f,
                "invalid function type tag {found:#04x} at offset {offset:#x}, expected 0x60"
            ),
            Error::InvalidBlockType { offset } => {
                write!(f, "invalid block type at offset {offset:#x}")
            }
            Error::InvalidLimits { offset } => {
                write!(f, "invalid limits encoding at offset {offset:#x}")
            }
            Error::InvalidExternalKind { found, offset } => write!(
                f,
                "invalid external kind {found:#04x} at offset {offset:#x}"
            ),
            Error::UnknownSection { found, offset } => {
                write!(f, "unknown section id {found:#04x} at offset {offset:#x}")
            }
            Error::SectionSizeMismatch {
                id,
                expected,
                actual,
            } => write!(
                f,
                "section {id:?} declared length {expected:#x} but consumed {actual:#x}"
            ),
            Error::InvalidOpcode { found, offset } => write!(
                f,
                "invalid opcode {found:#04x} in constant expression at offset {offset:#x}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
