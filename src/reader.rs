// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! A cursor over an in-memory byte buffer, plus decoders for every
//! primitive and grammar fragment the binary format defines.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::Error;
use crate::types::{
    BlockType, ExternalKind, GlobalType, Limits, MemArg, MemoryType, RefType, TableType, ValType,
};

/// A forward-only cursor over a borrowed byte buffer.
///
/// Every decode method either advances `pos` past the bytes it consumed and
/// returns `Ok`, or leaves `pos` unspecified and returns `Err`: callers must
/// treat any error as fatal to the reader, not as a recoverable mis-parse.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// The current byte offset within the original buffer.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether every byte of the buffer has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// The number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads and returns the next `n` bytes without interpretation.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let start = self.pos;
        let end = start
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(Error::UnexpectedEnd { offset: start })?;
        self.pos = end;
        Ok(&self.buf[start..end])
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Peeks at the next byte without advancing the cursor.
    fn peek_u8(&self) -> Result<u8, Error> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(Error::UnexpectedEnd { offset: self.pos })
    }

    /// Carves out a scoped sub-reader over exactly the next `len` bytes,
    /// advancing this reader past them.
    ///
    /// This is how every section body is decoded: the sub-reader's own
    /// exhaustion is checked independently by the caller, so that a
    /// section which under- or over-consumes its declared length is
    /// caught at the section boundary rather than corrupting the
    /// remainder of the module.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>, Error> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    /// Reads an unsigned LEB128-encoded 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        leb128::read_unsigned(self, 32).map(|v| v as u32)
    }

    /// Reads an unsigned LEB128-encoded 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        leb128::read_unsigned(self, 64)
    }

    /// Reads a signed LEB128-encoded 32-bit integer.
    pub fn read_s32(&mut self) -> Result<i32, Error> {
        leb128::read_signed(self, 32).map(|v| v as i32)
    }

    /// Reads a signed LEB128-encoded 64-bit integer.
    pub fn read_s64(&mut self) -> Result<i64, Error> {
        leb128::read_signed(self, 64)
    }

    /// Reads a signed LEB128-encoded 33-bit integer, widened to `i64`.
    ///
    /// The extra bit over a plain `i32` is what lets a block type's type
    /// index (always non-negative) share its encoding space with the
    /// negative one-byte sentinels (`Empty`, each value type) without the
    /// two ever colliding.
    fn read_s33(&mut self) -> Result<i64, Error> {
        leb128::read_signed(self, 33)
    }

    /// Reads a 4-byte little-endian IEEE 754 single-precision float.
    pub fn read_f32(&mut self) -> Result<f32, Error> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().unwrap();
        Ok(f32::from_le_bytes(bytes))
    }

    /// Reads an 8-byte little-endian IEEE 754 double-precision float.
    pub fn read_f64(&mut self) -> Result<f64, Error> {
        let bytes: [u8; 8] = self.read_bytes(8)?.try_into().unwrap();
        Ok(f64::from_le_bytes(bytes))
    }

    /// Reads a length-prefixed, UTF-8-validated name.
    pub fn read_name(&mut self) -> Result<String, Error> {
        let offset = self.pos;
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        core::str::from_utf8(bytes)
            .map(String::from)
            .map_err(|_| Error::InvalidUtf8 { offset })
    }

    /// Reads a value type tag.
    pub fn read_val_type(&mut self) -> Result<ValType, Error> {
        let offset = self.pos;
        let byte = self.read_u8()?;
        ValType::try_from(byte).map_err(|_| Error::InvalidValType { found: byte, offset })
    }

    /// Reads a reference type tag (the `ValType` subset legal for table
    /// element types).
    pub fn read_ref_type(&mut self) -> Result<RefType, Error> {
        let offset = self.pos;
        let byte = self.read_u8()?;
        RefType::try_from(byte).map_err(|_| Error::InvalidValType { found: byte, offset })
    }

    /// Reads a `limits` encoding: a flags byte (`0x00` bounded-below-only,
    /// `0x01` bounded-above-and-below; all other values are rejected as
    /// reserved), followed by the bound(s).
    ///
    /// This only enforces the encoding's own shape (the reserved flag
    /// bits). It does not check `max >= min` or the page-space cap —
    /// those are module-level invariants the validator enforces over the
    /// decoded `Limits`, not faults in the encoding itself.
    pub fn read_limits(&mut self) -> Result<Limits, Error> {
        let flags_offset = self.pos;
        let flags = self.read_u8()?;
        let min = self.read_u32()?;
        let max = match flags {
            0x00 => None,
            0x01 => Some(self.read_u32()?),
            _ => return Err(Error::InvalidLimits { offset: flags_offset }),
        };
        Ok(Limits { min, max })
    }

    /// Reads a table type: an element [`RefType`] followed by its
    /// [`Limits`].
    pub fn read_table_type(&mut self) -> Result<TableType, Error> {
        let element = self.read_ref_type()?;
        let limits = self.read_limits()?;
        Ok(TableType { element, limits })
    }

    /// Reads a memory type: bare [`Limits`], in page units.
    pub fn read_memory_type(&mut self) -> Result<MemoryType, Error> {
        Ok(MemoryType { limits: self.read_limits()? })
    }

    /// Reads a global type: content [`ValType`] followed by a mutability
    /// flag byte (`0x00` immutable, `0x01` mutable).
    pub fn read_global_type(&mut self) -> Result<GlobalType, Error> {
        let content = self.read_val_type()?;
        let mutable = match self.read_u8()? {
            0x00 => false,
            0x01 => true,
            found => {
                return Err(Error::InvalidValType {
                    found,
                    offset: self.pos - 1,
                })
            }
        };
        Ok(GlobalType { content, mutable })
    }

    /// Reads an external (import/export) kind byte.
    pub fn read_external_kind(&mut self) -> Result<ExternalKind, Error> {
        let offset = self.pos;
        let byte = self.read_u8()?;
        ExternalKind::try_from(byte).map_err(|_| Error::InvalidExternalKind { found: byte, offset })
    }

    /// Reads a block type: `0x40` (empty), a single value type byte, or a
    /// signed 33-bit LEB128 type index, disambiguated by peeking the first
    /// byte before committing to either the single-byte or LEB128 form.
    ///
    /// This mirrors the grammar's genuine ambiguity: `0x40` and every
    /// value-type byte are themselves valid one-byte encodings of a
    /// (negative) signed LEB128 integer, so the peeked byte alone decides
    /// which interpretation applies before any bytes are consumed.
    pub fn read_block_type(&mut self) -> Result<BlockType, Error> {
        let offset = self.pos;
        let byte = self.peek_u8()?;
        match byte {
            0x40 => {
                self.pos += 1;
                Ok(BlockType::Empty)
            }
            _ if ValType::try_from(byte).is_ok() => {
                self.pos += 1;
                Ok(BlockType::Value(ValType::try_from(byte).unwrap()))
            }
            _ => {
                let index = self.read_s33()?;
                u32::try_from(index)
                    .map(BlockType::TypeIndex)
                    .map_err(|_| Error::InvalidBlockType { offset })
            }
        }
    }

    /// Reads a memory instruction's static operands: an alignment hint and
    /// byte offset, both as unsigned LEB128 integers.
    pub fn read_mem_arg(&mut self) -> Result<MemArg, Error> {
        let align = self.read_u32()?;
        let offset = self.read_u32()?;
        Ok(MemArg { align, offset })
    }

    /// Reads a length-prefixed vector, decoding each element with `f`.
    ///
    /// The declared count is capped against the remaining buffer length
    /// before any allocation happens, so a maliciously huge count cannot
    /// force an unbounded `Vec` allocation ahead of the read that would
    /// have failed anyway.
    pub fn read_vec<T>(
        &mut self,
        mut f: impl FnMut(&mut Reader<'a>) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let offset = self.pos;
        let count = self.read_u32()? as usize;
        if count > self.remaining() {
            return Err(Error::UnexpectedEnd { offset });
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }
}

/// LEB128 variable-length integer decoding.
///
/// Grounded on the teacher's `Leb128` trait: a width-parameterized
/// shift-accumulate loop that additionally validates the terminating
/// byte's unused high bits are all zero (unsigned) or a consistent sign
/// extension (signed), rather than silently masking them away.
mod leb128 {
    use super::Reader;
    use crate::error::Error;

    /// Decodes an unsigned LEB128 integer of at most `max_bits` bits,
    /// returned widened to `u64`.
    pub(super) fn read_unsigned(reader: &mut Reader<'_>, max_bits: u32) -> Result<u64, Error> {
        let start = reader.offset();
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = reader.read_u8()?;
            let low7 = u64::from(byte & 0x7f);
            if shift >= max_bits {
                return Err(Error::VarIntTooLarge { offset: start });
            }
            if shift + 7 >= max_bits {
                let unused_bits = shift + 7 - max_bits;
                let significant_mask = 0x7fu8 >> unused_bits;
                if byte & 0x7f & !significant_mask != 0 {
                    return Err(Error::VarIntTooLarge { offset: start });
                }
            }
            result |= low7 << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Decodes a signed LEB128 integer of at most `max_bits` bits,
    /// sign-extended into an `i64`.
    pub(super) fn read_signed(reader: &mut Reader<'_>, max_bits: u32) -> Result<i64, Error> {
        let start = reader.offset();
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = reader.read_u8()?;
            let low7 = i64::from(byte & 0x7f);
            if shift >= max_bits {
                return Err(Error::VarIntTooLarge { offset: start });
            }
            result |= low7 << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < max_bits && byte & 0x40 != 0 {
                    result |= -1i64 << shift;
                } else if shift >= max_bits {
                    let sign_bit_set = byte & 0x40 != 0;
                    let unused_bits = shift - max_bits;
                    let significant_mask = 0x7fu8 >> unused_bits << unused_bits;
                    let significant = byte & 0x7f & significant_mask;
                    let expected = if sign_bit_set { significant_mask } else { 0 };
                    if significant != expected {
                        return Err(Error::VarIntTooLarge { offset: start });
                    }
                }
                return Ok(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_small_unsigned_leb128() {
        let mut r = Reader::new(&[0x00]);
        assert_eq!(r.read_u32().unwrap(), 0);

        let mut r = Reader::new(&[0xe5, 0x8e, 0x26]);
        assert_eq!(r.read_u32().unwrap(), 624_485);
    }

    #[test]
    fn reads_signed_leb128_negative() {
        let mut r = Reader::new(&[0x7f]);
        assert_eq!(r.read_s32().unwrap(), -1);

        let mut r = Reader::new(&[0x9b, 0xf1, 0x59]);
        assert_eq!(r.read_s32().unwrap(), -624_485);
    }

    #[test]
    fn rejects_overlong_unsigned_u32() {
        // 5 bytes is the max for a 32-bit value; only the low 4 bits of the
        // final byte fall within the 32-bit budget, so `0x0f` is the
        // largest legal final byte and encodes u32::MAX.
        let mut r = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(r.read_u32().unwrap(), u32::MAX);

        // Bit 4 of the final byte is above the 4-bit remaining width.
        let mut r = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x1f]);
        assert!(matches!(r.read_u32(), Err(Error::VarIntTooLarge { .. })));

        let mut r = Reader::new(&[0xff, 0xff, 0xff, 0xff, 0x7f]);
        assert!(matches!(r.read_u32(), Err(Error::VarIntTooLarge { .. })));
    }

    #[test]
    fn rejects_truncated_leb128() {
        let mut r = Reader::new(&[0x80]);
        assert!(matches!(r.read_u32(), Err(Error::UnexpectedEnd { .. })));
    }

    #[test]
    fn reads_val_type_and_rejects_unknown() {
        let mut r = Reader::new(&[0x7f]);
        assert_eq!(r.read_val_type().unwrap(), ValType::I32);

        let mut r = Reader::new(&[0x00]);
        assert!(matches!(
            r.read_val_type(),
            Err(Error::InvalidValType { found: 0x00, .. })
        ));
    }

    #[test]
    fn reads_limits_both_forms() {
        let mut r = Reader::new(&[0x00, 0x01]);
        assert_eq!(r.read_limits().unwrap(), Limits { min: 1, max: None });

        let mut r = Reader::new(&[0x01, 0x01, 0x02]);
        assert_eq!(
            r.read_limits().unwrap(),
            Limits {
                min: 1,
                max: Some(2)
            }
        );
    }

    #[test]
    fn rejects_reserved_limits_flag() {
        let mut r = Reader::new(&[0x02, 0x00]);
        assert!(matches!(r.read_limits(), Err(Error::InvalidLimits { .. })));
    }

    #[test]
    fn reads_block_type_variants() {
        let mut r = Reader::new(&[0x40]);
        assert!(matches!(r.read_block_type().unwrap(), BlockType::Empty));

        let mut r = Reader::new(&[0x7f]);
        assert!(matches!(
            r.read_block_type().unwrap(),
            BlockType::Value(ValType::I32)
        ));

        let mut r = Reader::new(&[0x05]);
        assert!(matches!(
            r.read_block_type().unwrap(),
            BlockType::TypeIndex(5)
        ));
    }

    #[test]
    fn reads_name() {
        let mut r = Reader::new(&[0x03, b'f', b'o', b'o']);
        assert_eq!(r.read_name().unwrap(), "foo");
    }

    #[test]
    fn rejects_invalid_utf8_name() {
        let mut r = Reader::new(&[0x01, 0xff]);
        assert!(matches!(r.read_name(), Err(Error::InvalidUtf8 { .. })));
    }

    #[test]
    fn sub_reader_carves_exact_span() {
        let mut r = Reader::new(&[0x01, 0x02, 0x03, 0x04]);
        let mut sub = r.sub_reader(2).unwrap();
        assert_eq!(sub.read_u8().unwrap(), 0x01);
        assert_eq!(sub.read_u8().unwrap(), 0x02);
        assert!(sub.is_empty());
        assert_eq!(r.read_u8().unwrap(), 0x03);
    }

    /// Plain unsigned LEB128 encoder, used only to build round-trip test
    /// fixtures; the crate itself never needs to encode.
    fn encode_var_u64(mut v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    fn encode_var_i64(mut v: i64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
            if done {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn var_u32_round_trips_sampled_values() {
        for &v in &[0u32, 1, 127, 128, 300, 65_535, 624_485, u32::MAX / 2, u32::MAX] {
            let bytes = encode_var_u64(u64::from(v));
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_u32().unwrap(), v, "round-trip failed for {v}");
        }
    }

    #[test]
    fn var_u64_round_trips_sampled_values() {
        for &v in &[0u64, 1, 127, 128, u64::from(u32::MAX), u64::MAX / 2, u64::MAX] {
            let bytes = encode_var_u64(v);
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_u64().unwrap(), v, "round-trip failed for {v}");
        }
    }

    #[test]
    fn var_i32_round_trips_sampled_values() {
        for &v in &[0i32, 1, -1, 63, -64, 624_485, -624_485, i32::MIN, i32::MAX] {
            let bytes = encode_var_i64(i64::from(v));
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_s32().unwrap(), v, "round-trip failed for {v}");
        }
    }

    #[test]
    fn var_i64_round_trips_sampled_values() {
        for &v in &[0i64, 1, -1, 63, -64, i64::from(i32::MIN), i64::from(i32::MAX), i64::MIN, i64::MAX] {
            let bytes = encode_var_i64(v);
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_s64().unwrap(), v, "round-trip failed for {v}");
        }
    }

    #[test]
    fn f32_bit_exact_round_trip() {
        for &bits in &[0x0000_0000u32, 0x3f80_0000, 0xff80_0000, 0x7fc0_0000, u32::MAX] {
            let mut r = Reader::new(&bits.to_le_bytes());
            assert_eq!(r.read_f32().unwrap().to_bits(), bits);
        }
    }

    #[test]
    fn f64_bit_exact_round_trip() {
        for &bits in &[0x0000_0000_0000_0000u64, 0x3ff0_0000_0000_0000, u64::MAX] {
            let mut r = Reader::new(&bits.to_le_bytes());
            assert_eq!(r.read_f64().unwrap().to_bits(), bits);
        }
    }

    #[test]
    fn string_round_trips_valid_utf8() {
        for s in ["", "hello", "wasm \u{1F600}", "caf\u{e9}"] {
            let mut bytes = encode_var_u64(s.len() as u64);
            bytes.extend_from_slice(s.as_bytes());
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_name().unwrap(), s);
        }
    }
}
