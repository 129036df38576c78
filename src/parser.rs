// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! The lazy, pull-driven event stream over a WebAssembly module buffer.

use alloc::vec::Vec;

use crate::error::Error;
use crate::reader::Reader;
use crate::types::{
    ConstExpr, ConstOperator, CustomSection, DataSegment, ElementSegment, Export,
    ExportDescriptor, ExternalKind, FuncType, FunctionBody, GlobalEntry, Import,
    ImportDescriptor, LocalEntry, Payload, SectionId,
};

const MAGIC: u32 = 0x6d73_6100; // "\0asm", read as a little-endian u32.
const VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// No bytes have been consumed yet; the next `next()` call reads and
    /// verifies the magic and version, emitting `Payload::Version`.
    NotStarted,
    /// The magic/version is behind us; each `next()` call decodes one more
    /// section, or emits `Payload::End` and transitions to `Done` once the
    /// buffer is exhausted.
    InSections,
    /// The stream is finished. Every subsequent call to `next()` returns
    /// `None`.
    Done,
}

/// A lazy, event-driven parser over an in-memory WebAssembly module buffer.
///
/// `Parser` implements `Iterator<Item = Result<Payload<'a>, Error>>`: each
/// call to `next()` decodes exactly one more section (or the bookending
/// `Version`/`End` events) and returns immediately, rather than decoding
/// the whole module up front. Once an item is `Err`, the stream is
/// considered exhausted; `next()` returns `None` on every subsequent call.
#[derive(Debug)]
pub struct Parser<'a> {
    reader: Reader<'a>,
    state: State,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `buf`, which must begin with the module's
    /// magic and version (verified lazily, on the first call to `next()`).
    pub fn new(buf: &'a [u8]) -> Self {
        Parser {
            reader: Reader::new(buf),
            state: State::NotStarted,
        }
    }

    /// The byte offset the parser has reached within the original buffer.
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    fn read_header(&mut self) -> Result<Payload<'a>, Error> {
        let magic = self.reader.read_bytes(4)?;
        let magic = u32::from_le_bytes(magic.try_into().unwrap());
        if magic != MAGIC {
            return Err(Error::InvalidMagic { found: magic });
        }
        let version = self.reader.read_bytes(4)?;
        let version = u32::from_le_bytes(version.try_into().unwrap());
        if version != VERSION {
            return Err(Error::UnsupportedVersion { found: version });
        }
        Ok(Payload::Version)
    }

    fn read_section(&mut self) -> Result<Payload<'a>, Error> {
        let id_offset = self.reader.offset();
        let id_byte = self.reader.read_u8()?;
        let id = SectionId::try_from(id_byte)
            .map_err(|_| Error::UnknownSection { found: id_byte, offset: id_offset })?;
        let len = self.reader.read_u32()?;
        let mut body = self.reader.sub_reader(len as usize)?;

        let payload = decode_section_body(id, &mut body)?;

        if !body.is_empty() {
            return Err(Error::SectionSizeMismatch {
                id,
                expected: len,
                actual: len - body.remaining() as u32,
            });
        }
        Ok(payload)
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Payload<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::NotStarted => {
                let result = self.read_header();
                match result {
                    Ok(payload) => {
                        self.state = State::InSections;
                        Some(Ok(payload))
                    }
                    Err(err) => {
                        self.state = State::Done;
                        Some(Err(err))
                    }
                }
            }
            State::InSections => {
                if self.reader.is_empty() {
                    self.state = State::Done;
                    return Some(Ok(Payload::End));
                }
                let result = self.read_section();
                if result.is_err() {
                    self.state = State::Done;
                }
                Some(result)
            }
            State::Done => None,
        }
    }
}

fn decode_section_body<'a>(id: SectionId, r: &mut Reader<'a>) -> Result<Payload<'a>, Error> {
    Ok(match id {
        SectionId::Custom => Payload::CustomSection(decode_custom_section(r)?),
        SectionId::Type => Payload::TypeSection(r.read_vec(decode_func_type)?),
        SectionId::Import => Payload::ImportSection(r.read_vec(decode_import)?),
        SectionId::Function => Payload::FunctionSection(r.read_vec(Reader::read_u32)?),
        SectionId::Table => Payload::TableSection(r.read_vec(Reader::read_table_type)?),
        SectionId::Memory => Payload::MemorySection(r.read_vec(Reader::read_memory_type)?),
        SectionId::Global => Payload::GlobalSection(r.read_vec(decode_global_entry)?),
        SectionId::Export => Payload::ExportSection(r.read_vec(decode_export)?),
        SectionId::Start => Payload::StartSection(r.read_u32()?),
        SectionId::Element => Payload::ElementSection(r.read_vec(decode_element_segment)?),
        SectionId::Code => Payload::CodeSection(r.read_vec(decode_function_body)?),
        SectionId::Data => Payload::DataSection(r.read_vec(decode_data_segment)?),
        SectionId::DataCount => Payload::DataCountSection(r.read_u32()?),
    })
}

fn decode_custom_section<'a>(r: &mut Reader<'a>) -> Result<CustomSection<'a>, Error> {
    let name = r.read_name()?;
    let payload = r.read_bytes(r.remaining())?;
    Ok(CustomSection { name, payload })
}

fn decode_func_type(r: &mut Reader<'_>) -> Result<FuncType, Error> {
    let offset = r.offset();
    let tag = r.read_u8()?;
    if tag != 0x60 {
        return Err(Error::InvalidFuncTypeTag { found: tag, offset });
    }
    let params = r.read_vec(Reader::read_val_type)?;
    let results = r.read_vec(Reader::read_val_type)?;
    Ok(FuncType { params, results })
}

fn decode_import(r: &mut Reader<'_>) -> Result<Import, Error> {
    let module = r.read_name()?;
    let field = r.read_name()?;
    let kind = r.read_external_kind()?;
    let descriptor = match kind {
        ExternalKind::Function => ImportDescriptor::Function(r.read_u32()?),
        ExternalKind::Table => ImportDescriptor::Table(r.read_table_type()?),
        ExternalKind::Memory => ImportDescriptor::Memory(r.read_memory_type()?),
        ExternalKind::Global => ImportDescriptor::Global(r.read_global_type()?),
    };
    Ok(Import { module, field, descriptor })
}

fn decode_global_entry(r: &mut Reader<'_>) -> Result<GlobalEntry, Error> {
    let ty = r.read_global_type()?;
    let init = decode_const_expr(r)?;
    Ok(GlobalEntry { ty, init })
}

fn decode_export(r: &mut Reader<'_>) -> Result<Export, Error> {
    let name = r.read_name()?;
    let kind = r.read_external_kind()?;
    let index = r.read_u32()?;
    let descriptor = match kind {
        ExternalKind::Function => ExportDescriptor::Function(index),
        ExternalKind::Table => ExportDescriptor::Table(index),
        ExternalKind::Memory => ExportDescriptor::Memory(index),
        ExternalKind::Global => ExportDescriptor::Global(index),
    };
    Ok(Export { name, descriptor })
}

fn decode_element_segment(r: &mut Reader<'_>) -> Result<ElementSegment, Error> {
    let table_index = r.read_u32()?;
    let offset = decode_const_expr(r)?;
    let func_indices = r.read_vec(Reader::read_u32)?;
    Ok(ElementSegment { table_index, offset, func_indices })
}

fn decode_function_body<'a>(r: &mut Reader<'a>) -> Result<FunctionBody<'a>, Error> {
    let size = r.read_u32()?;
    let mut body = r.sub_reader(size as usize)?;
    let locals = body.read_vec(|r| {
        let count = r.read_u32()?;
        let ty = r.read_val_type()?;
        Ok(LocalEntry { count, ty })
    })?;
    let code = body.read_bytes(body.remaining())?;
    Ok(FunctionBody { locals, code })
}

fn decode_data_segment<'a>(r: &mut Reader<'a>) -> Result<DataSegment<'a>, Error> {
    let memory_index = r.read_u32()?;
    let offset = decode_const_expr(r)?;
    let len = r.read_u32()?;
    let init = r.read_bytes(len as usize)?;
    Ok(DataSegment { memory_index, offset, init })
}

/// Decodes a constant initializer expression: a sequence of the five
/// producing opcodes legal inside Global/Element/Data initializers,
/// terminated by `end` (`0x0b`). No other opcode is legal here; full
/// instruction decoding is out of scope.
fn decode_const_expr(r: &mut Reader<'_>) -> Result<ConstExpr, Error> {
    let mut operators = Vec::new();
    loop {
        let offset = r.offset();
        let opcode = r.read_u8()?;
        let operator = match opcode {
            0x41 => ConstOperator::I32Const(r.read_s32()?),
            0x42 => ConstOperator::I64Const(r.read_s64()?),
            0x43 => ConstOperator::F32Const(r.read_f32()?),
            0x44 => ConstOperator::F64Const(r.read_f64()?),
            0x23 => ConstOperator::GlobalGet(r.read_u32()?),
            0x0b => ConstOperator::End,
            found => return Err(Error::InvalidOpcode { found, offset }),
        };
        let is_end = matches!(operator, ConstOperator::End);
        operators.push(operator);
        if is_end {
            return Ok(ConstExpr { operators });
        }
    }
}
