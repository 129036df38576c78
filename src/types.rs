// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! WebAssembly type and event definitions.
//!
//! These are pure value types: entities own whatever allocations they
//! carry, and `Payload`'s borrowed fields (`Custom`/`Data`/`Code` payloads)
//! borrow directly from the input buffer for the lifetime of the event.

use alloc::string::String;
use alloc::vec::Vec;

use num_enum::TryFromPrimitive;

/// Value types classify the individual values that WebAssembly code
/// computes with and the values a global or local variable accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum ValType {
    /// 32-bit integer.
    I32 = 0x7f,
    /// 64-bit integer.
    I64 = 0x7e,
    /// 32-bit IEEE 754 float.
    F32 = 0x7d,
    /// 64-bit IEEE 754 float.
    F64 = 0x7c,
    /// 128-bit SIMD vector.
    V128 = 0x7b,
    /// Function reference.
    FuncRef = 0x70,
    /// External (host) reference.
    ExternRef = 0x6f,
}

/// The subset of [`ValType`] that classifies references, used to type
/// table elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum RefType {
    /// Function reference.
    Func = 0x70,
    /// External (host) reference.
    Extern = 0x6f,
}

impl From<RefType> for ValType {
    fn from(reftype: RefType) -> Self {
        match reftype {
            RefType::Func => ValType::FuncRef,
            RefType::Extern => ValType::ExternRef,
        }
    }
}

/// The size range of a resizable memory (in pages) or table (in elements).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Minimum size.
    pub min: u32,
    /// Maximum size, or `None` if unbounded.
    pub max: Option<u32>,
}

/// The signature of a function: an ordered sequence of parameter types
/// mapped to an ordered sequence of result types.
#[derive(Clone, Debug)]
pub struct FuncType {
    /// Parameter types, in declared order.
    pub params: Vec<ValType>,
    /// Result types, in declared order.
    pub results: Vec<ValType>,
}

/// A table's element type and size limits.
#[derive(Clone, Copy, Debug)]
pub struct TableType {
    /// The type of reference the table holds.
    pub element: RefType,
    /// The table's size limits, in elements.
    pub limits: Limits,
}

/// A linear memory's size limits, in 64 KiB pages.
#[derive(Clone, Copy, Debug)]
pub struct MemoryType {
    /// The memory's size limits, in pages.
    pub limits: Limits,
}

/// A global variable's content type and mutability.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GlobalType {
    /// The type of value the global holds.
    pub content: ValType,
    /// Whether the global may be mutated after module instantiation.
    pub mutable: bool,
}

/// The type of value a block (`block`/`loop`/`if`) instruction produces.
#[derive(Clone, Copy, Debug)]
pub enum BlockType {
    /// Produces no value.
    Empty,
    /// Produces a single value of the given type.
    Value(ValType),
    /// Produces the results of the function type at this index in the
    /// module's type section.
    TypeIndex(u32),
}

/// The static operands of a memory instruction: an alignment hint and a
/// byte offset.
#[derive(Clone, Copy, Debug)]
pub struct MemArg {
    /// Alignment hint, as a power-of-two exponent.
    pub align: u32,
    /// Constant byte offset added to the dynamic address operand.
    pub offset: u32,
}

/// The kind of entity an import or export refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum ExternalKind {
    /// A function.
    Function = 0,
    /// A table.
    Table = 1,
    /// A linear memory.
    Memory = 2,
    /// A global variable.
    Global = 3,
}

/// The kind-dispatched descriptor of an imported entity, carrying a typed
/// payload rather than a bare index for every kind (see the module's Open
/// Question resolution in `SPEC_FULL.md`).
#[derive(Clone, Copy, Debug)]
pub enum ImportDescriptor {
    /// Imported function, naming an index into the module's type section.
    Function(u32),
    /// Imported table, with its full type.
    Table(TableType),
    /// Imported memory, with its full type.
    Memory(MemoryType),
    /// Imported global, with its full type.
    Global(GlobalType),
}

impl ImportDescriptor {
    /// The kind of entity this descriptor imports.
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDescriptor::Function(_) => ExternalKind::Function,
            ImportDescriptor::Table(_) => ExternalKind::Table,
            ImportDescriptor::Memory(_) => ExternalKind::Memory,
            ImportDescriptor::Global(_) => ExternalKind::Global,
        }
    }
}

/// A single entry of the Import section.
#[derive(Clone, Debug)]
pub struct Import {
    /// Name of the module being imported from.
    pub module: String,
    /// Name of the field within that module.
    pub field: String,
    /// The kind-dispatched descriptor of the imported entity.
    pub descriptor: ImportDescriptor,
}

/// The kind-dispatched descriptor of an exported entity.
#[derive(Clone, Copy, Debug)]
pub enum ExportDescriptor {
    /// Exported function, by function index.
    Function(u32),
    /// Exported table, by table index.
    Table(u32),
    /// Exported memory, by memory index.
    Memory(u32),
    /// Exported global, by global index.
    Global(u32),
}

impl ExportDescriptor {
    /// The kind of entity this descriptor exports.
    pub fn kind(&self) -> ExternalKind {
        match self {
            ExportDescriptor::Function(_) => ExternalKind::Function,
            ExportDescriptor::Table(_) => ExternalKind::Table,
            ExportDescriptor::Memory(_) => ExternalKind::Memory,
            ExportDescriptor::Global(_) => ExternalKind::Global,
        }
    }

    /// The index this descriptor names, within whatever index space its
    /// `kind()` selects.
    pub fn index(&self) -> u32 {
        match *self {
            ExportDescriptor::Function(idx)
            | ExportDescriptor::Table(idx)
            | ExportDescriptor::Memory(idx)
            | ExportDescriptor::Global(idx) => idx,
        }
    }
}

/// A single entry of the Export section.
#[derive(Clone, Debug)]
pub struct Export {
    /// The externally visible name.
    pub name: String,
    /// The kind-dispatched descriptor of the exported entity.
    pub descriptor: ExportDescriptor,
}

/// One operator of a constant initializer expression. Only the five
/// producing operators legal inside Global/Element/Data initializers (plus
/// the terminating `End`) are ever decoded; no other opcode is legal here.
#[derive(Clone, Copy, Debug)]
pub enum ConstOperator {
    /// `i32.const`.
    I32Const(i32),
    /// `i64.const`.
    I64Const(i64),
    /// `f32.const`, as the bit-cast IEEE 754 value.
    F32Const(f32),
    /// `f64.const`, as the bit-cast IEEE 754 value.
    F64Const(f64),
    /// `global.get`, naming the index of an (necessarily immutable,
    /// necessarily-imported in the MVP) global.
    GlobalGet(u32),
    /// The terminator of the initializer.
    End,
}

/// A constant initializer expression: an ordered sequence of
/// [`ConstOperator`]s ending with `End`.
#[derive(Clone, Debug, Default)]
pub struct ConstExpr {
    /// The operators, in source order, including the trailing `End`.
    pub operators: Vec<ConstOperator>,
}

/// A single entry of the Global section.
#[derive(Clone, Debug)]
pub struct GlobalEntry {
    /// The global's type.
    pub ty: GlobalType,
    /// The expression that computes its initial value.
    pub init: ConstExpr,
}

/// A single entry of the Element section (MVP form: an active segment
/// naming a table, an offset, and the function indices it installs).
#[derive(Clone, Debug)]
pub struct ElementSegment {
    /// Index of the table this segment initializes.
    pub table_index: u32,
    /// Expression computing the starting offset within the table.
    pub offset: ConstExpr,
    /// The function indices installed starting at `offset`, in order.
    pub func_indices: Vec<u32>,
}

/// A single entry of the Data section (MVP form: an active segment naming
/// a memory, an offset, and its raw initializer bytes).
#[derive(Clone, Debug)]
pub struct DataSegment<'a> {
    /// Index of the memory this segment initializes.
    pub memory_index: u32,
    /// Expression computing the starting offset within the memory.
    pub offset: ConstExpr,
    /// The raw bytes written starting at `offset`, borrowed from the input
    /// buffer.
    pub init: &'a [u8],
}

/// One run of local variables declared at the head of a function body, all
/// sharing a single type.
#[derive(Clone, Copy, Debug)]
pub struct LocalEntry {
    /// Number of locals in this run.
    pub count: u32,
    /// The shared type of every local in this run.
    pub ty: ValType,
}

/// A single entry of the Code section.
#[derive(Clone, Debug)]
pub struct FunctionBody<'a> {
    /// The function's local-variable declarations, in order.
    pub locals: Vec<LocalEntry>,
    /// The uninterpreted instruction bytes following the locals, borrowed
    /// from the input buffer. The parser does not decode these; only code
    /// that consumes `CodeSection` events interprets them further.
    pub code: &'a [u8],
}

/// A Custom section: an arbitrary name and an uninterpreted payload.
#[derive(Clone, Debug)]
pub struct CustomSection<'a> {
    /// The section's declared name.
    pub name: String,
    /// The remainder of the section body, borrowed from the input buffer.
    pub payload: &'a [u8],
}

/// The one-byte identifier of a module section.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, TryFromPrimitive)]
#[repr(u8)]
pub enum SectionId {
    /// Custom section: not subject to ordering or duplicate checks.
    Custom = 0,
    /// Type section.
    Type = 1,
    /// Import section.
    Import = 2,
    /// Function section.
    Function = 3,
    /// Table section.
    Table = 4,
    /// Memory section.
    Memory = 5,
    /// Global section.
    Global = 6,
    /// Export section.
    Export = 7,
    /// Start section.
    Start = 8,
    /// Element section.
    Element = 9,
    /// Code section.
    Code = 10,
    /// Data section.
    Data = 11,
    /// DataCount section.
    DataCount = 12,
}

/// One event yielded by [`crate::Parser`]'s iterator.
///
/// This is a closed variant set by design: a caller matching on `Payload`
/// is forced by the compiler to handle every section kind the format
/// defines, rather than silently ignoring one.
#[derive(Clone, Debug)]
pub enum Payload<'a> {
    /// Emitted once, after the magic and version have been verified.
    Version,
    /// The Type section's decoded function types.
    TypeSection(Vec<FuncType>),
    /// The Import section's decoded entries.
    ImportSection(Vec<Import>),
    /// The Function section's declared type indices, one per defined
    /// function, in order.
    FunctionSection(Vec<u32>),
    /// The Table section's decoded table types.
    TableSection(Vec<TableType>),
    /// The Memory section's decoded memory types.
    MemorySection(Vec<MemoryType>),
    /// The Global section's decoded entries.
    GlobalSection(Vec<GlobalEntry>),
    /// The Export section's decoded entries.
    ExportSection(Vec<Export>),
    /// The Start section's function index.
    StartSection(u32),
    /// The Element section's decoded segments.
    ElementSection(Vec<ElementSegment>),
    /// The Code section's decoded function bodies.
    CodeSection(Vec<FunctionBody<'a>>),
    /// The Data section's decoded segments.
    DataSection(Vec<DataSegment<'a>>),
    /// The DataCount section's declared segment count.
    DataCountSection(u32),
    /// A Custom section. May appear any number of times, anywhere in the
    /// module, and is never subject to duplicate-section checks.
    CustomSection(CustomSection<'a>),
    /// Emitted once, after the last byte of the module has been consumed.
    End,
}

impl Payload<'_> {
    /// The section id this event corresponds to, or `None` for the
    /// bookending `Version`/`End` events.
    pub fn section_id(&self) -> Option<SectionId> {
        Some(match self {
            Payload::Version | Payload::End => return None,
            Payload::TypeSection(_) => SectionId::Type,
            Payload::ImportSection(_) => SectionId::Import,
            Payload::FunctionSection(_) => SectionId::Function,
            Payload::TableSection(_) => SectionId::Table,
            Payload::MemorySection(_) => SectionId::Memory,
            Payload::GlobalSection(_) => SectionId::Global,
            Payload::ExportSection(_) => SectionId::Export,
            Payload::StartSection(_) => SectionId::Start,
            Payload::ElementSection(_) => SectionId::Element,
            Payload::CodeSection(_) => SectionId::Code,
            Payload::DataSection(_) => SectionId::Data,
            Payload::DataCountSection(_) => SectionId::DataCount,
            Payload::CustomSection(_) => SectionId::Custom,
        })
    }
}
