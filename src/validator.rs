// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Module-level structural validation.
//!
//! [`validate`] folds once over a [`Parser`]'s event stream and reports
//! every structural defect it finds — it never re-decodes a byte, and it
//! never interprets instruction-level semantics (a function body's code
//! bytes are opaque to it). This is deliberately weaker than full
//! WebAssembly validation: a module can pass here and still be rejected by
//! a real embedder's type-checker.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::parser::Parser;
use crate::types::{ImportDescriptor, Limits, Payload, SectionId};

/// The page-space cap: both bounds of a memory or table's [`Limits`] must
/// be at most this many pages/elements.
const MAX_PAGE_SPACE: u32 = 65_536;

/// The cap on a function type's parameter or result arity.
const MAX_TYPE_ARITY: usize = 1_000;

/// A single structural defect found while validating a module.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// A singleton section id appeared more than once.
    DuplicateSection(SectionId),
    /// A function type's parameter or result count exceeded
    /// [`MAX_TYPE_ARITY`].
    TypeArityTooLarge,
    /// Two exports share the same externally visible name.
    DuplicateExport(String),
    /// A memory or table's `Limits` violated `max >= min` or the
    /// page-space cap.
    InvalidLimits(Limits),
    /// Both the Function and Code sections were present but declared
    /// different entry counts.
    FunctionCodeCountMismatch { functions: u32, code: u32 },
    /// The Function section declared one or more functions but no Code
    /// section was present.
    MissingCodeSection,
    /// The Code section declared one or more bodies but no Function
    /// section was present.
    MissingFunctionSection,
    /// The Start section named a function outside the function index
    /// space (imported function count plus declared Function section
    /// count).
    StartFunctionOutOfBounds { index: u32, function_count: u32 },
    /// Both the DataCount and Data sections were present but declared
    /// different segment counts.
    DataCountMismatch { declared: u32, actual: u32 },
    /// Parsing itself failed; folding stopped at the point of failure.
    ParseError(String),
}

/// The outcome of validating a module: every [`ValidationError`] found, in
/// the order encountered.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    /// The defects found, in encounter order. Empty means the module is
    /// structurally well-formed.
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Whether the module has no structural defects.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn check_limits(limits: &Limits, errors: &mut Vec<ValidationError>) {
    let bounds_ok = limits.min <= MAX_PAGE_SPACE
        && match limits.max {
            Some(max) => max <= MAX_PAGE_SPACE && max >= limits.min,
            None => true,
        };
    if !bounds_ok {
        errors.push(ValidationError::InvalidLimits(*limits));
    }
}

/// Parses and structurally validates `buf` in a single pass.
///
/// Folds the event stream exactly once. If parsing itself fails partway
/// through, folding stops at that point and the failure is recorded as
/// [`ValidationError::ParseError`] alongside whatever structural findings
/// were already accumulated; it never re-decodes bytes to recover further
/// findings.
pub fn validate(buf: &[u8]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen_sections: BTreeSet<SectionId> = BTreeSet::new();
    let mut exported_names: BTreeSet<String> = BTreeSet::new();

    let mut function_count: Option<u32> = None;
    let mut code_count: Option<u32> = None;
    let mut imported_function_count: u32 = 0;
    let mut start_index: Option<u32> = None;
    let mut data_count: Option<u32> = None;
    let mut data_segment_count: Option<u32> = None;

    for payload in Parser::new(buf) {
        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                report
                    .errors
                    .push(ValidationError::ParseError(format!("{err}")));
                break;
            }
        };

        if let Some(id) = payload.section_id() {
            if id != SectionId::Custom && !seen_sections.insert(id) {
                report.errors.push(ValidationError::DuplicateSection(id));
            }
        }

        match &payload {
            Payload::TypeSection(types) => {
                for ty in types {
                    if ty.params.len() > MAX_TYPE_ARITY || ty.results.len() > MAX_TYPE_ARITY {
                        report.errors.push(ValidationError::TypeArityTooLarge);
                    }
                }
            }
            Payload::ImportSection(imports) => {
                for import in imports {
                    match &import.descriptor {
                        ImportDescriptor::Function(_) => imported_function_count += 1,
                        ImportDescriptor::Table(table) => {
                            check_limits(&table.limits, &mut report.errors);
                        }
                        ImportDescriptor::Memory(memory) => {
                            check_limits(&memory.limits, &mut report.errors);
                        }
                        ImportDescriptor::Global(_) => {}
                    }
                }
            }
            Payload::FunctionSection(type_indices) => {
                function_count = Some(type_indices.len() as u32);
            }
            Payload::TableSection(tables) => {
                for table in tables {
                    check_limits(&table.limits, &mut report.errors);
                }
            }
            Payload::MemorySection(memories) => {
                for memory in memories {
                    check_limits(&memory.limits, &mut report.errors);
                }
            }
            Payload::ExportSection(exports) => {
                for export in exports {
                    if !exported_names.insert(export.name.clone()) {
                        report
                            .errors
                            .push(ValidationError::DuplicateExport(export.name.clone()));
                    }
                }
            }
            Payload::StartSection(idx) => start_index = Some(*idx),
            Payload::CodeSection(bodies) => {
                code_count = Some(bodies.len() as u32);
            }
            Payload::DataSection(segments) => {
                data_segment_count = Some(segments.len() as u32);
            }
            Payload::DataCountSection(count) => {
                data_count = Some(*count);
            }
            Payload::GlobalSection(_)
            | Payload::ElementSection(_)
            | Payload::Version
            | Payload::CustomSection(_)
            | Payload::End => {}
        }
    }

    match (function_count, code_count) {
        (Some(functions), Some(code)) if functions != code => {
            report
                .errors
                .push(ValidationError::FunctionCodeCountMismatch { functions, code });
        }
        (Some(functions), None) if functions > 0 => {
            report.errors.push(ValidationError::MissingCodeSection);
        }
        (None, Some(code)) if code > 0 => {
            report.errors.push(ValidationError::MissingFunctionSection);
        }
        _ => {}
    }

    if let Some(index) = start_index {
        let function_space = imported_function_count + function_count.unwrap_or(0);
        if index >= function_space {
            report.errors.push(ValidationError::StartFunctionOutOfBounds {
                index,
                function_count: function_space,
            });
        }
    }

    if let (Some(declared), Some(actual)) = (data_count, data_segment_count) {
        if declared != actual {
            report
                .errors
                .push(ValidationError::DataCountMismatch { declared, actual });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn header() -> Vec<u8> {
        vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00]
    }

    fn module_with_sections(sections: &[u8]) -> Vec<u8> {
        let mut buf = header();
        buf.extend_from_slice(sections);
        buf
    }

    #[test]
    fn minimal_module_is_valid() {
        let module = header();
        assert!(validate(&module).is_valid());
    }

    #[test]
    fn empty_type_section_is_valid() {
        let module = module_with_sections(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        assert!(validate(&module).is_valid());
    }

    #[test]
    fn function_code_count_mismatch_is_reported() {
        // S6: one declared function, two code bodies.
        let type_section = [0x01u8, 0x04, 0x01, 0x60, 0x00, 0x00];
        let func_section = [0x03u8, 0x03, 0x02, 0x00, 0x00];
        let code_section = [0x0au8, 0x04, 0x01, 0x02, 0x00, 0x0b];
        let mut all = type_section.to_vec();
        all.extend_from_slice(&func_section);
        all.extend_from_slice(&code_section);
        let module = module_with_sections(&all);
        let report = validate(&module);
        assert!(report
            .errors
            .contains(&ValidationError::FunctionCodeCountMismatch { functions: 2, code: 1 }));
    }

    #[test]
    fn duplicate_export_name_is_reported() {
        // S7: two exports both named "a".
        let type_section = [0x01u8, 0x04, 0x01, 0x60, 0x00, 0x00];
        let export_section = [
            0x07u8, 0x09, 0x02, 0x01, b'a', 0x00, 0x00, 0x01, b'a', 0x00, 0x00,
        ];
        let mut all = type_section.to_vec();
        all.extend_from_slice(&export_section);
        let module = module_with_sections(&all);
        let report = validate(&module);
        assert!(report
            .errors
            .contains(&ValidationError::DuplicateExport("a".into())));
    }

    #[test]
    fn duplicate_section_is_reported() {
        let module = module_with_sections(&[0x01, 0x01, 0x00, 0x01, 0x01, 0x00]);
        let report = validate(&module);
        assert!(report
            .errors
            .contains(&ValidationError::DuplicateSection(SectionId::Type)));
    }

    #[test]
    fn start_function_out_of_range_is_reported() {
        let module = module_with_sections(&[0x08, 0x01, 0x00]);
        let report = validate(&module);
        assert!(report.errors.contains(&ValidationError::StartFunctionOutOfBounds {
            index: 0,
            function_count: 0
        }));
    }

    #[test]
    fn invalid_memory_limits_are_reported() {
        // memory section: 1 entry, flags=1 (has max), min=2, max=1 (max < min)
        let module = module_with_sections(&[0x05, 0x04, 0x01, 0x01, 0x02, 0x01]);
        let report = validate(&module);
        assert!(report.errors.iter().any(|e| matches!(e, ValidationError::InvalidLimits(_))));
    }

    #[test]
    fn data_count_mismatch_is_reported() {
        // DataCount section declares 2 segments, Data section declares 0.
        let data_count_section = [0x0cu8, 0x01, 0x02];
        let data_section = [0x0bu8, 0x01, 0x00];
        let mut all = data_count_section.to_vec();
        all.extend_from_slice(&data_section);
        let module = module_with_sections(&all);
        let report = validate(&module);
        assert!(report.errors.contains(&ValidationError::DataCountMismatch {
            declared: 2,
            actual: 0
        }));
    }

    #[test]
    fn validating_twice_yields_equal_reports() {
        let type_section = [0x01u8, 0x04, 0x01, 0x60, 0x00, 0x00];
        let module = module_with_sections(&type_section);
        let first = validate(&module);
        let second = validate(&module);
        assert_eq!(first.errors, second.errors);
    }

    #[test]
    fn inserting_custom_section_leaves_validity_unchanged() {
        let type_section = [0x01u8, 0x04, 0x01, 0x60, 0x00, 0x00];
        let without_custom = module_with_sections(&type_section);

        let custom_section = [0x00u8, 0x05, 0x02, b'h', b'i', 0xaa, 0xbb];
        let mut with_custom = type_section.to_vec();
        with_custom.extend_from_slice(&custom_section);
        let with_custom = module_with_sections(&with_custom);

        assert_eq!(
            validate(&without_custom).is_valid(),
            validate(&with_custom).is_valid()
        );
    }

    #[test]
    fn bad_magic_is_reported_as_parse_error() {
        let module = [0x00, 0x62, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        let report = validate(&module);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(
            |e| matches!(e, ValidationError::ParseError(msg) if msg.contains("magic"))
        ));
    }
}
