// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! A lazy, event-driven parser and structural validator for the
//! WebAssembly 1.0 binary module format.
//!
//! [`Parser`] turns an in-memory byte buffer into an ordered,
//! pull-driven stream of [`Payload`] events, one per module section plus
//! the bookending `Version`/`End` events. It performs no allocation beyond
//! what each event's payload needs and never buffers the whole module.
//!
//! [`Validator`] is a thin consumer of that same event stream: it folds
//! over the events once and reports module-level structural defects
//! (duplicate sections, export-name collisions, out-of-range indices, and
//! the like) without re-decoding any bytes. Neither component interprets
//! instruction-level semantics; only the five opcodes legal inside a
//! constant initializer expression are ever decoded.
//!
//! ```
//! use wasmtap::Parser;
//!
//! let module = [
//!     0x00, 0x61, 0x73, 0x6d, // magic "\0asm"
//!     0x01, 0x00, 0x00, 0x00, // version 1
//! ];
//! let events: Result<Vec<_>, _> = Parser::new(&module).collect();
//! assert_eq!(events.unwrap().len(), 2); // [Version, End]
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod parser;
pub mod reader;
pub mod types;
pub mod validator;

pub use error::Error;
pub use parser::Parser;
pub use types::Payload;
pub use validator::{validate, ValidationError, ValidationReport};
