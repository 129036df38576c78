// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! A minimal illustrative consumer of the crate's event stream: reads a
//! module from the path given as the sole command-line argument and
//! prints one line per [`wasmtap::types::Payload`] event, followed by the
//! validator's report.

use std::env;
use std::fs;
use std::process::ExitCode;

use wasmtap::types::Payload;
use wasmtap::{validate, Parser};

fn main() -> ExitCode {
    let mut args = env::args_os();
    let _ = args.next();
    let Some(path) = args.next() else {
        eprintln!("usage: wasmtap-dump <module.wasm>");
        return ExitCode::FAILURE;
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("{}: {err}", path.to_string_lossy());
            return ExitCode::FAILURE;
        }
    };

    for payload in Parser::new(&bytes) {
        match payload {
            Ok(payload) => println!("{}", describe(&payload)),
            Err(err) => {
                eprintln!("parse error: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    let report = validate(&bytes);
    if report.is_valid() {
        println!("valid");
    } else {
        for error in &report.errors {
            println!("invalid: {error:?}");
        }
    }

    ExitCode::SUCCESS
}

fn describe(payload: &Payload<'_>) -> String {
    match payload {
        Payload::Version => "version".to_string(),
        Payload::TypeSection(types) => format!("type section: {} entries", types.len()),
        Payload::ImportSection(imports) => format!("import section: {} entries", imports.len()),
        Payload::FunctionSection(funcs) => format!("function section: {} entries", funcs.len()),
        Payload::TableSection(tables) => format!("table section: {} entries", tables.len()),
        Payload::MemorySection(mems) => format!("memory section: {} entries", mems.len()),
        Payload::GlobalSection(globals) => format!("global section: {} entries", globals.len()),
        Payload::ExportSection(exports) => format!("export section: {} entries", exports.len()),
        Payload::StartSection(idx) => format!("start section: function {idx}"),
        Payload::ElementSection(elems) => format!("element section: {} entries", elems.len()),
        Payload::CodeSection(bodies) => format!("code section: {} entries", bodies.len()),
        Payload::DataSection(data) => format!("data section: {} entries", data.len()),
        Payload::DataCountSection(count) => format!("data count section: {count}"),
        Payload::CustomSection(custom) => {
            format!("custom section: {:?} ({} bytes)", custom.name, custom.payload.len())
        }
        Payload::End => "end".to_string(),
    }
}
