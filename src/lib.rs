//! VM-to-assembly translator for a 16-bit register/memory machine.
//!
//! Lowers stack VM code (.vm) to symbolic Hack assembly (.asm), the middle
//! stage between a high-level compiler and the assembler.
//!
//! # Usage Modes
//!
//! - Single file: `translate_file(path)` - no bootstrap prologue
//! - Directory: `translate_directory(path)` - bootstrap, then every unit

pub mod command;
pub mod error;
pub mod segment;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::classify_line;
pub use crate::error::{Result, TranslateError};
use crate::writer::CodeWriter;

/// Translate a single VM source string. Single-unit mode: no bootstrap.
///
/// `unit` is the input file stem; it namespaces static variables.
pub fn translate(source: &str, unit: &str) -> Result<String> {
    let mut writer = CodeWriter::new();
    writer.set_unit(unit);

    let mut errors = Vec::new();
    translate_unit(source, unit, &mut writer, &mut errors);

    finish(writer, errors)
}

/// Translate a single .vm file. The unit name is the file stem.
pub fn translate_file(path: &Path) -> Result<String> {
    let unit = unit_name(path);
    let source = read_source(path)?;
    translate(&source, &unit)
}

/// Translate every .vm file in a directory into one program.
///
/// Emits the bootstrap prologue (`SP = 256`, `call Sys.init 0`), then each
/// unit in sorted order. Non-recursive.
pub fn translate_directory(dir: &Path) -> Result<String> {
    let mut vm_files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| TranslateError::ReadFailed {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "vm"))
        .collect();

    if vm_files.is_empty() {
        return Err(TranslateError::NoVmFiles {
            path: dir.display().to_string(),
        });
    }

    vm_files.sort();

    let mut writer = CodeWriter::new();
    writer.bootstrap();

    let mut errors = Vec::new();
    for file in &vm_files {
        let unit = unit_name(file);
        let source = read_source(file)?;
        writer.set_unit(&unit);
        translate_unit(&source, &unit, &mut writer, &mut errors);
    }

    finish(writer, errors)
}

/// Classify and emit every line of one unit, accumulating structural errors.
fn translate_unit(
    source: &str,
    unit: &str,
    writer: &mut CodeWriter,
    errors: &mut Vec<TranslateError>,
) {
    for (idx, raw) in source.lines().enumerate() {
        match classify_line(raw, idx + 1, unit) {
            Ok(Some(cmd)) => writer.write_command(&cmd),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
}

/// Surface accumulated errors, reject empty programs, strip the trailing
/// line separator.
fn finish(writer: CodeWriter, errors: Vec<TranslateError>) -> Result<String> {
    if !errors.is_empty() {
        let report = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        return Err(TranslateError::Rejected { report });
    }

    let mut asm = writer.into_output();
    if asm.is_empty() {
        return Err(TranslateError::EmptyProgram);
    }
    asm.pop();
    Ok(asm)
}

fn unit_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| TranslateError::ReadFailed {
        path: path.display().to_string(),
        source: e,
    })
}

/// Output placement: `X.vm` -> `X.asm`; `dir/` -> `dir/dir.asm`.
pub fn output_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        let dir_name = input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        input.join(format!("{dir_name}.asm"))
    } else {
        input.with_extension("asm")
    }
}
