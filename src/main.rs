//! vm2asm CLI.
//!
//! ```bash
//! # Single file, no bootstrap
//! vm2asm SimpleAdd.vm
//!
//! # Directory, with bootstrap
//! vm2asm FibonacciElement/
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use vm2asm::{TranslateError, output_path, translate_directory, translate_file};

#[derive(Parser, Debug)]
#[command(name = "vm2asm")]
#[command(version)]
#[command(about = "Stack VM to Hack assembly translator")]
struct Args {
    /// Input .vm file or directory of .vm files
    #[arg(value_name = "PATH")]
    input: PathBuf,

    /// Show detailed output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args.input, args.verbose) {
        Ok(output) => {
            println!("{}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(input: &Path, verbose: bool) -> Result<PathBuf, TranslateError> {
    let asm = if input.is_dir() {
        if verbose {
            list_units(input)?;
            eprintln!("Emitting bootstrap (SP = 256, call Sys.init 0)");
        }
        translate_directory(input)?
    } else if input.extension().is_some_and(|ext| ext == "vm") {
        if verbose {
            eprintln!("Translating single file: {}", input.display());
        }
        translate_file(input)?
    } else {
        return Err(TranslateError::InvalidInput {
            path: input.display().to_string(),
        });
    };

    let output = output_path(input);
    fs::write(&output, &asm).map_err(|e| TranslateError::WriteFailed {
        path: output.display().to_string(),
        source: e,
    })?;

    if verbose {
        eprintln!("Generated {} lines of assembly", asm.lines().count());
    }

    Ok(output)
}

fn list_units(dir: &Path) -> Result<(), TranslateError> {
    let entries = fs::read_dir(dir).map_err(|e| TranslateError::ReadFailed {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut vm_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "vm"))
        .collect();
    vm_files.sort();

    eprintln!("Found {} .vm files in {}:", vm_files.len(), dir.display());
    for f in &vm_files {
        eprintln!("  - {}", f.file_name().unwrap_or_default().to_string_lossy());
    }
    Ok(())
}
