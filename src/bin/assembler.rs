//! Assembly to encoded program compiler CLI.
//!
//! Reads an assembly source file and writes the encoded program text the runner loads with
//! `--encoded`.
//!
//! # Usage
//! ```text
//! assembler <input.asm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `input.asm`: Assembly source file to compile
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.tcp`)
//! - `--listing`: Log the decoded instructions with their source lines
//!
//! # Examples
//! ```text
//! assembler program.asm
//! assembler program.asm -o output.tcp
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tinycpu::virtual_machine::assembler::{assemble_source, render_assembly_diagnostic};
use tinycpu::{error, info};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut listing = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            "--listing" => {
                listing = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        let p = Path::new(input_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let parent = p.parent().unwrap_or(Path::new("."));
        parent
            .join(format!("{}.tcp", stem))
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    let source = fs::read_to_string(input_path).unwrap_or_else(|e| {
        error!("Failed to read {}: {}", input_path, e);
        process::exit(1);
    });

    let program = match assemble_source(&source) {
        Ok(p) => p,
        Err(e) => {
            eprint!("{}", render_assembly_diagnostic(input_path, &e));
            error!("Assembly failed: {}", e);
            process::exit(1);
        }
    };

    let text = program.to_text();
    if let Err(e) = fs::write(&output_path, format!("{text}\n")) {
        error!("Failed to write output file: {}", e);
        process::exit(1);
    }

    let req = program.requirements();
    info!(
        "Compiled {} -> {} ({} instruction(s), {} bytes encoded)",
        input_path,
        output_path,
        program.len(),
        text.len()
    );
    info!(
        "Requirements: registers={} stack={} devices={}",
        req.registers, req.stack, req.devices
    );
    info!("Digest: {}", program.digest());

    if listing {
        for ins in program.instructions() {
            info!("{:>4} | {}", ins.line, ins);
        }
    }
}

const USAGE: &str = "\
Assembly Compiler

USAGE:
    {program} <input.asm> [OPTIONS]

ARGS:
    <input.asm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.tcp)
    --listing               Log the decoded instructions with their source lines
    -h, --help              Print this help message

EXAMPLES:
    # Compile to default output name
    {program} program.asm

    # Compile with explicit output
    {program} program.asm -o output.tcp

    # Show what was assembled
    {program} program.asm --listing
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
