//! Runs a tinycpu program.
//!
//! # Usage
//! ```text
//! tinycpu <program> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `program`: assembly source, or encoded program text with `--encoded`
//!
//! # Options
//! - `--encoded`: treat `program` as the output of the `assembler` tool
//! - `--registers <n>`, `--stack <n>`, `--devices <n>`: machine capacities (default: fit the program)
//! - `--frequency <hz>`: pace execution to `hz` instructions per second
//! - `--trace`: log every step
//! - `--rom <file>`: lookup memory contents (slot 1)
//! - `--cells <file>`: persistent cell store (slot 2), created if missing
//! - `--display <n>`: display width (slot 0)
//!
//! Devices are wired as slot 0 display, slot 1 lookup memory and slot 2 cell store.

use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::str::FromStr;
use tinycpu::devices::{CellStore, Display, LookupMemory};
use tinycpu::utils::log::{Level, set_min_level};
use tinycpu::virtual_machine::assembler::{assemble_source, render_assembly_diagnostic};
use tinycpu::virtual_machine::device::Device;
use tinycpu::virtual_machine::program::Program;
use tinycpu::virtual_machine::vm::{
    MAX_DEVICES, MAX_REGISTERS, MAX_STACK, MachineConfig, StepSnapshot, VM,
};
use tinycpu::{debug, error, info, warn};

const DISPLAY_SLOT: usize = 0;
const ROM_SLOT: usize = 1;
const CELLS_SLOT: usize = 2;
const DEFAULT_DISPLAY_WIDTH: usize = 80;
const DEFAULT_CELLS: usize = 256;

/// Command-line options after parsing.
struct Options {
    program_path: String,
    encoded: bool,
    registers: Option<usize>,
    stack: Option<usize>,
    devices: Option<usize>,
    frequency: Option<u32>,
    trace: bool,
    rom: Option<String>,
    cells: Option<String>,
    display: usize,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let options = parse_args(&args);
    if options.trace {
        set_min_level(Level::Debug);
    }

    let program = load_program(&options);
    let config = machine_config(&options, &program);
    info!(
        "Loaded {} instruction(s); registers={} stack={} devices={}",
        program.len(),
        config.registers,
        config.stack,
        config.devices
    );

    let mut display = Display::new(options.display);
    let mut rom = options.rom.as_deref().map(load_rom);
    let mut cells = options.cells.as_deref().map(load_cells);

    let result = {
        let mut vm = VM::new(config);
        wire(&mut vm, DISPLAY_SLOT, &mut display);
        if let Some(rom) = rom.as_mut() {
            wire(&mut vm, ROM_SLOT, rom);
        }
        if let Some(cells) = cells.as_mut() {
            wire(&mut vm, CELLS_SLOT, cells);
        }

        let mut trace = |snap: &StepSnapshot<'_>| debug!("{snap}");
        if options.trace {
            vm.run(&program, Some(&mut trace))
        } else {
            vm.run(&program, None)
        }
    };

    if let (Some(path), Some(cells)) = (options.cells.as_deref(), cells.as_ref())
        && let Err(e) = cells.save(path)
    {
        error!("Failed to save cells: {e}");
    }

    let text = display.text();
    if !text.is_empty() {
        println!("{text}");
    }

    match result {
        Ok(()) => info!("Program finished"),
        Err(e) => {
            error!("Fault: {} at line {}", e.kind, e.line);
            if !e.text.is_empty() {
                error!("    {}", e.text);
            }
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        program_path: args[1].clone(),
        encoded: false,
        registers: None,
        stack: None,
        devices: None,
        frequency: None,
        trace: false,
        rom: None,
        cells: None,
        display: DEFAULT_DISPLAY_WIDTH,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--encoded" => options.encoded = true,
            "--trace" => options.trace = true,
            "--registers" => options.registers = Some(number_arg(args, &mut i)),
            "--stack" => options.stack = Some(number_arg(args, &mut i)),
            "--devices" => options.devices = Some(number_arg(args, &mut i)),
            "--frequency" => options.frequency = Some(number_arg(args, &mut i)),
            "--display" => options.display = number_arg(args, &mut i),
            "--rom" => options.rom = Some(value_arg(args, &mut i).to_string()),
            "--cells" => options.cells = Some(value_arg(args, &mut i).to_string()),
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
        i += 1;
    }
    options
}

/// Returns the argument following the flag at `args[*i]` and moves `i` onto it.
fn value_arg<'a>(args: &'a [String], i: &mut usize) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => value.as_str(),
        None => {
            error!("{flag} requires an argument");
            process::exit(1);
        }
    }
}

fn number_arg<T: FromStr>(args: &[String], i: &mut usize) -> T {
    let flag = args[*i].clone();
    let value = value_arg(args, i);
    value.parse().unwrap_or_else(|_| {
        error!("Invalid value for {flag}: '{value}' is not a valid number");
        process::exit(1);
    })
}

fn load_program(options: &Options) -> Program {
    let path = &options.program_path;
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        error!("Failed to read {path}: {e}");
        process::exit(1);
    });

    if options.encoded {
        return Program::from_text(&source).unwrap_or_else(|e| {
            error!("{path}: {e}");
            process::exit(1);
        });
    }

    assemble_source(&source).unwrap_or_else(|e| {
        eprint!("{}", render_assembly_diagnostic(path, &e));
        process::exit(1);
    })
}

/// Program-fitted defaults, overridden by explicit capacities.
fn machine_config(options: &Options, program: &Program) -> MachineConfig {
    let fitted = MachineConfig::fitting(program);
    MachineConfig {
        registers: capacity_arg("--registers", options.registers, MAX_REGISTERS)
            .unwrap_or(fitted.registers),
        stack: capacity_arg("--stack", options.stack, MAX_STACK).unwrap_or(fitted.stack),
        devices: capacity_arg("--devices", options.devices, MAX_DEVICES)
            .unwrap_or(fitted.devices),
        frequency: options.frequency,
    }
}

fn capacity_arg(flag: &str, value: Option<usize>, max: usize) -> Option<usize> {
    if let Some(n) = value
        && n > max
    {
        error!("Invalid value for {flag}: {n} exceeds the limit of {max}");
        process::exit(1);
    }
    value
}

fn load_rom(path: &str) -> LookupMemory {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        error!("Failed to read {path}: {e}");
        process::exit(1);
    });
    LookupMemory::parse(&text).unwrap_or_else(|e| {
        error!("{path}: {e}");
        process::exit(1);
    })
}

fn load_cells(path: &str) -> CellStore {
    if !Path::new(path).exists() {
        info!("Creating cell store {path} ({DEFAULT_CELLS} cells)");
        return CellStore::new(DEFAULT_CELLS);
    }
    CellStore::load(path).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    })
}

fn wire<'d, D: Device>(vm: &mut VM<'d>, slot: usize, device: &'d mut D) {
    if !vm.attach(slot, device) {
        warn!("No slot {slot} on this machine; device left unplugged");
    }
}

const USAGE: &str = "\
tinycpu runner

USAGE:
    {program} <program> [OPTIONS]

ARGS:
    <program>    Assembly source file (or encoded program with --encoded)

OPTIONS:
    --encoded             Read the program as encoded text produced by `assembler`
    --registers <n>       Register count (defaults to the program's needs, at least 16)
    --stack <n>           Stack depth (defaults to the program's needs, at least 16)
    --devices <n>         Device slot count (defaults to the program's needs, at least 4)
    --frequency <hz>      Instructions per second (unpaced by default)
    --trace               Log every executed step
    --rom <file>          Lookup memory contents for slot 1
    --cells <file>        Persistent cell store for slot 2 (created if missing)
    --display <n>         Display width for slot 0 (default 80)
    -h, --help            Print this help message

EXAMPLES:
    {program} hello.asm
    {program} hello.tcp --encoded --trace
    {program} table.asm --rom squares.txt --cells state.bin
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
