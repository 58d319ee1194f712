//! Headless DCPU-16 image runner.
//!
//! Loads a flat little-endian memory image at address 0, runs it until the
//! machine halts or catches fire, and reports the final state. `--trace`
//! prints one line per step with the registers and the disassembly at PC;
//! `--json` emits the final state as a machine-readable report.

use dcpu16::{Dcpu, State};
use serde::Serialize;
use std::fs;

const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Final machine state for the `--json` report.
#[derive(Debug, Serialize)]
struct Report {
    image: String,
    state: &'static str,
    steps: u64,
    cycles: u64,
    pc: u16,
    sp: u16,
    ex: u16,
    ia: u16,
    registers: [u16; 8],
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut trace = false;
    let mut json = false;
    let mut max_steps = DEFAULT_MAX_STEPS;
    let mut path: Option<&str> = None;

    for arg in &args {
        if arg == "-t" || arg == "--trace" {
            trace = true;
        } else if arg == "--json" {
            json = true;
        } else if let Some(value) = arg.strip_prefix("--max-steps=") {
            match value.parse() {
                Ok(n) => max_steps = n,
                Err(_) => {
                    eprintln!("Invalid step limit: {value}");
                    std::process::exit(2);
                }
            }
        } else if arg.starts_with('-') {
            eprintln!("Unknown option: {arg}");
            usage();
        } else if path.is_none() {
            path = Some(arg.as_str());
        } else {
            usage();
        }
    }

    let Some(path) = path else {
        usage();
    };

    if let Err(e) = run(path, trace, json, max_steps) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn usage() -> ! {
    eprintln!("Usage: dcpu-runner [-t|--trace] [--json] [--max-steps=N] <image.bin>");
    eprintln!("       Images are flat little-endian word sequences, loaded at 0x0000.");
    std::process::exit(2);
}

fn run(path: &str, trace: bool, json: bool, max_steps: u64) -> Result<(), String> {
    let data = fs::read(path).map_err(|e| format!("Failed to read {path}: {e}"))?;
    let words = decode_image(&data)?;

    let mut cpu = Dcpu::new();
    cpu.load(0, &words);

    if trace {
        println!("PC   SP   EX   IA   A    B    C    X    Y    Z    I    J    Instruction");
        println!("---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- ---- -----------");
    }

    let mut steps = 0;
    while !matches!(cpu.state(), State::Halt | State::OnFire) && steps < max_steps {
        if trace {
            print_trace_line(&cpu);
        }
        cpu.step();
        steps += 1;
    }

    if json {
        let r = &cpu.regs;
        let report = Report {
            image: path.to_string(),
            state: state_name(cpu.state()),
            steps,
            cycles: cpu.cycles(),
            pc: r.pc,
            sp: r.sp,
            ex: r.ex,
            ia: r.ia,
            registers: r.gp,
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to render report: {e}"))?;
        println!("{rendered}");
    } else {
        if steps >= max_steps && !matches!(cpu.state(), State::Halt | State::OnFire) {
            println!("Stopped after {steps} steps (limit reached)");
        }
        println!(
            "State: {} after {} steps, {} cycles",
            state_name(cpu.state()),
            steps,
            cpu.cycles()
        );
        let r = &cpu.regs;
        println!(
            "PC={:04x} SP={:04x} EX={:04x} IA={:04x} A={:04x} B={:04x} C={:04x} X={:04x} Y={:04x} Z={:04x} I={:04x} J={:04x}",
            r.pc,
            r.sp,
            r.ex,
            r.ia,
            r.gp[0],
            r.gp[1],
            r.gp[2],
            r.gp[3],
            r.gp[4],
            r.gp[5],
            r.gp[6],
            r.gp[7],
        );
    }

    Ok(())
}

/// Decode a flat binary image into words, little-endian byte pairs.
fn decode_image(data: &[u8]) -> Result<Vec<u16>, String> {
    if data.len() % 2 != 0 {
        return Err(format!(
            "Image is {} bytes; expected whole little-endian words",
            data.len()
        ));
    }
    if data.len() / 2 > dcpu16::MEMORY_WORDS {
        return Err(format!(
            "Image is {} words; the address space holds {}",
            data.len() / 2,
            dcpu16::MEMORY_WORDS
        ));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn print_trace_line(cpu: &Dcpu) {
    let r = &cpu.regs;
    let disasm = cpu.disassemble(r.pc);
    println!(
        "{:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {}",
        r.pc,
        r.sp,
        r.ex,
        r.ia,
        r.gp[0],
        r.gp[1],
        r.gp[2],
        r.gp[3],
        r.gp[4],
        r.gp[5],
        r.gp[6],
        r.gp[7],
        disasm.text,
    );
}

fn state_name(state: State) -> &'static str {
    match state {
        State::Idle => "idle",
        State::Ok => "ok",
        State::Halt => "halt",
        State::OnFire => "on fire",
    }
}
