use std::{error::Error, fs, io, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use libemulator::Emulator;
use libisa::instruction::Instruction;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Raw program image, loaded at 0x200.
    rom_path: PathBuf,

    /// Fixed RNG seed for reproducible runs.
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let rom = fs::read(&args.rom_path)
        .with_context(|| format!("failed to read program image {:?}", args.rom_path))?;

    let mut emulator = match args.seed {
        Some(seed) => Emulator::with_seed(seed),
        None => Emulator::new(),
    };
    emulator
        .load_program(&rom)
        .context("failed to load program image")?;

    repl(&mut emulator)
}

fn repl(emulator: &mut Emulator) -> anyhow::Result<()> {
    println!("e [n] | r | f | d <addr> <len> | dis <addr> <len> | k [keys..] | q");

    for line in io::stdin().lines() {
        let line = line.context("failed to read command")?;

        if let Err(e) = execute_command(line.split_whitespace(), emulator) {
            eprintln!("!> {}", e);
        }
    }

    Ok(())
}

fn execute_command<'a, I>(mut args: I, emulator: &mut Emulator) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = &'a str>,
{
    match args.next().ok_or("no command specified")? {
        // Execute n cycles (default 1), reporting the last instruction.
        "e" => {
            let cycle_count = match args.next() {
                Some(arg) => parse_num(arg)?,
                None => 1,
            };

            for _ in 0..cycle_count {
                let instruction = emulator.step()?;
                log::debug!("executed {}", instruction);
            }

            println!(
                "pc {:#05X}, last opcode {:04X} ({})",
                emulator.pc,
                emulator.opcode,
                Instruction::decode(emulator.opcode)
            );
        }

        "r" => {
            for (index, value) in emulator.registers.iter().enumerate() {
                print!("V{index:X}={value:02X} ");
            }
            println!();
            println!(
                "pc={:#05X} i={:#05X} sp={} dt={} st={}",
                emulator.pc,
                emulator.index,
                emulator.stack_pointer,
                emulator.delay_timer,
                emulator.sound_timer
            );
        }

        "f" => {
            for row in emulator.framebuffer.rows() {
                let line: String = row.iter().map(|on| if *on { '#' } else { '.' }).collect();
                println!("{line}");
            }
            if emulator.sound_timer > 0 {
                println!("(sound timer active)");
            }
        }

        "d" => {
            let begin: u16 = parse_num(args.next().ok_or("no begin address given")?)?;
            let len: u16 = parse_num(args.next().ok_or("no length given")?)?;

            for (offset, addr) in (begin..begin.saturating_add(len)).enumerate() {
                let byte = emulator.memory.byte(addr).ok_or("address out of range")?;

                if offset % 8 == 0 {
                    print!("\n{addr:#05X}: ");
                }
                print!("{byte:02X} ");
            }
            println!();
        }

        "dis" => {
            let begin: u16 = parse_num(args.next().ok_or("no begin address given")?)?;
            let len: u16 = parse_num(args.next().ok_or("no length given")?)?;

            let mut addr = begin;
            while addr < begin.saturating_add(len) {
                let opcode = emulator.memory.opcode(addr).ok_or("address out of range")?;
                println!("{addr:#05X}: {opcode:04X}  {}", Instruction::decode(opcode));
                addr += libisa::BYTES_PER_OPCODE as u16;
            }
        }

        // Set the held keys for the following cycles, e.g. "k 1 a f".
        // Without arguments every key is released.
        "k" => {
            let mut keys = [false; libisa::KEY_COUNT];
            for arg in args.by_ref() {
                let key = usize::from_str_radix(arg, 16)?;
                *keys.get_mut(key).ok_or("key out of range")? = true;
            }
            emulator.set_keys(keys);
        }

        "q" => std::process::exit(0),

        _ => eprintln!("unrecognized command!"),
    }

    let unused_arg_count = args.count();
    if unused_arg_count != 0 {
        eprintln!("{} unused command arguments!", unused_arg_count);
    }

    Ok(())
}

fn parse_num(arg: &str) -> Result<u16, std::num::ParseIntError> {
    match arg.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}
