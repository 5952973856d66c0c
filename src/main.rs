use std::path::PathBuf;

use anyhow::{
    Context,
    Result,
};
use chip8vm::{
    constants,
    Config,
    Emulator,
    Interpreter,
    Rom,
    RunConfig,
    RunnerEvent,
};
use clap::{
    Parser,
    ValueEnum,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InterpreterArg {
    Chip8,
    CosmacVip,
    SuperChip,
}

impl From<InterpreterArg> for Interpreter {
    fn from(value: InterpreterArg) -> Self {
        match value {
            InterpreterArg::Chip8 => Interpreter::Chip8,
            InterpreterArg::CosmacVip => Interpreter::CosmacVip,
            InterpreterArg::SuperChip => Interpreter::SuperChip,
        }
    }
}

/// Runs a CHIP-8 program headless and prints the final screen.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Program image, loaded at 0x200
    rom: PathBuf,

    #[arg(long, default_value_t = constants::INSTRUCTIONS_PER_SECOND)]
    cycles_per_second: u32,

    /// Stop after this many steps; runs forever if omitted
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Stop after this many seconds of emulated time
    #[arg(long)]
    seconds: Option<f64>,

    #[arg(long, value_enum, default_value_t = InterpreterArg::Chip8)]
    interpreter: InterpreterArg,

    /// Fx1E sets VF when I overflows 0xFFF
    #[arg(long)]
    index_overflow_flag: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Hex keys held down for the whole run, e.g. `--hold 5,a`
    #[arg(long, value_delimiter = ',', value_parser = parse_key)]
    hold: Vec<u8>,

    /// Pace execution against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Write the final screen to this PNG
    #[arg(long)]
    screenshot: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    pixel_size: u32,
}

fn parse_key(s: &str) -> Result<u8, String> {
    match u8::from_str_radix(s, 16) {
        Ok(key) if (key as usize) < constants::KEY_COUNT => Ok(key),
        _ => Err(format!("`{s}` is not a key between 0 and F")),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = Rom::load(&args.rom).with_context(|| format!("reading {}", args.rom.display()))?;
    let config = Config {
        interpreter: args.interpreter.into(),
        index_overflow_flag: args.index_overflow_flag,
    };
    let mut emulator = match args.seed {
        Some(seed) => Emulator::with_seed(config, seed),
        None => Emulator::new(config),
    };
    emulator.load_rom(&rom)?;
    for key in &args.hold {
        emulator.set_key(*key, true);
    }

    let run_config = RunConfig {
        cycles_per_second: args.cycles_per_second,
        max_cycles: args.max_cycles,
        pacing: if args.realtime {
            chip8vm::Pacing::RealTime
        } else {
            chip8vm::Pacing::Unthrottled
        },
    };
    let mut events: Vec<RunnerEvent> = args
        .seconds
        .map(|s| RunnerEvent::stop_at(chip8vm::Trigger::TimerSeconds(s)))
        .into_iter()
        .collect();

    let summary = chip8vm::run(&mut emulator, &run_config, &mut events)?;

    print!("{}", emulator.display());
    println!(
        "cycles: {}  pc: {:#05x}  unknown opcodes: {}",
        summary.cycles,
        emulator.pc(),
        summary.unknown_opcodes
    );

    if let Some(path) = &args.screenshot {
        emulator
            .export_display(path, args.pixel_size)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}
