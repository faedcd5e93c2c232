//! rv32i_sim 命令行入口
//!
//! ```text
//! rv32i_sim_cli [OPTIONS] <IMAGE> [MAINARGS]...
//! ```
//!
//! 加载镜像，把 MAINARGS 编组到栈上，运行直到 PC 变为 0。
//! 开始、每一步之后以及结束时都打印机器状态；`--quiet` 只保留开始和结束。

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use rv32i_sim::isa::DecodeMode;
use rv32i_sim::loader::ImageFormat;
use rv32i_sim::sim_env::{SimConfig, SimEnv, SimError, StopReason};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Raw,
    Elf,
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => ImageFormat::Auto,
            FormatArg::Raw => ImageFormat::Raw,
            FormatArg::Elf => ImageFormat::Elf,
        }
    }
}

/// Single-hart RV32I emulator
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Raw binary or ELF32 image to run
    image: PathBuf,

    /// Integer arguments passed to main (decimal or 0x hex, at most 4)
    #[arg(allow_hyphen_values = true)]
    mainargs: Vec<String>,

    /// Image format
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Memory base address
    #[arg(long, default_value = "0", value_parser = parse_addr)]
    base: u32,

    /// Memory size in MiB
    #[arg(long, default_value_t = 64)]
    mem_mib: usize,

    /// Stop after N instructions (0 = run until halt)
    #[arg(long, default_value_t = 0)]
    max_steps: u64,

    /// Reject encodings outside RV32I instead of executing them leniently
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Only print the initial and final machine state, not the state after every instruction
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(args: Args) -> Result<StopReason, SimError> {
    let mem_size = args
        .mem_mib
        .checked_mul(1024 * 1024)
        .ok_or_else(|| SimError::Config(format!("memory size {} MiB is too large", args.mem_mib)))?;
    let mode = if args.strict {
        DecodeMode::Strict
    } else {
        DecodeMode::Compat
    };

    let config = SimConfig::new()
        .with_image_path(args.image)
        .with_image_format(args.format.into())
        .with_memory_base(args.base)
        .with_memory_size(mem_size)
        .with_mainargs(args.mainargs)
        .with_max_steps(args.max_steps)
        .with_decode_mode(mode);

    let mut env = SimEnv::from_config(config)?;

    println!("initially:");
    println!("{}", env.report());

    let result = if args.quiet {
        env.run()
    } else {
        env.run_with(|m| println!("{}", m.report()))
    };

    println!("finally:");
    println!("{}", env.report());

    Ok(result?.reason)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args) {
        Ok(StopReason::Halted) => ExitCode::SUCCESS,
        Ok(StopReason::StepLimit) => {
            error!("step limit reached before the program halted");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
