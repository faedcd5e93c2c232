//! 仿真环境
//!
//! 本模块负责：
//! - 仿真配置（`SimConfig` 构建器）
//! - 按配置创建机器、加载镜像、编组 main 参数
//! - 运行循环：反复单步直到 PC 变为 0（停机约定）
//!
//! # 示例
//!
//! ```no_run
//! use rv32i_sim::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::new()
//!     .with_image_path("program.bin")
//!     .with_mainargs(["1", "0x10"])
//!     .with_max_steps(1_000_000);
//!
//! let mut env = SimEnv::from_config(config).expect("failed to create sim env");
//! let summary = env.run().expect("run failed");
//! println!("{} steps, {:?}", summary.steps, summary.reason);
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::cpu::{Retired, StepError};
use crate::isa::DecodeMode;
use crate::loader::{self, ImageFormat, LoadedImage};
use crate::machine::{LayoutError, Machine, MemoryLayout};
use crate::mainargs::{self, MainArgError};
use crate::memory::MemError;
use crate::report::StateReport;

/// 程序跳转到该地址即视为停机
pub const HALT_PC: u32 = 0;

/// 仿真环境错误
///
/// 除 `Step` 外，都在第一条指令执行之前产生。
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read image {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("image is {len} bytes but the text region holds only {limit} bytes")]
    ImageTooLarge { len: usize, limit: usize },
    #[error("ELF segment 0x{vaddr:08x}+0x{size:x} does not fit in the text region")]
    SegmentOutsideText { vaddr: u32, size: usize },
    #[error("ELF error: {0}")]
    Elf(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    MainArg(#[from] MainArgError),
    #[error(transparent)]
    Memory(#[from] MemError),
    #[error(transparent)]
    Step(#[from] StepError),
}

/// 仿真配置
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// 镜像文件路径
    pub image_path: Option<PathBuf>,
    pub image_format: ImageFormat,
    pub layout: MemoryLayout,
    /// 未解析的 main 参数
    pub mainargs: Vec<String>,
    /// 最大执行指令数（0 表示无限制）
    pub max_steps: u64,
    pub decode_mode: DecodeMode,
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn with_memory_base(mut self, base: u32) -> Self {
        self.layout.base = base;
        self
    }

    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.layout.size = size;
        self
    }

    pub fn with_mainargs<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mainargs = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_steps(mut self, max: u64) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }
}

/// 运行结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// PC 变为 `HALT_PC`
    Halted,
    /// 达到 `max_steps`
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 本次运行执行的指令数
    pub steps: u64,
    pub reason: StopReason,
}

/// 仿真环境
///
/// 持有机器状态与配置，提供统一的仿真接口
#[derive(Debug)]
pub struct SimEnv {
    machine: Machine,
    config: SimConfig,
    image: LoadedImage,
    steps: u64,
}

impl SimEnv {
    /// 从配置创建仿真环境，镜像从 `config.image_path` 读取
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let path = config
            .image_path
            .clone()
            .ok_or_else(|| SimError::Config("no image path configured".into()))?;
        config.layout.validate()?;
        let data = loader::read_image(&path)?;
        info!(path = %path.display(), len = data.len(), "image file read");
        Self::from_image(config, &data)
    }

    /// 从内存中的镜像创建仿真环境
    ///
    /// 顺序：检查布局、解析参数、加载镜像、编组参数。
    /// 任一步失败都不会进入运行阶段。
    pub fn from_image(config: SimConfig, data: &[u8]) -> Result<Self, SimError> {
        config.layout.validate()?;
        let args = mainargs::parse_mainargs(&config.mainargs)?;

        let layout = config.layout;
        debug!(
            base = format_args!("0x{:08x}", layout.base),
            size = layout.size,
            text_size = layout.text_size(),
            stack_end = format_args!("0x{:08x}", layout.stack_end()),
            "memory layout"
        );

        let mut machine = Machine::with_mode(layout, config.decode_mode);
        let image = loader::load_image(&mut machine, data, config.image_format)?;
        mainargs::marshal(&mut machine, &args)?;

        Ok(SimEnv {
            machine,
            config,
            image,
            steps: 0,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn image(&self) -> &LoadedImage {
        &self.image
    }

    /// 累计执行的指令数
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn report(&self) -> StateReport<'_> {
        self.machine.report()
    }

    /// 执行单步
    pub fn step(&mut self) -> Result<Retired, SimError> {
        let retired = self.machine.step()?;
        self.steps += 1;
        trace!(
            pc = format_args!("0x{:08x}", retired.pc),
            raw = format_args!("0x{:08x}", retired.raw),
            instr = %retired.instr,
            "retired"
        );
        Ok(retired)
    }

    /// 运行直到停机或达到步数上限
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.run_with(|_| {})
    }

    /// 同 `run`，每执行一步后调用 `observer`
    ///
    /// 先执行再检查 PC：镜像基址为 0 时第一条指令照常执行，
    /// 之后任何跳转到 `HALT_PC` 的控制流都结束运行。
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<RunSummary, SimError>
    where
        F: FnMut(&Machine),
    {
        let start = self.steps;
        let limit = self.config.max_steps;

        let reason = loop {
            if limit > 0 && self.steps - start >= limit {
                break StopReason::StepLimit;
            }
            self.step()?;
            observer(&self.machine);
            if self.machine.pc() == HALT_PC {
                break StopReason::Halted;
            }
        };

        let summary = RunSummary {
            steps: self.steps - start,
            reason,
        };
        info!(steps = summary.steps, reason = ?summary.reason, "run finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::regs::{REG_A0, REG_SP};

    fn image(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn small_config() -> SimConfig {
        SimConfig::new()
            .with_memory_base(0x1000)
            .with_memory_size(0x400)
    }

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_image_path("prog.bin")
            .with_image_format(ImageFormat::Raw)
            .with_memory_base(0x8000_0000)
            .with_memory_size(128 * 1024)
            .with_mainargs(["1", "2"])
            .with_max_steps(1000)
            .with_decode_mode(DecodeMode::Strict);

        assert_eq!(config.image_path, Some(PathBuf::from("prog.bin")));
        assert_eq!(config.image_format, ImageFormat::Raw);
        assert_eq!(config.layout, MemoryLayout::new(0x8000_0000, 128 * 1024));
        assert_eq!(config.mainargs, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(config.max_steps, 1000);
        assert_eq!(config.decode_mode, DecodeMode::Strict);
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.layout, MemoryLayout::default());
        assert_eq!(config.image_format, ImageFormat::Auto);
        assert_eq!(config.max_steps, 0);
        assert_eq!(config.decode_mode, DecodeMode::Compat);
    }

    #[test]
    fn test_run_until_halt() {
        // 计算 1 + 2 + 3，然后 jalr x0, 0(x0) 停机
        let program = image(&[
            0x00000093, // addi x1, x0, 0
            0x00100113, // addi x2, x0, 1
            0x00400193, // addi x3, x0, 4
            0x002080B3, // add x1, x1, x2
            0x00110113, // addi x2, x2, 1
            0xFE314CE3, // blt x2, x3, -8
            0x00000067, // jalr x0, 0(x0)
        ]);
        let mut env = SimEnv::from_image(small_config(), &program).unwrap();
        assert_eq!(env.machine().pc(), 0x1000);

        let summary = env.run().unwrap();

        assert_eq!(summary.reason, StopReason::Halted);
        assert_eq!(summary.steps, 13);
        assert_eq!(env.steps(), 13);
        assert_eq!(env.machine().reg(1), 6);
        assert_eq!(env.machine().pc(), HALT_PC);
    }

    #[test]
    fn test_image_at_address_zero_starts() {
        // 基址为 0 时入口 PC 也是 0，仍然执行第一条指令
        let program = image(&[
            0x00500513, // addi x10, x0, 5
            0x00000067, // jalr x0, 0(x0)
        ]);
        let config = SimConfig::new().with_memory_size(0x400);
        let mut env = SimEnv::from_image(config, &program).unwrap();

        let summary = env.run().unwrap();

        assert_eq!(summary.steps, 2);
        assert_eq!(summary.reason, StopReason::Halted);
        assert_eq!(env.machine().reg(10), 5);
    }

    #[test]
    fn test_step_limit() {
        // jal x0, 0：原地死循环
        let program = image(&[0x0000006F]);
        let config = small_config().with_max_steps(10);
        let mut env = SimEnv::from_image(config, &program).unwrap();

        let summary = env.run().unwrap();

        assert_eq!(summary.reason, StopReason::StepLimit);
        assert_eq!(summary.steps, 10);
        assert_eq!(env.machine().pc(), 0x1000);
    }

    #[test]
    fn test_observer_sees_every_step() {
        let program = image(&[
            0x00100513, // addi x10, x0, 1
            0x00150513, // addi x10, x10, 1
            0x00000067, // jalr x0, 0(x0)
        ]);
        let mut env = SimEnv::from_image(small_config(), &program).unwrap();

        let mut seen = Vec::new();
        env.run_with(|m| seen.push(m.pc())).unwrap();

        assert_eq!(seen, vec![0x1004, 0x1008, 0]);
    }

    #[test]
    fn test_mainargs_reach_program() {
        let program = image(&[
            0x0005A283, // lw x5, 0(x11)
            0x0045A303, // lw x6, 4(x11)
            0x00628533, // add x10, x5, x6
            0x00000067, // jalr x0, 0(x0)
        ]);
        let config = small_config().with_mainargs(["3", "0x4"]);
        let mut env = SimEnv::from_image(config, &program).unwrap();

        assert_eq!(env.machine().reg(REG_A0), 2);
        assert_eq!(env.machine().reg(REG_SP), 0x1400 - 8);

        env.run().unwrap();
        assert_eq!(env.machine().reg(REG_A0), 7);
    }

    #[test]
    fn test_step_error_ends_run() {
        let program = image(&[
            0x000020B7, // lui x1, 0x2
            0x00008067, // jalr x0, 0(x1)
        ]);
        let mut env = SimEnv::from_image(small_config(), &program).unwrap();

        let err = env.run().unwrap_err();

        assert!(matches!(
            err,
            SimError::Step(StepError::Fetch { pc: 0x2000, .. })
        ));
        assert_eq!(env.steps(), 2);
        assert_eq!(env.machine().pc(), 0x2000);
    }

    #[test]
    fn test_strict_mode_from_config() {
        let program = image(&[0x0000050B]);
        let config = small_config().with_decode_mode(DecodeMode::Strict);
        let mut env = SimEnv::from_image(config, &program).unwrap();

        assert!(matches!(
            env.run(),
            Err(SimError::Step(StepError::IllegalInstruction { pc: 0x1000, .. }))
        ));
    }

    #[test]
    fn test_setup_errors() {
        let program = image(&[0x00000067]);

        let config = small_config().with_mainargs(["12x"]);
        assert!(matches!(
            SimEnv::from_image(config, &program),
            Err(SimError::MainArg(_))
        ));

        let config = SimConfig::new().with_memory_size(6);
        assert!(matches!(
            SimEnv::from_image(config, &program),
            Err(SimError::Layout(_))
        ));

        let config = small_config();
        assert!(matches!(
            SimEnv::from_image(config, &vec![0; 0x204]),
            Err(SimError::ImageTooLarge { .. })
        ));

        assert!(matches!(
            SimEnv::from_config(SimConfig::new()),
            Err(SimError::Config(_))
        ));

        let config = small_config().with_image_path("/nonexistent/prog.bin");
        assert!(matches!(
            SimEnv::from_config(config),
            Err(SimError::Io { .. })
        ));
    }
}
