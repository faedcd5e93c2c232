//! CPU 核心与执行引擎
//!
//! `CpuCore` 持有单个 hart 的架构状态：32 个通用寄存器与程序计数器。
//! 内存由调用者持有，通过 `&mut dyn Memory` 传入 `step`。
//!
//! 设计约定：
//! - x0 恒为 0，写入被丢弃
//! - 每次 `step` 恰好执行一条指令，要么完整生效，要么返回错误且不修改任何状态
//! - 引擎本身不知道停机约定（PC == 0），停机判断由运行循环负责

use thiserror::Error;

use crate::isa::{self, DecodeMode, RvInstr};
use crate::memory::{MemError, Memory};

mod exu;
mod regfile;

pub use regfile::RegFile;

/// 单步执行失败的原因
///
/// 失败的 `step` 不会修改寄存器、PC 或内存。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    /// 取指越界
    #[error("instruction fetch failed at pc=0x{pc:08x}: {source}")]
    Fetch { pc: u32, source: MemError },
    /// load 越界
    #[error("load failed at pc=0x{pc:08x}: {source}")]
    Load { pc: u32, source: MemError },
    /// store 越界
    #[error("store failed at pc=0x{pc:08x}: {source}")]
    Store { pc: u32, source: MemError },
    /// 严格解码模式下遇到非 RV32I 编码
    #[error("illegal instruction 0x{raw:08x} at pc=0x{pc:08x}")]
    IllegalInstruction { pc: u32, raw: u32 },
}

impl StepError {
    /// 出错指令的地址
    pub fn pc(&self) -> u32 {
        match *self {
            StepError::Fetch { pc, .. }
            | StepError::Load { pc, .. }
            | StepError::Store { pc, .. }
            | StepError::IllegalInstruction { pc, .. } => pc,
        }
    }
}

/// 一条已退休指令的记录，供跟踪日志使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retired {
    pub pc: u32,
    pub raw: u32,
    pub instr: RvInstr,
}

/// 单线程 RV32I CPU 核心
#[derive(Debug, Clone)]
pub struct CpuCore {
    regs: RegFile,
    pc: u32,
    decode_mode: DecodeMode,
}

impl CpuCore {
    /// 创建一个寄存器清零的 CPU 核心
    ///
    /// # 示例
    ///
    /// ```
    /// use rv32i_sim::cpu::CpuCore;
    ///
    /// let cpu = CpuCore::new(0x1000);
    /// assert_eq!(cpu.pc(), 0x1000);
    /// assert_eq!(cpu.read_reg(0), 0);
    /// ```
    pub fn new(entry_pc: u32) -> Self {
        Self::with_mode(entry_pc, DecodeMode::default())
    }

    pub fn with_mode(entry_pc: u32, decode_mode: DecodeMode) -> Self {
        CpuCore {
            regs: RegFile::new(),
            pc: entry_pc,
            decode_mode,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }

    pub fn set_decode_mode(&mut self, mode: DecodeMode) {
        self.decode_mode = mode;
    }

    /// 读取 x0 总是返回 0
    pub fn read_reg(&self, reg: u8) -> u32 {
        self.regs.read(reg)
    }

    /// 写 x0 是空操作
    pub fn write_reg(&mut self, reg: u8, value: u32) {
        self.regs.write(reg, value)
    }

    pub fn regs(&self) -> &[u32; 32] {
        self.regs.snapshot()
    }

    /// 执行单步指令
    ///
    /// # 流程
    ///
    /// 1. 从 PC 处取指（越界返回 `StepError::Fetch`）
    /// 2. 按当前解码模式解码
    /// 3. 执行，得到写回与跳转
    /// 4. rd != 0 时写回
    /// 5. PC 更新为跳转目标，或 PC + 4
    pub fn step(&mut self, mem: &mut dyn Memory) -> Result<Retired, StepError> {
        let pc = self.pc;
        let raw = mem
            .load32(pc)
            .map_err(|source| StepError::Fetch { pc, source })?;
        let instr = isa::decode(raw, self.decode_mode);

        let effect = exu::rv32i::execute(self, mem, instr, pc)?;

        if let Some((rd, value)) = effect.write_back {
            self.regs.write(rd, value);
        }
        self.pc = effect.next_pc.unwrap_or(pc.wrapping_add(4));

        Ok(Retired { pc, raw, instr })
    }
}

impl Default for CpuCore {
    fn default() -> Self {
        Self::new(0)
    }
}
