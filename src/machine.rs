//! 机器状态
//!
//! `Machine` 将 `CpuCore` 与 `FlatMemory` 组合为一个完整的 hart，
//! `MemoryLayout` 描述地址窗口以及代码区/栈区的划分：
//!
//! ```text
//! base                 base + size/2              base + size
//!  |----- text -----------|----- stack (向下增长) ---|
//! ```

use thiserror::Error;

use crate::cpu::{CpuCore, Retired, StepError};
use crate::isa::DecodeMode;
use crate::memory::{FlatMemory, MemResult, Memory};
use crate::report::StateReport;

/// 默认内存大小：64 MiB
pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024 * 1024;

/// 内存布局不合法
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid memory layout base=0x{base:08x} size=0x{size:x}: {reason}")]
pub struct LayoutError {
    pub base: u32,
    pub size: usize,
    pub reason: &'static str,
}

/// 地址窗口 `[base, base + size)`，低半部分为代码区，高半部分为栈
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub base: u32,
    pub size: usize,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            base: 0,
            size: DEFAULT_MEMORY_SIZE,
        }
    }
}

impl MemoryLayout {
    pub fn new(base: u32, size: usize) -> Self {
        Self { base, size }
    }

    /// 检查布局：size 至少 8 字节、按字对齐，且整个窗口落在 32 位地址空间内
    pub fn validate(&self) -> Result<(), LayoutError> {
        let fail = |reason| {
            Err(LayoutError {
                base: self.base,
                size: self.size,
                reason,
            })
        };
        if self.size < 8 {
            return fail("size must be at least 8 bytes");
        }
        if self.size % 4 != 0 {
            return fail("size must be a multiple of 4");
        }
        if self.base as u64 + self.size as u64 > u32::MAX as u64 {
            return fail("window exceeds the 32-bit address space");
        }
        Ok(())
    }

    pub fn text_start(&self) -> u32 {
        self.base
    }

    pub fn text_size(&self) -> usize {
        self.size / 2
    }

    pub fn stack_start(&self) -> u32 {
        self.base.wrapping_add(self.text_size() as u32)
    }

    /// 栈顶（最后一个字节之后的地址）
    pub fn stack_end(&self) -> u32 {
        self.base.wrapping_add(self.size as u32)
    }

    /// `[addr, addr + len)` 是否完全落在代码区内
    pub fn text_contains(&self, addr: u32, len: usize) -> bool {
        let Some(offset) = addr.checked_sub(self.base) else {
            return false;
        };
        (offset as usize)
            .checked_add(len)
            .is_some_and(|end| end <= self.text_size())
    }
}

/// 单个 hart 的完整状态：寄存器、PC 与内存
#[derive(Debug, Clone)]
pub struct Machine {
    cpu: CpuCore,
    memory: FlatMemory,
    layout: MemoryLayout,
}

impl Machine {
    /// 创建清零的机器，PC 指向代码区起始
    ///
    /// 调用者负责先对 `layout` 调用 `validate`。
    pub fn new(layout: MemoryLayout) -> Self {
        Self::with_mode(layout, DecodeMode::default())
    }

    pub fn with_mode(layout: MemoryLayout, mode: DecodeMode) -> Self {
        Machine {
            cpu: CpuCore::with_mode(layout.text_start(), mode),
            memory: FlatMemory::new(layout.size, layout.base),
            layout,
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn cpu(&self) -> &CpuCore {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CpuCore {
        &mut self.cpu
    }

    pub fn memory(&self) -> &FlatMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut FlatMemory {
        &mut self.memory
    }

    pub fn reg(&self, idx: u8) -> u32 {
        self.cpu.read_reg(idx)
    }

    /// 写 x0 是空操作
    pub fn set_reg(&mut self, idx: u8, value: u32) {
        self.cpu.write_reg(idx, value)
    }

    pub fn regs(&self) -> &[u32; 32] {
        self.cpu.regs()
    }

    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }

    pub fn set_pc(&mut self, addr: u32) {
        self.cpu.set_pc(addr)
    }

    pub fn load8(&self, addr: u32) -> MemResult<u8> {
        self.memory.load8(addr)
    }

    pub fn load16(&self, addr: u32) -> MemResult<u16> {
        self.memory.load16(addr)
    }

    pub fn load32(&self, addr: u32) -> MemResult<u32> {
        self.memory.load32(addr)
    }

    pub fn store8(&mut self, addr: u32, value: u8) -> MemResult<()> {
        self.memory.store8(addr, value)
    }

    pub fn store16(&mut self, addr: u32, value: u16) -> MemResult<()> {
        self.memory.store16(addr, value)
    }

    pub fn store32(&mut self, addr: u32, value: u32) -> MemResult<()> {
        self.memory.store32(addr, value)
    }

    /// 执行一条指令
    pub fn step(&mut self) -> Result<Retired, StepError> {
        self.cpu.step(&mut self.memory)
    }

    /// 当前状态的只读快照，`Display` 输出即状态转储
    pub fn report(&self) -> StateReport<'_> {
        StateReport::new(self)
    }
}
