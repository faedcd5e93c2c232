//! 机器状态转储
//!
//! `StateReport` 借用 `Machine`，只读；同一状态渲染两次得到相同文本。
//!
//! 输出格式：
//!
//! ```text
//!  PC:00000000 [00500513] addi a0, zero, 5
//!  zero:00000000    ra:00000000    sp:03fffff8    gp:00000000
//!  ...
//! stack (sp:03fffff8):
//!   03fffff8: 00000001
//!   03fffffc: 00000002
//! 04000000 (stack end)
//! ```

use std::fmt;

use crate::isa::{abi_name, decode, regs::REG_SP};
use crate::machine::Machine;
use crate::memory::Memory;

/// 栈转储的最大行数
pub const MAX_STACK_WORDS: usize = 32;

/// 机器状态的文本视图
#[derive(Debug, Clone, Copy)]
pub struct StateReport<'a> {
    machine: &'a Machine,
}

impl<'a> StateReport<'a> {
    pub fn new(machine: &'a Machine) -> Self {
        Self { machine }
    }

    /// PC 落在代码区内时返回该处的指令字
    fn fetched_word(&self) -> Option<u32> {
        let layout = self.machine.layout();
        let offset = self.machine.pc().wrapping_sub(layout.text_start()) as usize;
        if offset < layout.text_size().saturating_sub(3) {
            self.machine.load32(self.machine.pc()).ok()
        } else {
            None
        }
    }

    fn fmt_pc(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " PC:{:08x}", self.machine.pc())?;
        match self.fetched_word() {
            Some(raw) => {
                let instr = decode(raw, self.machine.cpu().decode_mode());
                writeln!(f, " [{raw:08x}] {instr}")
            }
            None => writeln!(f, " [xxxxxxxx]"),
        }
    }

    fn fmt_regs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.machine.regs().iter().enumerate() {
            let lead = if i % 4 == 0 { " " } else { "  " };
            write!(f, "{lead}{:>4}:{value:08x}", abi_name(i as u8))?;
            if i % 4 == 3 {
                writeln!(f)?;
            }
        }
        Ok(())
    }

    fn fmt_stack(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sp = self.machine.reg(REG_SP);
        let layout = self.machine.layout();
        let stack_end = layout.stack_end();

        writeln!(f, "stack (sp:{sp:08x}):")?;
        if sp < layout.base || sp > stack_end {
            writeln!(f, "  sp outside memory")?;
        } else {
            let total = ((stack_end - sp) / 4) as usize;
            let shown = total.min(MAX_STACK_WORDS);
            for i in 0..shown {
                let addr = sp + (i as u32) * 4;
                match self.machine.memory().load32(addr) {
                    Ok(word) => writeln!(f, "  {addr:08x}: {word:08x}")?,
                    Err(_) => writeln!(f, "  {addr:08x}: ????????")?,
                }
            }
            if total > shown {
                writeln!(f, "  ... ({} more words)", total - shown)?;
            }
        }
        writeln!(f, "{stack_end:08x} (stack end)")
    }
}

impl fmt::Display for StateReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_pc(f)?;
        self.fmt_regs(f)?;
        self.fmt_stack(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::machine::{Machine, MemoryLayout};

    fn machine() -> Machine {
        let mut m = Machine::new(MemoryLayout::new(0x1000, 0x400));
        // addi a0, zero, 5
        m.store32(0x1000, 0x00500513).unwrap();
        m
    }

    #[test]
    fn test_pc_line_with_disassembly() {
        let m = machine();
        let text = m.report().to_string();
        assert!(text.starts_with(" PC:00001000 [00500513] addi a0, zero, 5\n"));
    }

    #[test]
    fn test_pc_outside_text() {
        let mut m = machine();
        m.set_pc(0);
        assert!(m.report().to_string().starts_with(" PC:00000000 [xxxxxxxx]\n"));

        // 代码区最后 3 个字节之内不再取指
        m.set_pc(0x1000 + 0x200 - 3);
        assert!(m.report().to_string().contains("[xxxxxxxx]"));
        m.set_pc(0x1000 + 0x200 - 4);
        assert!(!m.report().to_string().contains("[xxxxxxxx]"));
    }

    #[test]
    fn test_register_columns() {
        let mut m = machine();
        m.set_reg(1, 0xDEAD_BEEF);
        m.set_reg(31, 7);
        let text = m.report().to_string();

        assert!(text.contains(" zero:00000000    ra:deadbeef    sp:00000000    gp:00000000\n"));
        assert!(text.contains("   t6:00000007\n"));
        let reg_lines = text.lines().skip(1).take(8).collect::<Vec<_>>();
        assert!(reg_lines.iter().all(|l| l.matches(':').count() == 4));
    }

    #[test]
    fn test_stack_dump() {
        let mut m = machine();
        m.set_reg(2, 0x13F8);
        m.store32(0x13F8, 1).unwrap();
        m.store32(0x13FC, 0xFFFF_FFFF).unwrap();
        let text = m.report().to_string();

        assert!(text.contains(
            "stack (sp:000013f8):\n  000013f8: 00000001\n  000013fc: ffffffff\n00001400 (stack end)\n"
        ));
    }

    #[test]
    fn test_stack_dump_is_capped() {
        let mut m = machine();
        m.set_reg(2, 0x1200);
        let text = m.report().to_string();

        assert_eq!(text.lines().filter(|l| l.starts_with("  0000")).count(), 32);
        assert!(text.contains("  ... (96 more words)\n"));
    }

    #[test]
    fn test_sp_outside_memory() {
        let mut m = machine();
        m.set_reg(2, 0x10);
        assert!(m.report().to_string().contains("  sp outside memory\n"));
    }

    #[test]
    fn test_report_is_idempotent() {
        let mut m = machine();
        m.set_reg(2, 0x13F0);
        let first = m.report().to_string();
        let second = m.report().to_string();
        assert_eq!(first, second);
    }
}
