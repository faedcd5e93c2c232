//! Integer register file x0..x31.

/// 32 个 32 位通用寄存器，x0 硬连线为 0。
///
/// x0 的不变式由写入策略维持：写 x0 被丢弃，数组中对应的槽位始终为 0。
/// 索引只取低 5 位，与指令字段宽度一致。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegFile {
    regs: [u32; 32],
}

impl RegFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn read(&self, reg: u8) -> u32 {
        self.regs[(reg & 0x1F) as usize]
    }

    #[inline]
    pub fn write(&mut self, reg: u8, value: u32) {
        let idx = (reg & 0x1F) as usize;
        if idx != 0 {
            self.regs[idx] = value;
        }
    }

    pub fn snapshot(&self) -> &[u32; 32] {
        &self.regs
    }
}

impl std::fmt::Debug for RegFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for r in &self.regs {
            list.entry(&format_args!("0x{:08x}", r));
        }
        list.finish()
    }
}
