//! 通用寄存器的 ABI 名称

/// x0..x31 对应的 ABI 名称
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

pub const REG_ZERO: u8 = 0;
pub const REG_RA: u8 = 1;
pub const REG_SP: u8 = 2;
pub const REG_A0: u8 = 10;
pub const REG_A1: u8 = 11;

/// 返回寄存器的 ABI 名称，索引只取低 5 位
#[inline]
pub fn abi_name(reg: u8) -> &'static str {
    ABI_NAMES[(reg & 0x1F) as usize]
}
