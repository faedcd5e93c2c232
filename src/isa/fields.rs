//! 指令字段提取辅助函数
//!
//! 所有立即数在这里一次性完成拼接与符号扩展，解码器只负责按 opcode 分派。

/// 将 `value` 的低 `bits` 位视为有符号数，符号扩展到 32 位
#[inline]
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// opcode [6:0]
#[inline]
pub fn opcode(raw: u32) -> u32 {
    raw & 0x7F
}

/// rd [11:7]
#[inline]
pub fn rd(raw: u32) -> u8 {
    ((raw >> 7) & 0x1F) as u8
}

/// funct3 [14:12]
#[inline]
pub fn funct3(raw: u32) -> u32 {
    (raw >> 12) & 0x7
}

/// rs1 [19:15]
#[inline]
pub fn rs1(raw: u32) -> u8 {
    ((raw >> 15) & 0x1F) as u8
}

/// rs2 [24:20]
#[inline]
pub fn rs2(raw: u32) -> u8 {
    ((raw >> 20) & 0x1F) as u8
}

/// funct7 [31:25]
#[inline]
pub fn funct7(raw: u32) -> u32 {
    (raw >> 25) & 0x7F
}

/// bit 30：区分 ADD/SUB、SRL/SRA
#[inline]
pub fn alt_bit(raw: u32) -> bool {
    raw & 0x4000_0000 != 0
}

/// I-type 立即数：imm[11:0] = raw[31:20]
#[inline]
pub fn imm_i(raw: u32) -> i32 {
    sign_extend(raw >> 20, 12)
}

/// S-type 立即数：imm[11:5] = raw[31:25], imm[4:0] = raw[11:7]
#[inline]
pub fn imm_s(raw: u32) -> i32 {
    let imm = ((raw >> 20) & 0xFE0) | ((raw >> 7) & 0x1F);
    sign_extend(imm, 12)
}

/// B-type 立即数（13 位，最低位恒 0）
///
/// imm[12] = raw[31], imm[11] = raw[7], imm[10:5] = raw[30:25], imm[4:1] = raw[11:8]
#[inline]
pub fn imm_b(raw: u32) -> i32 {
    let imm = ((raw >> 19) & 0x1000)
        | ((raw << 4) & 0x800)
        | ((raw >> 20) & 0x7E0)
        | ((raw >> 7) & 0x1E);
    sign_extend(imm, 13)
}

/// U-type 立即数：raw[31:12]，低 12 位清零，不做移位
#[inline]
pub fn imm_u(raw: u32) -> u32 {
    raw & 0xFFFF_F000
}

/// J-type 立即数（21 位，最低位恒 0）
///
/// imm[20] = raw[31], imm[19:12] = raw[19:12], imm[11] = raw[20], imm[10:1] = raw[30:21]
#[inline]
pub fn imm_j(raw: u32) -> i32 {
    let imm = ((raw >> 11) & 0x10_0000)
        | (raw & 0xF_F000)
        | ((raw >> 9) & 0x800)
        | ((raw >> 20) & 0x7FE);
    sign_extend(imm, 21)
}

// ========== Opcode 常量 ==========
pub const OP_LUI: u32 = 0b0110111;
pub const OP_AUIPC: u32 = 0b0010111;
pub const OP_JAL: u32 = 0b1101111;
pub const OP_JALR: u32 = 0b1100111;
pub const OP_BRANCH: u32 = 0b1100011;
pub const OP_LOAD: u32 = 0b0000011;
pub const OP_STORE: u32 = 0b0100011;
pub const OP_IMM: u32 = 0b0010011;
pub const OP_REG: u32 = 0b0110011;
