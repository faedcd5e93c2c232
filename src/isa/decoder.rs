//! RV32I 解码器
//!
//! 按 opcode 分派到各格式的解码函数。`DecodeMode` 决定如何处理
//! 基础指令集之外的编码（funct3/funct7 的保留组合、M 扩展等）。

use super::fields::*;
use super::instr::{AluOp, BranchCond, LoadKind, Operand, RvInstr, StoreKind};

/// 非标准编码的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// 兼容模式：保留参考实现的行为，保留编码按最接近的基础指令执行
    #[default]
    Compat,
    /// 严格模式：任何不属于 RV32I 的编码都解码为 `Illegal`
    Strict,
}

/// 解码一条 32 位指令
///
/// 不会失败：无法识别的编码返回 `RvInstr::Illegal`。
///
/// # 示例
///
/// ```
/// use rv32i_sim::isa::{decode, DecodeMode, RvInstr, AluOp, Operand};
///
/// let instr = decode(0x00500513, DecodeMode::Compat); // addi a0, zero, 5
/// assert_eq!(
///     instr,
///     RvInstr::Alu { op: AluOp::Add, rd: 10, rs1: 0, rhs: Operand::Imm(5) }
/// );
/// ```
pub fn decode(raw: u32, mode: DecodeMode) -> RvInstr {
    let strict = mode == DecodeMode::Strict;
    let decoded = match opcode(raw) {
        OP_LUI => Some(RvInstr::Lui { rd: rd(raw), imm: imm_u(raw) }),
        OP_AUIPC => Some(RvInstr::Auipc { rd: rd(raw), imm: imm_u(raw) }),
        OP_JAL => Some(RvInstr::Jal { rd: rd(raw), offset: imm_j(raw) }),
        OP_JALR if strict && funct3(raw) != 0 => None,
        OP_JALR => Some(RvInstr::Jalr {
            rd: rd(raw),
            rs1: rs1(raw),
            offset: imm_i(raw),
        }),
        OP_BRANCH => decode_branch(raw),
        OP_LOAD => decode_load(raw),
        OP_STORE => decode_store(raw),
        OP_IMM => decode_op_imm(raw, strict),
        OP_REG => decode_op(raw, strict),
        _ => None,
    };
    decoded.unwrap_or(RvInstr::Illegal { raw })
}

/// 兼容模式下 `Illegal` 指令的写回目标
///
/// 参考实现对未识别的编码仍按 bits 11:7 写回 0；
/// 只有 store 与 branch 在分派前就放弃了写回。
pub fn compat_write_back(raw: u32) -> Option<u8> {
    match opcode(raw) {
        OP_STORE | OP_BRANCH => None,
        _ => Some(rd(raw)),
    }
}

fn decode_branch(raw: u32) -> Option<RvInstr> {
    let cond = match funct3(raw) {
        0b000 => BranchCond::Eq,
        0b001 => BranchCond::Ne,
        0b100 => BranchCond::Lt,
        0b101 => BranchCond::Ge,
        0b110 => BranchCond::Ltu,
        0b111 => BranchCond::Geu,
        _ => return None,
    };
    Some(RvInstr::Branch {
        cond,
        rs1: rs1(raw),
        rs2: rs2(raw),
        offset: imm_b(raw),
    })
}

fn decode_load(raw: u32) -> Option<RvInstr> {
    let kind = match funct3(raw) {
        0b000 => LoadKind::Byte,
        0b001 => LoadKind::Half,
        0b010 => LoadKind::Word,
        0b100 => LoadKind::ByteUnsigned,
        0b101 => LoadKind::HalfUnsigned,
        _ => return None,
    };
    Some(RvInstr::Load {
        kind,
        rd: rd(raw),
        rs1: rs1(raw),
        offset: imm_i(raw),
    })
}

fn decode_store(raw: u32) -> Option<RvInstr> {
    let kind = match funct3(raw) {
        0b000 => StoreKind::Byte,
        0b001 => StoreKind::Half,
        0b010 => StoreKind::Word,
        _ => return None,
    };
    Some(RvInstr::Store {
        kind,
        rs1: rs1(raw),
        rs2: rs2(raw),
        offset: imm_s(raw),
    })
}

/// funct3 到运算的映射；`alt` 为 bit 30，只有寄存器形式的 funct3=0 才把它当作 SUB
fn alu_op(f3: u32, alt: bool, is_reg: bool) -> AluOp {
    match f3 {
        0b000 if alt && is_reg => AluOp::Sub,
        0b000 => AluOp::Add,
        0b001 => AluOp::Sll,
        0b010 => AluOp::Slt,
        0b011 => AluOp::Sltu,
        0b100 => AluOp::Xor,
        0b101 if alt => AluOp::Sra,
        0b101 => AluOp::Srl,
        0b110 => AluOp::Or,
        _ => AluOp::And,
    }
}

fn decode_op_imm(raw: u32, strict: bool) -> Option<RvInstr> {
    let f3 = funct3(raw);
    if strict {
        let f7 = funct7(raw);
        let shift_ok = match f3 {
            0b001 => f7 == 0,
            0b101 => f7 == 0 || f7 == 0b010_0000,
            _ => true,
        };
        if !shift_ok {
            return None;
        }
    }
    Some(RvInstr::Alu {
        op: alu_op(f3, alt_bit(raw), false),
        rd: rd(raw),
        rs1: rs1(raw),
        rhs: Operand::Imm(imm_i(raw)),
    })
}

fn decode_op(raw: u32, strict: bool) -> Option<RvInstr> {
    let f3 = funct3(raw);
    if strict {
        let valid = match funct7(raw) {
            0 => true,
            0b010_0000 => f3 == 0b000 || f3 == 0b101,
            _ => false,
        };
        if !valid {
            return None;
        }
    }
    Some(RvInstr::Alu {
        op: alu_op(f3, alt_bit(raw), true),
        rd: rd(raw),
        rs1: rs1(raw),
        rhs: Operand::Reg(rs2(raw)),
    })
}
