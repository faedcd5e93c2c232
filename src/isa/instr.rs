//! 已解码指令的语义表示
//!
//! 解码阶段按指令格式归类，一次性完成字段提取与符号扩展；
//! 执行阶段只需对 `RvInstr` 做一次 `match`，各分支互斥。

use std::fmt;

use super::regs::abi_name;

/// 条件分支的比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    /// BEQ
    Eq,
    /// BNE
    Ne,
    /// BLT（有符号）
    Lt,
    /// BGE（有符号）
    Ge,
    /// BLTU（无符号）
    Ltu,
    /// BGEU（无符号）
    Geu,
}

impl BranchCond {
    /// 比较两个寄存器值，返回分支是否成立
    pub fn taken(self, lhs: u32, rhs: u32) -> bool {
        match self {
            BranchCond::Eq => lhs == rhs,
            BranchCond::Ne => lhs != rhs,
            BranchCond::Lt => (lhs as i32) < (rhs as i32),
            BranchCond::Ge => (lhs as i32) >= (rhs as i32),
            BranchCond::Ltu => lhs < rhs,
            BranchCond::Geu => lhs >= rhs,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            BranchCond::Eq => "beq",
            BranchCond::Ne => "bne",
            BranchCond::Lt => "blt",
            BranchCond::Ge => "bge",
            BranchCond::Ltu => "bltu",
            BranchCond::Geu => "bgeu",
        }
    }
}

/// 访存宽度与扩展方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// LB：字节，符号扩展
    Byte,
    /// LH：半字，符号扩展
    Half,
    /// LW
    Word,
    /// LBU：字节，零扩展
    ByteUnsigned,
    /// LHU：半字，零扩展
    HalfUnsigned,
}

impl LoadKind {
    fn mnemonic(self) -> &'static str {
        match self {
            LoadKind::Byte => "lb",
            LoadKind::Half => "lh",
            LoadKind::Word => "lw",
            LoadKind::ByteUnsigned => "lbu",
            LoadKind::HalfUnsigned => "lhu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Byte,
    Half,
    Word,
}

impl StoreKind {
    fn mnemonic(self) -> &'static str {
        match self {
            StoreKind::Byte => "sb",
            StoreKind::Half => "sh",
            StoreKind::Word => "sw",
        }
    }
}

/// 整数运算，立即数形式与寄存器形式共用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

impl AluOp {
    /// 计算 `lhs op rhs`，移位量取 `rhs` 低 5 位，全部按 32 位回绕
    pub fn apply(self, lhs: u32, rhs: u32) -> u32 {
        let shamt = rhs & 0x1F;
        match self {
            AluOp::Add => lhs.wrapping_add(rhs),
            AluOp::Sub => lhs.wrapping_sub(rhs),
            AluOp::Sll => lhs << shamt,
            AluOp::Slt => ((lhs as i32) < (rhs as i32)) as u32,
            AluOp::Sltu => (lhs < rhs) as u32,
            AluOp::Xor => lhs ^ rhs,
            AluOp::Srl => lhs >> shamt,
            AluOp::Sra => ((lhs as i32) >> shamt) as u32,
            AluOp::Or => lhs | rhs,
            AluOp::And => lhs & rhs,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Sll => "sll",
            AluOp::Slt => "slt",
            AluOp::Sltu => "sltu",
            AluOp::Xor => "xor",
            AluOp::Srl => "srl",
            AluOp::Sra => "sra",
            AluOp::Or => "or",
            AluOp::And => "and",
        }
    }
}

/// 第二操作数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// 寄存器 rs2（opcode `0110011`）
    Reg(u8),
    /// 符号扩展后的 12 位立即数（opcode `0010011`）
    Imm(i32),
}

/// RV32I 指令的语义化表示
///
/// 每个变体对应一种指令格式，携带执行所需的全部操作数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RvInstr {
    /// LUI: rd = imm（低 12 位为 0）
    Lui { rd: u8, imm: u32 },
    /// AUIPC: rd = pc + imm
    Auipc { rd: u8, imm: u32 },
    /// JAL: rd = pc + 4; pc = pc + offset
    Jal { rd: u8, offset: i32 },
    /// JALR: rd = pc + 4; pc = (rs1 + offset) & !1
    Jalr { rd: u8, rs1: u8, offset: i32 },
    /// BEQ/BNE/BLT/BGE/BLTU/BGEU
    Branch { cond: BranchCond, rs1: u8, rs2: u8, offset: i32 },
    /// LB/LH/LW/LBU/LHU
    Load { kind: LoadKind, rd: u8, rs1: u8, offset: i32 },
    /// SB/SH/SW
    Store { kind: StoreKind, rs1: u8, rs2: u8, offset: i32 },
    /// OP 与 OP-IMM
    Alu { op: AluOp, rd: u8, rs1: u8, rhs: Operand },
    /// 无法识别的编码，保留原始指令字
    Illegal { raw: u32 },
}

impl fmt::Display for RvInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RvInstr::Lui { rd, imm } => write!(f, "lui {}, {:#x}", abi_name(rd), imm >> 12),
            RvInstr::Auipc { rd, imm } => write!(f, "auipc {}, {:#x}", abi_name(rd), imm >> 12),
            RvInstr::Jal { rd, offset } => write!(f, "jal {}, {}", abi_name(rd), offset),
            RvInstr::Jalr { rd, rs1, offset } => {
                write!(f, "jalr {}, {}({})", abi_name(rd), offset, abi_name(rs1))
            }
            RvInstr::Branch { cond, rs1, rs2, offset } => write!(
                f,
                "{} {}, {}, {}",
                cond.mnemonic(),
                abi_name(rs1),
                abi_name(rs2),
                offset
            ),
            RvInstr::Load { kind, rd, rs1, offset } => write!(
                f,
                "{} {}, {}({})",
                kind.mnemonic(),
                abi_name(rd),
                offset,
                abi_name(rs1)
            ),
            RvInstr::Store { kind, rs1, rs2, offset } => write!(
                f,
                "{} {}, {}({})",
                kind.mnemonic(),
                abi_name(rs2),
                offset,
                abi_name(rs1)
            ),
            RvInstr::Alu { op, rd, rs1, rhs: Operand::Reg(rs2) } => write!(
                f,
                "{} {}, {}, {}",
                op.mnemonic(),
                abi_name(rd),
                abi_name(rs1),
                abi_name(rs2)
            ),
            RvInstr::Alu { op, rd, rs1, rhs: Operand::Imm(imm) } => {
                // 立即数移位只显示 shamt
                let shown = match op {
                    AluOp::Sll | AluOp::Srl | AluOp::Sra => imm & 0x1F,
                    _ => imm,
                };
                write!(
                    f,
                    "{}i {}, {}, {}",
                    op.mnemonic(),
                    abi_name(rd),
                    abi_name(rs1),
                    shown
                )
            }
            RvInstr::Illegal { raw } => write!(f, "illegal {:#010x}", raw),
        }
    }
}
