//! RISC-V RV32I 指令集抽象与解码
//!
//! - `fields`: 指令字段提取与立即数符号扩展
//! - `RvInstr`: 已解码指令的语义表示，实现 `Display` 用作反汇编
//! - `decode`: 按 opcode 分派的解码器，`DecodeMode` 控制保留编码的处理
//! - `regs`: ABI 寄存器名

mod decoder;
mod fields;
mod instr;
pub mod regs;

pub use decoder::{compat_write_back, decode, DecodeMode};
pub use fields::*;
pub use instr::{AluOp, BranchCond, LoadKind, Operand, RvInstr, StoreKind};
pub use regs::abi_name;
