use super::super::{CpuCore, StepError};
use super::Effect;
use crate::isa::{compat_write_back, DecodeMode, LoadKind, Operand, RvInstr, StoreKind};
use crate::memory::Memory;

/// Execute one decoded RV32I instruction fetched from `pc`.
///
/// Only reads the register file; the caller applies the returned `Effect`.
/// Stores are the one side effect performed here, and a failed store
/// leaves memory untouched.
pub fn execute(
    cpu: &CpuCore,
    mem: &mut dyn Memory,
    instr: RvInstr,
    pc: u32,
) -> Result<Effect, StepError> {
    let link = pc.wrapping_add(4);

    let effect = match instr {
        RvInstr::Lui { rd, imm } => Effect::write(rd, imm),
        RvInstr::Auipc { rd, imm } => Effect::write(rd, pc.wrapping_add(imm)),

        RvInstr::Jal { rd, offset } => {
            Effect::link_and_jump(rd, link, pc.wrapping_add(offset as u32))
        }
        RvInstr::Jalr { rd, rs1, offset } => {
            // rs1 在写回之前读取，rd == rs1 时也成立
            let target = cpu.read_reg(rs1).wrapping_add(offset as u32) & !1;
            Effect::link_and_jump(rd, link, target)
        }

        RvInstr::Branch { cond, rs1, rs2, offset } => {
            if cond.taken(cpu.read_reg(rs1), cpu.read_reg(rs2)) {
                Effect::jump(pc.wrapping_add(offset as u32))
            } else {
                Effect::default()
            }
        }

        RvInstr::Load { kind, rd, rs1, offset } => {
            let addr = cpu.read_reg(rs1).wrapping_add(offset as u32);
            let value = match kind {
                LoadKind::Byte => mem.load8(addr).map(|v| v as i8 as i32 as u32),
                LoadKind::Half => mem.load16(addr).map(|v| v as i16 as i32 as u32),
                LoadKind::Word => mem.load32(addr),
                LoadKind::ByteUnsigned => mem.load8(addr).map(u32::from),
                LoadKind::HalfUnsigned => mem.load16(addr).map(u32::from),
            }
            .map_err(|source| StepError::Load { pc, source })?;
            Effect::write(rd, value)
        }

        RvInstr::Store { kind, rs1, rs2, offset } => {
            let addr = cpu.read_reg(rs1).wrapping_add(offset as u32);
            let value = cpu.read_reg(rs2);
            match kind {
                StoreKind::Byte => mem.store8(addr, value as u8),
                StoreKind::Half => mem.store16(addr, value as u16),
                StoreKind::Word => mem.store32(addr, value),
            }
            .map_err(|source| StepError::Store { pc, source })?;
            Effect::default()
        }

        RvInstr::Alu { op, rd, rs1, rhs } => {
            let rhs = match rhs {
                Operand::Reg(rs2) => cpu.read_reg(rs2),
                Operand::Imm(imm) => imm as u32,
            };
            Effect::write(rd, op.apply(cpu.read_reg(rs1), rhs))
        }

        RvInstr::Illegal { raw } => match cpu.decode_mode() {
            DecodeMode::Strict => return Err(StepError::IllegalInstruction { pc, raw }),
            // 参考行为：结果为 0，仍按 rd 字段写回
            DecodeMode::Compat => Effect {
                write_back: compat_write_back(raw).map(|rd| (rd, 0)),
                next_pc: None,
            },
        },
    };

    Ok(effect)
}
