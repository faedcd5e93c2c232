//! main 参数编组
//!
//! 将命令行上的整数参数写到栈顶，并按 `main(argc, argv)` 的约定设置寄存器：
//!
//! - `sp = stack_end - 4 * argc`
//! - 参数按小端序依次写在 `sp, sp + 4, ...`
//! - `a0 = argc`，`a1 = sp`，`sp = sp`
//!
//! 参数可以是十进制（可带 `-`）或 `0x` 前缀的十六进制。

use thiserror::Error;
use tracing::{debug, warn};

use crate::isa::regs::{REG_A0, REG_A1, REG_SP};
use crate::machine::Machine;
use crate::memory::MemError;

/// 最多传递的参数个数，多余的被丢弃
pub const MAX_MAINARGS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MainArgError {
    #[error("empty main argument")]
    Empty,
    #[error("invalid hex main argument {0:?} (expected 1-8 hex digits after 0x)")]
    InvalidHex(String),
    #[error("invalid decimal main argument {0:?}")]
    InvalidDecimal(String),
    #[error("main argument {0:?} does not fit in 32 bits")]
    OutOfRange(String),
    #[error("{argc} main arguments do not fit in a {stack_size}-byte stack")]
    StackTooSmall { argc: usize, stack_size: usize },
    #[error(transparent)]
    Memory(#[from] MemError),
}

/// 解析单个参数
///
/// 十进制取值范围为 `i32::MIN..=u32::MAX`，负数按补码存储。
///
/// ```
/// use rv32i_sim::mainargs::parse_mainarg;
///
/// assert_eq!(parse_mainarg("42").unwrap(), 42);
/// assert_eq!(parse_mainarg("-1").unwrap(), 0xFFFF_FFFF);
/// assert_eq!(parse_mainarg("0x10").unwrap(), 16);
/// assert!(parse_mainarg("0x").is_err());
/// ```
pub fn parse_mainarg(token: &str) -> Result<u32, MainArgError> {
    if token.is_empty() {
        return Err(MainArgError::Empty);
    }

    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        let valid = (1..=8).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit());
        if !valid {
            return Err(MainArgError::InvalidHex(token.to_string()));
        }
        return u32::from_str_radix(hex, 16).map_err(|_| MainArgError::InvalidHex(token.to_string()));
    }

    let digits = token.strip_prefix('-').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MainArgError::InvalidDecimal(token.to_string()));
    }
    let value: i64 = token
        .parse()
        .map_err(|_| MainArgError::OutOfRange(token.to_string()))?;
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return Err(MainArgError::OutOfRange(token.to_string()));
    }
    Ok(value as u32)
}

fn keep_allowed<T>(args: &[T]) -> &[T] {
    if args.len() > MAX_MAINARGS {
        warn!(
            given = args.len(),
            max = MAX_MAINARGS,
            "too many main arguments, the excess ones are discarded"
        );
        &args[..MAX_MAINARGS]
    } else {
        args
    }
}

/// 解析参数列表，超出 `MAX_MAINARGS` 的部分丢弃且不解析
pub fn parse_mainargs<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<u32>, MainArgError> {
    keep_allowed(tokens)
        .iter()
        .map(|t| parse_mainarg(t.as_ref()))
        .collect()
}

/// 把参数写入栈并设置 a0/a1/sp，返回新的 sp
pub fn marshal(machine: &mut Machine, args: &[u32]) -> Result<u32, MainArgError> {
    let args = keep_allowed(args);
    let layout = *machine.layout();
    let argc = args.len();
    let bytes = argc * 4;
    let stack_size = layout.size - layout.text_size();
    if bytes > stack_size {
        return Err(MainArgError::StackTooSmall { argc, stack_size });
    }

    let sp = layout.stack_end().wrapping_sub(bytes as u32);
    for (i, &value) in args.iter().enumerate() {
        machine.store32(sp + (i as u32) * 4, value)?;
    }

    machine.set_reg(REG_SP, sp);
    machine.set_reg(REG_A0, argc as u32);
    machine.set_reg(REG_A1, sp);

    debug!(argc, sp = format_args!("0x{sp:08x}"), ?args, "main arguments marshaled");
    Ok(sp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MemoryLayout;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_mainarg("0").unwrap(), 0);
        assert_eq!(parse_mainarg("123").unwrap(), 123);
        assert_eq!(parse_mainarg("-5").unwrap(), -5i32 as u32);
        assert_eq!(parse_mainarg("4294967295").unwrap(), u32::MAX);
        assert_eq!(parse_mainarg("-2147483648").unwrap(), 0x8000_0000);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_mainarg("0xff").unwrap(), 0xFF);
        assert_eq!(parse_mainarg("0XDEADBEEF").unwrap(), 0xDEAD_BEEF);
        assert_eq!(parse_mainarg("0x0").unwrap(), 0);
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_mainarg(""), Err(MainArgError::Empty));
        assert_eq!(parse_mainarg("0x"), Err(MainArgError::InvalidHex("0x".into())));
        assert_eq!(
            parse_mainarg("0x123456789"),
            Err(MainArgError::InvalidHex("0x123456789".into()))
        );
        assert_eq!(parse_mainarg("0xzz"), Err(MainArgError::InvalidHex("0xzz".into())));
        assert_eq!(parse_mainarg("12a"), Err(MainArgError::InvalidDecimal("12a".into())));
        assert_eq!(parse_mainarg("-"), Err(MainArgError::InvalidDecimal("-".into())));
        assert_eq!(parse_mainarg("+1"), Err(MainArgError::InvalidDecimal("+1".into())));
        assert_eq!(
            parse_mainarg("4294967296"),
            Err(MainArgError::OutOfRange("4294967296".into()))
        );
        assert_eq!(
            parse_mainarg("-2147483649"),
            Err(MainArgError::OutOfRange("-2147483649".into()))
        );
    }

    #[test]
    fn test_parse_mainargs_drops_excess() {
        let args = parse_mainargs(&["1", "2", "3", "4", "not-a-number"]).unwrap();
        assert_eq!(args, vec![1, 2, 3, 4]);

        assert!(parse_mainargs(&["1", "x"]).is_err());
        assert!(parse_mainargs::<&str>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_marshal_layout() {
        let mut m = Machine::new(MemoryLayout::new(0x1000, 0x400));
        let sp = marshal(&mut m, &[7, 0xFFFF_FFFF, 0x1234]).unwrap();

        assert_eq!(sp, 0x1400 - 12);
        assert_eq!(m.reg(REG_SP), sp);
        assert_eq!(m.reg(REG_A0), 3);
        assert_eq!(m.reg(REG_A1), sp);
        assert_eq!(m.load32(sp).unwrap(), 7);
        assert_eq!(m.load32(sp + 4).unwrap(), 0xFFFF_FFFF);
        assert_eq!(m.load32(sp + 8).unwrap(), 0x1234);
        assert_eq!(m.load8(sp + 8).unwrap(), 0x34);
    }

    #[test]
    fn test_marshal_no_args() {
        let mut m = Machine::new(MemoryLayout::new(0, 0x100));
        let sp = marshal(&mut m, &[]).unwrap();
        assert_eq!(sp, 0x100);
        assert_eq!(m.reg(REG_A0), 0);
        assert_eq!(m.reg(REG_A1), 0x100);
    }

    #[test]
    fn test_marshal_truncates() {
        let mut m = Machine::new(MemoryLayout::new(0, 0x100));
        let sp = marshal(&mut m, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(sp, 0x100 - 16);
        assert_eq!(m.reg(REG_A0), 4);
        assert_eq!(m.load32(0x100 - 4).unwrap(), 4);
    }

    #[test]
    fn test_marshal_stack_too_small() {
        let mut m = Machine::new(MemoryLayout::new(0, 8));
        let err = marshal(&mut m, &[1, 2]).unwrap_err();
        assert_eq!(err, MainArgError::StackTooSmall { argc: 2, stack_size: 4 });
        assert_eq!(m.reg(REG_SP), 0);
    }
}
