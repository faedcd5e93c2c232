pub mod rv32i;

/// 一条指令执行后对架构状态的影响
///
/// 写回与跳转都显式用 `Option` 表示：`write_back` 为 `None` 表示不写回
/// （branch/store），而不是用 rd = 0 充当哨兵。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effect {
    /// (rd, value)
    pub write_back: Option<(u8, u32)>,
    /// 跳转目标；`None` 时顺序执行 pc + 4
    pub next_pc: Option<u32>,
}

impl Effect {
    fn write(rd: u8, value: u32) -> Self {
        Effect {
            write_back: Some((rd, value)),
            next_pc: None,
        }
    }

    fn jump(target: u32) -> Self {
        Effect {
            write_back: None,
            next_pc: Some(target),
        }
    }

    fn link_and_jump(rd: u8, link: u32, target: u32) -> Self {
        Effect {
            write_back: Some((rd, link)),
            next_pc: Some(target),
        }
    }
}
