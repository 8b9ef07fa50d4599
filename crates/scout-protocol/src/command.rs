//! 执行器命令集
//!
//! 命令是无状态的，与操作码一一对应。运动/夹爪命令的应答是
//! 操作码本身的回显；`QueryDistance` 与 `Handshake` 的应答是
//! 自由格式文本，由调用方解释。

use crate::Opcode;

/// 执行器命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Forward,
    Backward,
    Stop,
    TurnLeft,
    TurnRight,
    Grab,
    Release,
    QueryDistance,
    Handshake,
}

impl Command {
    /// 命令对应的线上操作码
    pub fn opcode(self) -> Opcode {
        match self {
            Command::Forward => Opcode::Forward,
            Command::Backward => Opcode::Backward,
            Command::Stop => Opcode::Stop,
            Command::TurnLeft => Opcode::TurnLeft,
            Command::TurnRight => Opcode::TurnRight,
            Command::Grab => Opcode::Grab,
            Command::Release => Opcode::Release,
            Command::QueryDistance => Opcode::QueryDistance,
            Command::Handshake => Opcode::Handshake,
        }
    }

    /// 控制器固件对该命令的固定回显
    ///
    /// 返回 `None` 表示应答为自由格式（距离读数、握手确认），
    /// 不做回显校验。
    pub fn expected_ack(self) -> Option<&'static str> {
        match self {
            Command::TurnLeft => Some("2"),
            Command::TurnRight => Some("3"),
            Command::Stop => Some("5"),
            Command::Forward => Some("6"),
            Command::Backward => Some("7"),
            Command::Grab => Some("8"),
            Command::Release => Some("9"),
            Command::QueryDistance | Command::Handshake => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Forward => "Forward",
            Command::Backward => "Backward",
            Command::Stop => "Stop",
            Command::TurnLeft => "TurnLeft",
            Command::TurnRight => "TurnRight",
            Command::Grab => "Grab",
            Command::Release => "Release",
            Command::QueryDistance => "QueryDistance",
            Command::Handshake => "Handshake",
        };
        write!(f, "{}", name)
    }
}
