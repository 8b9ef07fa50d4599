//! 操作码定义
//!
//! 每个操作码对应控制器固件的一条指令。线上传输的是
//! 操作码的 ASCII 十进制表示（见 [`crate::framing`]），
//! 不是原始字节。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ProtocolError;

/// 串口链路操作码
///
/// 与控制器固件约定的固定词汇表：
///
/// | 操作码 | 含义 | 期望应答 |
/// |---|---|---|
/// | 1 | Handshake | 任意非空字符串 |
/// | 2 | TurnLeft | `"2"` |
/// | 3 | TurnRight | `"3"` |
/// | 4 | QueryDistance | 十进制厘米文本 |
/// | 5 | Stop | `"5"` |
/// | 6 | Forward | `"6"` |
/// | 7 | Backward | `"7"` |
/// | 8 | Grab | `"8"` |
/// | 9 | Release | `"9"` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Handshake = 1,
    TurnLeft = 2,
    TurnRight = 3,
    QueryDistance = 4,
    Stop = 5,
    Forward = 6,
    Backward = 7,
    Grab = 8,
    Release = 9,
}

impl Opcode {
    /// 从原始字节解析操作码
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        Self::try_from(byte).map_err(|_| ProtocolError::UnknownOpcode(byte))
    }

    /// 操作码的原始字节值
    pub fn as_byte(self) -> u8 {
        self.into()
    }
}
