//! # Scout Protocol
//!
//! 小车串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `opcode`: 操作码常量定义
//! - `command`: 执行器命令集（命令 -> 操作码 -> 期望应答）
//! - `framing`: 请求/应答帧的编码与解码
//!
//! ## 帧格式
//!
//! 请求帧：操作码的 ASCII 十进制表示 + 单个 `\n` 终止符。
//! 应答帧：任意载荷 + `\r\n` 终止符，解码时剥除末尾两个字节。
//! 终止符缺失或载荷不是 UTF-8 均视为帧错误，不做静默猜测。

pub mod command;
pub mod framing;
pub mod opcode;

// 重新导出常用类型
pub use command::Command;
pub use framing::{decode_ack, encode_request};
pub use opcode::Opcode;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 应答帧格式错误（缺少 `\r\n` 终止符、长度不足或非 UTF-8 载荷）
    #[error("Framing error: {0}")]
    Framing(String),

    /// 未知操作码
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),
}
