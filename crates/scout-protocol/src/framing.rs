//! 请求/应答帧的编码与解码
//!
//! 控制器固件以 `\n` 判断请求是否接收完整，应答统一以 `\r\n`
//! 结尾。解码时精确剥除末尾两个字节；应答不足两个字节、缺少
//! 终止符或载荷非 UTF-8 都是帧错误。

use crate::{Opcode, ProtocolError};

/// 应答终止符
pub const ACK_TERMINATOR: &[u8] = b"\r\n";

/// 编码一帧请求
///
/// 传输操作码的 ASCII 十进制表示，后接单个 `\n` 终止符。
///
/// # 示例
///
/// ```rust
/// use scout_protocol::{encode_request, Opcode};
///
/// assert_eq!(encode_request(Opcode::QueryDistance), b"4\n");
/// assert_eq!(encode_request(Opcode::Stop), b"5\n");
/// ```
pub fn encode_request(opcode: Opcode) -> Vec<u8> {
    let mut buf = opcode.as_byte().to_string().into_bytes();
    buf.push(b'\n');
    buf
}

/// 解码一帧应答
///
/// 校验 `\r\n` 终止符并精确剥除末尾两个字节，载荷按 UTF-8 解码。
///
/// # 错误
///
/// - 应答不足两个字节 -> [`ProtocolError::Framing`]
/// - 末尾不是 `\r\n` -> [`ProtocolError::Framing`]
/// - 载荷非 UTF-8 -> [`ProtocolError::Framing`]
pub fn decode_ack(raw: &[u8]) -> Result<String, ProtocolError> {
    if raw.len() < ACK_TERMINATOR.len() {
        return Err(ProtocolError::Framing(format!(
            "ack too short: {} byte(s)",
            raw.len()
        )));
    }

    let (payload, terminator) = raw.split_at(raw.len() - ACK_TERMINATOR.len());
    if terminator != ACK_TERMINATOR {
        return Err(ProtocolError::Framing(format!(
            "ack not terminated by CRLF: {:02X?}",
            terminator
        )));
    }

    String::from_utf8(payload.to_vec())
        .map_err(|e| ProtocolError::Framing(format!("ack payload is not UTF-8: {}", e)))
}
