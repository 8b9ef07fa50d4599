//! 真实串口后端（`serialport` crate）
//!
//! 控制器固件的应答以 `\n` 结束一行，这里逐字节读取直到
//! 终止符出现。底层超时是按单次 `read` 计的，所以行累积循环
//! 自带整体截止时间与长度上限：字节流里迟迟不出现 `\n` 时，
//! 节拍不会被无限拖住，缓冲也不会无限增长。波特率与设备路径
//! 可配置，默认值与控制器固件约定一致。

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use scout_protocol::ProtocolError;
use tracing::debug;

use crate::{LinkError, SerialAdapter};

/// 默认串口设备
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 默认读超时
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// 一行应答的长度上限（应答都是短文本）
const MAX_ACK_LEN: usize = 64;

/// `serialport` 后端适配器
pub struct SerialPortAdapter {
    port: Box<dyn serialport::SerialPort>,
    read_timeout: Duration,
}

impl SerialPortAdapter {
    /// 打开串口设备
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .timeout(DEFAULT_READ_TIMEOUT)
            .open()
            .map_err(|e| LinkError::Device(format!("failed to open {}: {}", path, e)))?;

        debug!(path, baud_rate, "serial port opened");
        Ok(Self {
            port,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }
}

/// 从字节流累积一行，直到 `\n`、长度上限或整体截止时间
fn read_line_from<R: Read>(reader: &mut R, deadline: Instant) -> Result<Vec<u8>, LinkError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => {
                // 设备在行中途关闭，按帧超时处理
                return Err(LinkError::Timeout);
            }
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Ok(line);
                }
                if line.len() >= MAX_ACK_LEN {
                    return Err(LinkError::Framing(ProtocolError::Framing(format!(
                        "ack exceeds {} bytes without terminator",
                        MAX_ACK_LEN
                    ))));
                }
                if Instant::now() >= deadline {
                    return Err(LinkError::Timeout);
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => return Err(LinkError::Timeout),
            Err(e) => return Err(LinkError::Io(e)),
        }
    }
}

impl SerialAdapter for SerialPortAdapter {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, LinkError> {
        read_line_from(&mut self.port, Instant::now() + self.read_timeout)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| LinkError::Device(format!("failed to set read timeout: {}", e)))?;
        self.read_timeout = timeout;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 永远吐同一个字节、从不给出 `\n` 的流
    struct EndlessByteStream(u8);

    impl Read for EndlessByteStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            buf[0] = self.0;
            Ok(1)
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn test_read_line_stops_at_terminator() {
        let mut stream = std::io::Cursor::new(b"12.5\r\nextra".to_vec());
        let line = read_line_from(&mut stream, far_deadline()).unwrap();
        assert_eq!(line, b"12.5\r\n".to_vec());
        // 终止符之后的字节留在流里
        assert_eq!(stream.position(), 6);
    }

    #[test]
    fn test_read_line_mid_line_eof_is_timeout() {
        let mut stream = std::io::Cursor::new(b"12.".to_vec());
        assert!(matches!(
            read_line_from(&mut stream, far_deadline()),
            Err(LinkError::Timeout)
        ));
    }

    #[test]
    fn test_read_line_caps_runaway_line() {
        // 字节流里永远不出现 '\n'：长度上限兜底，缓冲不无限增长
        let mut stream = EndlessByteStream(b'x');
        assert!(matches!(
            read_line_from(&mut stream, far_deadline()),
            Err(LinkError::Framing(_))
        ));
    }

    #[test]
    fn test_read_line_enforces_overall_deadline() {
        // 每个字节都按时到达，但整体截止时间已过：按超时处理
        let mut stream = EndlessByteStream(b'x');
        assert!(matches!(
            read_line_from(&mut stream, Instant::now()),
            Err(LinkError::Timeout)
        ));
    }
}
