//! # Scout Link Layer
//!
//! 串口硬件抽象层与帧化请求/应答链路。
//!
//! 所有执行器命令（运动、夹爪、距离查询、握手）都通过同一条
//! 独占串口链路收发，链路同一时刻最多只有一笔未完成事务。
//! 事务没有取消机制：要么在超时内完成，要么失败。

use std::time::Duration;

use scout_protocol::{Command, ProtocolError};
use thiserror::Error;

mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "serial")]
mod serial;

pub use link::{HANDSHAKE_RETRY_DELAY, Link};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSerialAdapter;
#[cfg(feature = "serial")]
pub use serial::{DEFAULT_BAUD_RATE, DEFAULT_PORT, SerialPortAdapter};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 超时窗口内没有读到任何数据
    #[error("Read timeout")]
    Timeout,

    /// 应答帧格式错误
    #[error("Framing error: {0}")]
    Framing(#[from] ProtocolError),

    /// 控制器回显与命令不符
    #[error("Unexpected ack for {command}: {ack:?}")]
    UnexpectedAck { command: Command, ack: String },

    /// 外部停止信号中止了阻塞操作（目前只有握手）
    #[error("Interrupted by stop signal")]
    Interrupted,

    /// 串口设备错误（打开失败、配置失败）
    #[error("Device error: {0}")]
    Device(String),
}

/// 串口适配器统一抽象
///
/// `Link` 只依赖该 trait，后端可以是真实串口
/// （[`SerialPortAdapter`]）或脚本化的 mock（[`MockSerialAdapter`]）。
pub trait SerialAdapter {
    /// 写出完整请求帧
    fn write_all(&mut self, buf: &[u8]) -> Result<(), LinkError>;

    /// 读取一行（含 `\n` 终止符在内的原始字节）
    ///
    /// 超时窗口内没有任何数据返回 [`LinkError::Timeout`]。
    fn read_line(&mut self) -> Result<Vec<u8>, LinkError>;

    /// 设置读超时
    fn set_read_timeout(&mut self, _timeout: Duration) -> Result<(), LinkError> {
        Ok(())
    }
}
