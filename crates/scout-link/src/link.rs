//! 帧化请求/应答链路
//!
//! # 事务模型
//!
//! 一笔事务 = 一帧请求 + 一帧应答，在单次调用内创建并销毁。
//! `send` 以 `&mut self` 收发，编译期保证同一链路上最多一笔
//! 未完成事务；链路本身从不自动重试，重试策略属于调用方。

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use scout_protocol::{Command, Opcode, decode_ack, encode_request};
use tracing::{debug, info, trace, warn};

use crate::{LinkError, SerialAdapter};

/// 握手重试间隔（固定）
pub const HANDSHAKE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// 串口请求/应答链路
///
/// 持有物理连接的独占所有权。距离采样器与决策执行共用同一个
/// `Link` 实例，通过可变借用串行化访问，从不经由全局状态。
pub struct Link<A: SerialAdapter> {
    adapter: A,
}

impl<A: SerialAdapter> Link<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// 发送一个操作码并等待应答
    ///
    /// 应答载荷已剥除 `\r\n` 终止符。超时与帧错误原样上抛，
    /// 由调用方决定重试策略。
    pub fn send(&mut self, opcode: Opcode) -> Result<String, LinkError> {
        let request = encode_request(opcode);
        self.adapter.write_all(&request)?;

        let raw = self.adapter.read_line()?;
        let ack = decode_ack(&raw)?;
        trace!(opcode = opcode.as_byte(), %ack, "link transaction complete");
        Ok(ack)
    }

    /// 执行一条执行器命令并校验回显
    ///
    /// 对定义了固定回显的命令（运动/夹爪），应答不符返回
    /// [`LinkError::UnexpectedAck`]；自由格式应答的命令
    /// （距离查询、握手）原样返回载荷。
    pub fn execute(&mut self, command: Command) -> Result<String, LinkError> {
        let ack = self.send(command.opcode())?;

        if let Some(expected) = command.expected_ack()
            && ack != expected
        {
            return Err(LinkError::UnexpectedAck { command, ack });
        }

        Ok(ack)
    }

    /// 阻塞式启动握手
    ///
    /// 反复发送握手操作码，直到收到非空应答为止。这是控制循环
    /// 启动前的前置门，不设超时上限；空应答与链路错误都只触发
    /// 固定间隔的重试。外部停止标志（Ctrl+C）在每次重试前检查，
    /// 置位即中止并返回 [`LinkError::Interrupted`]——控制器失联
    /// 时进程必须还能被正常终止。
    pub fn handshake(&mut self, retry_delay: Duration, stop: &AtomicBool) -> Result<(), LinkError> {
        loop {
            if stop.load(Ordering::Relaxed) {
                info!("handshake aborted by stop signal");
                return Err(LinkError::Interrupted);
            }
            info!("sending handshake signal");
            match self.send(Opcode::Handshake) {
                Ok(ack) if !ack.is_empty() => {
                    info!(%ack, "controller connected");
                    return Ok(());
                }
                Ok(_) => debug!("empty handshake ack, retrying"),
                Err(e) => warn!(error = %e, "handshake attempt failed, retrying"),
            }
            spin_sleep::sleep(retry_delay);
        }
    }

    /// 设置底层读超时
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.adapter.set_read_timeout(timeout)
    }

    /// 访问底层适配器（测试与诊断用）
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// 取回底层适配器
    pub fn into_adapter(self) -> A {
        self.adapter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSerialAdapter;

    #[test]
    fn test_send_round_trip() {
        let adapter = MockSerialAdapter::new();
        adapter.push_ack("5");

        let mut link = Link::new(adapter);
        let ack = link.send(Opcode::Stop).unwrap();
        assert_eq!(ack, "5");

        // 请求帧是 ASCII 十进制 + '\n'
        assert_eq!(link.adapter_mut().written(), vec![b"5\n".to_vec()]);
    }

    #[test]
    fn test_send_timeout() {
        let adapter = MockSerialAdapter::new();
        adapter.push_timeout();

        let mut link = Link::new(adapter);
        assert!(matches!(link.send(Opcode::Forward), Err(LinkError::Timeout)));
    }

    #[test]
    fn test_send_short_ack_is_framing_error_not_crash() {
        let adapter = MockSerialAdapter::new();
        adapter.push_raw(b"\n".to_vec()); // 不足两个字节的终止

        let mut link = Link::new(adapter);
        assert!(matches!(
            link.send(Opcode::Stop),
            Err(LinkError::Framing(_))
        ));
    }

    #[test]
    fn test_execute_verifies_echo() {
        let adapter = MockSerialAdapter::new();
        adapter.push_ack("6");
        adapter.push_ack("5"); // Grab 期望 "8"，返回 "5"

        let mut link = Link::new(adapter);
        assert_eq!(link.execute(Command::Forward).unwrap(), "6");

        let err = link.execute(Command::Grab).unwrap_err();
        assert!(matches!(
            err,
            LinkError::UnexpectedAck {
                command: Command::Grab,
                ..
            }
        ));
    }

    #[test]
    fn test_execute_free_form_ack_passes_through() {
        let adapter = MockSerialAdapter::new();
        adapter.push_ack("42.5");

        let mut link = Link::new(adapter);
        assert_eq!(link.execute(Command::QueryDistance).unwrap(), "42.5");
    }

    #[test]
    fn test_handshake_retries_until_non_empty_ack() {
        let adapter = MockSerialAdapter::new();
        adapter.push_ack(""); // 空应答 -> 重试
        adapter.push_timeout(); // 链路错误 -> 重试
        adapter.push_ack("OK");

        let mut link = Link::new(adapter);
        let stop = AtomicBool::new(false);
        link.handshake(Duration::ZERO, &stop).unwrap();

        // 三次握手请求都发出去了
        assert_eq!(link.adapter_mut().written().len(), 3);
    }

    #[test]
    fn test_handshake_aborts_on_stop_signal() {
        // 控制器永不应答（每次事务都超时）
        let adapter = MockSerialAdapter::new();
        let mut link = Link::new(adapter);

        let stop = AtomicBool::new(true);
        let err = link.handshake(Duration::ZERO, &stop).unwrap_err();

        // 置位的停止标志立即中止握手，一帧都不再发
        assert!(matches!(err, LinkError::Interrupted));
        assert!(link.adapter_mut().written().is_empty());
    }

    #[test]
    fn test_handshake_observes_stop_between_retries() {
        let adapter = MockSerialAdapter::new();
        adapter.push_timeout();
        let mut link = Link::new(adapter);

        // 脚本耗尽后 mock 持续超时，握手只能靠停止标志退出
        let stop = AtomicBool::new(false);
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                stop.store(true, Ordering::Relaxed);
            });
            let err = link.handshake(Duration::from_millis(1), &stop).unwrap_err();
            assert!(matches!(err, LinkError::Interrupted));
        });
    }
}
