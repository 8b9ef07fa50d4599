//! Mock 串口适配器（无硬件依赖）
//!
//! 内部状态放在 `Arc<Mutex<..>>` 里，克隆出的句柄共享同一份
//! 脚本队列与写出记录：测试可以先克隆一个句柄交给 `Link`，
//! 再通过原句柄注入应答、检查写出的请求帧。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scout_protocol::Opcode;

use crate::{LinkError, SerialAdapter};

/// 脚本化应答
enum ScriptedRead {
    Line(Vec<u8>),
    Timeout,
}

#[derive(Default)]
struct Inner {
    reads: VecDeque<ScriptedRead>,
    written: Vec<Vec<u8>>,
}

/// 脚本化的 mock 串口适配器
#[derive(Clone)]
pub struct MockSerialAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl MockSerialAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock adapter lock poisoned")
    }

    /// 注入一帧应答载荷，自动补上 `\r\n` 终止符
    pub fn push_ack(&self, payload: &str) {
        let mut raw = payload.as_bytes().to_vec();
        raw.extend_from_slice(b"\r\n");
        self.lock().reads.push_back(ScriptedRead::Line(raw));
    }

    /// 注入原始字节（用于构造坏帧）
    pub fn push_raw(&self, raw: Vec<u8>) {
        self.lock().reads.push_back(ScriptedRead::Line(raw));
    }

    /// 注入一次读超时
    pub fn push_timeout(&self) {
        self.lock().reads.push_back(ScriptedRead::Timeout);
    }

    /// 已写出的请求帧
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// 把写出的请求帧解析回操作码序列
    ///
    /// 遇到无法解析的帧直接 panic，只用于测试断言。
    pub fn sent_opcodes(&self) -> Vec<Opcode> {
        self.lock()
            .written
            .iter()
            .map(|frame| {
                let text = std::str::from_utf8(frame)
                    .expect("request frame is not UTF-8")
                    .trim_end_matches('\n');
                let byte: u8 = text.parse().expect("request frame is not a decimal opcode");
                Opcode::from_byte(byte).expect("request frame carries unknown opcode")
            })
            .collect()
    }
}

impl Default for MockSerialAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialAdapter for MockSerialAdapter {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), LinkError> {
        self.lock().written.push(buf.to_vec());
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, LinkError> {
        match self.lock().reads.pop_front() {
            Some(ScriptedRead::Line(raw)) => Ok(raw),
            Some(ScriptedRead::Timeout) | None => Err(LinkError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_scripting_order() {
        let mock = MockSerialAdapter::new();
        mock.push_ack("1");
        mock.push_timeout();

        let mut handle = mock.clone();
        assert_eq!(handle.read_line().unwrap(), b"1\r\n".to_vec());
        assert!(matches!(handle.read_line(), Err(LinkError::Timeout)));
        // 队列耗尽后继续返回超时
        assert!(matches!(handle.read_line(), Err(LinkError::Timeout)));
    }

    #[test]
    fn test_mock_records_writes_across_clones() {
        let mock = MockSerialAdapter::new();
        let mut handle = mock.clone();
        handle.write_all(b"4\n").unwrap();
        handle.write_all(b"5\n").unwrap();

        assert_eq!(mock.written().len(), 2);
        assert_eq!(
            mock.sent_opcodes(),
            vec![Opcode::QueryDistance, Opcode::Stop]
        );
    }
}
