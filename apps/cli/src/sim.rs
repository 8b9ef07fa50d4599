//! 仿真后端
//!
//! 无硬件/无模型时的整机演练：串口由一个会"逼近"的仿真
//! 控制器扮演，视觉由延迟出现的目标检测扮演。仿真控制器对
//! 运动命令回显操作码，对距离查询返回逐次递减的读数，完整
//! 走通 搜索 -> 逼近 -> 抓取 的任务闭环。

use std::time::Duration;

use scout_control::{
    Camera, Category, ClassificationResult, ClassifierFeed, ControlError, Frame, ResultMailbox,
};
use scout_link::{LinkError, SerialAdapter};
use scout_protocol::Opcode;
use tracing::info;

/// 仿真串口控制器
///
/// 每次距离查询读数递减，模拟小车向目标逼近。
pub struct SimSerialAdapter {
    /// 最近一次请求的操作码（用于生成应答）
    pending: Option<Opcode>,
    distance_cm: f64,
    step_cm: f64,
}

impl SimSerialAdapter {
    pub fn new(initial_distance_cm: f64, step_cm: f64) -> Self {
        Self {
            pending: None,
            distance_cm: initial_distance_cm,
            step_cm,
        }
    }
}

impl Default for SimSerialAdapter {
    fn default() -> Self {
        Self::new(120.0, 6.0)
    }
}

impl SerialAdapter for SimSerialAdapter {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), LinkError> {
        let text = std::str::from_utf8(buf)
            .map_err(|e| LinkError::Device(format!("non UTF-8 request: {}", e)))?;
        let byte: u8 = text
            .trim_end_matches('\n')
            .parse()
            .map_err(|e| LinkError::Device(format!("bad request frame: {}", e)))?;
        self.pending =
            Some(Opcode::from_byte(byte).map_err(|e| LinkError::Device(format!("{}", e)))?);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>, LinkError> {
        let Some(opcode) = self.pending.take() else {
            return Err(LinkError::Timeout);
        };

        let payload = match opcode {
            Opcode::Handshake => "READY".to_string(),
            Opcode::QueryDistance => {
                let reading = self.distance_cm;
                self.distance_cm = (self.distance_cm - self.step_cm).max(5.0);
                format!("{:.1}", reading)
            }
            // 运动/夹爪命令：回显操作码
            other => other.as_byte().to_string(),
        };

        let mut raw = payload.into_bytes();
        raw.extend_from_slice(b"\r\n");
        Ok(raw)
    }
}

/// 仿真相机：按名义帧率供给空白帧
pub struct SimCamera {
    seq: u64,
    frame_interval: Duration,
    released: bool,
}

impl SimCamera {
    pub fn new(fps: u32) -> Self {
        Self {
            seq: 0,
            frame_interval: Duration::from_secs(1) / fps.max(1),
            released: false,
        }
    }
}

impl Camera for SimCamera {
    fn read(&mut self) -> Result<Frame, ControlError> {
        if self.released {
            return Err(ControlError::Camera("camera already released".to_string()));
        }
        // 模拟取帧阻塞，给控制循环一个真实的节奏
        std::thread::sleep(self.frame_interval);

        self.seq += 1;
        Ok(Frame {
            seq: self.seq,
            timestamp_ms: self.seq * self.frame_interval.as_millis() as u64,
            data: Vec::new(),
        })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            info!("simulated camera released");
        }
    }
}

/// 仿真分类器：预热期之后每帧"看到"目标
pub struct SimClassifier {
    mailbox: ResultMailbox,
    target_label: String,
    warmup_frames: u64,
    submitted: u64,
    closed: bool,
}

impl SimClassifier {
    pub fn new(mailbox: ResultMailbox, target_label: String, warmup_frames: u64) -> Self {
        Self {
            mailbox,
            target_label,
            warmup_frames,
            submitted: 0,
            closed: false,
        }
    }
}

impl ClassifierFeed for SimClassifier {
    fn submit(&mut self, frame: &Frame) -> Result<(), ControlError> {
        self.submitted += 1;
        if self.submitted > self.warmup_frames {
            self.mailbox.publish(ClassificationResult {
                categories: vec![Category {
                    name: self.target_label.clone(),
                    score: 0.92,
                }],
                timestamp_ms: frame.timestamp_ms,
            });
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!("simulated classifier closed");
        }
    }
}
