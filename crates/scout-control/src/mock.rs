//! 脚本化相机与分类器（无硬件、无模型依赖）
//!
//! 与链路层的 mock 同一套路：内部状态在 `Arc<Mutex<..>>` 里，
//! 克隆句柄共享状态，测试可以在循环运行后检查资源是否释放。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ControlError;
use crate::vision::{Camera, ClassificationResult, ClassifierFeed, Frame, ResultMailbox};

// ==================== Mock 相机 ====================

struct CameraInner {
    /// 剩余可供给的帧数；`None` 表示无限
    remaining: Option<u64>,
    seq: u64,
    released: bool,
    /// 到第 N 次 `read`（从 1 计）时注入失败
    fail_at: Option<u64>,
}

/// 按需生成空白帧的 mock 相机
#[derive(Clone)]
pub struct MockCamera {
    inner: Arc<Mutex<CameraInner>>,
}

impl MockCamera {
    /// 无限供帧
    pub fn new() -> Self {
        Self::with_frames(None)
    }

    /// 供给固定帧数，之后 `read` 失败
    pub fn with_frames(remaining: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CameraInner {
                remaining,
                seq: 0,
                released: false,
                fail_at: None,
            })),
        }
    }

    /// 让第 `n` 次 `read`（从 1 计）失败
    pub fn fail_at(self, n: u64) -> Self {
        self.lock().fail_at = Some(n);
        self
    }

    /// 相机是否已释放
    pub fn released(&self) -> bool {
        self.lock().released
    }

    /// 已供给的帧数
    pub fn frames_read(&self) -> u64 {
        self.lock().seq
    }

    fn lock(&self) -> MutexGuard<'_, CameraInner> {
        self.inner.lock().expect("mock camera lock poisoned")
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for MockCamera {
    fn read(&mut self) -> Result<Frame, ControlError> {
        let mut inner = self.lock();
        let next = inner.seq + 1;

        if let Some(n) = inner.fail_at
            && next >= n
        {
            return Err(ControlError::Camera("injected read failure".to_string()));
        }
        if let Some(remaining) = inner.remaining {
            if remaining == 0 {
                return Err(ControlError::Camera("frame source exhausted".to_string()));
            }
            inner.remaining = Some(remaining - 1);
        }

        inner.seq = next;
        Ok(Frame {
            seq: next,
            // 33ms/帧 的名义节奏
            timestamp_ms: next * 33,
            data: Vec::new(),
        })
    }

    fn release(&mut self) {
        self.lock().released = true;
    }
}

// ==================== 脚本化分类器 ====================

struct FeedInner {
    /// 每次 `submit` 消费一项脚本
    script: VecDeque<ScriptedStep>,
    closed: bool,
    submissions: u64,
}

enum ScriptedStep {
    /// 同步投递一个结果到信箱
    Publish(ClassificationResult),
    /// 本帧不产生结果（推理尚未返回）
    Silent,
    /// 提交失败
    Fail(String),
}

/// 脚本化分类器输入端
///
/// 真实分类器经由回调异步投递；这里为了测试的确定性，
/// 在 `submit` 内同步投递脚本结果。脚本耗尽后保持沉默。
#[derive(Clone)]
pub struct ScriptedClassifierFeed {
    mailbox: ResultMailbox,
    inner: Arc<Mutex<FeedInner>>,
}

impl ScriptedClassifierFeed {
    pub fn new(mailbox: ResultMailbox) -> Self {
        Self {
            mailbox,
            inner: Arc::new(Mutex::new(FeedInner {
                script: VecDeque::new(),
                closed: false,
                submissions: 0,
            })),
        }
    }

    /// 下一次提交投递该结果
    pub fn push_result(&self, result: ClassificationResult) {
        self.lock().script.push_back(ScriptedStep::Publish(result));
    }

    /// 下一次提交不产生结果
    pub fn push_silence(&self) {
        self.lock().script.push_back(ScriptedStep::Silent);
    }

    /// 下一次提交失败
    pub fn push_error(&self, message: &str) {
        self.lock()
            .script
            .push_back(ScriptedStep::Fail(message.to_string()));
    }

    /// 输入端是否已关闭
    pub fn closed(&self) -> bool {
        self.lock().closed
    }

    /// 已提交的帧数
    pub fn submissions(&self) -> u64 {
        self.lock().submissions
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().expect("mock feed lock poisoned")
    }
}

impl ClassifierFeed for ScriptedClassifierFeed {
    fn submit(&mut self, _frame: &Frame) -> Result<(), ControlError> {
        let step = {
            let mut inner = self.lock();
            inner.submissions += 1;
            inner.script.pop_front()
        };

        match step {
            Some(ScriptedStep::Publish(result)) => {
                self.mailbox.publish(result);
                Ok(())
            }
            Some(ScriptedStep::Silent) | None => Ok(()),
            Some(ScriptedStep::Fail(message)) => Err(ControlError::Classifier(message)),
        }
    }

    fn close(&mut self) {
        self.lock().closed = true;
    }
}
