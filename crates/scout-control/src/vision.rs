//! 视觉协作方边界
//!
//! 相机与分类器是外部协作方：核心不关心模型与取帧的实现，
//! 只约定两个 trait 与一个"最新结果信箱"。分类是逐帧
//! fire-and-forget 提交的，结果经信箱送回；信箱是单槽的，
//! 新结果到达即覆盖旧结果——不排队、无背压、最新者胜。

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::ControlError;

/// 一帧相机图像（对核心不透明）
#[derive(Debug, Clone)]
pub struct Frame {
    /// 帧序号（自进程启动单调递增）
    pub seq: u64,
    /// 采集时间戳（毫秒）
    pub timestamp_ms: u64,
    /// 像素数据（mock 实现可为空）
    pub data: Vec<u8>,
}

/// 单个分类类别
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    /// 置信度，[0, 1]
    pub score: f64,
}

/// 一次分类的完整结果
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// 分类器给出的类别列表
    pub categories: Vec<Category>,
    /// 对应帧的时间戳（毫秒）
    pub timestamp_ms: u64,
}

impl ClassificationResult {
    /// 单个最高分类别
    ///
    /// 决策只看最高分类别，低位类别从不参与；同分取先出现者。
    pub fn top(&self) -> Option<&Category> {
        self.categories
            .iter()
            .fold(None, |best: Option<&Category>, cat| match best {
                Some(b) if b.score >= cat.score => Some(b),
                _ => Some(cat),
            })
    }
}

/// 相机源
///
/// 取帧失败对控制循环是致命的；`release` 幂等，退出清理时
/// 无条件调用。
pub trait Camera {
    fn read(&mut self) -> Result<Frame, ControlError>;
    fn release(&mut self);
}

/// 异步分类器输入端
///
/// `submit` 必须立即返回，不得阻塞当前节拍；结果由分类器
/// 后端写入构造时拿到的 [`ResultMailbox`]。`close` 幂等。
pub trait ClassifierFeed {
    fn submit(&mut self, frame: &Frame) -> Result<(), ControlError>;
    fn close(&mut self);
}

/// 最新结果信箱（单槽，最新者胜）
///
/// 分类回调与控制节拍可以运行在不同线程上：写入方
/// 无条件覆盖，读取方无锁加载最近一次写入的快照，
/// 读取不消费——同一结果可以被连续多个节拍读到（过期
/// 是被接受的，不是错误）。
#[derive(Clone, Default)]
pub struct ResultMailbox {
    slot: Arc<ArcSwapOption<ClassificationResult>>,
}

impl ResultMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖写入最新结果，旧结果即刻被丢弃
    pub fn publish(&self, result: ClassificationResult) {
        self.slot.store(Some(Arc::new(result)));
    }

    /// 无锁读取最新结果快照（非消费）
    pub fn latest(&self) -> Option<Arc<ClassificationResult>> {
        self.slot.load_full()
    }

    /// 清空信箱
    pub fn clear(&self) {
        self.slot.store(None);
    }
}
