//! # Scout Control
//!
//! 取物小车的实时决策层：每个控制节拍把三路独立节奏的输入
//! ——异步分类结果、限速的距离采样、执行器应答——融合成
//! 单线程的一次控制决策，并通过串口链路下发。
//!
//! ## 模块
//!
//! - `vision`: 相机/分类器协作方边界与最新结果信箱
//! - `sampler`: 限速距离采样与无效值归一化
//! - `decision`: 任务状态机与逐节拍决策
//! - `stats`: 节拍/FPS 统计
//! - `driver`: 控制循环驱动器（严格节拍顺序 + 退出清理）
//! - `mock`: 脚本化相机与分类器（测试/仿真用）
//!
//! ## 数据流
//!
//! ```text
//! 相机帧 -> ClassifierFeed（异步） -> ResultMailbox（最新者胜）
//! Link -> DistanceSampler -> 驱动器保留的最新距离
//! 两者每节拍被 DecisionEngine 同步读取一次，产出链路命令
//! ```

pub mod decision;
pub mod driver;
pub mod mock;
pub mod sampler;
pub mod stats;
pub mod vision;

pub use decision::{CommandBuffer, Decision, DecisionConfig, DecisionEngine, MissionState};
pub use driver::{ControlLoop, ControlLoopBuilder, LoopConfig, MissionReport};
pub use sampler::{DistanceSample, DistanceSampler, SamplerConfig};
pub use stats::TickStats;
pub use vision::{Camera, Category, ClassificationResult, ClassifierFeed, Frame, ResultMailbox};

use scout_link::LinkError;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 相机取帧失败（对控制循环是致命的）
    #[error("Camera error: {0}")]
    Camera(String),

    /// 分类器提交失败
    #[error("Classifier error: {0}")]
    Classifier(String),
}
