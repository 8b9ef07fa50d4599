//! 距离采样
//!
//! 距离查询与运动命令共用同一条阻塞式串口链路，逐帧查询会
//! 饿死运动命令，所以采样被限速：一个采样周期内最多发起一次
//! `QueryDistance` 事务。
//!
//! 传感器固件用 0 和 999 之类的哨兵值表示"无回波"/错误，
//! 这些值在这里归一化为一等公民 [`DistanceSample::Invalid`]，
//! 从不与 0 或其它数值常量混同。

use std::time::{Duration, Instant};

use scout_link::{Link, SerialAdapter};
use scout_protocol::Command;
use tracing::{debug, warn};

/// 有效距离的开区间下界（厘米）
const MIN_VALID_CM: f64 = 0.0;

/// 有效距离的开区间上界（厘米）
const MAX_VALID_CM: f64 = 900.0;

/// 一次距离采样
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceSample {
    /// 有效读数，厘米，落在 (0, 900) 开区间内
    Valid(f64),
    /// 无回波、传感器错误或不可信的量值
    Invalid,
}

impl DistanceSample {
    /// 从应答文本归一化
    ///
    /// 解析失败、非有限值、`<= 0` 或 `>= 900` 都归一化为
    /// `Invalid`；(0, 900) 内的值原样通过。
    pub fn from_ack(ack: &str) -> Self {
        match ack.trim().parse::<f64>() {
            Ok(d) if d.is_finite() && d > MIN_VALID_CM && d < MAX_VALID_CM => {
                DistanceSample::Valid(d)
            }
            _ => DistanceSample::Invalid,
        }
    }

    /// 有效读数的厘米值
    pub fn value_cm(&self) -> Option<f64> {
        match self {
            DistanceSample::Valid(d) => Some(*d),
            DistanceSample::Invalid => None,
        }
    }
}

/// 采样器配置
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// 两次采样之间的最小间隔
    pub period: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            period: Duration::from_millis(150),
        }
    }
}

/// 限速距离采样器
///
/// 不持有链路，由调用方按节拍注入，保证与决策命令互斥地
/// 使用同一条链路。
pub struct DistanceSampler {
    config: SamplerConfig,
    last_sample: Option<Instant>,
}

impl DistanceSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            last_sample: None,
        }
    }

    /// 每节拍调用一次，必要时发起一笔距离查询事务
    ///
    /// - 距上次采样不足一个周期：返回 `None`，不碰链路，
    ///   调用方继续沿用上一个保留值；
    /// - 到期：无论事务结果如何都先记录本次采样时间，再发起
    ///   查询。链路失败是可恢复的（记一条 warn），与解析失败
    ///   一样归一化为 `Some(Invalid)`。
    pub fn maybe_sample<A: SerialAdapter>(
        &mut self,
        now: Instant,
        link: &mut Link<A>,
    ) -> Option<DistanceSample> {
        if let Some(last) = self.last_sample
            && now.duration_since(last) < self.config.period
        {
            return None;
        }

        self.last_sample = Some(now);

        let sample = match link.execute(Command::QueryDistance) {
            Ok(ack) => DistanceSample::from_ack(&ack),
            Err(e) => {
                warn!(error = %e, "distance query failed");
                DistanceSample::Invalid
            }
        };

        debug!(?sample, "distance sampled");
        Some(sample)
    }

    /// 上次采样时刻（未采样过为 `None`）
    pub fn last_sample(&self) -> Option<Instant> {
        self.last_sample
    }
}
