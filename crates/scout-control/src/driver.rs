//! 控制循环驱动器
//!
//! 每个节拍按严格顺序执行：取时间戳 -> 条件距离采样 -> 取帧 ->
//! 异步提交分类 -> 读取最新结果 -> 决策 -> 下发命令，直到任务
//! 终止或外部停止信号。循环自身没有内部并行：这是一个同步的
//! poll-decide-act 周期，节奏由取帧延迟与分类回调延迟决定。
//!
//! # 退出保证
//!
//! 任何退出路径——正常终止、外部中止、未处理错误，乃至 panic
//! 展开——都会下发一条兜底 `Stop` 并释放相机与分类器资源，
//! 部分失败不会让执行器停留在运动状态。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use scout_link::{Link, SerialAdapter};
use scout_protocol::Command;
use tracing::{debug, info, warn};

use crate::ControlError;
use crate::decision::{DecisionConfig, DecisionEngine, MissionState};
use crate::sampler::{DistanceSampler, SamplerConfig};
use crate::stats::{FPS_WINDOW_FRAMES, TickStats};
use crate::vision::{Camera, ClassifierFeed, ResultMailbox};

/// 控制循环配置
#[derive(Debug, Clone, Default)]
pub struct LoopConfig {
    /// 最大节拍数（`None` 表示直到终止条件；测试钩子）
    pub max_ticks: Option<u64>,
}

/// 任务运行结果
#[derive(Debug, Clone)]
pub struct MissionReport {
    /// 实际执行的节拍数
    pub ticks: u64,
    /// 循环退出时的任务阶段
    pub state: MissionState,
}

/// 控制循环驱动器
///
/// 独占持有链路、相机与分类器输入端；距离采样器与决策引擎
/// 通过可变借用共享同一条链路，天然互斥。
pub struct ControlLoop<A: SerialAdapter, C: Camera, F: ClassifierFeed> {
    link: Link<A>,
    camera: C,
    feed: F,
    mailbox: ResultMailbox,
    sampler: DistanceSampler,
    engine: DecisionEngine,
    stats: TickStats,
    config: LoopConfig,
    stop: Arc<AtomicBool>,
    /// 保留的最新有效距离；仅在新采样产生时更新
    last_distance_cm: Option<f64>,
    shut_down: bool,
}

impl<A: SerialAdapter, C: Camera, F: ClassifierFeed> ControlLoop<A, C, F> {
    pub fn builder(
        link: Link<A>,
        camera: C,
        feed: F,
        mailbox: ResultMailbox,
    ) -> ControlLoopBuilder<A, C, F> {
        ControlLoopBuilder {
            link,
            camera,
            feed,
            mailbox,
            sampler_config: SamplerConfig::default(),
            decision_config: DecisionConfig::default(),
            loop_config: LoopConfig::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 运行控制循环直到任务终止、停止信号或致命错误
    ///
    /// 消费 `self`；返回前必然执行退出清理。
    pub fn run(mut self) -> Result<MissionReport, ControlError> {
        let outcome = self.run_inner();
        self.shutdown();
        outcome
    }

    fn run_inner(&mut self) -> Result<MissionReport, ControlError> {
        let mut ticks: u64 = 0;

        loop {
            // 外部停止信号只在节拍之间生效
            if self.stop.load(Ordering::Relaxed) {
                info!("external stop signal received");
                break;
            }
            if let Some(max) = self.config.max_ticks
                && ticks >= max
            {
                debug!(max, "tick budget exhausted");
                break;
            }

            // (a) 节拍时间戳
            let now = Instant::now();

            // (b) 条件距离采样：只有真的发起了采样才更新保留值，
            //     Invalid 会把保留值清为 None
            if let Some(sample) = self.sampler.maybe_sample(now, &mut self.link) {
                self.last_distance_cm = sample.value_cm();
            }

            // (c) 取帧，失败对循环致命
            let frame = self.camera.read()?;

            // (d) fire-and-forget 提交分类，不阻塞本节拍
            self.feed.submit(&frame)?;

            // (e) 读取当前缓冲的分类结果；过期一到多帧或早期
            //     节拍缺失都是被接受的，不是错误
            let result = self.mailbox.latest();

            // (f) 决策
            let decision = self.engine.decide(result.as_deref(), self.last_distance_cm);

            // (g) 按序下发。链路超时/帧错误可恢复：记警告后继续，
            //     下一节拍自然重发，不做内部退避——漏发一条命令
            //     比让异常带着运动中的小车逃逸要安全
            for command in &decision.commands {
                if let Err(e) = self.link.execute(*command) {
                    warn!(command = %command, error = %e, "actuator command failed");
                }
            }

            self.engine.commit(decision.next_state);
            self.stats.on_frame(Instant::now());
            ticks += 1;

            if self.stats.frames().is_multiple_of(u64::from(FPS_WINDOW_FRAMES)) {
                debug!(fps = self.stats.fps(), frames = self.stats.frames(), "tick stats");
            }

            if decision.done {
                info!(ticks, "mission complete");
                break;
            }
        }

        Ok(MissionReport {
            ticks,
            state: self.engine.state(),
        })
    }

    /// 退出清理：兜底停车 + 释放协作方资源（幂等）
    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Err(e) = self.link.execute(Command::Stop) {
            warn!(error = %e, "final stop command failed");
        }
        self.feed.close();
        self.camera.release();
        debug!("control loop resources released");
    }
}

impl<A: SerialAdapter, C: Camera, F: ClassifierFeed> Drop for ControlLoop<A, C, F> {
    fn drop(&mut self) {
        // panic 展开时兜底；正常路径已在 run() 里清理过
        self.shutdown();
    }
}

/// 控制循环构造器
pub struct ControlLoopBuilder<A: SerialAdapter, C: Camera, F: ClassifierFeed> {
    link: Link<A>,
    camera: C,
    feed: F,
    mailbox: ResultMailbox,
    sampler_config: SamplerConfig,
    decision_config: DecisionConfig,
    loop_config: LoopConfig,
    stop: Arc<AtomicBool>,
}

impl<A: SerialAdapter, C: Camera, F: ClassifierFeed> ControlLoopBuilder<A, C, F> {
    pub fn sampler_config(mut self, config: SamplerConfig) -> Self {
        self.sampler_config = config;
        self
    }

    pub fn decision_config(mut self, config: DecisionConfig) -> Self {
        self.decision_config = config;
        self
    }

    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// 外部停止标志（ctrlc 处理器或测试置位）
    pub fn stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn build(self) -> ControlLoop<A, C, F> {
        ControlLoop {
            link: self.link,
            camera: self.camera,
            feed: self.feed,
            mailbox: self.mailbox,
            sampler: DistanceSampler::new(self.sampler_config),
            engine: DecisionEngine::new(self.decision_config),
            stats: TickStats::new(Instant::now()),
            config: self.loop_config,
            stop: self.stop,
            last_distance_cm: None,
            shut_down: false,
        }
    }
}
