//! # Scout CLI
//!
//! 取物小车的命令行入口：解析参数 -> 打开链路 -> 阻塞握手 ->
//! 运行控制循环。`Ctrl+C` 置位停止标志：握手中即中止退出，
//! 循环中则在节拍间退出并保证兜底停车。
//!
//! ```bash
//! # 真实串口（分类器后端接入前使用内置仿真视觉）
//! scout-cli --port /dev/ttyUSB0 --grab-distance 12
//!
//! # 全仿真演练（无硬件）
//! scout-cli --simulate
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use scout_control::{ControlLoop, MissionReport, ResultMailbox};
use scout_link::{HANDSHAKE_RETRY_DELAY, Link, SerialAdapter, SerialPortAdapter};

mod config;
mod sim;

use config::ScoutConfig;
use sim::{SimCamera, SimClassifier, SimSerialAdapter};

/// Scout CLI - 视觉引导取物小车
#[derive(Parser, Debug)]
#[command(name = "scout-cli")]
#[command(about = "Camera-guided fetch rover runner", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML 配置文件（命令行标志覆盖文件值）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 串口设备路径
    #[arg(long)]
    port: Option<String>,

    /// 波特率
    #[arg(long)]
    baud: Option<u32>,

    /// 分类模型路径
    #[arg(long)]
    model: Option<String>,

    /// 分类结果数量上限
    #[arg(long)]
    max_results: Option<usize>,

    /// 分类器层面的置信度过滤阈值
    #[arg(long)]
    score_threshold: Option<f64>,

    /// 相机编号
    #[arg(long)]
    camera_id: Option<u32>,

    /// 采集帧宽
    #[arg(long)]
    frame_width: Option<u32>,

    /// 采集帧高
    #[arg(long)]
    frame_height: Option<u32>,

    /// 目标类别标签
    #[arg(long)]
    target_label: Option<String>,

    /// 触发逼近/抓取的目标置信度阈值
    #[arg(long)]
    target_score: Option<f64>,

    /// 触发抓取的距离阈值（厘米）
    #[arg(long)]
    grab_distance: Option<f64>,

    /// 全仿真运行（无硬件）
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    /// 文件配置 + 命令行覆盖
    fn resolve_config(&self) -> Result<ScoutConfig> {
        let mut config = match &self.config {
            Some(path) => ScoutConfig::load(path)?,
            None => ScoutConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.baud = baud;
        }
        if let Some(model) = &self.model {
            config.vision.model = model.clone();
        }
        if let Some(max_results) = self.max_results {
            config.vision.max_results = max_results;
        }
        if let Some(score_threshold) = self.score_threshold {
            config.vision.score_threshold = score_threshold;
        }
        if let Some(camera_id) = self.camera_id {
            config.vision.camera_id = camera_id;
        }
        if let Some(frame_width) = self.frame_width {
            config.vision.frame_width = frame_width;
        }
        if let Some(frame_height) = self.frame_height {
            config.vision.frame_height = frame_height;
        }
        if let Some(target_label) = &self.target_label {
            config.mission.target_label = target_label.clone();
        }
        if let Some(target_score) = self.target_score {
            config.mission.target_score = target_score;
        }
        if let Some(grab_distance) = self.grab_distance {
            config.mission.grab_distance_cm = grab_distance;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scout_cli=info".parse()?)
                .add_directive("scout_control=info".parse()?)
                .add_directive("scout_link=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    // Ctrl+C 置位停止标志，循环在节拍间退出
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handle = stop.clone();
    ctrlc::set_handler(move || {
        stop_handle.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl+C handler")?;

    let report = if cli.simulate {
        info!("running in full simulation mode");
        run_mission(SimSerialAdapter::default(), &config, stop)?
    } else {
        let adapter = SerialPortAdapter::open(&config.port, config.baud)?;
        run_mission(adapter, &config, stop)?
    };

    info!(ticks = report.ticks, state = %report.state, "mission finished");
    Ok(())
}

/// 握手并运行控制循环
///
/// 视觉侧当前接的是内置仿真后端；真实分类器通过实现
/// `Camera`/`ClassifierFeed` 两个 trait 接入同一位置。
fn run_mission<A: SerialAdapter>(
    adapter: A,
    config: &ScoutConfig,
    stop: Arc<AtomicBool>,
) -> Result<MissionReport> {
    let mut link = Link::new(adapter);

    // 控制循环启动前的阻塞前置门；Ctrl+C 可中止
    link.handshake(HANDSHAKE_RETRY_DELAY, &stop)
        .context("handshake aborted before controller connected")?;

    info!(
        model = %config.vision.model,
        max_results = config.vision.max_results,
        camera_id = config.vision.camera_id,
        frame_width = config.vision.frame_width,
        frame_height = config.vision.frame_height,
        "vision collaborator options (simulated backend)"
    );

    let mailbox = ResultMailbox::new();
    let camera = SimCamera::new(30);
    let feed = SimClassifier::new(
        mailbox.clone(),
        config.mission.target_label.clone(),
        10, // 预热帧数：模拟目标进入视野前的搜索阶段
    );

    let report = ControlLoop::builder(link, camera, feed, mailbox)
        .decision_config(config.decision_config())
        .stop_flag(stop)
        .build()
        .run()?;

    Ok(report)
}
