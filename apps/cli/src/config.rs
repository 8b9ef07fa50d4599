//! 运行配置
//!
//! 所有参数都有默认值；可选的 TOML 配置文件先加载，命令行
//! 标志再覆盖文件值。配置只是简单的取值参数，不参与核心逻辑。

use std::path::Path;

use anyhow::{Context, Result};
use scout_control::DecisionConfig;
use serde::{Deserialize, Serialize};

/// 顶层运行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// 串口设备路径
    pub port: String,
    /// 波特率
    pub baud: u32,
    pub vision: VisionConfig,
    pub mission: MissionConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        ScoutConfig {
            port: scout_link::DEFAULT_PORT.to_string(),
            baud: scout_link::DEFAULT_BAUD_RATE,
            vision: VisionConfig::default(),
            mission: MissionConfig::default(),
        }
    }
}

/// 视觉协作方参数（透传给分类器/相机后端）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// 分类模型路径
    pub model: String,
    /// 分类结果数量上限
    pub max_results: usize,
    /// 分类器层面的置信度过滤阈值
    pub score_threshold: f64,
    /// 相机编号
    pub camera_id: u32,
    /// 采集帧宽
    pub frame_width: u32,
    /// 采集帧高
    pub frame_height: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        VisionConfig {
            model: "model.tflite".to_string(),
            max_results: 1,
            score_threshold: 0.0,
            camera_id: 0,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

/// 任务决策参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// 目标类别标签
    pub target_label: String,
    /// 触发逼近/抓取的目标置信度阈值
    pub target_score: f64,
    /// 触发抓取的距离阈值（厘米）
    pub grab_distance_cm: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        let defaults = DecisionConfig::default();
        MissionConfig {
            target_label: defaults.target_label,
            target_score: defaults.score_threshold,
            grab_distance_cm: defaults.grab_distance_cm,
        }
    }
}

impl ScoutConfig {
    /// 从 TOML 文件加载；缺省字段回落到默认值
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// 决策引擎配置
    pub fn decision_config(&self) -> DecisionConfig {
        DecisionConfig {
            target_label: self.mission.target_label.clone(),
            score_threshold: self.mission.target_score,
            grab_distance_cm: self.mission.grab_distance_cm,
        }
    }
}
