//! 任务状态机与逐节拍决策
//!
//! 决策是当前输入的纯函数：除上一节拍留下的任务状态之外没有
//! 隐藏历史。每个控制节拍恰好调用一次 [`DecisionEngine::decide`]，
//! 产出本节拍要下发的命令与节拍末要提交的状态。
//!
//! # 安全不变量
//!
//! 终端命令对 `[Stop, Grab]` 的顺序永不调换：先停车，后抓取。

use scout_protocol::Command;
use smallvec::{SmallVec, smallvec};
use tracing::{debug, info};

use crate::vision::ClassificationResult;

/// 任务阶段
///
/// 状态由决策引擎独占持有，只在节拍边界变迁；到达 `Done` 后
/// 冻结。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionState {
    /// 搜索目标
    Searching,
    /// 看到高置信目标，逼近中
    Approaching,
    /// 终端命令对执行中
    Grabbing,
    /// 任务完成
    Done,
}

impl std::fmt::Display for MissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MissionState::Searching => "Searching",
            MissionState::Approaching => "Approaching",
            MissionState::Grabbing => "Grabbing",
            MissionState::Done => "Done",
        };
        write!(f, "{}", name)
    }
}

/// 决策阈值配置
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// 目标类别标签
    pub target_label: String,
    /// 目标置信度阈值（`>=` 判定，等于阈值算命中）
    pub score_threshold: f64,
    /// 触发抓取的距离阈值，厘米（`<=` 判定，等于阈值算够近）
    pub grab_distance_cm: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            target_label: "Bottle".to_string(),
            score_threshold: 0.6,
            grab_distance_cm: 12.0,
        }
    }
}

/// 每节拍的命令缓冲
///
/// 一个节拍最多两条命令（终端的 `[Stop, Grab]` 对），栈上分配。
pub type CommandBuffer = SmallVec<[Command; 2]>;

/// 一次决策的产出
#[derive(Debug, Clone)]
pub struct Decision {
    /// 本节拍按序下发的命令
    pub commands: CommandBuffer,
    /// 命令执行完毕后由驱动器提交的状态
    pub next_state: MissionState,
    /// 任务终止信号：终端命令对执行后停止请求后续节拍
    pub done: bool,
}

/// 决策引擎
pub struct DecisionEngine {
    config: DecisionConfig,
    state: MissionState,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            state: MissionState::Searching,
        }
    }

    /// 当前任务阶段
    pub fn state(&self) -> MissionState {
        self.state
    }

    /// 把本节拍的最新分类结果与保留距离融合成一次决策
    ///
    /// - 本节拍没有分类结果：`Stop`，状态不变；
    /// - 最高分类别命中目标且置信度达标：
    ///   - 距离有效且够近：`[Stop, Grab]`（顺序即安全不变量），
    ///     引擎进入 `Grabbing`，提交后为 `Done`；
    ///   - 否则 `Forward` 逼近——距离缺失只封锁抓取路径，
    ///     不阻止前进；
    /// - 没有高置信目标：`Stop`，回到 `Searching`。
    pub fn decide(
        &mut self,
        result: Option<&ClassificationResult>,
        distance_cm: Option<f64>,
    ) -> Decision {
        // Done 之后冻结：只会再要求停车
        if self.state == MissionState::Done {
            return Decision {
                commands: smallvec![Command::Stop],
                next_state: MissionState::Done,
                done: true,
            };
        }

        let top = result.and_then(|r| r.top());

        let Some(top) = top else {
            debug!(state = %self.state, "no classification result this tick");
            return Decision {
                commands: smallvec![Command::Stop],
                next_state: self.state,
                done: false,
            };
        };

        debug!(
            label = %top.name,
            score = top.score,
            distance_cm = ?distance_cm,
            state = %self.state,
            "deciding",
        );

        let confident_target =
            top.name == self.config.target_label && top.score >= self.config.score_threshold;

        if !confident_target {
            return Decision {
                commands: smallvec![Command::Stop],
                next_state: MissionState::Searching,
                done: false,
            };
        }

        match distance_cm {
            Some(d) if d <= self.config.grab_distance_cm => {
                info!(
                    distance_cm = d,
                    "target within grab distance, stopping and grabbing"
                );
                // 终端命令对执行期间引擎处于 Grabbing 阶段
                self.state = MissionState::Grabbing;
                Decision {
                    commands: smallvec![Command::Stop, Command::Grab],
                    next_state: MissionState::Done,
                    done: true,
                }
            }
            _ => Decision {
                commands: smallvec![Command::Forward],
                next_state: MissionState::Approaching,
                done: false,
            },
        }
    }

    /// 在节拍边界提交状态变迁
    ///
    /// `Done` 是冻结态，提交后不再离开。
    pub fn commit(&mut self, next: MissionState) {
        if self.state == MissionState::Done {
            return;
        }
        if self.state != next {
            info!(from = %self.state, to = %next, "mission state transition");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Category;

    fn result(label: &str, score: f64) -> ClassificationResult {
        ClassificationResult {
            categories: vec![Category {
                name: label.to_string(),
                score,
            }],
            timestamp_ms: 0,
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(DecisionConfig::default())
    }

    #[test]
    fn test_confident_target_within_grab_distance() {
        let mut e = engine();
        let r = result("Bottle", 0.9);
        let d = e.decide(Some(&r), Some(10.0));

        // 先停车，后抓取，顺序不可调换
        assert_eq!(d.commands.as_slice(), &[Command::Stop, Command::Grab]);
        assert_eq!(d.next_state, MissionState::Done);
        assert!(d.done);
        // 命令对执行期间引擎处于 Grabbing
        assert_eq!(e.state(), MissionState::Grabbing);

        e.commit(d.next_state);
        assert_eq!(e.state(), MissionState::Done);
    }

    #[test]
    fn test_score_equal_to_threshold_matches() {
        let mut e = engine();
        let r = result("Bottle", 0.6);
        let d = e.decide(Some(&r), Some(12.0));

        // 置信度 >= 阈值、距离 <= 阈值，等号都算命中
        assert_eq!(d.commands.as_slice(), &[Command::Stop, Command::Grab]);
        assert_eq!(d.next_state, MissionState::Done);
    }

    #[test]
    fn test_confident_target_too_far_moves_forward() {
        let mut e = engine();
        let r = result("Bottle", 0.9);
        let d = e.decide(Some(&r), Some(50.0));

        assert_eq!(d.commands.as_slice(), &[Command::Forward]);
        assert_eq!(d.next_state, MissionState::Approaching);
        assert!(!d.done);
    }

    #[test]
    fn test_distance_unavailable_still_permits_forward() {
        let mut e = engine();
        let r = result("Bottle", 0.9);
        let d = e.decide(Some(&r), None);

        // 距离证据缺失只封锁抓取路径
        assert_eq!(d.commands.as_slice(), &[Command::Forward]);
        assert_eq!(d.next_state, MissionState::Approaching);
    }

    #[test]
    fn test_wrong_label_stops_regardless_of_distance() {
        let mut e = engine();
        let r = result("Cup", 0.99);
        let d = e.decide(Some(&r), Some(5.0));

        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert_eq!(d.next_state, MissionState::Searching);
        assert!(!d.done);
    }

    #[test]
    fn test_low_score_stops() {
        let mut e = engine();
        let r = result("Bottle", 0.59);
        let d = e.decide(Some(&r), Some(5.0));

        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert_eq!(d.next_state, MissionState::Searching);
    }

    #[test]
    fn test_no_result_stops_and_keeps_state() {
        let mut e = engine();

        // Searching 下没有结果：保持 Searching
        let d = e.decide(None, None);
        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert_eq!(d.next_state, MissionState::Searching);

        // 先进入 Approaching，再丢失结果：状态不变
        let r = result("Bottle", 0.9);
        let d = e.decide(Some(&r), None);
        e.commit(d.next_state);
        assert_eq!(e.state(), MissionState::Approaching);

        let d = e.decide(None, Some(8.0));
        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert_eq!(d.next_state, MissionState::Approaching);
    }

    #[test]
    fn test_empty_categories_treated_as_no_result() {
        let mut e = engine();
        let r = ClassificationResult {
            categories: vec![],
            timestamp_ms: 0,
        };
        let d = e.decide(Some(&r), Some(5.0));
        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert_eq!(d.next_state, MissionState::Searching);
    }

    #[test]
    fn test_only_top_category_considered() {
        let mut e = engine();
        // 低位类别里有高置信 Bottle，但最高分是 Cup：不算命中
        let r = ClassificationResult {
            categories: vec![
                Category {
                    name: "Cup".into(),
                    score: 0.95,
                },
                Category {
                    name: "Bottle".into(),
                    score: 0.9,
                },
            ],
            timestamp_ms: 0,
        };
        let d = e.decide(Some(&r), Some(5.0));
        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
    }

    #[test]
    fn test_done_is_frozen() {
        let mut e = engine();
        let r = result("Bottle", 0.9);
        let d = e.decide(Some(&r), Some(1.0));
        e.commit(d.next_state);
        assert_eq!(e.state(), MissionState::Done);

        // Done 后再决策只要求停车，状态不离开 Done
        let d = e.decide(Some(&r), Some(1.0));
        assert_eq!(d.commands.as_slice(), &[Command::Stop]);
        assert!(d.done);

        e.commit(MissionState::Searching);
        assert_eq!(e.state(), MissionState::Done);
    }
}
