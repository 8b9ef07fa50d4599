//! 节拍统计
//!
//! 帧计数与滚动 FPS。统计量是驱动器拥有的显式结构体，随循环
//! 一起构造与销毁，不是进程级全局状态。

use std::time::Instant;

/// FPS 统计窗口长度（帧）
pub const FPS_WINDOW_FRAMES: u32 = 10;

/// 节拍统计
#[derive(Debug)]
pub struct TickStats {
    frames: u64,
    window_start: Instant,
    window_frames: u32,
    fps: f64,
}

impl TickStats {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// 记录一帧；每满一个窗口重算一次 FPS
    pub fn on_frame(&mut self, now: Instant) {
        self.frames += 1;
        self.window_frames += 1;

        if self.window_frames >= FPS_WINDOW_FRAMES {
            let elapsed = now.duration_since(self.window_start).as_secs_f64();
            // 避免除零（至少 1ms）
            self.fps = f64::from(FPS_WINDOW_FRAMES) / elapsed.max(0.001);
            self.window_start = now;
            self.window_frames = 0;
        }
    }

    /// 累计帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 最近一个完整窗口的 FPS（窗口未满前为 0）
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counts_frames() {
        let t0 = Instant::now();
        let mut stats = TickStats::new(t0);
        for i in 0..5 {
            stats.on_frame(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(stats.frames(), 5);
        // 窗口未满，FPS 尚未计算
        assert_eq!(stats.fps(), 0.0);
    }

    #[test]
    fn test_fps_over_full_window() {
        let t0 = Instant::now();
        let mut stats = TickStats::new(t0);

        // 10 帧，每帧间隔 50ms -> 第 10 帧在 t0+500ms，FPS = 10 / 0.5 = 20
        for i in 1..=10u64 {
            stats.on_frame(t0 + Duration::from_millis(i * 50));
        }

        assert_eq!(stats.frames(), 10);
        assert!((stats.fps() - 20.0).abs() < 0.5, "fps = {}", stats.fps());
    }

    #[test]
    fn test_window_resets_after_computation() {
        let t0 = Instant::now();
        let mut stats = TickStats::new(t0);

        for i in 1..=10u64 {
            stats.on_frame(t0 + Duration::from_millis(i * 50));
        }
        let first = stats.fps();

        // 第二个窗口节奏变快一倍
        let t1 = t0 + Duration::from_millis(500);
        for i in 1..=10u64 {
            stats.on_frame(t1 + Duration::from_millis(i * 25));
        }

        assert!((stats.fps() - first * 2.0).abs() < 1.0, "fps = {}", stats.fps());
    }
}
