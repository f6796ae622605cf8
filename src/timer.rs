//! Frame-rate counter that reports once per second.

use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Counts presented frames and reports the total once more than a second has
/// passed since the previous report.
#[derive(Debug)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
        }
    }

    /// Record one presented frame at `now`. Frames that were skipped must
    /// not be recorded.
    ///
    /// Returns the frame count for the window that just closed, if one did.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) > REPORT_INTERVAL {
            let fps = self.frames;
            self.frames = 0;
            self.window_start = now;
            return Some(fps);
        }
        None
    }
}

/// Window title showing the current frame rate.
pub fn fps_title(base: &str, fps: u32) -> String {
    format!("{base} - FPS: {fps}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_within_the_first_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for i in 0..10 {
            assert_eq!(counter.tick(start + Duration::from_millis(i * 100)), None);
        }
    }

    #[test]
    fn reports_and_resets_after_a_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for i in 1..=60u64 {
            let now = start + Duration::from_millis(i * 16);
            assert_eq!(counter.tick(now), None);
        }
        let report_at = start + Duration::from_millis(1001);
        assert_eq!(counter.tick(report_at), Some(61));

        // New window starts at the report.
        assert_eq!(counter.tick(report_at + Duration::from_millis(500)), None);
        assert_eq!(counter.tick(report_at + Duration::from_millis(1200)), Some(2));
    }

    #[test]
    fn only_presented_frames_are_counted() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        let mut report = None;
        // 100 redraws over 1.1s, only every 20th one reached the screen.
        for i in 1..=100u64 {
            let presented = i % 20 == 0;
            if presented {
                report = counter.tick(start + Duration::from_millis(i * 11));
            }
        }
        assert_eq!(report, Some(5));
    }

    #[test]
    fn exactly_one_second_is_not_enough() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        assert_eq!(counter.tick(start + REPORT_INTERVAL), None);
    }

    #[test]
    fn title_format() {
        assert_eq!(fps_title("Forest Fire", 144), "Forest Fire - FPS: 144");
    }
}
