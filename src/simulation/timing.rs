//! Mapping of simulated seconds to animation frames
//!
//! An animation cycle shows `seconds_per_cycle` simulated seconds in `fps`
//! frames. Frame `i` of a cycle is due in the second `ceil((i + 1) * spf)`
//! (mod `seconds_per_cycle`), where `spf` is the seconds per frame. When a
//! frame takes less than a second, several frames share one second, and each
//! of them advances the bodies by that fraction only.

#[derive(Debug, Clone, PartialEq)]
pub struct FrameSchedule {
    fps: usize,
    seconds_per_cycle: u64,
    due: Vec<u64>, // second in cycle of every frame
    step_fraction: f64, // seconds per frame, clipped to 1
    cycles_per_frame: f64,
}

impl FrameSchedule {
    pub fn new(fps: usize, seconds_per_cycle: u64) -> Self {
        let fps = fps.max(1);
        let seconds_per_cycle = seconds_per_cycle.max(1);
        let spf = seconds_per_cycle as f64 / fps as f64;

        // summing up avoids the rounding drift of i * spf
        let mut sec = 0.0;
        let due = (0..fps)
            .map(|_| {
                sec += spf;
                sec.ceil() as u64 % seconds_per_cycle
            })
            .collect();

        Self {
            fps,
            seconds_per_cycle,
            due,
            step_fraction: spf.min(1.0),
            cycles_per_frame: 1.0 / fps as f64,
        }
    }

    pub fn fps(&self) -> usize {
        self.fps
    }

    pub fn seconds_per_cycle(&self) -> u64 {
        self.seconds_per_cycle
    }

    /// Second in cycle at which `frame` (index in the cycle) is drawn
    pub fn due_second(&self, frame: usize) -> u64 {
        self.due[frame % self.fps]
    }

    /// True if `frame` exists and must be drawn in `second_in_cycle`
    pub fn is_due(&self, frame: usize, second_in_cycle: u64) -> bool {
        frame < self.fps && self.due[frame] == second_in_cycle
    }

    pub fn second_in_cycle(&self, seconds_done: u64) -> u64 {
        seconds_done % self.seconds_per_cycle
    }

    /// Fraction of a second one movement step covers
    pub fn step_fraction(&self) -> f64 {
        self.step_fraction
    }

    pub fn cycles_per_frame(&self) -> f64 {
        self.cycles_per_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_cycles_draw_once_every_few_seconds() {
        let s = FrameSchedule::new(50, 100);
        assert_eq!(s.due_second(0), 2);
        assert_eq!(s.due_second(48), 98);
        // the last frame belongs to second 0 of the next cycle
        assert_eq!(s.due_second(49), 0);
        assert_eq!(s.step_fraction(), 1.0);
    }

    #[test]
    fn fast_cycles_share_seconds() {
        let s = FrameSchedule::new(4, 1);
        assert!((0..4).all(|f| s.is_due(f, 0)));
        assert!(!s.is_due(4, 0));
        assert_eq!(s.step_fraction(), 0.25);
        assert_eq!(s.cycles_per_frame(), 0.25);
    }
}
