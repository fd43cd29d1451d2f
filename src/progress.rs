use std::time::{Duration, Instant};

pub const STAGES: [&str; 4] = [
    "Downloading Image...",
    "Processing...",
    "Searching Reddit...",
    "Analyzing Results...",
];

/// Timer-driven stage display for a pending check. It does not observe the
/// request; it only advances on the clock.
#[derive(Debug, Clone)]
pub struct Simulation {
    step: usize,
    reddit_url: bool,
    step_delay: Duration,
    last_advance: Instant,
}

impl Simulation {
    pub fn start(reddit_url: bool, step_delay: Duration, now: Instant) -> Self {
        Self {
            step: 0,
            reddit_url,
            step_delay,
            last_advance: now,
        }
    }

    pub fn headline(&self) -> &'static str {
        if self.reddit_url {
            "Fetching Reddit post..."
        } else {
            "Processing image..."
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn stage_label(&self) -> &'static str {
        STAGES[self.step]
    }

    pub fn is_reddit_url(&self) -> bool {
        self.reddit_url
    }

    pub fn percent(&self) -> u16 {
        (self.step * 100 / (STAGES.len() - 1)) as u16
    }

    pub fn is_last_stage(&self) -> bool {
        self.step + 1 == STAGES.len()
    }

    /// Advances as many stages as have elapsed. Returns true when the
    /// visible stage changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while !self.is_last_stage()
            && now.saturating_duration_since(self.last_advance) >= self.step_delay
        {
            self.step += 1;
            self.last_advance += self.step_delay;
            changed = true;
        }
        changed
    }

    pub fn stage_state(&self, index: usize) -> StageState {
        match index.cmp(&self.step) {
            std::cmp::Ordering::Less => StageState::Completed,
            std::cmp::Ordering::Equal => StageState::Active,
            std::cmp::Ordering::Greater => StageState::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Completed,
    Active,
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_once_per_delay_and_stops_at_last_stage() {
        let start = Instant::now();
        let delay = Duration::from_secs(1);
        let mut sim = Simulation::start(false, delay, start);
        assert_eq!(sim.stage_label(), "Downloading Image...");
        assert_eq!(sim.percent(), 0);

        assert!(!sim.tick(start + Duration::from_millis(999)));
        assert!(sim.tick(start + delay));
        assert_eq!(sim.step(), 1);
        assert_eq!(sim.percent(), 33);

        assert!(sim.tick(start + Duration::from_secs(10)));
        assert_eq!(sim.step(), 3);
        assert_eq!(sim.percent(), 100);
        assert_eq!(sim.stage_label(), "Analyzing Results...");
        assert!(!sim.tick(start + Duration::from_secs(20)));
    }

    #[test]
    fn headline_depends_on_submission_type() {
        let now = Instant::now();
        let reddit = Simulation::start(true, Duration::from_secs(2), now);
        let image = Simulation::start(false, Duration::from_secs(1), now);
        assert_eq!(reddit.headline(), "Fetching Reddit post...");
        assert_eq!(image.headline(), "Processing image...");
    }

    #[test]
    fn stage_states_follow_current_step() {
        let start = Instant::now();
        let mut sim = Simulation::start(false, Duration::from_secs(1), start);
        sim.tick(start + Duration::from_secs(2));
        assert_eq!(sim.stage_state(0), StageState::Completed);
        assert_eq!(sim.stage_state(1), StageState::Completed);
        assert_eq!(sim.stage_state(2), StageState::Active);
        assert_eq!(sim.stage_state(3), StageState::Pending);
    }
}
