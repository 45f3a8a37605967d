//! Splitting one job's budget into the phases of a test generation run.

/// Number of phases besides search.
const PHASES: u64 = 6;
/// Per-phase timeout once half the budget exceeds `PHASES * MAJOR_DELTA`.
const MAJOR_DELTA: u64 = 120;
/// Per-phase timeout once half the budget exceeds `PHASES * MINOR_DELTA`.
const MINOR_DELTA: u64 = 60;

/// Seconds granted to each phase of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimeouts {
    pub search: u64,
    pub initialization: u64,
    pub minimization: u64,
    pub assertion: u64,
    pub extra: u64,
    pub junit_check: u64,
    pub write_junit: u64,
}

impl PhaseTimeouts {
    /// Split `seconds` between search and the auxiliary phases.
    ///
    /// The budget is first clamped to `remaining_seconds` (when the run has a
    /// deadline), then raised to `min_seconds_per_job`: a job that starts
    /// always gets at least the minimum. Search keeps at least half.
    pub fn for_job(seconds: u64, remaining_seconds: Option<u64>, min_seconds_per_job: u64) -> Self {
        let mut seconds = match remaining_seconds {
            Some(remaining) => seconds.min(remaining),
            None => seconds,
        };
        seconds = seconds.max(min_seconds_per_job);

        let half = seconds / 2;
        let phase = if half > PHASES * MAJOR_DELTA {
            MAJOR_DELTA
        } else if half > PHASES * MINOR_DELTA {
            MINOR_DELTA
        } else {
            half / PHASES
        };

        Self {
            search: seconds - PHASES * phase,
            initialization: phase,
            minimization: phase,
            assertion: phase,
            extra: phase,
            junit_check: phase,
            write_junit: phase,
        }
    }

    /// Wall-clock seconds the job may take in the worst case.
    pub fn total(&self) -> u64 {
        self.search
            + self.initialization
            + self.minimization
            + self.assertion
            + self.extra
            + self.junit_check
            + self.write_junit
    }

    /// `(property, seconds)` pairs as passed to the test generator process.
    pub fn as_properties(&self) -> [(&'static str, u64); 8] {
        [
            ("search_budget", self.search),
            ("global_timeout", self.search),
            ("initialization_timeout", self.initialization),
            ("minimization_timeout", self.minimization),
            ("assertion_timeout", self.assertion),
            ("extra_timeout", self.extra),
            ("junit_check_timeout", self.junit_check),
            ("write_junit_timeout", self.write_junit),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_budget_splits_half_evenly() {
        // half = 150, 25 per phase
        let t = PhaseTimeouts::for_job(300, None, 60);
        assert_eq!(t.initialization, 25);
        assert_eq!(t.write_junit, 25);
        assert_eq!(t.search, 150);
        assert_eq!(t.total(), 300);
    }

    #[test]
    fn test_medium_budget_uses_minor_delta() {
        // half = 400 > 360
        let t = PhaseTimeouts::for_job(800, None, 60);
        assert_eq!(t.minimization, 60);
        assert_eq!(t.search, 800 - 360);
    }

    #[test]
    fn test_large_budget_uses_major_delta() {
        // half = 750 > 720
        let t = PhaseTimeouts::for_job(1500, None, 60);
        assert_eq!(t.assertion, 120);
        assert_eq!(t.search, 1500 - 720);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        // half = 720 exactly: not above 6 * 120
        let t = PhaseTimeouts::for_job(1440, None, 60);
        assert_eq!(t.extra, 60);
        // half = 360 exactly: not above 6 * 60
        let t = PhaseTimeouts::for_job(720, None, 60);
        assert_eq!(t.extra, 60);
    }

    #[test]
    fn test_clamped_to_remaining_time() {
        let t = PhaseTimeouts::for_job(1500, Some(300), 60);
        assert_eq!(t.total(), 300);
    }

    #[test]
    fn test_minimum_wins_over_remaining_time() {
        let t = PhaseTimeouts::for_job(600, Some(10), 120);
        assert_eq!(t.total(), 120);
        assert_eq!(t.junit_check, 10);
        assert_eq!(t.search, 60);
    }

    #[test]
    fn test_properties_repeat_search_as_global_timeout() {
        let t = PhaseTimeouts::for_job(300, None, 60);
        let props = t.as_properties();
        assert_eq!(props[0], ("search_budget", 150));
        assert_eq!(props[1], ("global_timeout", 150));
        assert_eq!(props[7], ("write_junit_timeout", 25));
    }
}
