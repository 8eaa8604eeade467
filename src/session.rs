//! Session-level trial history: the store the orchestrator queries for
//! scripted-reward decisions and timeout monitoring, and the sink interface
//! completed records are handed to.

use tracing::info;

use crate::config::Configuration;
use crate::records::TrialRecord;
use crate::stage::Stage;

/// Reward tallies over a window of trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardFrequencies {
    pub rewarded: u32,
    pub unrewarded: u32,
}

/// Completed trials of the running session.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    records: Vec<TrialRecord>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn trial_count(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn count_stage(&self, stage: Stage) -> u32 {
        self.records
            .iter()
            .filter(|record| record.stage == stage)
            .count() as u32
    }

    /// Reward tallies over the last `last` trials of `stage`.
    pub fn reward_frequencies(&self, stage: Stage, last: u32) -> RewardFrequencies {
        let mut frequencies = RewardFrequencies::default();
        for record in self
            .records
            .iter()
            .filter(|record| record.stage == stage)
            .rev()
            .take(last as usize)
        {
            if record.rewarded != 0 {
                frequencies.rewarded += 1;
            } else {
                frequencies.unrewarded += 1;
            }
        }
        frequencies
    }

    /// Total rewards received so far.
    pub fn reward_sum(&self) -> i32 {
        self.records.iter().map(|record| record.rewarded).sum()
    }

    /// Number of trials with any timed-out decision.
    pub fn timeout_sum(&self) -> u32 {
        self.records
            .iter()
            .filter(|record| record.timed_out())
            .count() as u32
    }

    /// Check the number of timeouts that have occurred in a given stage.
    /// Returns whether the participant may continue.
    pub fn check_timeouts(&self, stage: Stage, cfg: &Configuration) -> bool {
        let trial_count = self.count_stage(stage);
        info!("Trial count: {trial_count}");
        if trial_count == 0 {
            return true;
        }

        let timeout_trials = self
            .records
            .iter()
            .filter(|record| record.stage == stage && record.timed_out())
            .count() as u32;
        info!("Timeout trials: {timeout_trials}");

        let timeout_proportion = f64::from(timeout_trials) / f64::from(trial_count);
        let can_continue = timeout_proportion < cfg.manipulations.timeout_proportion;
        info!("Timeout proportion: {timeout_proportion}");
        info!("Continue: {can_continue}");
        can_continue
    }
}

/// Receives completed records; persistence and wire format are the host's
/// concern.
pub trait RecordSink {
    fn push(&mut self, record: &TrialRecord);

    /// Periodic partial-export hook, fired every fifth trial on keyboard and
    /// spectrometer layouts.
    fn partial_export(&mut self, _session: &SessionData) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn push(&mut self, _record: &TrialRecord) {}
}

/// Running reward-rate tally over a sliding window of recent trials.
#[derive(Debug, Clone)]
pub struct RewardStats {
    pub rewarded: u32,
    pub trials: u32,
    recent: Vec<bool>,
    window: usize,
}

impl RewardStats {
    pub fn new(window: usize) -> Self {
        Self {
            rewarded: 0,
            trials: 0,
            recent: Vec::with_capacity(window.max(1)),
            window: window.max(1),
        }
    }

    pub fn record_trial(&mut self, rewarded: bool) {
        if rewarded {
            self.rewarded += 1;
        }
        self.recent.push(rewarded);
        if self.recent.len() > self.window {
            self.recent.remove(0);
        }
        self.trials += 1;
    }

    /// Overall reward proportion.
    pub fn rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        f64::from(self.rewarded) / f64::from(self.trials)
    }

    /// Reward proportion over the recent window.
    pub fn recent_rate(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        let rewarded = self.recent.iter().filter(|&&r| r).count();
        rewarded as f64 / self.recent.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MappingGraph;
    use crate::trial::TrialParameters;

    fn record(stage: Stage, rewarded: i32, slow: bool) -> TrialRecord {
        let params = TrialParameters {
            stage,
            mappings: MappingGraph::new(),
            first_transition: 0,
            second_transition: 0,
            reward_position: 1,
            highly_rewarding_state: 1,
        };
        let mut record = TrialRecord::new(0, &params);
        record.rewarded = rewarded;
        if slow {
            record.slow_first_action = 1;
        }
        record
    }

    #[test]
    fn frequencies_look_at_the_most_recent_window() {
        let mut session = SessionData::new();
        session.push(record(Stage::PracticeThree, 1, false));
        for _ in 0..5 {
            session.push(record(Stage::PracticeThree, 0, false));
        }
        session.push(record(Stage::MainThree, 1, false));

        let freq = session.reward_frequencies(Stage::PracticeThree, 5);
        assert_eq!(
            freq,
            RewardFrequencies {
                rewarded: 0,
                unrewarded: 5
            }
        );

        let wider = session.reward_frequencies(Stage::PracticeThree, 10);
        assert_eq!(wider.rewarded, 1);
        assert_eq!(wider.unrewarded, 5);
    }

    #[test]
    fn sums_span_every_stage() {
        let mut session = SessionData::new();
        session.push(record(Stage::PracticeThree, 1, true));
        session.push(record(Stage::MainThree, 1, false));
        session.push(record(Stage::MainThree, 0, true));

        assert_eq!(session.trial_count(), 3);
        assert_eq!(session.count_stage(Stage::MainThree), 2);
        assert_eq!(session.reward_sum(), 2);
        assert_eq!(session.timeout_sum(), 2);
    }

    #[test]
    fn timeout_gate_compares_against_the_configured_proportion() {
        let cfg = Configuration::default();
        let mut session = SessionData::new();
        assert!(session.check_timeouts(Stage::PracticeThree, &cfg));

        for i in 0..10 {
            session.push(record(Stage::PracticeThree, 0, i < 2));
        }
        // 2 / 10 timeouts, threshold 0.3
        assert!(session.check_timeouts(Stage::PracticeThree, &cfg));

        session.push(record(Stage::PracticeThree, 0, true));
        session.push(record(Stage::PracticeThree, 0, true));
        // 4 / 12 timeouts
        assert!(!session.check_timeouts(Stage::PracticeThree, &cfg));
    }

    #[test]
    fn reward_stats_track_overall_and_recent_rates() {
        let mut stats = RewardStats::new(4);
        for rewarded in [true, false, false, false, true, true] {
            stats.record_trial(rewarded);
        }
        assert_eq!(stats.trials, 6);
        assert_eq!(stats.rewarded, 3);
        assert!((stats.rate() - 0.5).abs() < 1e-9);
        assert!((stats.recent_rate() - 0.5).abs() < 1e-9);
    }
}
