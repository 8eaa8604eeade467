//! Trial records: the per-depth measurements handed to the data sink, plus
//! the raw interaction stream captured alongside them.
//!
//! Field names serialize in the camelCase convention the downstream analysis
//! pipeline expects.

use serde::{Deserialize, Serialize};

use crate::events::KeypressEntry;
use crate::stage::Stage;
use crate::trial::TrialParameters;

/// The complete record for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    /// 1-based trial counter across the whole session.
    pub trial: u32,
    pub stage: Stage,

    // States
    pub first_state: i32,
    pub second_state: i32,
    pub third_state: i32,

    // Stimuli
    pub first_stimulus: i32,
    pub second_stimulus: i32,
    pub third_stimulus: i32,

    // Actions
    pub first_action: i32,
    pub first_action_raw: i32,
    pub second_action: i32,
    pub second_action_raw: i32,

    // Reaction times, milliseconds
    pub first_reaction_time: f64,
    pub second_reaction_time: f64,
    pub third_reaction_time: f64,

    // Timeouts
    pub slow_first_action: i32,
    pub slow_second_action: i32,
    pub slow_third_action: i32,

    // Transitions
    pub first_transition: i32,
    pub second_transition: i32,

    // Reward
    pub highly_rewarding_state: i32,
    pub reward_position: i32,
    pub rewarded: i32,
    pub total_reward: i32,
}

impl TrialRecord {
    /// A fresh record for the trial described by `params`, numbered `trial`.
    pub fn new(trial: u32, params: &TrialParameters) -> Self {
        Self {
            trial,
            stage: params.stage,
            first_state: 0,
            second_state: 0,
            third_state: 0,
            first_stimulus: 0,
            second_stimulus: 0,
            third_stimulus: 0,
            first_action: 0,
            first_action_raw: 0,
            second_action: 0,
            second_action_raw: 0,
            first_reaction_time: 0.0,
            second_reaction_time: 0.0,
            third_reaction_time: 0.0,
            slow_first_action: 0,
            slow_second_action: 0,
            slow_third_action: 0,
            first_transition: params.first_transition,
            second_transition: params.second_transition,
            highly_rewarding_state: params.highly_rewarding_state,
            reward_position: params.reward_position,
            rewarded: 0,
            total_reward: 0,
        }
    }

    /// Whether any decision of this trial timed out.
    pub fn timed_out(&self) -> bool {
        self.slow_first_action != 0 || self.slow_second_action != 0 || self.slow_third_action != 0
    }
}

/// Interaction data from the participant, organised separately from the
/// per-depth measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Interactions {
    /// `(stimulus:ms)` entries, one per resolved selection.
    pub selections: Vec<String>,
    /// `(depth,column)` entries, one per resolved selection.
    pub path: Vec<String>,
    /// Every keypress of the trial, bound or not.
    pub keypresses: Vec<KeypressEntry>,
}

/// Everything one finished trial produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrial {
    pub record: TrialRecord,
    pub interactions: Interactions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TrialParameters {
        TrialParameters {
            stage: Stage::MainThree,
            mappings: crate::state::MappingGraph::new(),
            first_transition: 1,
            second_transition: 0,
            reward_position: 3,
            highly_rewarding_state: 2,
        }
    }

    #[test]
    fn fresh_record_copies_the_trial_parameters() {
        let record = TrialRecord::new(7, &params());
        assert_eq!(record.trial, 7);
        assert_eq!(record.stage, Stage::MainThree);
        assert_eq!(record.first_transition, 1);
        assert_eq!(record.second_transition, 0);
        assert_eq!(record.reward_position, 3);
        assert_eq!(record.highly_rewarding_state, 2);
        assert_eq!(record.rewarded, 0);
        assert!(!record.timed_out());
    }

    #[test]
    fn serializes_with_camel_case_columns() {
        let record = TrialRecord::new(1, &params());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"firstActionRaw\""));
        assert!(json.contains("\"slowSecondAction\""));
        assert!(json.contains("\"totalReward\""));
        assert!(json.contains("\"stage\":\"main_three\""));
    }

    #[test]
    fn timed_out_tracks_every_slow_flag() {
        let mut record = TrialRecord::new(1, &params());
        record.slow_third_action = 1;
        assert!(record.timed_out());
    }
}
