//! Timeline assembly: turns a generated trial collection into the ordered
//! per-trial parameters the orchestrator consumes.
//!
//! Instruction pages, breaks, and countdown screens sit outside the core;
//! the timeline here is the trial backbone they are threaded around.

use tracing::warn;

use crate::config::Configuration;
use crate::constants::REWARD_STIMULUS_OFFSET;
use crate::generate::{TrialCollection, TrialSpec};
use crate::stage::Stage;
use crate::trial::TrialParameters;

/// Number of trials the configuration requests for a stage.
pub fn stage_trial_count(cfg: &Configuration, stage: Stage) -> u32 {
    let manipulations = &cfg.manipulations;
    match stage {
        Stage::PracticeOne => manipulations.level_one_practice_trials,
        Stage::PracticeTwo => manipulations.level_two_practice_trials,
        Stage::PracticeThree => manipulations.level_three_practice_trials,
        Stage::MainOne => manipulations.level_one_main_trials,
        Stage::MainTwo => manipulations.level_two_main_trials,
        Stage::MainThree => manipulations.level_three_main_trials,
    }
}

/// Unpack one generated spec into runtime trial parameters.
pub fn trial_parameters(stage: Stage, spec: &TrialSpec) -> TrialParameters {
    TrialParameters {
        stage,
        mappings: spec.mappings.clone(),
        first_transition: spec.transition_flag(0),
        second_transition: spec.transition_flag(1),
        reward_position: spec.reward_stimulus - REWARD_STIMULUS_OFFSET,
        highly_rewarding_state: spec.high_rewarding - REWARD_STIMULUS_OFFSET,
    }
}

/// Build the full trial timeline: practice stages one to three, then the
/// main stages, each truncated to the configured count.
pub fn build_timeline(cfg: &Configuration, collection: &TrialCollection) -> Vec<TrialParameters> {
    let mut timeline = Vec::new();
    for stage in Stage::ALL {
        let requested = stage_trial_count(cfg, stage) as usize;
        let available = collection.stage(stage);
        if available.len() < requested {
            warn!(
                stage = stage.as_str(),
                requested,
                available = available.len(),
                "trial collection is short for stage"
            );
        }
        timeline.extend(
            available
                .iter()
                .take(requested)
                .map(|spec| trial_parameters(stage, spec)),
        );
    }
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;
    use crate::prng::Prng;

    fn small_cfg() -> Configuration {
        let mut cfg = Configuration::default();
        cfg.manipulations.level_one_practice_trials = 2;
        cfg.manipulations.level_two_practice_trials = 2;
        cfg.manipulations.level_three_practice_trials = 3;
        cfg.manipulations.level_one_main_trials = 2;
        cfg.manipulations.level_two_main_trials = 2;
        cfg.manipulations.level_three_main_trials = 4;
        cfg
    }

    #[test]
    fn timeline_orders_stages_and_respects_counts() {
        let cfg = small_cfg();
        let collection = TrialCollection::generate(&cfg);
        let timeline = build_timeline(&cfg, &collection);

        let stages: Vec<Stage> = timeline.iter().map(|params| params.stage).collect();
        assert_eq!(
            stages,
            [
                Stage::PracticeOne,
                Stage::PracticeOne,
                Stage::PracticeTwo,
                Stage::PracticeTwo,
                Stage::PracticeThree,
                Stage::PracticeThree,
                Stage::PracticeThree,
                Stage::MainOne,
                Stage::MainOne,
                Stage::MainTwo,
                Stage::MainTwo,
                Stage::MainThree,
                Stage::MainThree,
                Stage::MainThree,
                Stage::MainThree,
            ]
        );
    }

    #[test]
    fn parameters_shift_reward_fields_into_position_space() {
        let mut rng = Prng::new(3);
        let spec = &generate::generate_stage(&mut rng, 1, 0.7)[0];
        let params = trial_parameters(Stage::MainThree, spec);

        assert_eq!(params.reward_position, spec.reward_stimulus - 6);
        assert!((1..=4).contains(&params.reward_position));
        assert_eq!(
            params.first_transition,
            if spec.transitions.starts_with('C') { 0 } else { 1 }
        );
    }

    #[test]
    fn short_collections_truncate_instead_of_failing() {
        let cfg = small_cfg();
        let collection = TrialCollection::default();
        let timeline = build_timeline(&cfg, &collection);
        assert!(timeline.is_empty());
    }
}
