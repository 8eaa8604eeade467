//! Per-trial orchestration: sequences the stage's stimulus sets through the
//! runner, resolves keypresses into per-depth measurements, handles
//! timeouts, and settles the reward outcome.

use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::constants::{BLANK, NO_REWARD, REWARD, REWARD_STIMULUS_OFFSET};
use crate::events::KeySource;
use crate::records::{CompletedTrial, Interactions, TrialRecord};
use crate::runner::{self, SelectionEvent};
use crate::scene::SceneContext;
use crate::session::SessionData;
use crate::stage::Stage;
use crate::state::{MappingGraph, State};
use crate::stimuli::{StimulusFactory, StimulusKind, StimulusSet};
use crate::surface::Surface;

/// Per-trial configuration supplied by the timeline.
#[derive(Debug, Clone)]
pub struct TrialParameters {
    pub stage: Stage,
    pub mappings: MappingGraph,
    /// 0 = common, 1 = rare, per the trial's pre-generated transition script.
    pub first_transition: i32,
    pub second_transition: i32,
    /// Rewarding terminal location, shifted to 1..=4.
    pub reward_position: i32,
    pub highly_rewarding_state: i32,
}

/// Decision start instants, used to derive reaction times.
#[derive(Debug, Default, Clone, Copy)]
struct DecisionStarts {
    first: Option<Instant>,
    second: Option<Instant>,
    third: Option<Instant>,
}

/// One trial of the three-step task.
#[derive(Debug)]
pub struct Trial<'a> {
    cfg: &'a Configuration,
    params: TrialParameters,
}

impl<'a> Trial<'a> {
    pub fn new(cfg: &'a Configuration, params: TrialParameters) -> Self {
        Self { cfg, params }
    }

    pub fn stage(&self) -> Stage {
        self.params.stage
    }

    /// Run the trial to completion.
    ///
    /// `session` supplies the history the scripted-reward paths query;
    /// `surface` and `keys` are the injected display and input capabilities.
    pub async fn run<S: Surface>(
        &self,
        id: &str,
        session: &SessionData,
        surface: &mut S,
        keys: &mut KeySource,
    ) -> CompletedTrial {
        let cfg = self.cfg;
        let reward_stimulus = self.params.reward_position + REWARD_STIMULUS_OFFSET;
        if cfg.cheats.show_reward {
            info!("[Cheats] Reward stimulus: {reward_stimulus}");
        }

        surface.set_cursor_visible(false);

        let mut record = TrialRecord::new(session.trial_count() + 1, &self.params);
        let mut interactions = Interactions::default();
        let trial_started = Instant::now();
        let tap = keys.tap(trial_started);

        let mut state = State::new(id, self.params.mappings.clone());
        state.set_reward_stimulus(reward_stimulus);
        let mut was_rewarded = false;

        let keymap = cfg.keymap();
        info!("Experiment using '{}' keymap", keymap.name);

        let factory = StimulusFactory::new(cfg, self.params.stage);
        let mut queue: VecDeque<StimulusSet> = factory.sequence().into();
        let mut starts = DecisionStarts::default();

        while let Some(mut set) = queue.pop_front() {
            if set.kind() == StimulusKind::Reward {
                was_rewarded = self.resolve_reward(&mut set, &state, session);
            }

            // Begin timing the decision.
            match set.kind() {
                StimulusKind::DecisionOne => starts.first = Some(Instant::now()),
                StimulusKind::DecisionTwo => starts.second = Some(Instant::now()),
                StimulusKind::DecisionThree => starts.third = Some(Instant::now()),
                _ => {}
            }

            let ctx = SceneContext {
                controller: cfg.controller,
                keymap,
                timeouts_so_far: session.timeout_sum(),
                timeout_threshold: cfg.manipulations.timeout_count,
            };
            let presented = runner::present(&mut set, &state, &ctx, surface, keys).await;

            match presented.selection {
                Some(selection) => handle_selection(
                    &set,
                    selection,
                    &mut state,
                    &mut record,
                    &mut interactions,
                    trial_started,
                    starts,
                ),
                None if set.is_interactive() => {
                    // No response inside the run+post window: drop whatever
                    // was queued and show the timeout notice instead.
                    queue.clear();
                    queue.push_back(factory.timeout());
                    match set.kind() {
                        StimulusKind::DecisionOne => record.slow_first_action = 1,
                        StimulusKind::DecisionTwo => record.slow_second_action = 1,
                        StimulusKind::DecisionThree => record.slow_third_action = 1,
                        _ => {}
                    }
                    warn!("Timeout on '{}'", set.name());
                }
                None => {}
            }
        }

        // Trial end: restore the page and assemble the record.
        surface.set_background("white");
        surface.set_cursor_visible(true);

        record.rewarded = i32::from(was_rewarded);
        record.total_reward = session.reward_sum() + record.rewarded;
        interactions.keypresses = tap.take_entries();
        drop(tap);

        debug!("Total rewards: {}", record.total_reward);
        debug!(?record, "trial data");
        CompletedTrial {
            record,
            interactions,
        }
    }

    /// Decide the reward outcome for the terminal display, in priority order:
    /// scripted first-reward injection, reward-streak injection, then natural
    /// resolution against the trial's reward location. Exactly one path
    /// fires, and the displayed frames follow it.
    fn resolve_reward(&self, set: &mut StimulusSet, state: &State, session: &SessionData) -> bool {
        let cheats = &self.cfg.cheats;
        let practice_three = session.count_stage(Stage::PracticeThree);
        let frequencies =
            session.reward_frequencies(Stage::PracticeThree, cheats.practice_reward_delta);

        let rewarded = if self.params.stage == Stage::PracticeThree
            && practice_three + 1 == cheats.practice_first_reward
            && frequencies.rewarded == 0
        {
            // No rewards received so far, inject the first reward.
            info!("Injecting first practice reward");
            true
        } else if cheats.increase_practice_rewards
            && self.params.stage == Stage::PracticeThree
            && frequencies.unrewarded == cheats.practice_reward_delta
        {
            // Place a reward regardless of whether it was truly reached.
            info!("Injecting reward after unrewarded streak");
            true
        } else {
            state.is_reward_stimulus(parse_stimulus_id(state.current_location()))
        };

        let middle = if rewarded { REWARD } else { NO_REWARD };
        set.set_stimuli(vec![
            BLANK.to_string(),
            middle.to_string(),
            BLANK.to_string(),
        ]);
        rewarded
    }
}

/// Store the per-depth measurements for a resolved selection and advance the
/// transition model.
fn handle_selection(
    set: &StimulusSet,
    selection: SelectionEvent,
    state: &mut State,
    record: &mut TrialRecord,
    interactions: &mut Interactions,
    trial_started: Instant,
    starts: DecisionStarts,
) {
    let action = selection.side.index() as i32;
    let stimulus = state
        .current_pair()
        .get(selection.side.index())
        .cloned()
        .unwrap_or_default();
    info!("Stimulus '{stimulus}' selected");
    let stimulus_id = parse_stimulus_id(&stimulus);

    // Store state and actions dependent on depth. The corrected action
    // compensates for the randomised on-screen sides: it reflects the
    // canonical room position regardless of which physical key was pressed.
    match state.depth() {
        0 => {
            record.first_stimulus = stimulus_id;
            record.first_action_raw = action;
            record.first_action = if action == 0 && stimulus_id == 2 {
                // Pressed 'left' for a room that is ordinarily on the right.
                1
            } else if action == 1 && stimulus_id == 1 {
                // Pressed 'right' for a room that is ordinarily on the left.
                0
            } else {
                action
            };
            record.first_state = 0;
        }
        1 => {
            record.second_stimulus = stimulus_id;
            record.second_action_raw = action;
            record.second_action = if action == 0 && (stimulus_id == 4 || stimulus_id == 6) {
                1
            } else if action == 1 && (stimulus_id == 3 || stimulus_id == 5) {
                0
            } else {
                action
            };
            // Second state, bucketed to {1, 2}.
            record.second_state = if stimulus_id == 3 || stimulus_id == 4 {
                1
            } else {
                2
            };
        }
        2 => {
            record.third_stimulus = stimulus_id;
            // Third state, adjusted to {1, 2, 3, 4}.
            record.third_state = stimulus_id - REWARD_STIMULUS_OFFSET;
        }
        depth => {
            error!("Unknown depth: '{depth}'");
        }
    }

    // Calculate and store the reaction time. The third decision's clock
    // starts before its run phase, so its pre duration is subtracted.
    let elapsed_ms = |start: Option<Instant>| {
        start
            .map(|start| (selection.pressed_at - start).as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    };
    match set.kind() {
        StimulusKind::DecisionOne => record.first_reaction_time = elapsed_ms(starts.first),
        StimulusKind::DecisionTwo => record.second_reaction_time = elapsed_ms(starts.second),
        StimulusKind::DecisionThree => {
            record.third_reaction_time =
                elapsed_ms(starts.third) - set.timing().pre.as_secs_f64() * 1000.0;
        }
        _ => {}
    }

    let at_ms = (selection.pressed_at - trial_started).as_millis();
    interactions.selections.push(format!("({stimulus}:{at_ms})"));
    interactions
        .path
        .push(format!("({},{})", state.depth(), state.column()));

    // Continue the game with the physical side that was pressed; the
    // corrected action is a recording artifact only.
    state.advance(Some(selection.side));
}

/// Leading-integer parse, so compound location keys such as `1,0` still map
/// to their numeric stimulus.
fn parse_stimulus_id(value: &str) -> i32 {
    let trimmed = value.trim();
    let mut end = 0;
    for (index, ch) in trimmed.char_indices() {
        if ch.is_ascii_digit() || (index == 0 && ch == '-') {
            end = index + ch.len_utf8();
        } else {
            break;
        }
    }
    trimmed[..end].parse().unwrap_or(0)
}
