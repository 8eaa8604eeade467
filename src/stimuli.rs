//! Stimulus sets: one displayable unit of the trial, bundling the frames to
//! show, the timing budget, the interactivity flag, and the key bindings.
//!
//! Every per-stage variant of the original definition tables reduces to the
//! same structural shape, so the sets are produced by [`StimulusFactory`]
//! parameterized over depth, stage kind, and interactivity instead of being
//! spelled out literally.

use hashbrown::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::Configuration;
use crate::constants::{
    BLANK, FOCUS, MAIN_STIMULUS, PRACTICE_STIMULUS, PRACTICE_SUFFIX, REWARD, TIMEOUT,
};
use crate::controller::{Binding, Controller};
use crate::stage::Stage;
use crate::state::Side;

/// Semantic tag of a stimulus set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StimulusKind {
    Fixation,
    DecisionOne,
    DecisionTwo,
    DecisionThree,
    Reward,
    Timeout,
}

impl StimulusKind {
    pub fn name(self) -> &'static str {
        match self {
            StimulusKind::Fixation => "fixation",
            StimulusKind::DecisionOne => "decisionOne",
            StimulusKind::DecisionTwo => "decisionTwo",
            StimulusKind::DecisionThree => "decisionThree",
            StimulusKind::Reward => "reward",
            StimulusKind::Timeout => "timeout",
        }
    }

    /// Decision index for decision sets, `None` otherwise.
    pub fn decision_depth(self) -> Option<u32> {
        match self {
            StimulusKind::DecisionOne => Some(0),
            StimulusKind::DecisionTwo => Some(1),
            StimulusKind::DecisionThree => Some(2),
            _ => None,
        }
    }
}

/// Pre/run/post budget for one set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub pre: Duration,
    pub run: Duration,
    pub post: Duration,
}

impl Timing {
    fn from_millis(pre: u64, run: u64, post: u64) -> Self {
        Self {
            pre: Duration::from_millis(pre),
            run: Duration::from_millis(run),
            post: Duration::from_millis(post),
        }
    }
}

/// One displayable unit, consumed by the runner across a full
/// pre -> run -> post cycle.
#[derive(Debug, Clone)]
pub struct StimulusSet {
    kind: StimulusKind,
    stage: Stage,
    stimuli: Vec<String>,
    interactive: bool,
    timing: Timing,
    controller: Controller,
    selected: Option<Side>,
}

impl StimulusSet {
    pub fn kind(&self) -> StimulusKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn stimuli(&self) -> &[String] {
        &self.stimuli
    }

    /// Replace the displayed items (reward / no-reward substitution).
    pub fn set_stimuli(&mut self, stimuli: Vec<String>) {
        self.stimuli = stimuli;
    }

    pub fn selected(&self) -> Option<Side> {
        self.selected
    }

    /// Record the resolved choice. The first valid keypress wins; bindings
    /// are removed on resolution, so a second call indicates a logic error
    /// upstream and is ignored.
    pub fn set_selected(&mut self, side: Side) {
        if self.selected.is_some() {
            debug!(stimuli = self.name(), "selection already made, ignoring");
            return;
        }
        self.selected = Some(side);
    }

    /// Activate the key bindings, if this set accepts input at all.
    pub fn create_keybindings(&mut self) {
        if self.interactive {
            self.controller.bind();
        }
    }

    /// Deactivate the key bindings. Idempotent.
    pub fn remove_keybindings(&mut self) {
        self.controller.unbind();
    }

    pub fn resolve_key(&self, key: &str) -> Option<Side> {
        self.controller.resolve(key)
    }
}

/// Produces the stimulus sets for one trial's stage.
#[derive(Debug, Clone, Copy)]
pub struct StimulusFactory<'a> {
    cfg: &'a Configuration,
    stage: Stage,
}

impl<'a> StimulusFactory<'a> {
    pub fn new(cfg: &'a Configuration, stage: Stage) -> Self {
        Self { cfg, stage }
    }

    fn stimulus_item(&self) -> &'static str {
        if self.stage.is_practice() {
            PRACTICE_STIMULUS
        } else {
            MAIN_STIMULUS
        }
    }

    fn blank_item(&self) -> String {
        if self.stage.is_practice() {
            format!("{BLANK}{PRACTICE_SUFFIX}")
        } else {
            BLANK.to_string()
        }
    }

    fn binary_bindings(&self) -> Controller {
        let keymap = self.cfg.keymap();
        let mut keybindings = HashMap::new();
        keybindings.insert(keymap.previous.clone(), Binding { choice: Side::Left });
        keybindings.insert(
            keymap.next.clone(),
            Binding {
                choice: Side::Right,
            },
        );
        Controller::new(keybindings)
    }

    fn submit_bindings(&self) -> Controller {
        let keymap = self.cfg.keymap();
        let mut keybindings = HashMap::new();
        keybindings.insert(keymap.submit.clone(), Binding { choice: Side::Left });
        Controller::new(keybindings)
    }

    pub fn fixation(&self) -> StimulusSet {
        StimulusSet {
            kind: StimulusKind::Fixation,
            stage: self.stage,
            stimuli: vec![BLANK.to_string(), FOCUS.to_string(), BLANK.to_string()],
            interactive: false,
            timing: Timing::from_millis(0, self.cfg.timings.fixation, 0),
            controller: Controller::empty(),
            selected: None,
        }
    }

    /// A decision set at the given depth (0..=2). Non-interactive variants
    /// render the same frames with the bindings left empty.
    pub fn decision(&self, depth: u32, interactive: bool) -> StimulusSet {
        let resources = self.cfg.manipulations.resources;
        let timings = &self.cfg.timings;
        let stimulus = self.stimulus_item().to_string();

        let (kind, stimuli, timing, controller) = match depth {
            0 => (
                StimulusKind::DecisionOne,
                vec![stimulus.clone(), FOCUS.to_string(), stimulus],
                Timing::from_millis(
                    0,
                    timings.decision_one.for_resources(resources),
                    timings.selection_one,
                ),
                self.binary_bindings(),
            ),
            1 => (
                StimulusKind::DecisionTwo,
                vec![stimulus.clone(), FOCUS.to_string(), stimulus],
                Timing::from_millis(
                    0,
                    timings.decision_two.for_resources(resources),
                    timings.selection_two,
                ),
                self.binary_bindings(),
            ),
            _ => (
                StimulusKind::DecisionThree,
                vec![self.blank_item(), stimulus, self.blank_item()],
                Timing::from_millis(0, timings.decision_three.for_resources(resources), 0),
                self.submit_bindings(),
            ),
        };

        StimulusSet {
            kind,
            stage: self.stage,
            stimuli,
            interactive,
            timing,
            controller: if interactive {
                controller
            } else {
                Controller::empty()
            },
            selected: None,
        }
    }

    pub fn reward(&self) -> StimulusSet {
        StimulusSet {
            kind: StimulusKind::Reward,
            stage: self.stage,
            stimuli: vec![BLANK.to_string(), REWARD.to_string(), BLANK.to_string()],
            interactive: false,
            timing: Timing::from_millis(0, self.cfg.timings.reward, 0),
            controller: Controller::empty(),
            selected: None,
        }
    }

    pub fn timeout(&self) -> StimulusSet {
        StimulusSet {
            kind: StimulusKind::Timeout,
            stage: self.stage,
            stimuli: vec![BLANK.to_string(), TIMEOUT.to_string(), BLANK.to_string()],
            interactive: false,
            timing: Timing::from_millis(0, self.cfg.timings.timeout, 0),
            controller: Controller::empty(),
            selected: None,
        }
    }

    /// The ordered stimulus sequence for this stage: level one stops after a
    /// non-interactive second decision, level two opens all three decisions,
    /// level three appends the reward display.
    pub fn sequence(&self) -> Vec<StimulusSet> {
        match self.stage.level() {
            1 => vec![
                self.fixation(),
                self.decision(0, true),
                self.decision(1, false),
            ],
            2 => vec![
                self.fixation(),
                self.decision(0, true),
                self.decision(1, true),
                self.decision(2, true),
            ],
            _ => vec![
                self.fixation(),
                self.decision(0, true),
                self.decision(1, true),
                self.decision(2, true),
                self.reward(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory_for(stage: Stage) -> (Configuration, Stage) {
        (Configuration::default(), stage)
    }

    #[test]
    fn stimuli_round_trip_through_set_stimuli() {
        let (cfg, stage) = factory_for(Stage::MainThree);
        let mut set = StimulusFactory::new(&cfg, stage).fixation();
        set.set_stimuli(vec!["left".to_string(), "right".to_string()]);
        assert_eq!(set.stimuli(), ["left", "right"]);
    }

    #[test]
    fn first_valid_selection_wins() {
        let (cfg, stage) = factory_for(Stage::MainThree);
        let mut set = StimulusFactory::new(&cfg, stage).decision(0, true);
        set.set_selected(Side::Right);
        set.set_selected(Side::Left);
        assert_eq!(set.selected(), Some(Side::Right));
    }

    #[test]
    fn binary_decisions_bind_previous_and_next() {
        let (cfg, stage) = factory_for(Stage::MainTwo);
        let mut set = StimulusFactory::new(&cfg, stage).decision(1, true);
        set.create_keybindings();
        assert_eq!(set.resolve_key("f"), Some(Side::Left));
        assert_eq!(set.resolve_key("j"), Some(Side::Right));
        assert_eq!(set.resolve_key(" "), None);
    }

    #[test]
    fn third_decision_binds_submit_as_left() {
        let (cfg, stage) = factory_for(Stage::MainTwo);
        let mut set = StimulusFactory::new(&cfg, stage).decision(2, true);
        set.create_keybindings();
        assert_eq!(set.resolve_key(" "), Some(Side::Left));
        assert_eq!(set.resolve_key("f"), None);
    }

    #[test]
    fn non_interactive_sets_never_bind() {
        let (cfg, stage) = factory_for(Stage::PracticeOne);
        let mut set = StimulusFactory::new(&cfg, stage).decision(1, false);
        set.create_keybindings();
        assert_eq!(set.resolve_key("f"), None);
        assert!(!set.is_interactive());
    }

    #[test]
    fn practice_stages_use_practice_artwork() {
        let (cfg, stage) = factory_for(Stage::PracticeTwo);
        let factory = StimulusFactory::new(&cfg, stage);
        let second = factory.decision(1, true);
        assert_eq!(second.stimuli(), ["stimulus_p", "focus", "stimulus_p"]);
        let third = factory.decision(2, true);
        assert_eq!(third.stimuli(), ["blank_p", "stimulus_p", "blank_p"]);
    }

    #[test]
    fn sequences_follow_the_stage_level() {
        let (cfg, _) = factory_for(Stage::MainThree);

        let level_one: Vec<_> = StimulusFactory::new(&cfg, Stage::PracticeOne)
            .sequence()
            .iter()
            .map(|set| (set.kind(), set.is_interactive()))
            .collect();
        assert_eq!(
            level_one,
            [
                (StimulusKind::Fixation, false),
                (StimulusKind::DecisionOne, true),
                (StimulusKind::DecisionTwo, false),
            ]
        );

        let level_three: Vec<_> = StimulusFactory::new(&cfg, Stage::MainThree)
            .sequence()
            .iter()
            .map(|set| set.kind())
            .collect();
        assert_eq!(
            level_three,
            [
                StimulusKind::Fixation,
                StimulusKind::DecisionOne,
                StimulusKind::DecisionTwo,
                StimulusKind::DecisionThree,
                StimulusKind::Reward,
            ]
        );
    }

    #[test]
    fn decision_timing_tracks_the_resource_condition() {
        let mut cfg = Configuration::default();
        cfg.manipulations.resources = crate::config::Resources::Low;
        let set = StimulusFactory::new(&cfg, Stage::MainThree).decision(0, true);
        assert_eq!(set.timing().run, Duration::from_millis(1000));
        assert_eq!(set.timing().post, Duration::from_millis(500));
        assert_eq!(set.timing().pre, Duration::ZERO);
    }
}
