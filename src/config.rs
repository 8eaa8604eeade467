//! Experiment configuration: timings, manipulations, keymaps, and the
//! scripted-reward settings.
//!
//! Defaults match the deployed study parameters; any subset can be overridden
//! from a JSON document.

use serde::{Deserialize, Serialize};

/// Resource condition selecting the decision window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resources {
    High,
    Low,
}

/// Physical control layout the participant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Keyboard,
    Spectrometer,
    Touch,
}

/// A decision window that differs between the resource conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionWindow {
    pub high: u64,
    pub low: u64,
}

impl DecisionWindow {
    pub fn for_resources(self, resources: Resources) -> u64 {
        match resources {
            Resources::High => self.high,
            Resources::Low => self.low,
        }
    }
}

/// Timing budgets in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub fixation: u64,
    pub decision_one: DecisionWindow,
    /// Time the first selection stays outlined.
    pub selection_one: u64,
    pub decision_two: DecisionWindow,
    /// Time the second selection stays outlined.
    pub selection_two: u64,
    /// Delay before the final room's outline appears.
    pub forced_waiting: u64,
    pub decision_three: DecisionWindow,
    pub reward: u64,
    pub timeout: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            fixation: 1000,
            decision_one: DecisionWindow {
                high: 3000,
                low: 1000,
            },
            selection_one: 500,
            decision_two: DecisionWindow {
                high: 3000,
                low: 1000,
            },
            selection_two: 400,
            forced_waiting: 500,
            decision_three: DecisionWindow {
                high: 3000,
                low: 1000,
            },
            reward: 3000,
            timeout: 5000,
        }
    }
}

/// Experimental manipulations: trial counts, transition probability,
/// timeout monitoring, and break scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Manipulations {
    /// Duration of the countdown between trial blocks, in seconds.
    pub inter_trial_countdown: u32,
    /// Probability of a common transition.
    pub probability: f64,
    pub resources: Resources,

    pub level_one_practice_trials: u32,
    pub level_two_practice_trials: u32,
    pub level_three_practice_trials: u32,
    pub level_one_main_trials: u32,
    pub level_two_main_trials: u32,
    pub level_three_main_trials: u32,

    /// Number of timed-out trials before the timeout message changes.
    pub timeout_count: u32,
    /// Whether participants with too many timeouts are removed.
    pub timeout_restrictions: bool,
    /// Proportion of acceptable timeouts.
    pub timeout_proportion: f64,

    pub enable_breaks: bool,
    pub break_frequency: u32,
}

impl Default for Manipulations {
    fn default() -> Self {
        Self {
            inter_trial_countdown: 15,
            probability: 0.7,
            resources: Resources::High,
            level_one_practice_trials: 5,
            level_two_practice_trials: 10,
            level_three_practice_trials: 20,
            level_one_main_trials: 5,
            level_two_main_trials: 10,
            level_three_main_trials: 250,
            timeout_count: 10,
            timeout_restrictions: false,
            timeout_proportion: 0.3,
            enable_breaks: true,
            break_frequency: 50,
        }
    }
}

/// Scripted reward overrides used while the participant is still learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cheats {
    /// Log the reward stimulus at trial start. Leave `false` for deployment.
    pub show_reward: bool,
    /// Enable the reward-streak injection.
    pub increase_practice_rewards: bool,
    /// Number of consecutive unrewarded trials before a reward is placed.
    pub practice_reward_delta: u32,
    /// Ordinal of the reward-visible practice trial that receives a forced
    /// first reward.
    pub practice_first_reward: u32,
}

impl Default for Cheats {
    fn default() -> Self {
        Self {
            show_reward: false,
            increase_practice_rewards: true,
            practice_reward_delta: 5,
            practice_first_reward: 2,
        }
    }
}

/// Key assignments for one controller layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keymap {
    pub name: String,
    pub next: String,
    pub previous: String,
    pub alt: String,
    pub submit: String,
    #[serde(default)]
    pub trigger: Option<String>,
    pub show_buttons: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keymaps {
    pub keyboard: Keymap,
    pub spectrometer: Keymap,
}

impl Default for Keymaps {
    fn default() -> Self {
        Self {
            keyboard: Keymap {
                name: "keyboard".to_string(),
                next: "j".to_string(),
                previous: "f".to_string(),
                alt: "d".to_string(),
                submit: " ".to_string(),
                trigger: None,
                show_buttons: false,
            },
            spectrometer: Keymap {
                name: "spectrometer".to_string(),
                next: "3".to_string(),
                previous: "2".to_string(),
                alt: "1".to_string(),
                submit: "4".to_string(),
                trigger: Some("5".to_string()),
                show_buttons: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub name: String,
    pub study_name: String,
    pub manipulations: Manipulations,
    pub timings: Timings,
    pub controller: ControllerKind,
    pub keymaps: Keymaps,
    pub cheats: Cheats,
    /// Seed for any random numbers generated.
    pub seed: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Maze".to_string(),
            study_name: "three_step_game".to_string(),
            manipulations: Manipulations::default(),
            timings: Timings::default(),
            controller: ControllerKind::Keyboard,
            keymaps: Keymaps::default(),
            cheats: Cheats::default(),
            seed: "threestep".to_string(),
        }
    }
}

impl Configuration {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// The keymap matching the configured controller. The touch layout has no
    /// key assignments of its own and falls back to the keyboard map.
    pub fn keymap(&self) -> &Keymap {
        match self.controller {
            ControllerKind::Keyboard | ControllerKind::Touch => &self.keymaps.keyboard,
            ControllerKind::Spectrometer => &self.keymaps.spectrometer,
        }
    }

    /// Fold the textual seed into a 64-bit PRNG seed (FNV-1a).
    pub fn seed_value(&self) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in self.seed.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}
