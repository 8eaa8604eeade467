//! Stimulus and location name constants shared across the task modules.

/// Blank filler frame.
pub const BLANK: &str = "blank";
/// Central fixation cross.
pub const FOCUS: &str = "focus";
/// Reward (treasure) frame.
pub const REWARD: &str = "reward";
/// Explicit no-reward frame.
pub const NO_REWARD: &str = "no_reward";
/// Timeout notice frame.
pub const TIMEOUT: &str = "timeout";
/// Placeholder resolved against the current positional pair (main artwork).
pub const MAIN_STIMULUS: &str = "stimulus";
/// Placeholder resolved against the current positional pair (practice artwork).
pub const PRACTICE_STIMULUS: &str = "stimulus_p";

/// Suffix distinguishing the practice artwork set from the main set.
pub const PRACTICE_SUFFIX: &str = "_p";

/// Sentinel location key a fresh transition model starts from.
pub const START_LOCATION: &str = "start";
/// Fallback start key used by mapping graphs that omit the sentinel.
pub const START_LOCATION_ALT: &str = "0";

/// Terminal stimuli are numbered 7..=10; records store them shifted to 1..=4.
pub const REWARD_STIMULUS_OFFSET: i32 = 6;

/// Reward stimulus sentinel before `set_reward_stimulus` is called.
pub const NO_REWARD_STIMULUS: i32 = -1;
