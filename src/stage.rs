//! Stage labels selecting which decisions of a trial are interactive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six blocks a trial can belong to.
///
/// The level determines how deep the participant can interact: level one
/// stops after the first decision, level two opens all three decisions, and
/// level three additionally shows the reward outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PracticeOne,
    PracticeTwo,
    PracticeThree,
    MainOne,
    MainTwo,
    MainThree,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::PracticeOne,
        Stage::PracticeTwo,
        Stage::PracticeThree,
        Stage::MainOne,
        Stage::MainTwo,
        Stage::MainThree,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PracticeOne => "practice_one",
            Stage::PracticeTwo => "practice_two",
            Stage::PracticeThree => "practice_three",
            Stage::MainOne => "main_one",
            Stage::MainTwo => "main_two",
            Stage::MainThree => "main_three",
        }
    }

    pub fn is_practice(self) -> bool {
        matches!(
            self,
            Stage::PracticeOne | Stage::PracticeTwo | Stage::PracticeThree
        )
    }

    pub fn is_main(self) -> bool {
        !self.is_practice()
    }

    /// Block level, 1..=3.
    pub fn level(self) -> u8 {
        match self {
            Stage::PracticeOne | Stage::MainOne => 1,
            Stage::PracticeTwo | Stage::MainTwo => 2,
            Stage::PracticeThree | Stage::MainThree => 3,
        }
    }

    /// Whether the reward outcome is shown at the end of trials in this stage.
    pub fn reward_visible(self) -> bool {
        self.level() == 3
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}
