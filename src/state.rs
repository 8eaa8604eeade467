//! Transition model: the probabilistic mapping graph for one trial and the
//! participant's position inside it.
//!
//! The graph is already resolved upstream: each location holds exactly the
//! pair of stimuli reachable from it on this trial (common/rare sampling
//! happens at generation time), so traversal is a plain lookup.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::constants::{NO_REWARD_STIMULUS, START_LOCATION, START_LOCATION_ALT};

/// Stimuli reachable from one location, in display order (index 0 = left).
/// Terminal locations carry a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingNode {
    pub stimuli: Vec<String>,
}

impl MappingNode {
    pub fn pair(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            stimuli: vec![left.into(), right.into()],
        }
    }

    pub fn terminal(stimulus: impl Into<String>) -> Self {
        Self {
            stimuli: vec![stimulus.into()],
        }
    }
}

/// Location key to reachable-pair mapping for a whole trial.
pub type MappingGraph = HashMap<String, MappingNode>;

/// A resolved left/right choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Index into a positional pair.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// State abstraction: current depth, location, and the stimuli on display.
#[derive(Debug, Clone)]
pub struct State {
    id: String,
    depth: u32,
    column: u32,
    mappings: MappingGraph,
    reward_stimulus: i32,
    current_location: String,
    positional: Vec<String>,
}

impl State {
    pub fn new(id: impl Into<String>, mappings: MappingGraph) -> Self {
        let current_location = if mappings.contains_key(START_LOCATION) {
            START_LOCATION.to_string()
        } else {
            START_LOCATION_ALT.to_string()
        };
        let positional = mappings
            .get(current_location.as_str())
            .map(|node| node.stimuli.clone())
            .unwrap_or_default();

        Self {
            id: id.into(),
            depth: 0,
            column: 1,
            mappings,
            reward_stimulus: NO_REWARD_STIMULUS,
            current_location,
            positional,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current decision index, 0..=2 while decisions are pending.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Positional marker used by layout bookkeeping. Initialised to 1 and not
    /// mutated by traversal.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Record the rewarding terminal stimulus for this trial.
    pub fn set_reward_stimulus(&mut self, stimulus: i32) {
        self.reward_stimulus = stimulus;
    }

    pub fn is_reward_stimulus(&self, stimulus: i32) -> bool {
        stimulus == self.reward_stimulus
    }

    /// The stimuli reachable from the current location, in display order.
    pub fn current_pair(&self) -> &[String] {
        &self.positional
    }

    pub fn current_location(&self) -> &str {
        &self.current_location
    }

    pub fn mappings(&self) -> &MappingGraph {
        &self.mappings
    }

    /// Move to the next location.
    ///
    /// A missing selection is a timeout: the participant did not act, so the
    /// traversal falls back to the left stimulus without counting a decision.
    /// Real selections increment the depth by exactly one.
    pub fn advance(&mut self, selection: Option<Side>) {
        let side = match selection {
            None => {
                warn!("no selection made, selected 'left' by default");
                Side::Left
            }
            Some(side) => {
                self.depth += 1;
                side
            }
        };

        let Some(node) = self.mappings.get(self.current_location.as_str()) else {
            error!(
                location = %self.current_location,
                "current location missing from mapping graph"
            );
            return;
        };
        let Some(destination) = node.stimuli.get(side.index()).cloned() else {
            error!(
                location = %self.current_location,
                side = side.as_str(),
                "selected side has no destination"
            );
            return;
        };

        self.positional = self
            .mappings
            .get(destination.as_str())
            .map(|node| node.stimuli.clone())
            .unwrap_or_default();
        self.current_location = destination;
    }
}
