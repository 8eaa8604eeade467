//! Trial collection generation.
//!
//! Produces the pre-resolved mapping graphs the runtime consumes: the
//! counter-balanced stimulus layout, the sampled common/rare transition
//! script, and the reward schedule whose stay times follow N(5, 2) and sum
//! exactly to the requested trial count.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Configuration;
use crate::prng::Prng;
use crate::stage::Stage;
use crate::state::{MappingGraph, MappingNode};

/// Mean of the reward stay-time distribution, in trials.
const STAY_MEAN: f64 = 5.0;
/// Standard deviation of the stay-time distribution (variance 2).
const STAY_STD: f64 = 1.4142;
/// Bail-out for the exact-sum rejection loop.
const MAX_STAY_ITERATIONS: u32 = 100_000;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("trial collection is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transition type of one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Common,
    Rare,
}

impl Transition {
    pub fn letter(self) -> char {
        match self {
            Transition::Common => 'C',
            Transition::Rare => 'R',
        }
    }
}

/// One generated trial, in the shape the collection file stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub trial_count: u32,
    pub mappings: MappingGraph,
    /// Rewarding terminal stimulus, 7..=10.
    pub reward_stimulus: i32,
    /// Most frequently rewarding stimulus so far.
    pub high_rewarding: i32,
    /// Two-letter transition script, e.g. `CR`.
    pub transitions: String,
}

impl TrialSpec {
    /// Transition flag for hop 0 or 1: 0 = common, 1 = rare.
    pub fn transition_flag(&self, hop: usize) -> i32 {
        match self.transitions.chars().nth(hop) {
            Some('C') => 0,
            Some('R') => 1,
            other => {
                warn!(?other, hop, "malformed transition script");
                0
            }
        }
    }
}

/// Per-stage trial lists, as stored in the collection file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialCollection {
    pub trials: HashMap<String, Vec<TrialSpec>>,
}

impl TrialCollection {
    pub fn stage(&self, stage: Stage) -> &[TrialSpec] {
        self.trials
            .get(stage.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn from_json(source: &str) -> Result<Self, CollectionError> {
        let collection: TrialCollection = serde_json::from_str(source)?;
        for (stage, trials) in &collection.trials {
            info!("[JSON] {} '{stage}' trials", trials.len());
        }
        Ok(collection)
    }

    pub fn to_json(&self) -> Result<String, CollectionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generate a full collection for every stage, sized from the configured
    /// trial counts and seeded from the configured seed.
    pub fn generate(cfg: &Configuration) -> Self {
        let mut rng = Prng::new(cfg.seed_value());
        let probability = cfg.manipulations.probability;
        let manipulations = &cfg.manipulations;

        let mut trials = HashMap::new();
        for stage in Stage::ALL {
            let total = match stage {
                Stage::PracticeOne => manipulations.level_one_practice_trials,
                Stage::PracticeTwo => manipulations.level_two_practice_trials,
                Stage::PracticeThree => manipulations.level_three_practice_trials,
                Stage::MainOne => manipulations.level_one_main_trials,
                Stage::MainTwo => manipulations.level_two_main_trials,
                Stage::MainThree => manipulations.level_three_main_trials,
            };
            trials.insert(
                stage.as_str().to_string(),
                generate_stage(&mut rng, total, probability),
            );
        }
        Self { trials }
    }
}

fn pair(left: i32, right: i32) -> MappingNode {
    MappingNode::pair(left.to_string(), right.to_string())
}

/// Generate the mapping graph and transition script for one trial.
///
/// Starts from the all-common layout {start: [1,2], 1: [3,4], 2: [5,6],
/// 3..6: [7..10]}, counter-balances the visible pairs, then applies the
/// sampled rare swaps: hop one exchanges the subtrees of 1 and 2, hop two
/// exchanges 3 with 5 and 4 with 6.
pub fn generate_trial_mappings(
    rng: &mut Prng,
    common_probability: f64,
) -> (MappingGraph, [Transition; 2]) {
    let mut start = pair(1, 2);
    let mut one = pair(3, 4);
    let mut two = pair(5, 6);
    let mut three = MappingNode::terminal("7");
    let mut four = MappingNode::terminal("8");
    let mut five = MappingNode::terminal("9");
    let mut six = MappingNode::terminal("10");

    // Counter-balance the displayed pairs.
    if rng.chance(0.5) {
        start = pair(2, 1);
    }
    if rng.chance(0.5) {
        one = pair(4, 3);
    }
    if rng.chance(0.5) {
        two = pair(6, 5);
    }

    let transitions = [
        if rng.chance(common_probability) {
            Transition::Common
        } else {
            Transition::Rare
        },
        if rng.chance(common_probability) {
            Transition::Common
        } else {
            Transition::Rare
        },
    ];

    // First-to-second-state rare transition swaps the subtrees of 1 and 2.
    if transitions[0] == Transition::Rare {
        std::mem::swap(&mut one, &mut two);
    }
    // Second-to-third-state rare transition crosses the terminal mappings.
    if transitions[1] == Transition::Rare {
        std::mem::swap(&mut three, &mut five);
        std::mem::swap(&mut four, &mut six);
    }

    let mut mappings = MappingGraph::new();
    mappings.insert("start".to_string(), start);
    mappings.insert("1".to_string(), one);
    mappings.insert("2".to_string(), two);
    mappings.insert("3".to_string(), three);
    mappings.insert("4".to_string(), four);
    mappings.insert("5".to_string(), five);
    mappings.insert("6".to_string(), six);

    (mappings, transitions)
}

fn sample_stay(rng: &mut Prng) -> u32 {
    loop {
        let stay = rng.normal(STAY_MEAN, STAY_STD).round();
        if stay >= 1.0 {
            return stay as u32;
        }
    }
}

/// Chunk `total_trials` into reward stay times that sum exactly to it.
fn generate_stay_times(rng: &mut Prng, total_trials: u32) -> Vec<u32> {
    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > MAX_STAY_ITERATIONS {
            warn!(total_trials, "stay-time sampling did not converge, padding");
            return vec![total_trials];
        }

        let mut chunks: Vec<u32> = Vec::new();
        let mut stay = 0;
        while chunks.iter().sum::<u32>() + stay <= total_trials {
            stay = sample_stay(rng);
            chunks.push(stay);
        }
        if chunks.iter().sum::<u32>() == total_trials {
            return chunks;
        }
    }
}

/// Modal reward stimulus among the specs generated so far.
fn frequent_reward(specs: &[TrialSpec], current: i32) -> i32 {
    if specs.is_empty() {
        return current;
    }
    let mut counts: HashMap<i32, u32> = HashMap::new();
    for spec in specs {
        *counts.entry(spec.reward_stimulus).or_insert(0) += 1;
    }
    // Ties resolve to the lowest stimulus so generation stays deterministic.
    counts
        .into_iter()
        .max_by_key(|(stimulus, count)| (*count, -stimulus))
        .map(|(stimulus, _count)| stimulus)
        .unwrap_or(current)
}

/// Generate one stage's trials: a reward schedule of exact-sum stay chunks,
/// each chunk holding its reward stimulus constant, with a fresh mapping
/// graph per trial.
pub fn generate_stage(rng: &mut Prng, total_trials: u32, common_probability: f64) -> Vec<TrialSpec> {
    let stay_times = generate_stay_times(rng, total_trials);

    let mut specs: Vec<TrialSpec> = Vec::with_capacity(total_trials as usize);
    let mut previous_stimulus = -1;
    let mut trial_count = 0;

    for stay in stay_times {
        // A new reward location, never the same as the previous chunk's.
        let mut stimulus = rng.gen_range_u32(7, 11) as i32;
        while stimulus == previous_stimulus {
            stimulus = rng.gen_range_u32(7, 11) as i32;
        }
        previous_stimulus = stimulus;

        for _ in 0..stay {
            let (mappings, transitions) = generate_trial_mappings(rng, common_probability);
            let high_rewarding = frequent_reward(&specs, stimulus);
            specs.push(TrialSpec {
                trial_count,
                mappings,
                reward_stimulus: stimulus,
                high_rewarding,
                transitions: format!("{}{}", transitions[0].letter(), transitions[1].letter()),
            });
            trial_count += 1;
        }
    }

    specs
}
