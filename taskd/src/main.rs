//! Three-step task daemon: headless session driver.
//!
//! Runs the full trial timeline against a simulated participant and exports
//! the behavioural records, mirroring what the in-browser deployment hands
//! to its data sink.
//!
//! Examples:
//!   taskd generate
//!   taskd generate --out trials.json
//!   taskd simulate --fast
//!   taskd simulate --trials trials.json --out records.jsonl --seed 42
//!
//! Without `--trials`, `simulate` generates a collection on the fly from the
//! configured seed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use threestep::config::{Configuration, ControllerKind, Keymap};
use threestep::events::{KeyEvent, KeySource};
use threestep::generate::TrialCollection;
use threestep::scene::{Control, Scene};
use threestep::session::{RecordSink, RewardStats, SessionData};
use threestep::stage::Stage;
use threestep::state::Side;
use threestep::surface::{Surface, SurfaceError};
use threestep::timeline::build_timeline;
use threestep::trial::Trial;

mod export;
mod paths;
mod policy;

use export::JsonlSink;
use paths::AppPaths;
use policy::{Policy, RandomPolicy};

/// Timing divisor applied by `--fast`.
const FAST_DIVISOR: u64 = 50;

/// What the currently rendered scene asks of the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneCue {
    /// Left/right decision with active controls.
    Binary,
    /// Single submit control (third decision).
    Submit,
}

/// Surface that renders nothing but announces response opportunities to the
/// simulated participant.
struct SimSurface {
    cues: UnboundedSender<SceneCue>,
}

impl SimSurface {
    fn classify(scene: &Scene) -> Option<SceneCue> {
        let enabled = |control: &Control| match control {
            Control::Button { enabled, .. } | Control::Image { enabled, .. } => *enabled,
            Control::Blank => false,
        };
        if enabled(&scene.controls[0]) || enabled(&scene.controls[2]) {
            return Some(SceneCue::Binary);
        }
        if enabled(&scene.controls[1]) {
            return Some(SceneCue::Submit);
        }
        None
    }
}

impl Surface for SimSurface {
    fn clear(&mut self) {}

    fn render(&mut self, scene: &Scene) {
        if let Some(cue) = Self::classify(scene) {
            let _ = self.cues.send(cue);
        }
    }

    fn highlight(&mut self, _element: &str, _colour: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn flash_control(
        &mut self,
        _position: threestep::scene::ControlPosition,
        _hold: bool,
        _interval: Duration,
    ) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_background(&mut self, _colour: &str) {}

    fn set_cursor_visible(&mut self, _visible: bool) {}
}

/// Respond to scene cues with policy-chosen keys after a sampled reaction
/// time.
async fn drive_policy(
    mut cues: UnboundedReceiver<SceneCue>,
    keys: UnboundedSender<KeyEvent>,
    keymap: Keymap,
    mut policy: RandomPolicy,
) {
    while let Some(cue) = cues.recv().await {
        if policy.lapses() {
            continue;
        }
        tokio::time::sleep(Duration::from_millis(policy.reaction_ms())).await;
        let key = match cue {
            SceneCue::Binary => match policy.decide() {
                Side::Left => keymap.previous.clone(),
                Side::Right => keymap.next.clone(),
            },
            SceneCue::Submit => keymap.submit.clone(),
        };
        if keys.send(KeyEvent::press(key.clone())).is_err() {
            return;
        }
        if keys.send(KeyEvent::release(key)).is_err() {
            return;
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(index) = args.iter().position(|arg| arg == flag) {
        args.remove(index);
        true
    } else {
        false
    }
}

fn take_option(args: &mut Vec<String>, option: &str) -> Option<String> {
    let index = args.iter().position(|arg| arg == option)?;
    if index + 1 >= args.len() {
        return None;
    }
    args.remove(index);
    Some(args.remove(index))
}

fn scale_timings(cfg: &mut Configuration, divisor: u64) {
    let scale = |ms: &mut u64| *ms = (*ms / divisor).max(1);
    let timings = &mut cfg.timings;
    scale(&mut timings.fixation);
    scale(&mut timings.decision_one.high);
    scale(&mut timings.decision_one.low);
    scale(&mut timings.selection_one);
    scale(&mut timings.decision_two.high);
    scale(&mut timings.decision_two.low);
    scale(&mut timings.selection_two);
    scale(&mut timings.forced_waiting);
    scale(&mut timings.decision_three.high);
    scale(&mut timings.decision_three.low);
    scale(&mut timings.reward);
    scale(&mut timings.timeout);
}

fn load_configuration(path: Option<&str>) -> Result<Configuration, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)?;
            Ok(Configuration::from_json(&source)?)
        }
        None => Ok(Configuration::default()),
    }
}

fn load_collection(
    cfg: &Configuration,
    path: Option<PathBuf>,
) -> Result<TrialCollection, Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => {
            info!("Loading trial collection from {}", path.display());
            let source = std::fs::read_to_string(&path)?;
            Ok(TrialCollection::from_json(&source)?)
        }
        Some(path) => {
            warn!("No collection at {}, generating instead", path.display());
            Ok(TrialCollection::generate(cfg))
        }
        None => Ok(TrialCollection::generate(cfg)),
    }
}

async fn simulate(
    cfg: Configuration,
    collection: TrialCollection,
    out: PathBuf,
    policy_seed: u64,
    fast: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let timeline = build_timeline(&cfg, &collection);
    info!("Timeline holds {} trials", timeline.len());

    let mut sink = JsonlSink::create(&out)?;
    let mut session = SessionData::new();

    let (keys_tx, mut keys) = KeySource::channel();
    let (cue_tx, cue_rx) = mpsc::unbounded_channel();
    let mut surface = SimSurface { cues: cue_tx };

    let (min_rt, max_rt) = if fast {
        (300 / FAST_DIVISOR, 1500 / FAST_DIVISOR)
    } else {
        (300, 1500)
    };
    let participant = RandomPolicy::new(policy_seed, min_rt, max_rt, 0.02);
    let driver = tokio::spawn(drive_policy(
        cue_rx,
        keys_tx,
        cfg.keymap().clone(),
        participant,
    ));

    let mut rewards = RewardStats::new(50);
    let mut gated = false;
    let mut stage_counters: HashMap<Stage, u32> = HashMap::new();

    for params in timeline {
        // The timeout gate sits between the practice and main blocks.
        if cfg.manipulations.timeout_restrictions && params.stage.is_main() && !gated {
            gated = true;
            if !session.check_timeouts(Stage::PracticeThree, &cfg) {
                warn!("Too many timeouts during practice, ending session");
                break;
            }
        }

        let ordinal = {
            let counter = stage_counters.entry(params.stage).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        let id = format!("{}-{}", params.stage, ordinal);
        let trial = Trial::new(&cfg, params);
        let completed = trial.run(&id, &session, &mut surface, &mut keys).await;

        if completed.record.stage == Stage::MainThree {
            rewards.record_trial(completed.record.rewarded != 0);
        }

        sink.push(&completed.record);
        session.push(completed.record);

        let count = session.trial_count();
        if count > 0
            && count % 5 == 0
            && matches!(
                cfg.controller,
                ControllerKind::Keyboard | ControllerKind::Spectrometer
            )
        {
            sink.partial_export(&session);
        }
    }

    driver.abort();
    sink.flush()?;

    info!(
        "Session complete: {} trials, {} timeouts",
        session.trial_count(),
        session.timeout_sum()
    );
    info!(
        "Rewarded {} time/s ({:.1}%) across the final main stage",
        rewards.rewarded,
        rewards.rate() * 100.0
    );
    info!("Records written to {}", sink.path().display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let fast = take_flag(&mut args, "--fast");
    let config_path = take_option(&mut args, "--config");
    let trials_path = take_option(&mut args, "--trials").map(PathBuf::from);
    let out_path = take_option(&mut args, "--out").map(PathBuf::from);
    let seed = take_option(&mut args, "--seed")
        .and_then(|seed| seed.parse::<u64>().ok())
        .unwrap_or(0xB4A7_1D2B);
    let command = args.first().map(String::as_str).unwrap_or("simulate");

    let mut cfg = load_configuration(config_path.as_deref())?;
    let paths = AppPaths::new()?;
    info!("Data directory: {}", paths.data_dir().display());

    match command {
        "generate" => {
            let collection = TrialCollection::generate(&cfg);
            let out = out_path.unwrap_or_else(|| paths.trials_file());
            std::fs::write(&out, collection.to_json()?)?;
            for stage in Stage::ALL {
                info!(
                    "{}: {} trials generated",
                    stage,
                    collection.stage(stage).len()
                );
            }
            info!("Collection written to {}", out.display());
            Ok(())
        }
        "simulate" => {
            if fast {
                scale_timings(&mut cfg, FAST_DIVISOR);
            }
            let collection = load_collection(&cfg, trials_path)?;
            let out = out_path.unwrap_or_else(|| paths.records_file());
            simulate(cfg, collection, out, seed, fast).await
        }
        other => {
            eprintln!("Unknown command '{other}'. Use 'generate' or 'simulate'.");
            std::process::exit(2);
        }
    }
}
