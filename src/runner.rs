//! Driver that presents one stimulus set: a unidirectional
//! `setup -> run -> post -> finish` pipeline on cooperative timers.
//!
//! Input is accepted only during `run`. A resolving keypress records the
//! selection and triggers the highlight/flash effects immediately, but never
//! shortens the visible duration; only the captured instant reflects the
//! response. The outcome travels back as a [`Presented`] value, so a set can
//! neither complete twice nor leave a timer behind.

use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use crate::constants::PRACTICE_SUFFIX;
use crate::events::{KeyEventKind, KeySource};
use crate::scene::{compose, ControlPosition, SceneContext};
use crate::state::{Side, State};
use crate::stimuli::{StimulusKind, StimulusSet};
use crate::surface::Surface;

/// Duration of the control-indicator flash on a resolved choice.
const FLASH_INTERVAL_MS: u64 = 150;

/// A choice resolved during the run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub side: Side,
    pub pressed_at: Instant,
}

/// Result of presenting one stimulus set across its full cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presented {
    pub selection: Option<SelectionEvent>,
}

/// Present one stimulus set across `setup -> run -> post -> finish`.
pub async fn present<S: Surface>(
    set: &mut StimulusSet,
    state: &State,
    ctx: &SceneContext<'_>,
    surface: &mut S,
    keys: &mut KeySource,
) -> Presented {
    let timing = set.timing();

    // setup
    debug!(stimuli = set.name(), ms = timing.pre.as_millis() as u64, "runner 'setup'");
    surface.clear();
    let scene = compose(set, state, ctx);
    surface.render(&scene);
    sleep(timing.pre).await;

    // run
    debug!(stimuli = set.name(), ms = timing.run.as_millis() as u64, "runner 'run'");
    set.create_keybindings();

    let deadline = Instant::now() + timing.run;
    let run_timer = sleep_until(deadline);
    tokio::pin!(run_timer);

    let mut selection = None;
    let mut source_open = true;
    loop {
        tokio::select! {
            _ = &mut run_timer => break,
            event = keys.next(), if source_open => {
                let Some(event) = event else {
                    source_open = false;
                    continue;
                };
                if event.kind != KeyEventKind::Release || selection.is_some() {
                    continue;
                }
                // Keys without a binding are dropped, not errors.
                let Some(side) = set.resolve_key(&event.key) else {
                    continue;
                };
                let pressed_at = Instant::now();
                set.set_selected(side);
                apply_selection_effects(set, state, side, surface);
                set.remove_keybindings();
                selection = Some(SelectionEvent { side, pressed_at });
            }
        }
    }

    // post
    debug!(stimuli = set.name(), ms = timing.post.as_millis() as u64, "runner 'post'");
    set.remove_keybindings();
    sleep(timing.post).await;

    // finish
    debug!(stimuli = set.name(), "runner 'finish'");
    surface.clear();

    Presented { selection }
}

/// Outline the chosen stimulus and flash the matching control indicator.
/// Missing elements degrade to a warning; the trial keeps moving.
fn apply_selection_effects<S: Surface>(
    set: &StimulusSet,
    state: &State,
    side: Side,
    surface: &mut S,
) {
    let suffix = if set.stage().is_practice() {
        PRACTICE_SUFFIX
    } else {
        ""
    };
    match state.current_pair().get(side.index()) {
        Some(stimulus) => {
            let element = format!("{stimulus}{suffix}");
            debug!(%element, "highlighting selection");
            if let Err(err) = surface.highlight(&element, "white") {
                warn!("highlight skipped: {err}");
            }
        }
        None => warn!(side = side.as_str(), "no stimulus to highlight"),
    }

    // The final decision registers as a left choice but sits above the middle
    // control.
    let position = match side {
        Side::Left if set.kind() == StimulusKind::DecisionThree => ControlPosition::Middle,
        Side::Left => ControlPosition::Left,
        Side::Right => ControlPosition::Right,
    };
    if let Err(err) = surface.flash_control(
        position,
        true,
        std::time::Duration::from_millis(FLASH_INTERVAL_MS),
    ) {
        warn!("control flash skipped: {err}");
    }
}
