//! Typed description of what one stimulus set looks like on screen.
//!
//! A [`Scene`] is the render-side contract: the header line, the three
//! stimulus frames, and the three control indicators. Surfaces turn it into
//! whatever their medium needs; the core never touches a real display.

use crate::config::{ControllerKind, Keymap};
use crate::constants::{BLANK, NO_REWARD, PRACTICE_SUFFIX, REWARD, TIMEOUT};
use crate::state::State;
use crate::stimuli::{StimulusKind, StimulusSet};

/// Position of a control indicator below the stimuli.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub text: String,
    pub colour: &'static str,
}

/// One stimulus frame: the element id a highlight can address plus the asset
/// behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: String,
    pub asset: String,
}

/// A control indicator slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Blank,
    Button { label: String, enabled: bool },
    Image { asset: String, enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub background: &'static str,
    pub header: Header,
    pub frames: Vec<Frame>,
    pub controls: [Control; 3],
}

/// Session-level inputs the scene depends on beyond the stimulus set itself.
#[derive(Debug, Clone, Copy)]
pub struct SceneContext<'a> {
    pub controller: ControllerKind,
    pub keymap: &'a Keymap,
    /// Timed-out trials so far; switches the timeout message once it exceeds
    /// the threshold.
    pub timeouts_so_far: u32,
    pub timeout_threshold: u32,
}

/// Asset file behind a stimulus key.
pub fn asset_source(name: &str) -> String {
    if name == REWARD {
        "treasure_chest.gif".to_string()
    } else {
        format!("{name}.png")
    }
}

fn header(set: &StimulusSet, ctx: &SceneContext<'_>) -> Header {
    let middle = set.stimuli().get(1).map(String::as_str);
    match middle {
        Some(REWARD) => Header {
            text: "You found the treasure!".to_string(),
            colour: "#46CB2C",
        },
        Some(NO_REWARD) => Header {
            text: "You didn't find any treasure.".to_string(),
            colour: "red",
        },
        Some(TIMEOUT) => Header {
            text: if ctx.timeouts_so_far > ctx.timeout_threshold {
                "You have been too slow to respond in many games. \
                 Please pay attention to the games."
                    .to_string()
            } else {
                "You were too slow in responding.".to_string()
            },
            colour: "red",
        },
        _ if set.kind() == StimulusKind::Fixation => Header {
            text: "Next game starting...".to_string(),
            colour: "white",
        },
        _ => Header {
            text: String::new(),
            colour: "white",
        },
    }
}

fn frames(set: &StimulusSet, state: &State) -> Vec<Frame> {
    let pair = state.current_pair();
    set.stimuli()
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let key = if item.starts_with("stimulus") {
                let suffix = if item.ends_with(PRACTICE_SUFFIX) {
                    PRACTICE_SUFFIX
                } else {
                    ""
                };
                // Two layouts to consider here:
                //    1) left, focus, right     (first & second decision)
                //    2) blank, stimulus, blank (third decision)
                let slot = if position <= 1 { 0 } else { 1 };
                let resolved = pair.get(slot).map(String::as_str).unwrap_or(BLANK);
                format!("{resolved}{suffix}")
            } else {
                item.clone()
            };
            Frame {
                asset: asset_source(&key),
                id: key,
            }
        })
        .collect()
}

fn side_control(
    set: &StimulusSet,
    ctx: &SceneContext<'_>,
    item: Option<&String>,
    key_label: &str,
    spectrometer_asset: &str,
) -> Control {
    let blank = item.map(|item| item.starts_with(BLANK)).unwrap_or(true);
    if blank {
        return Control::Blank;
    }
    let enabled = set.is_interactive();
    if ctx.controller == ControllerKind::Spectrometer {
        Control::Image {
            asset: format!("{spectrometer_asset}.png"),
            enabled,
        }
    } else {
        Control::Button {
            label: key_label.to_uppercase(),
            enabled,
        }
    }
}

fn middle_control(set: &StimulusSet, ctx: &SceneContext<'_>) -> Control {
    if set.kind() != StimulusKind::DecisionThree {
        return Control::Blank;
    }
    if ctx.controller == ControllerKind::Spectrometer {
        Control::Image {
            asset: "btn_4.png".to_string(),
            enabled: true,
        }
    } else {
        let label = if ctx.keymap.submit == " " {
            "Space".to_string()
        } else {
            ctx.keymap.submit.to_uppercase()
        };
        Control::Button {
            label,
            enabled: true,
        }
    }
}

/// Compose the full scene for one stimulus set against the current state.
pub fn compose(set: &StimulusSet, state: &State, ctx: &SceneContext<'_>) -> Scene {
    let controls = [
        side_control(set, ctx, set.stimuli().first(), &ctx.keymap.previous, "btn_2"),
        middle_control(set, ctx),
        side_control(set, ctx, set.stimuli().get(2), &ctx.keymap.next, "btn_4"),
    ];

    Scene {
        background: "black",
        header: header(set, ctx),
        frames: frames(set, state),
        controls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::constants::FOCUS;
    use crate::stage::Stage;
    use crate::state::{MappingGraph, MappingNode, Side, State};
    use crate::stimuli::StimulusFactory;

    fn task_state() -> State {
        let mut mappings = MappingGraph::new();
        mappings.insert("start".to_string(), MappingNode::pair("2", "1"));
        mappings.insert("1".to_string(), MappingNode::pair("3", "4"));
        mappings.insert("2".to_string(), MappingNode::pair("5", "6"));
        mappings.insert("5".to_string(), MappingNode::terminal("9"));
        State::new("scene-test", mappings)
    }

    fn ctx(cfg: &Configuration) -> SceneContext<'_> {
        SceneContext {
            controller: cfg.controller,
            keymap: cfg.keymap(),
            timeouts_so_far: 0,
            timeout_threshold: cfg.manipulations.timeout_count,
        }
    }

    #[test]
    fn binary_decision_shows_the_pair_in_display_order() {
        let cfg = Configuration::default();
        let state = task_state();
        let set = StimulusFactory::new(&cfg, Stage::MainOne).decision(0, true);
        let scene = compose(&set, &state, &ctx(&cfg));

        assert_eq!(scene.frames[0].id, "2");
        assert_eq!(scene.frames[1].id, "focus");
        assert_eq!(scene.frames[2].id, "1");
        assert_eq!(scene.frames[0].asset, "2.png");
    }

    #[test]
    fn third_decision_centres_the_first_pair_entry() {
        let cfg = Configuration::default();
        let mut state = task_state();
        state.advance(Some(Side::Left));
        state.advance(Some(Side::Left));
        assert_eq!(state.current_pair(), ["9"]);

        let set = StimulusFactory::new(&cfg, Stage::MainTwo).decision(2, true);
        let scene = compose(&set, &state, &ctx(&cfg));
        assert_eq!(scene.frames[0].id, "blank");
        assert_eq!(scene.frames[1].id, "9");
        assert_eq!(scene.frames[2].id, "blank");
    }

    #[test]
    fn practice_frames_carry_the_practice_suffix() {
        let cfg = Configuration::default();
        let state = task_state();
        let set = StimulusFactory::new(&cfg, Stage::PracticeOne).decision(0, true);
        let scene = compose(&set, &state, &ctx(&cfg));
        assert_eq!(scene.frames[0].id, "2_p");
        assert_eq!(scene.frames[2].id, "1_p");
    }

    #[test]
    fn controls_follow_interactivity_and_kind() {
        let cfg = Configuration::default();
        let state = task_state();
        let factory = StimulusFactory::new(&cfg, Stage::MainOne);

        let interactive = compose(&factory.decision(0, true), &state, &ctx(&cfg));
        assert_eq!(
            interactive.controls[0],
            Control::Button {
                label: "F".to_string(),
                enabled: true
            }
        );
        assert_eq!(interactive.controls[1], Control::Blank);

        let filler = compose(&factory.decision(1, false), &state, &ctx(&cfg));
        assert_eq!(
            filler.controls[2],
            Control::Button {
                label: "J".to_string(),
                enabled: false
            }
        );

        let third = compose(
            &StimulusFactory::new(&cfg, Stage::MainTwo).decision(2, true),
            &state,
            &ctx(&cfg),
        );
        assert_eq!(third.controls[0], Control::Blank);
        assert_eq!(
            third.controls[1],
            Control::Button {
                label: "Space".to_string(),
                enabled: true
            }
        );
    }

    #[test]
    fn spectrometer_layout_uses_button_images() {
        let mut cfg = Configuration::default();
        cfg.controller = ControllerKind::Spectrometer;
        let state = task_state();
        let set = StimulusFactory::new(&cfg, Stage::MainThree).decision(0, true);
        let scene = compose(&set, &state, &ctx(&cfg));
        assert_eq!(
            scene.controls[0],
            Control::Image {
                asset: "btn_2.png".to_string(),
                enabled: true
            }
        );
    }

    #[test]
    fn header_text_matches_the_middle_frame() {
        let cfg = Configuration::default();
        let state = task_state();
        let factory = StimulusFactory::new(&cfg, Stage::MainThree);

        let reward = compose(&factory.reward(), &state, &ctx(&cfg));
        assert_eq!(reward.header.text, "You found the treasure!");
        assert_eq!(reward.frames[1].asset, "treasure_chest.gif");

        let mut no_reward_set = factory.reward();
        no_reward_set.set_stimuli(vec![
            BLANK.to_string(),
            NO_REWARD.to_string(),
            BLANK.to_string(),
        ]);
        let no_reward = compose(&no_reward_set, &state, &ctx(&cfg));
        assert_eq!(no_reward.header.text, "You didn't find any treasure.");

        let fixation = compose(&factory.fixation(), &state, &ctx(&cfg));
        assert_eq!(fixation.header.text, "Next game starting...");
        assert_eq!(fixation.frames[1].id, FOCUS);
    }

    #[test]
    fn timeout_header_escalates_after_repeated_timeouts() {
        let cfg = Configuration::default();
        let state = task_state();
        let set = StimulusFactory::new(&cfg, Stage::MainThree).timeout();

        let mut context = ctx(&cfg);
        let scene = compose(&set, &state, &context);
        assert_eq!(scene.header.text, "You were too slow in responding.");

        context.timeouts_so_far = cfg.manipulations.timeout_count + 1;
        let scene = compose(&set, &state, &context);
        assert!(scene.header.text.starts_with("You have been too slow"));
    }
}
