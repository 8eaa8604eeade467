//! Three-step sequential decision task.
//!
//! Core runtime for a three-stage Markov decision experiment: a transition
//! model over a pre-resolved mapping graph, a timed stimulus presentation
//! pipeline, and the per-trial orchestration that turns keypresses into
//! behavioural records. Rendering and input are injected capabilities
//! ([`surface::Surface`], [`events::KeySource`]); the crate owns no display
//! and no device.

pub mod config;
pub mod constants;
pub mod controller;
pub mod events;
pub mod generate;
pub mod prng;
pub mod records;
pub mod runner;
pub mod scene;
pub mod session;
pub mod stage;
pub mod state;
pub mod stimuli;
pub mod surface;
pub mod timeline;
pub mod trial;

pub use config::Configuration;
pub use records::{CompletedTrial, TrialRecord};
pub use session::{RecordSink, SessionData};
pub use stage::Stage;
pub use state::{MappingGraph, MappingNode, Side, State};
pub use stimuli::{StimulusFactory, StimulusKind, StimulusSet};
pub use surface::{NullSurface, Surface};
pub use trial::{Trial, TrialParameters};
