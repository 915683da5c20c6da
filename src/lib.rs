//! caplay-core is the document codec and animation engine behind an
//! editor for animated lock-screen wallpapers.
//!
//! Wallpapers are stored as CAML text, an XML Core-Animation dialect.
//! This crate turns that text into a layer-tree document and back, and
//! answers "what is this property's value right now" for the three
//! time-driven subsystems the editor runs every frame:
//!
//! 1. **Codec**: [`parse`] CAML text into a [`CamlDocument`] (layer
//!    tree plus discovered state names, per-state overrides,
//!    transitions, and parallax entries); [`serialize`] the reverse.
//! 2. **Keyframe evaluation**: [`evaluate`] samples one animation at a
//!    timestamp, returning the interpolated value or `None` when the
//!    property must be left unset.
//! 3. **State transitions**: [`resolve_tracks`] diffs two named
//!    states' override tables into tween tracks; a
//!    [`TransitionSession`] samples them per tick.
//! 4. **Particles**: [`EmitterSim`] steps a capped particle pool for
//!    the emitter layer variant and produces draw lists for an
//!    external painter.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Pure, tick-driven evaluation**: the frame clock lives with the
//!   caller; nothing here blocks, suspends, or owns a timer.
//! - **Copy-on-write tree edits**: every edit in [`model::tree`]
//!   replaces the mutated node and its ancestor chain, so a render
//!   pass reading the old tree never observes a half-applied change.
//! - **Best-effort parsing**: missing attributes fall back to
//!   defaults and broken optional sections degrade to empty; only
//!   unreadable top-level XML is an error.
//! - **No IO**: asset bytes are resolved by collaborators; this core
//!   only consumes opaque handles.
#![forbid(unsafe_code)]

pub mod animation;
pub mod codec;
pub mod emitter;
pub mod foundation;
pub mod model;
pub mod states;

pub use animation::evaluator::evaluate;
pub use codec::{ParseOptions, parse, serialize};
pub use emitter::sim::{DrawList, DrawOp, EmitterSim, Particle};
pub use emitter::tint::{TintCache, TintCacheOpts, TintKey};
pub use foundation::core::{Canvas, Color, GradientStop, Size, Vec2};
pub use foundation::error::{CaplayError, CaplayResult};
pub use model::document::{
    CamlDocument, GyroParallaxEntry, ParallaxAxis, StateOverrides, StateSetValue, StateTransition,
    TransitionElement, backfill_overrides,
};
pub use model::layer::{
    Animation, CalculationMode, CellColor, DisplayKind, EmitterCell, EmitterLayer, KeyPath,
    KeyValue, Layer, LayerKind, TimingFunction, VideoFrames,
};
pub use model::tree::{InsertPosition, LayerPatch};
pub use states::resolver::{
    TransitionSession, TweenTrack, apply_state, resolve_background_tracks, resolve_tracks,
};
