//! Dynamic audio-routing graph for braid.
//!
//! A [`Splitter`] arranges one or more [`Chain`]s under one of five closed
//! topologies ([`SplitType`]): series, parallel, frequency bands, left/right
//! and mid/side. Each chain is an ordered list of [`Slot`]s, either a built-in
//! [`GainStage`] or a hosted [`PluginSlot`] wrapping a
//! [`PluginModule`](braid_core::PluginModule).
//!
//! # Architecture
//!
//! - [`Splitter`] owns its chains in a `Vec` and addresses them by index.
//!   There are no back-pointers: a chain reports latency changes upward
//!   through the [`ProcessContext`], and the splitter broadcasts the
//!   resulting compensation downward.
//! - [`Crossover`] feeds a multiband splitter. Bands are formed as a tree of
//!   Linkwitz-Riley splits with all-pass phase correction, so the bands sum
//!   flat.
//! - [`ModulationSourceSet`] owns the LFOs, envelope followers and host
//!   macros. Each plugin slot carries a [`ModulationConfig`] the router
//!   ([`apply_modulation`]) evaluates before the module runs.
//!
//! # Latency Compensation
//!
//! Chain latency is the sum of its active modules' latencies (0 when the
//! chain is bypassed). The splitter's latency is the maximum over its
//! chains; every chain delays itself by `splitter − own` so all paths arrive
//! aligned. Latency changes observed on the audio thread are pushed into a
//! fixed-capacity SPSC queue ([`latency_queue`]) and folded in by the
//! control thread.
//!
//! # Real-time Safety
//!
//! [`Splitter::process`] never allocates or blocks: scratch buffers are sized
//! on [`Splitter::prepare`] and whenever a chain is added, and the only lock
//! on the audio path (the compensation delay) is try-locked.

pub mod chain;
pub mod context;
pub mod crossover;
pub mod host;
pub mod latency;
pub mod modulation;
pub mod slot;
pub mod splitter;

pub use chain::Chain;
pub use context::ProcessContext;
pub use crossover::{Band, Crossover, DEFAULT_CROSSOVER_HZ, MAX_CROSSOVER_HZ, MIN_CROSSOVER_HZ};
pub use host::{ChannelLayoutConfigurator, ErrorSink, ModuleConfigurator, PluginLoader, TracingErrorSink};
pub use latency::{LatencyConsumer, LatencyEvent, LatencyProducer, latency_queue};
pub use modulation::{
    EnvelopeInput, EnvelopeSource, LfoSource, ModulationConfig, ModulationSourceSet, NUM_MACROS,
    PARAMETER_NAME_MATCH_LEN, ParameterModulationConfig, Source, SourceKind, apply_modulation,
};
pub use slot::{EditorBounds, GainStage, PluginSlot, Rect, Slot};
pub use splitter::{ChainEntry, SplitType, Splitter};
