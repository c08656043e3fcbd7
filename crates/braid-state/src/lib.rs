//! Persistence for braid routing graphs.
//!
//! - [`PersistenceCodec`] restores a [`Splitter`](braid_graph::Splitter) from
//!   the versioned JSON document written by [`write_document`]. Field names
//!   live in [`schema`].
//! - [`write_sources`] / [`read_sources`] carry LFO, envelope and macro
//!   settings, so the source ids referenced by slot modulation tables
//!   survive a save and restore.
//! - [`Preset`] wraps both documents with a name and description in a JSON
//!   file.
//! - [`HostConfig`] holds sample rate, block size and channel count, read
//!   from TOML.
//!
//! # Example
//!
//! ```rust,no_run
//! use braid_graph::{ChannelLayoutConfigurator, PluginLoader, TracingErrorSink};
//! use braid_state::{HostConfig, PersistenceCodec, Preset};
//!
//! fn load(loader: &dyn PluginLoader) -> Result<(), braid_state::StateError> {
//!     let config = HostConfig::load("braid.toml")?;
//!     let codec = PersistenceCodec::new(loader, &ChannelLayoutConfigurator, &TracingErrorSink);
//!     let (splitter, sources) = Preset::load("wide_bass.json")?.restore(&codec, &config.process_setup())?;
//!     println!("{} chains, {} LFOs", splitter.num_chains(), sources.num_lfos());
//!     Ok(())
//! }
//! ```

mod codec;
mod config;
mod error;
mod preset;

/// Key names of the persisted documents.
pub mod schema;

pub use codec::{
    PersistenceCodec, read_descriptor, read_modulation, read_sources, write_descriptor,
    write_document, write_modulation, write_sources, write_state,
};
pub use config::{HostConfig, MAX_BLOCK_SIZE};
pub use error::StateError;
pub use preset::Preset;
