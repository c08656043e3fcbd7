//! Hosted effect module contract.
//!
//! A [`PluginModule`] is an effect the graph does not own the code for: it is
//! created by a loader from a [`PluginDescriptor`], exposes its parameters
//! through [`ParameterInfo`], accepts or refuses a bus channel count, and
//! round-trips its internal state as an opaque byte blob.

#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::{Effect, ParameterInfo};

/// Identity of a hosted module, enough for a loader to re-create it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Display name.
    pub name: String,
    /// Vendor name.
    pub manufacturer: String,
    /// Format tag the loader dispatches on (e.g. `"builtin"`).
    pub format: String,
    /// Format-specific locator (path, bundle id or registry key).
    pub identifier: String,
    /// Numeric id, unique within `format`.
    pub unique_id: i64,
    /// Version string.
    pub version: String,
    /// Declared input channel count.
    pub num_inputs: usize,
    /// Declared output channel count.
    pub num_outputs: usize,
}

impl PluginDescriptor {
    /// Creates a descriptor with the given name and format, stereo in/out.
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            num_inputs: 2,
            num_outputs: 2,
            ..Self::default()
        }
    }
}

/// Error returned when a module rejects a state blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleStateError {
    /// The blob is shorter than the module's state layout.
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes provided.
        found: usize,
    },
    /// The blob was written by an incompatible module or version.
    Incompatible(String),
    /// The blob's contents could not be parsed.
    Malformed(String),
}

#[cfg(feature = "std")]
impl std::fmt::Display for ModuleStateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated { expected, found } => {
                write!(f, "state blob truncated: expected {expected} bytes, found {found}")
            }
            Self::Incompatible(msg) => write!(f, "incompatible state blob: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed state blob: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModuleStateError {}

/// A hosted effect module.
///
/// `process_block`, `latency_samples` and the parameter accessors run on the
/// audio thread and must not block or allocate. Everything else is called
/// from the control thread.
pub trait PluginModule: Effect + ParameterInfo + Send {
    /// Returns the descriptor the module was created from.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Returns the display name.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Asks the module to run with `num_channels` in and out.
    ///
    /// Returns `false` if the layout is unsupported; the module must then be
    /// left unused.
    fn set_channel_count(&mut self, num_channels: usize) -> bool;

    /// Serializes the module's internal state.
    fn save_state(&self) -> Vec<u8>;

    /// Restores internal state from a blob produced by
    /// [`save_state`](Self::save_state).
    fn load_state(&mut self, data: &[u8]) -> Result<(), ModuleStateError>;
}
