//! Collaborators the graph relies on but does not implement.
//!
//! Creating module instances from descriptors, checking that an instance
//! accepts the bus layout, and surfacing user-facing errors all belong to the
//! host application. The graph and the persistence codec talk to them through
//! these traits.

use braid_core::{PluginDescriptor, PluginModule, ProcessSetup};

/// Creates module instances from persisted descriptors.
pub trait PluginLoader {
    /// Instantiates the module described by `descriptor`, prepared for the
    /// given sample rate and block size.
    ///
    /// The error string is shown to the user as-is.
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f32,
        block_size: usize,
    ) -> Result<Box<dyn PluginModule>, String>;
}

/// Decides whether a freshly created module can run on the bus.
pub trait ModuleConfigurator {
    /// Configures `module` for `setup`. Returns `false` if it cannot run
    /// with that layout.
    fn configure(&self, module: &mut dyn PluginModule, setup: &ProcessSetup) -> bool;
}

/// Asks the module to accept the bus channel count, in and out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelLayoutConfigurator;

impl ModuleConfigurator for ChannelLayoutConfigurator {
    fn configure(&self, module: &mut dyn PluginModule, setup: &ProcessSetup) -> bool {
        let accepted = module.set_channel_count(setup.num_channels);
        if !accepted {
            tracing::debug!(
                module = module.name(),
                num_channels = setup.num_channels,
                "module refused channel layout"
            );
        }
        accepted
    }
}

/// Receives user-facing error messages.
pub trait ErrorSink {
    /// Reports one message.
    fn report(&self, message: &str);
}

impl<F: Fn(&str)> ErrorSink for F {
    fn report(&self, message: &str) {
        self(message);
    }
}

/// Logs reported errors at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, message: &str) {
        tracing::error!("{message}");
    }
}
