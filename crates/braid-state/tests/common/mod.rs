//! Shared test fixtures: a small module catalog and a recording error sink.

#![allow(dead_code)]

use std::cell::RefCell;

use braid_core::{
    AudioBuffer, Effect, ModuleStateError, ParamDescriptor, ParameterInfo, PluginDescriptor,
    PluginModule, ProcessSetup,
};
use braid_graph::{ErrorSink, PluginLoader};

pub const SAMPLE_RATE: f32 = 48000.0;

pub fn stereo() -> ProcessSetup {
    ProcessSetup::new(SAMPLE_RATE, 128, 2)
}

/// A two-parameter filter stand-in. State is both parameters as LE floats.
pub struct Filter {
    descriptor: PluginDescriptor,
    params: Vec<ParamDescriptor>,
    values: [f32; 2],
    latency: usize,
    mono_only: bool,
}

impl Filter {
    pub fn new(descriptor: PluginDescriptor) -> Self {
        let latency = usize::try_from(descriptor.unique_id).unwrap_or(0);
        let mono_only = descriptor.num_inputs == 1;
        Self {
            descriptor,
            params: vec![
                ParamDescriptor::normalized("Cutoff"),
                ParamDescriptor::normalized("Resonance"),
            ],
            values: [0.5, 0.0],
            latency,
            mono_only,
        }
    }

    /// Descriptor the catalog below knows how to build. `unique_id` doubles
    /// as the module's latency; `num_inputs == 1` makes it mono only.
    pub fn descriptor(name: &str, latency: usize) -> PluginDescriptor {
        let mut descriptor = PluginDescriptor::new(name, "test");
        descriptor.manufacturer = "braid".into();
        descriptor.unique_id = latency as i64;
        descriptor.version = "1.0.0".into();
        descriptor.num_inputs = 2;
        descriptor.num_outputs = 2;
        descriptor
    }

    pub fn boxed(name: &str, latency: usize) -> Box<dyn PluginModule> {
        Box::new(Self::new(Self::descriptor(name, latency)))
    }
}

impl Effect for Filter {
    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        buffer.apply_gain(self.values[0]);
    }

    fn prepare(&mut self, _: &ProcessSetup) {}

    fn reset(&mut self) {}

    fn latency_samples(&self) -> usize {
        self.latency
    }
}

impl ParameterInfo for Filter {
    fn param_count(&self) -> usize {
        self.params.len()
    }

    fn param_info(&self, index: usize) -> Option<&ParamDescriptor> {
        self.params.get(index)
    }

    fn get_param(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn set_param(&mut self, index: usize, value: f32) {
        if let Some(v) = self.values.get_mut(index) {
            *v = value;
        }
    }
}

impl PluginModule for Filter {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn set_channel_count(&mut self, num_channels: usize) -> bool {
        if self.mono_only {
            num_channels == 1
        } else {
            (1..=2).contains(&num_channels)
        }
    }

    fn save_state(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), ModuleStateError> {
        if data.len() < 8 {
            return Err(ModuleStateError::Truncated {
                expected: 8,
                found: data.len(),
            });
        }
        for (value, bytes) in self.values.iter_mut().zip(data.chunks_exact(4)) {
            let bytes: [u8; 4] = bytes
                .try_into()
                .map_err(|_| ModuleStateError::Malformed("chunk".into()))?;
            *value = f32::from_le_bytes(bytes);
        }
        Ok(())
    }
}

/// Builds a [`Filter`] for any descriptor except those named `"Missing"`.
pub struct Catalog;

impl PluginLoader for Catalog {
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        _sample_rate: f32,
        _block_size: usize,
    ) -> Result<Box<dyn PluginModule>, String> {
        if descriptor.name == "Missing" {
            return Err("plugin not found".to_string());
        }
        Ok(Box::new(Filter::new(descriptor.clone())))
    }
}

/// Collects reported messages.
#[derive(Default)]
pub struct Recorder {
    pub messages: RefCell<Vec<String>>,
}

impl ErrorSink for Recorder {
    fn report(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
