//! Shared test module: a passthrough with a real, adjustable latency.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use braid_core::{
    AudioBuffer, CompensationDelay, Effect, ModuleStateError, ParamDescriptor, ParameterInfo,
    PluginDescriptor, PluginModule, ProcessSetup,
};

/// Delays its input by the current latency and scales it by `Level`.
pub struct Latent {
    descriptor: PluginDescriptor,
    params: Vec<ParamDescriptor>,
    level: f32,
    blend: f32,
    latency: Arc<AtomicUsize>,
    delay: CompensationDelay,
}

impl Latent {
    pub fn new(latency: usize) -> Self {
        Self::shared(Arc::new(AtomicUsize::new(latency)))
    }

    /// Latency is read from `latency` on every call, so tests can change it
    /// while the module sits in a chain.
    pub fn shared(latency: Arc<AtomicUsize>) -> Self {
        let initial = latency.load(Ordering::Relaxed);
        Self {
            descriptor: PluginDescriptor::new("Latent", "test"),
            params: vec![
                ParamDescriptor::normalized("Level"),
                ParamDescriptor::normalized("Very Long Parameter Name For Matching Tests"),
            ],
            level: 1.0,
            blend: 0.0,
            latency,
            delay: CompensationDelay::new(2, initial),
        }
    }

    pub fn boxed(latency: usize) -> Box<dyn PluginModule> {
        Box::new(Self::new(latency))
    }
}

impl Effect for Latent {
    fn process_block(&mut self, buffer: &mut AudioBuffer) {
        self.delay.set_delay(self.latency.load(Ordering::Relaxed));
        self.delay.process_block_inplace(buffer);
        buffer.apply_gain(self.level);
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.delay.set_num_channels(setup.num_channels);
    }

    fn reset(&mut self) {
        self.delay.clear();
    }

    fn latency_samples(&self) -> usize {
        self.latency.load(Ordering::Relaxed)
    }
}

impl ParameterInfo for Latent {
    fn param_count(&self) -> usize {
        self.params.len()
    }

    fn param_info(&self, index: usize) -> Option<&ParamDescriptor> {
        self.params.get(index)
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.level,
            1 => self.blend,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.level = value,
            1 => self.blend = value,
            _ => {}
        }
    }
}

impl PluginModule for Latent {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn set_channel_count(&mut self, num_channels: usize) -> bool {
        (1..=2).contains(&num_channels)
    }

    fn save_state(&self) -> Vec<u8> {
        self.level.to_le_bytes().to_vec()
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), ModuleStateError> {
        let bytes: [u8; 4] = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(ModuleStateError::Truncated { expected: 4, found: data.len() })?;
        self.level = f32::from_le_bytes(bytes);
        Ok(())
    }
}
