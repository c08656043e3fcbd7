//! Slots: the processing stages of a chain.

use std::fmt;
use std::str::FromStr;

use braid_core::{
    AudioBuffer, EnvelopeFollower, MAX_CHANNELS, PluginModule, ProcessSetup, SmoothedParam,
    pan_gains,
};

use crate::modulation::ModulationConfig;

/// Gain ramp time in milliseconds.
const GAIN_SMOOTHING_MS: f32 = 10.0;

/// Meter attack/release in milliseconds.
const METER_ATTACK_MS: f32 = 1.0;
const METER_RELEASE_MS: f32 = 300.0;

/// One stage of a chain.
pub enum Slot {
    /// Built-in gain and pan.
    GainStage(GainStage),
    /// Hosted effect module.
    Plugin(PluginSlot),
}

impl Slot {
    /// Returns true if the slot is bypassed.
    pub fn is_bypassed(&self) -> bool {
        match self {
            Slot::GainStage(g) => g.is_bypassed,
            Slot::Plugin(p) => p.is_bypassed,
        }
    }

    /// Bypasses or re-enables the slot.
    pub fn set_bypassed(&mut self, is_bypassed: bool) {
        match self {
            Slot::GainStage(g) => g.is_bypassed = is_bypassed,
            Slot::Plugin(p) => p.is_bypassed = is_bypassed,
        }
    }

    /// Latency the slot contributes to its chain: the module's latency for
    /// an active plugin, otherwise 0.
    pub fn latency_samples(&self) -> usize {
        match self {
            Slot::Plugin(p) if !p.is_bypassed => p.module.latency_samples(),
            _ => 0,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Slot::GainStage(_) => "Gain Stage",
            Slot::Plugin(p) => p.module.name(),
        }
    }

    /// Returns the gain stage, if this is one.
    pub fn as_gain_stage(&self) -> Option<&GainStage> {
        match self {
            Slot::GainStage(g) => Some(g),
            Slot::Plugin(_) => None,
        }
    }

    /// Returns the gain stage mutably, if this is one.
    pub fn as_gain_stage_mut(&mut self) -> Option<&mut GainStage> {
        match self {
            Slot::GainStage(g) => Some(g),
            Slot::Plugin(_) => None,
        }
    }

    /// Returns the plugin slot, if this is one.
    pub fn as_plugin(&self) -> Option<&PluginSlot> {
        match self {
            Slot::Plugin(p) => Some(p),
            Slot::GainStage(_) => None,
        }
    }

    /// Returns the plugin slot mutably, if this is one.
    pub fn as_plugin_mut(&mut self) -> Option<&mut PluginSlot> {
        match self {
            Slot::Plugin(p) => Some(p),
            Slot::GainStage(_) => None,
        }
    }

    pub(crate) fn prepare(&mut self, setup: &ProcessSetup) {
        match self {
            Slot::GainStage(g) => g.prepare(setup),
            Slot::Plugin(p) => p.module.prepare(setup),
        }
    }

    pub(crate) fn reset(&mut self) {
        match self {
            Slot::GainStage(g) => g.reset(),
            Slot::Plugin(p) => p.module.reset(),
        }
    }
}

/// Built-in gain/pan stage with output metering.
///
/// The channel count is fixed when the stage is created from the bus layout.
/// Pan only applies to stereo stages.
#[derive(Debug, Clone)]
pub struct GainStage {
    gain: SmoothedParam,
    pan: f32,
    meters: [EnvelopeFollower; MAX_CHANNELS],
    num_channels: usize,
    is_bypassed: bool,
}

impl GainStage {
    /// Creates a unity-gain, centered stage.
    pub fn new(num_channels: usize, sample_rate: f32) -> Self {
        let meter = EnvelopeFollower::with_times(sample_rate, METER_ATTACK_MS, METER_RELEASE_MS);
        Self {
            gain: SmoothedParam::with_config(1.0, sample_rate, GAIN_SMOOTHING_MS),
            pan: 0.0,
            meters: [meter.clone(), meter],
            num_channels: num_channels.clamp(1, MAX_CHANNELS),
            is_bypassed: false,
        }
    }

    /// Target gain (linear).
    pub fn gain_linear(&self) -> f32 {
        self.gain.target()
    }

    /// Sets the target gain. Negative or non-finite values become 0.
    pub fn set_gain_linear(&mut self, gain: f32) {
        let gain = if gain.is_finite() { gain.max(0.0) } else { 0.0 };
        self.gain.set_target(gain);
    }

    /// Pan position in \[-1, 1\].
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Sets the pan position, clamped into \[-1, 1\]. Non-finite values center.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = if pan.is_finite() { pan.clamp(-1.0, 1.0) } else { 0.0 };
    }

    /// Channel count fixed at creation.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Returns true if bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.is_bypassed
    }

    /// Output peak levels per channel (linear). Mono stages report the same
    /// level on both.
    pub fn output_levels(&self) -> [f32; MAX_CHANNELS] {
        if self.num_channels == 1 {
            [self.meters[0].level(); MAX_CHANNELS]
        } else {
            [self.meters[0].level(), self.meters[1].level()]
        }
    }

    fn prepare(&mut self, setup: &ProcessSetup) {
        self.gain.set_sample_rate(setup.sample_rate);
        for meter in &mut self.meters {
            meter.set_sample_rate(setup.sample_rate);
        }
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
        for meter in &mut self.meters {
            meter.reset();
        }
    }

    /// Applies gain (and pan when stereo) in place.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let n = buffer.num_samples();
        if self.num_channels == 2
            && let Some((left, right)) = buffer.stereo_mut()
        {
            let (pan_l, pan_r) = pan_gains(self.pan);
            let [meter_l, meter_r] = &mut self.meters;
            for i in 0..n {
                let g = self.gain.advance();
                left[i] *= g * pan_l;
                right[i] *= g * pan_r;
                meter_l.process(left[i]);
                meter_r.process(right[i]);
            }
            return;
        }
        let channels = buffer.num_channels();
        for i in 0..n {
            let g = self.gain.advance();
            for ch in 0..channels {
                buffer.channel_mut(ch)[i] *= g;
            }
            if channels > 0 {
                self.meters[0].process(buffer.channel(0)[i]);
            }
        }
    }
}

/// A rectangle in screen coordinates, persisted as `"x y width height"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Rect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;
        match parts.as_slice() {
            &[x, y, width, height] => Ok(Self::new(x, y, width, height)),
            _ => Err(format!("invalid rectangle '{s}': expected 4 integers")),
        }
    }
}

/// Where a module's editor window was last shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorBounds {
    /// Editor window rectangle.
    pub window: Rect,
    /// Bounds of the display the window was on.
    pub display_area: Rect,
}

/// A hosted module plus the graph state that belongs to its slot.
pub struct PluginSlot {
    pub(crate) module: Box<dyn PluginModule>,
    pub(crate) modulation: ModulationConfig,
    editor_bounds: Option<EditorBounds>,
    is_bypassed: bool,
    last_latency: usize,
}

impl PluginSlot {
    /// Wraps a module with an inactive, empty modulation config.
    pub fn new(module: Box<dyn PluginModule>) -> Self {
        let last_latency = module.latency_samples();
        Self {
            module,
            modulation: ModulationConfig::default(),
            editor_bounds: None,
            is_bypassed: false,
            last_latency,
        }
    }

    /// Returns the module.
    pub fn module(&self) -> &dyn PluginModule {
        &*self.module
    }

    /// Returns the module mutably.
    pub fn module_mut(&mut self) -> &mut dyn PluginModule {
        &mut *self.module
    }

    /// Swaps in a new module, returning the old one. Bypass state, editor
    /// bounds and modulation config are kept.
    pub fn replace_module(&mut self, module: Box<dyn PluginModule>) -> Box<dyn PluginModule> {
        self.last_latency = module.latency_samples();
        std::mem::replace(&mut self.module, module)
    }

    /// Returns the modulation config.
    pub fn modulation(&self) -> &ModulationConfig {
        &self.modulation
    }

    /// Returns the modulation config mutably.
    pub fn modulation_mut(&mut self) -> &mut ModulationConfig {
        &mut self.modulation
    }

    /// Replaces the modulation config.
    pub fn set_modulation(&mut self, modulation: ModulationConfig) {
        self.modulation = modulation;
    }

    /// Returns the persisted editor bounds.
    pub fn editor_bounds(&self) -> Option<EditorBounds> {
        self.editor_bounds
    }

    /// Records the editor bounds.
    pub fn set_editor_bounds(&mut self, bounds: Option<EditorBounds>) {
        self.editor_bounds = bounds;
    }

    /// Returns true if bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.is_bypassed
    }

    /// Latency the module reported after its last processed block.
    pub fn last_reported_latency(&self) -> usize {
        self.last_latency
    }

    /// Polls the module's latency; returns the new value if it changed.
    pub(crate) fn poll_latency(&mut self) -> Option<usize> {
        let latency = self.module.latency_samples();
        if latency == self.last_latency {
            None
        } else {
            self.last_latency = latency;
            Some(latency)
        }
    }

    /// Captures the module's opaque state blob.
    pub fn save_state(&self) -> Vec<u8> {
        self.module.save_state()
    }
}
