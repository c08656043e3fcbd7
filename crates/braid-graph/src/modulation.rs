//! Modulation sources and the per-slot modulation router.
//!
//! Sources are addressed by `(SourceKind, id)` where `id` is 1-based and
//! positional within its kind: removing LFO 2 makes the old LFO 3 the new
//! LFO 2. Every [`ModulationConfig`] referencing a removed source must be
//! renumbered with [`ModulationConfig::on_source_removed`];
//! [`Splitter::on_modulation_source_removed`](crate::Splitter::on_modulation_source_removed)
//! does that for a whole graph.
//!
//! Once per block, before the chains run, [`ModulationSourceSet::process`]
//! advances every LFO by the block length and feeds every envelope follower
//! its input. The router then reads the last output of the block:
//!
//! ```text
//! value = rest_value + Σ output(source) * modulation_amount
//! ```
//!
//! and writes it, unclamped, to the target parameter.

use std::fmt;
use std::str::FromStr;

use braid_core::{AudioBuffer, EnvelopeFollower, Lfo, LfoWaveform, PluginModule};

use crate::slot::PluginSlot;

/// Number of host macros.
pub const NUM_MACROS: usize = 4;

/// Parameter names are compared on this many leading characters.
pub const PARAMETER_NAME_MATCH_LEN: usize = 30;

/// Kind of a modulation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Host-supplied value in \[0, 1\].
    Macro,
    /// Low frequency oscillator.
    Lfo,
    /// Envelope follower.
    Envelope,
}

impl SourceKind {
    /// Returns the persisted name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Macro => "macro",
            SourceKind::Lfo => "lfo",
            SourceKind::Envelope => "envelope",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "macro" => Ok(SourceKind::Macro),
            "lfo" => Ok(SourceKind::Lfo),
            "envelope" => Ok(SourceKind::Envelope),
            other => Err(format!("unknown modulation source kind '{other}'")),
        }
    }
}

/// One modulation source feeding a target parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    /// 1-based id within `source_kind`.
    pub source_id: usize,
    /// Kind of source.
    pub source_kind: SourceKind,
    /// Weight in \[-1, 1\].
    pub modulation_amount: f32,
}

impl Source {
    /// Creates a source reference, clamping the amount into \[-1, 1\].
    pub fn new(source_kind: SourceKind, source_id: usize, modulation_amount: f32) -> Self {
        Self {
            source_id,
            source_kind,
            modulation_amount: modulation_amount.clamp(-1.0, 1.0),
        }
    }
}

/// Modulation applied to one named parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterModulationConfig {
    /// Name of the target parameter as the module reports it.
    pub target_parameter_name: String,
    /// Value the parameter takes when every source is at zero, in \[0, 1\].
    pub rest_value: f32,
    /// Weighted sources, summed.
    pub sources: Vec<Source>,
}

impl ParameterModulationConfig {
    /// Creates a target with rest value 0 and no sources.
    pub fn new(target_parameter_name: impl Into<String>) -> Self {
        Self {
            target_parameter_name: target_parameter_name.into(),
            rest_value: 0.0,
            sources: Vec::new(),
        }
    }
}

/// Per-slot modulation table.
///
/// All mutators return `false` without changing anything when an index is
/// out of range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModulationConfig {
    /// When false the router leaves the module's parameters alone.
    pub is_active: bool,
    /// Modulated targets in insertion order.
    pub parameter_configs: Vec<ParameterModulationConfig>,
}

impl ModulationConfig {
    /// Enables or disables the whole table.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Appends a target and returns its index.
    pub fn add_target(&mut self, target_parameter_name: impl Into<String>) -> usize {
        self.parameter_configs
            .push(ParameterModulationConfig::new(target_parameter_name));
        self.parameter_configs.len() - 1
    }

    /// Removes the target at `target`.
    pub fn remove_target(&mut self, target: usize) -> bool {
        if target >= self.parameter_configs.len() {
            return false;
        }
        self.parameter_configs.remove(target);
        true
    }

    /// Sets a target's rest value, clamped into \[0, 1\].
    pub fn set_rest_value(&mut self, target: usize, rest_value: f32) -> bool {
        match self.parameter_configs.get_mut(target) {
            Some(config) => {
                config.rest_value = rest_value.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Adds a source to a target. Refuses a second reference to the same
    /// `(kind, id)` on one target.
    pub fn add_source(&mut self, target: usize, source: Source) -> bool {
        let Some(config) = self.parameter_configs.get_mut(target) else {
            return false;
        };
        if config
            .sources
            .iter()
            .any(|s| s.source_kind == source.source_kind && s.source_id == source.source_id)
        {
            return false;
        }
        config.sources.push(source);
        true
    }

    /// Sets the weight of source `source` on `target`, clamped into \[-1, 1\].
    pub fn set_source_amount(&mut self, target: usize, source: usize, amount: f32) -> bool {
        match self
            .parameter_configs
            .get_mut(target)
            .and_then(|c| c.sources.get_mut(source))
        {
            Some(s) => {
                s.modulation_amount = amount.clamp(-1.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Removes source `source` from `target`.
    pub fn remove_source(&mut self, target: usize, source: usize) -> bool {
        match self.parameter_configs.get_mut(target) {
            Some(config) if source < config.sources.len() => {
                config.sources.remove(source);
                true
            }
            _ => false,
        }
    }

    /// Drops references to the removed source and shifts higher ids of the
    /// same kind down by one.
    pub fn on_source_removed(&mut self, kind: SourceKind, id: usize) {
        for config in &mut self.parameter_configs {
            config
                .sources
                .retain(|s| !(s.source_kind == kind && s.source_id == id));
            for s in &mut config.sources {
                if s.source_kind == kind && s.source_id > id {
                    s.source_id -= 1;
                }
            }
        }
    }
}

/// Which signal an envelope follower listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeInput {
    /// The bus being processed.
    #[default]
    Main,
    /// The host's sidechain input.
    Sidechain,
}

/// An LFO with depth and polarity.
#[derive(Debug, Clone)]
pub struct LfoSource {
    lfo: Lfo,
    depth: f32,
    invert: bool,
    output: f32,
}

impl LfoSource {
    /// Creates a 1 Hz sine LFO at full depth.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfo: Lfo::new(sample_rate, 1.0),
            depth: 1.0,
            invert: false,
            output: 0.0,
        }
    }

    /// Returns the frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.lfo.frequency()
    }

    /// Sets the frequency in Hz, clamped into \[0.01, 40\].
    pub fn set_frequency(&mut self, hz: f32) {
        self.lfo.set_frequency(hz.clamp(0.01, 40.0));
    }

    /// Returns the depth in \[0, 1\].
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Sets the depth, clamped into \[0, 1\].
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Returns the waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.lfo.waveform()
    }

    /// Sets the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.lfo.set_waveform(waveform);
    }

    /// Returns the start phase in \[0, 1).
    pub fn phase_offset(&self) -> f32 {
        self.lfo.phase_offset()
    }

    /// Sets the start phase and restarts the oscillator there.
    pub fn set_phase_offset(&mut self, offset: f32) {
        self.lfo.set_phase_offset(offset);
    }

    /// Returns true if the output is inverted.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Inverts the output polarity.
    pub fn set_inverted(&mut self, invert: bool) {
        self.invert = invert;
    }

    /// Output at the end of the last processed block.
    pub fn output(&self) -> f32 {
        self.output
    }

    fn advance(&mut self, num_samples: usize) {
        let raw = self.lfo.advance_block(num_samples) * self.depth;
        self.output = if self.invert { -raw } else { raw };
    }
}

/// An envelope follower with an output amount and input selector.
#[derive(Debug, Clone)]
pub struct EnvelopeSource {
    follower: EnvelopeFollower,
    amount: f32,
    input: EnvelopeInput,
}

impl EnvelopeSource {
    /// Creates a follower on the main input with 10 ms attack, 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            follower: EnvelopeFollower::new(sample_rate),
            amount: 1.0,
            input: EnvelopeInput::Main,
        }
    }

    /// Returns the attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.follower.attack_ms()
    }

    /// Sets the attack time in milliseconds.
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.follower.set_attack_ms(ms);
    }

    /// Returns the release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.follower.release_ms()
    }

    /// Sets the release time in milliseconds.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.follower.set_release_ms(ms);
    }

    /// Returns the output amount in \[-1, 1\].
    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Sets the output amount, clamped into \[-1, 1\].
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(-1.0, 1.0);
    }

    /// Returns the input selector.
    pub fn input(&self) -> EnvelopeInput {
        self.input
    }

    /// Selects the input.
    pub fn set_input(&mut self, input: EnvelopeInput) {
        self.input = input;
    }

    /// Level at the end of the last block times the amount.
    pub fn output(&self) -> f32 {
        self.follower.level() * self.amount
    }

    fn process(&mut self, main: &AudioBuffer, sidechain: Option<&AudioBuffer>) {
        let source = match self.input {
            EnvelopeInput::Main => Some(main),
            EnvelopeInput::Sidechain => sidechain,
        };
        match source {
            Some(buffer) => {
                for i in 0..buffer.num_samples() {
                    let peak = (0..buffer.num_channels())
                        .map(|ch| buffer.channel(ch)[i].abs())
                        .fold(0.0_f32, f32::max);
                    self.follower.process(peak);
                }
            }
            None => {
                for _ in 0..main.num_samples() {
                    self.follower.process(0.0);
                }
            }
        }
    }
}

/// All modulation sources of a graph.
#[derive(Debug, Clone)]
pub struct ModulationSourceSet {
    lfos: Vec<LfoSource>,
    envelopes: Vec<EnvelopeSource>,
    macros: [f32; NUM_MACROS],
    sample_rate: f32,
}

impl Default for ModulationSourceSet {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl ModulationSourceSet {
    /// Creates an empty set: no LFOs, no envelopes, macros at 0.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfos: Vec::new(),
            envelopes: Vec::new(),
            macros: [0.0; NUM_MACROS],
            sample_rate,
        }
    }

    /// Updates the sample rate of every source.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for lfo in &mut self.lfos {
            lfo.lfo.set_sample_rate(sample_rate);
        }
        for env in &mut self.envelopes {
            env.follower.set_sample_rate(sample_rate);
        }
    }

    /// Restarts LFOs at their phase offsets and zeroes envelope levels.
    pub fn reset(&mut self) {
        for lfo in &mut self.lfos {
            lfo.lfo.reset();
            lfo.output = 0.0;
        }
        for env in &mut self.envelopes {
            env.follower.reset();
        }
    }

    /// Appends an LFO and returns its 1-based id.
    pub fn add_lfo(&mut self) -> usize {
        self.lfos.push(LfoSource::new(self.sample_rate));
        self.lfos.len()
    }

    /// Removes LFO `id`. Higher LFOs shift down by one.
    pub fn remove_lfo(&mut self, id: usize) -> bool {
        remove_by_id(&mut self.lfos, id)
    }

    /// Returns LFO `id`.
    pub fn lfo(&self, id: usize) -> Option<&LfoSource> {
        id.checked_sub(1).and_then(|i| self.lfos.get(i))
    }

    /// Returns LFO `id` mutably.
    pub fn lfo_mut(&mut self, id: usize) -> Option<&mut LfoSource> {
        id.checked_sub(1).and_then(|i| self.lfos.get_mut(i))
    }

    /// Returns the number of LFOs.
    pub fn num_lfos(&self) -> usize {
        self.lfos.len()
    }

    /// Appends an envelope follower and returns its 1-based id.
    pub fn add_envelope(&mut self) -> usize {
        self.envelopes.push(EnvelopeSource::new(self.sample_rate));
        self.envelopes.len()
    }

    /// Removes envelope `id`. Higher envelopes shift down by one.
    pub fn remove_envelope(&mut self, id: usize) -> bool {
        remove_by_id(&mut self.envelopes, id)
    }

    /// Returns envelope `id`.
    pub fn envelope(&self, id: usize) -> Option<&EnvelopeSource> {
        id.checked_sub(1).and_then(|i| self.envelopes.get(i))
    }

    /// Returns envelope `id` mutably.
    pub fn envelope_mut(&mut self, id: usize) -> Option<&mut EnvelopeSource> {
        id.checked_sub(1).and_then(|i| self.envelopes.get_mut(i))
    }

    /// Returns the number of envelope followers.
    pub fn num_envelopes(&self) -> usize {
        self.envelopes.len()
    }

    /// Sets macro `id` (1..=4), clamped into \[0, 1\].
    pub fn set_macro(&mut self, id: usize, value: f32) -> bool {
        match id.checked_sub(1).and_then(|i| self.macros.get_mut(i)) {
            Some(m) => {
                *m = value.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Returns macro `id` (1..=4).
    pub fn macro_value(&self, id: usize) -> Option<f32> {
        id.checked_sub(1).and_then(|i| self.macros.get(i)).copied()
    }

    /// Advances every source over one block.
    ///
    /// Real-time safe.
    pub fn process(&mut self, main: &AudioBuffer, sidechain: Option<&AudioBuffer>) {
        let num_samples = main.num_samples();
        for lfo in &mut self.lfos {
            lfo.advance(num_samples);
        }
        for env in &mut self.envelopes {
            env.process(main, sidechain);
        }
    }

    /// Current output of `(kind, id)`; 0 for an unknown id.
    pub fn output(&self, kind: SourceKind, id: usize) -> f32 {
        match kind {
            SourceKind::Macro => self.macro_value(id),
            SourceKind::Lfo => self.lfo(id).map(LfoSource::output),
            SourceKind::Envelope => self.envelope(id).map(EnvelopeSource::output),
        }
        .unwrap_or(0.0)
    }
}

fn remove_by_id<T>(items: &mut Vec<T>, id: usize) -> bool {
    match id.checked_sub(1) {
        Some(i) if i < items.len() => {
            items.remove(i);
            true
        }
        _ => false,
    }
}

/// True if two parameter names agree on their first
/// [`PARAMETER_NAME_MATCH_LEN`] characters.
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .take(PARAMETER_NAME_MATCH_LEN)
        .eq(b.chars().take(PARAMETER_NAME_MATCH_LEN))
}

fn find_parameter(module: &dyn PluginModule, name: &str) -> Option<usize> {
    (0..module.param_count()).find(|&i| {
        module
            .param_info(i)
            .is_some_and(|desc| names_match(&desc.name, name))
    })
}

/// Pushes modulated values into a plugin slot's parameters.
///
/// Does nothing unless the slot's config is active. Targets whose name the
/// module does not expose are skipped. Real-time safe.
pub fn apply_modulation(slot: &mut PluginSlot, sources: &ModulationSourceSet) {
    if !slot.modulation.is_active {
        return;
    }
    for config in &slot.modulation.parameter_configs {
        let Some(index) = find_parameter(&*slot.module, &config.target_parameter_name)
        else {
            continue;
        };
        let value = config.rest_value
            + config
                .sources
                .iter()
                .map(|s| sources.output(s.source_kind, s.source_id) * s.modulation_amount)
                .sum::<f32>();
        slot.module.set_param(index, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_sources(sources: &[Source]) -> ModulationConfig {
        let mut config = ModulationConfig::default();
        let t = config.add_target("Cutoff");
        for &s in sources {
            assert!(config.add_source(t, s));
        }
        config
    }

    #[test]
    fn source_removal_renumbers_same_kind_only() {
        let mut config = config_with_sources(&[
            Source::new(SourceKind::Lfo, 1, 0.5),
            Source::new(SourceKind::Lfo, 2, 0.5),
            Source::new(SourceKind::Lfo, 3, 0.5),
            Source::new(SourceKind::Envelope, 3, 0.5),
        ]);
        config.on_source_removed(SourceKind::Lfo, 2);

        let ids: Vec<_> = config.parameter_configs[0]
            .sources
            .iter()
            .map(|s| (s.source_kind, s.source_id))
            .collect();
        assert_eq!(
            ids,
            vec![
                (SourceKind::Lfo, 1),
                (SourceKind::Lfo, 2),
                (SourceKind::Envelope, 3)
            ]
        );
    }

    #[test]
    fn mutators_reject_out_of_range() {
        let mut config = ModulationConfig::default();
        assert!(!config.remove_target(0));
        assert!(!config.set_rest_value(0, 0.5));
        assert!(!config.add_source(0, Source::new(SourceKind::Macro, 1, 1.0)));
        assert!(!config.set_source_amount(0, 0, 0.1));
        assert!(!config.remove_source(0, 0));
    }

    #[test]
    fn amounts_and_rest_values_clamp() {
        let mut config = config_with_sources(&[Source::new(SourceKind::Macro, 1, 3.0)]);
        assert_eq!(config.parameter_configs[0].sources[0].modulation_amount, 1.0);
        assert!(config.set_source_amount(0, 0, -7.0));
        assert_eq!(config.parameter_configs[0].sources[0].modulation_amount, -1.0);
        assert!(config.set_rest_value(0, 1.5));
        assert_eq!(config.parameter_configs[0].rest_value, 1.0);
    }

    #[test]
    fn duplicate_source_refused() {
        let mut config = config_with_sources(&[Source::new(SourceKind::Lfo, 1, 0.5)]);
        assert!(!config.add_source(0, Source::new(SourceKind::Lfo, 1, -0.5)));
        assert!(config.add_source(0, Source::new(SourceKind::Envelope, 1, -0.5)));
    }

    #[test]
    fn macros_are_one_based_and_clamped() {
        let mut set = ModulationSourceSet::new(48000.0);
        assert!(!set.set_macro(0, 0.5));
        assert!(!set.set_macro(NUM_MACROS + 1, 0.5));
        assert!(set.set_macro(4, 2.0));
        assert_eq!(set.output(SourceKind::Macro, 4), 1.0);
    }

    #[test]
    fn lfo_ids_shift_on_removal() {
        let mut set = ModulationSourceSet::new(48000.0);
        for hz in [1.0, 2.0, 3.0] {
            let id = set.add_lfo();
            set.lfo_mut(id).unwrap().set_frequency(hz);
        }
        assert!(set.remove_lfo(2));
        assert_eq!(set.num_lfos(), 2);
        assert_eq!(set.lfo(2).unwrap().frequency(), 3.0);
        assert!(!set.remove_lfo(3));
    }

    #[test]
    fn lfo_output_scaled_and_inverted() {
        let mut set = ModulationSourceSet::new(48000.0);
        let id = set.add_lfo();
        let lfo = set.lfo_mut(id).unwrap();
        lfo.set_waveform(LfoWaveform::Square);
        lfo.set_depth(0.5);
        lfo.set_inverted(true);
        set.process(&AudioBuffer::new(2, 64), None);
        assert_eq!(set.output(SourceKind::Lfo, id), -0.5);
    }

    #[test]
    fn envelope_follows_selected_input() {
        let mut set = ModulationSourceSet::new(48000.0);
        let main_id = set.add_envelope();
        let side_id = set.add_envelope();
        set.envelope_mut(side_id)
            .unwrap()
            .set_input(EnvelopeInput::Sidechain);

        let main = AudioBuffer::new(2, 4800);
        let side = AudioBuffer::from_channels(vec![vec![0.8; 4800], vec![0.8; 4800]]);
        set.process(&main, Some(&side));

        assert_eq!(set.output(SourceKind::Envelope, main_id), 0.0);
        assert!(set.output(SourceKind::Envelope, side_id) > 0.7);
    }

    #[test]
    fn unknown_source_outputs_zero() {
        let set = ModulationSourceSet::new(48000.0);
        assert_eq!(set.output(SourceKind::Lfo, 1), 0.0);
        assert_eq!(set.output(SourceKind::Envelope, 0), 0.0);
    }

    #[test]
    fn names_compared_on_bounded_prefix() {
        let long_a = "A".repeat(PARAMETER_NAME_MATCH_LEN) + "-left";
        let long_b = "A".repeat(PARAMETER_NAME_MATCH_LEN) + "-right";
        assert!(names_match(&long_a, &long_b));
        assert!(!names_match("Cutoff", "cutoff"));
        assert!(!names_match("Cut", "Cutoff"));
    }

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("LFO".parse::<SourceKind>(), Ok(SourceKind::Lfo));
        assert!("wobble".parse::<SourceKind>().is_err());
    }
}
