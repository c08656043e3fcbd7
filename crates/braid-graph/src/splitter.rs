//! Splitter: arranges chains under one of five routing topologies.
//!
//! | topology    | chains | routing                                             |
//! |-------------|--------|-----------------------------------------------------|
//! | Series      | 1      | straight through chain 0                            |
//! | Parallel    | ≥ 1    | each eligible chain gets a copy; outputs summed     |
//! | Multiband   | ≥ 2    | crossover band k feeds chain k; outputs summed      |
//! | LeftRight   | 2      | left → chain 0, right → chain 1; outputs summed     |
//! | MidSide     | 2      | mid → chain 0, side → chain 1; decoded back to L/R  |
//!
//! A chain is *eligible* when no chain is soloed or it is soloed itself.
//! LeftRight and MidSide on a mono bus run everything through chain 0.
//!
//! The topology of a splitter never changes. Switching topology builds a new
//! splitter with [`Splitter::from_previous`], which takes over the old
//! chains positionally.

use std::fmt;
use std::str::FromStr;

use braid_core::{AudioBuffer, PluginModule, ProcessSetup, mono_sum};

use crate::chain::Chain;
use crate::context::ProcessContext;
use crate::crossover::Crossover;
use crate::modulation::SourceKind;
use crate::slot::{PluginSlot, Slot};

/// Routing topology of a [`Splitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitType {
    /// One chain, straight through.
    #[default]
    Series,
    /// Any number of chains fed the same input.
    Parallel,
    /// One chain per frequency band.
    Multiband,
    /// Left channel to chain 0, right channel to chain 1.
    LeftRight,
    /// Mid signal to chain 0, side signal to chain 1.
    MidSide,
}

impl SplitType {
    /// Every topology, in persisted order.
    pub const ALL: [SplitType; 5] = [
        SplitType::Series,
        SplitType::Parallel,
        SplitType::Multiband,
        SplitType::LeftRight,
        SplitType::MidSide,
    ];

    /// Returns the persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            SplitType::Series => "series",
            SplitType::Parallel => "parallel",
            SplitType::Multiband => "multiband",
            SplitType::LeftRight => "leftright",
            SplitType::MidSide => "midside",
        }
    }

    /// Fewest chains the topology runs with.
    pub fn min_chains(self) -> usize {
        match self {
            SplitType::Series | SplitType::Parallel => 1,
            SplitType::Multiband | SplitType::LeftRight | SplitType::MidSide => 2,
        }
    }

    /// Most chains the topology runs with, if bounded.
    pub fn max_chains(self) -> Option<usize> {
        match self {
            SplitType::Series => Some(1),
            SplitType::LeftRight | SplitType::MidSide => Some(2),
            SplitType::Parallel | SplitType::Multiband => None,
        }
    }

    /// True if chains can be added or removed.
    pub fn has_variable_chain_count(self) -> bool {
        self.max_chains().is_none()
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        SplitType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown split type '{s}'"))
    }
}

enum Topology {
    Series,
    Parallel,
    Multiband(Crossover),
    LeftRight,
    MidSide,
}

impl Topology {
    fn new(split_type: SplitType, num_chains: usize, sample_rate: f32) -> Self {
        match split_type {
            SplitType::Series => Topology::Series,
            SplitType::Parallel => Topology::Parallel,
            SplitType::Multiband => {
                let mut crossover = Crossover::new(sample_rate);
                while crossover.num_bands() < num_chains {
                    crossover.add_band();
                }
                Topology::Multiband(crossover)
            }
            SplitType::LeftRight => Topology::LeftRight,
            SplitType::MidSide => Topology::MidSide,
        }
    }

    fn split_type(&self) -> SplitType {
        match self {
            Topology::Series => SplitType::Series,
            Topology::Parallel => SplitType::Parallel,
            Topology::Multiband(_) => SplitType::Multiband,
            Topology::LeftRight => SplitType::LeftRight,
            Topology::MidSide => SplitType::MidSide,
        }
    }
}

/// A chain together with its solo flag.
pub struct ChainEntry {
    /// The chain.
    pub chain: Chain,
    /// True if soloed.
    pub is_soloed: bool,
}

impl ChainEntry {
    fn new(setup: ProcessSetup) -> Self {
        Self {
            chain: Chain::new(setup),
            is_soloed: false,
        }
    }
}

#[inline]
fn is_eligible(num_soloed: usize, is_soloed: bool) -> bool {
    num_soloed == 0 || is_soloed
}

/// Owns the chains of one topology and routes audio through them.
pub struct Splitter {
    topology: Topology,
    chains: Vec<ChainEntry>,
    num_soloed: usize,
    cached_crossover_frequencies: Vec<f32>,
    latency: usize,
    pending_latency: Option<usize>,
    setup: ProcessSetup,
    /// One buffer per chain.
    scratch: Vec<AudioBuffer>,
    /// Copy of the input block.
    input: AudioBuffer,
    /// Staging buffer for blocks longer than the prepared block size.
    chunk: AudioBuffer,
}

impl Splitter {
    /// Creates a splitter with the minimum number of empty chains.
    pub fn new(split_type: SplitType, setup: ProcessSetup) -> Self {
        let chains = (0..split_type.min_chains())
            .map(|_| ChainEntry::new(setup))
            .collect();
        Self::with_chains(split_type, chains, Vec::new(), setup)
    }

    /// Builds a splitter of `split_type` from the chains of `previous`.
    ///
    /// The first chains that fit are kept in order and missing ones are
    /// created empty. Crossover frequencies of a multiband `previous` are
    /// cached, and a cache is applied when switching back to multiband.
    pub fn from_previous(previous: Splitter, split_type: SplitType) -> Self {
        let Splitter {
            topology,
            chains,
            cached_crossover_frequencies,
            setup,
            ..
        } = previous;
        let cached = match &topology {
            Topology::Multiband(crossover) => crossover.frequencies(),
            _ => cached_crossover_frequencies,
        };
        let previous_type = topology.split_type();

        let max = split_type.max_chains().unwrap_or(usize::MAX);
        let mut entries: Vec<ChainEntry> = chains.into_iter().take(max).collect();
        while entries.len() < split_type.min_chains() {
            entries.push(ChainEntry::new(setup));
        }

        let mut splitter = Self::with_chains(split_type, entries, cached, setup);
        splitter.recalculate_latency();
        tracing::info!(from = %previous_type, to = %split_type, "split type changed");
        splitter
    }

    fn with_chains(
        split_type: SplitType,
        chains: Vec<ChainEntry>,
        cached_crossover_frequencies: Vec<f32>,
        setup: ProcessSetup,
    ) -> Self {
        let mut topology = Topology::new(split_type, chains.len(), setup.sample_rate);
        if let Topology::Multiband(crossover) = &mut topology {
            crossover.set_frequencies(&cached_crossover_frequencies);
        }
        let num_soloed = chains.iter().filter(|e| e.is_soloed).count();
        let mut splitter = Self {
            topology,
            chains,
            num_soloed,
            cached_crossover_frequencies,
            latency: 0,
            pending_latency: None,
            setup,
            scratch: Vec::new(),
            input: AudioBuffer::new(0, 0),
            chunk: AudioBuffer::new(0, 0),
        };
        splitter.allocate_buffers();
        splitter.sync_bands();
        splitter
    }

    // --- Queries ---

    /// Returns the topology.
    pub fn split_type(&self) -> SplitType {
        self.topology.split_type()
    }

    /// Returns the bus layout the splitter is prepared for.
    pub fn setup(&self) -> &ProcessSetup {
        &self.setup
    }

    /// Returns the number of chains.
    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    /// Returns the number of soloed chains.
    pub fn num_chains_soloed(&self) -> usize {
        self.num_soloed
    }

    /// Returns all chains with their solo flags.
    pub fn chains(&self) -> &[ChainEntry] {
        &self.chains
    }

    /// Returns chain `index`.
    pub fn chain(&self, index: usize) -> Option<&Chain> {
        self.chains.get(index).map(|e| &e.chain)
    }

    /// Returns chain `index` mutably.
    ///
    /// Changes that affect latency must be followed by
    /// [`recalculate_latency`](Self::recalculate_latency).
    pub fn chain_mut(&mut self, index: usize) -> Option<&mut Chain> {
        self.chains.get_mut(index).map(|e| &mut e.chain)
    }

    /// Returns true if chain `index` is soloed.
    pub fn is_chain_soloed(&self, index: usize) -> bool {
        self.chains.get(index).is_some_and(|e| e.is_soloed)
    }

    /// Returns true if chain `index` currently takes part in processing.
    pub fn is_chain_eligible(&self, index: usize) -> bool {
        self.chains
            .get(index)
            .is_some_and(|e| is_eligible(self.num_soloed, e.is_soloed))
    }

    /// Returns the crossover of a multiband splitter.
    pub fn crossover(&self) -> Option<&Crossover> {
        match &self.topology {
            Topology::Multiband(crossover) => Some(crossover),
            _ => None,
        }
    }

    /// Returns the crossover frequencies, empty unless multiband.
    pub fn crossover_frequencies(&self) -> Vec<f32> {
        self.crossover().map(Crossover::frequencies).unwrap_or_default()
    }

    /// Frequencies remembered from the last multiband configuration.
    pub fn cached_crossover_frequencies(&self) -> &[f32] {
        &self.cached_crossover_frequencies
    }

    /// Replaces the remembered multiband frequencies.
    pub fn set_cached_crossover_frequencies(&mut self, frequencies: Vec<f32>) {
        self.cached_crossover_frequencies = frequencies;
    }

    // --- Chain mutations ---

    /// Appends an empty chain. Multiband splitters gain a band with it.
    ///
    /// Refused for Series, LeftRight and MidSide.
    pub fn add_chain(&mut self) -> bool {
        let split_type = self.split_type();
        if !split_type.has_variable_chain_count() {
            tracing::warn!(%split_type, "add_chain refused: fixed chain count");
            return false;
        }
        self.chains.push(ChainEntry::new(self.setup));
        if let Topology::Multiband(crossover) = &mut self.topology {
            crossover.add_band();
        }
        self.allocate_buffers();
        self.sync_bands();
        self.recalculate_latency();
        tracing::debug!("splitter_add_chain: {} chains", self.chains.len());
        true
    }

    /// Removes chain `index`. Multiband splitters lose their highest band.
    ///
    /// Refused for Series, LeftRight and MidSide, for an unknown index, and
    /// when it would leave fewer chains than the topology needs.
    pub fn remove_chain(&mut self, index: usize) -> bool {
        let split_type = self.split_type();
        if !split_type.has_variable_chain_count() {
            tracing::warn!(%split_type, "remove_chain refused: fixed chain count");
            return false;
        }
        if index >= self.chains.len() || self.chains.len() <= split_type.min_chains() {
            tracing::warn!(index, num_chains = self.chains.len(), "remove_chain refused");
            return false;
        }
        let removed = self.chains.remove(index);
        if removed.is_soloed {
            self.num_soloed -= 1;
        }
        if let Topology::Multiband(crossover) = &mut self.topology {
            crossover.remove_band();
        }
        self.scratch.truncate(self.chains.len());
        self.sync_bands();
        self.recalculate_latency();
        tracing::debug!("splitter_remove_chain: {index}, {} left", self.chains.len());
        true
    }

    /// Moves chain `from` to position `to` (clamped to the last position).
    ///
    /// For multiband splitters only the chains move; band frequencies stay.
    pub fn move_chain(&mut self, from: usize, to: usize) -> bool {
        if from >= self.chains.len() {
            return false;
        }
        let entry = self.chains.remove(from);
        let to = to.min(self.chains.len());
        self.chains.insert(to, entry);
        self.sync_bands();
        tracing::debug!("splitter_move_chain: {from} → {to}");
        true
    }

    /// Solos or unsolos chain `index`.
    pub fn set_chain_solo(&mut self, index: usize, is_soloed: bool) -> bool {
        let Some(entry) = self.chains.get(index) else {
            return false;
        };
        if entry.is_soloed == is_soloed {
            return true;
        }
        let before = self.num_soloed;
        self.chains[index].is_soloed = is_soloed;
        if is_soloed {
            self.num_soloed += 1;
        } else {
            self.num_soloed -= 1;
        }
        // Chains skipped while others were soloed hold stale delayed audio.
        if matches!(self.topology, Topology::Parallel | Topology::LeftRight) {
            let after = self.num_soloed;
            for (i, entry) in self.chains.iter_mut().enumerate() {
                let was_soloed = if i == index { !is_soloed } else { entry.is_soloed };
                if !is_eligible(before, was_soloed) && is_eligible(after, entry.is_soloed) {
                    entry.chain.clear_compensation();
                }
            }
        }
        self.sync_bands();
        true
    }

    /// Mutes or unmutes chain `index`.
    pub fn set_chain_mute(&mut self, index: usize, is_muted: bool) -> bool {
        let Some(chain) = self.chain_mut(index) else {
            return false;
        };
        chain.set_muted(is_muted);
        self.sync_bands();
        true
    }

    /// Bypasses chain `index` and recomputes latency.
    pub fn set_chain_bypass(&mut self, index: usize, is_bypassed: bool) -> bool {
        let Some(chain) = self.chain_mut(index) else {
            return false;
        };
        chain.set_bypassed(is_bypassed);
        self.recalculate_latency();
        true
    }

    /// Moves crossover point `index` of a multiband splitter.
    pub fn set_crossover_frequency(&mut self, index: usize, frequency: f32) -> bool {
        match &mut self.topology {
            Topology::Multiband(crossover) => crossover.set_crossover_frequency(index, frequency),
            _ => false,
        }
    }

    // --- Slot mutations ---

    /// Inserts a gain stage into chain `chain` (position clamped).
    pub fn insert_gain_stage(&mut self, chain: usize, pos: usize) -> bool {
        let Some(target) = self.chain_mut(chain) else {
            return false;
        };
        let pos = target.insert_gain_stage(pos);
        tracing::debug!("splitter_insert_gain_stage: chain {chain} slot {pos}");
        true
    }

    /// Inserts a module into chain `chain` (position clamped) and
    /// recomputes latency.
    pub fn insert_plugin(&mut self, chain: usize, pos: usize, module: Box<dyn PluginModule>) -> bool {
        let Some(target) = self.chain_mut(chain) else {
            return false;
        };
        let pos = target.insert_plugin(pos, module);
        self.recalculate_latency();
        tracing::debug!("splitter_insert_plugin: chain {chain} slot {pos}");
        true
    }

    /// Removes a slot and recomputes latency.
    pub fn remove_slot(&mut self, chain: usize, pos: usize) -> bool {
        let removed = self.chain_mut(chain).is_some_and(|c| c.remove_slot(pos));
        if removed {
            self.recalculate_latency();
            tracing::debug!("splitter_remove_slot: chain {chain} slot {pos}");
        }
        removed
    }

    /// Moves a slot, possibly between chains. `to_pos` is clamped.
    pub fn move_slot(&mut self, from_chain: usize, from_pos: usize, to_chain: usize, to_pos: usize) -> bool {
        if to_chain >= self.chains.len() {
            return false;
        }
        let moved = if from_chain == to_chain {
            self.chain_mut(from_chain).is_some_and(|c| c.move_slot(from_pos, to_pos))
        } else {
            match self.chain_mut(from_chain).and_then(|c| c.take_slot(from_pos)) {
                Some(slot) => {
                    self.chains[to_chain].chain.insert_slot(to_pos, slot);
                    true
                }
                None => false,
            }
        };
        if moved {
            self.recalculate_latency();
            tracing::debug!("splitter_move_slot: {from_chain}:{from_pos} → {to_chain}:{to_pos}");
        }
        moved
    }

    /// Bypasses a slot and recomputes latency.
    pub fn set_slot_bypass(&mut self, chain: usize, pos: usize, is_bypassed: bool) -> bool {
        let changed = self
            .chain_mut(chain)
            .is_some_and(|c| c.set_slot_bypass(pos, is_bypassed));
        if changed {
            self.recalculate_latency();
        }
        changed
    }

    /// Sets the gain of a gain stage.
    pub fn set_gain_linear(&mut self, chain: usize, pos: usize, gain: f32) -> bool {
        self.chain_mut(chain).is_some_and(|c| c.set_gain_linear(pos, gain))
    }

    /// Sets the pan of a gain stage.
    pub fn set_pan(&mut self, chain: usize, pos: usize, pan: f32) -> bool {
        self.chain_mut(chain).is_some_and(|c| c.set_pan(pos, pan))
    }

    /// Swaps the module of a plugin slot, returning the old module.
    pub fn replace_plugin(
        &mut self,
        chain: usize,
        pos: usize,
        module: Box<dyn PluginModule>,
    ) -> Option<Box<dyn PluginModule>> {
        let old = self.chain_mut(chain)?.replace_plugin(pos, module)?;
        self.recalculate_latency();
        Some(old)
    }

    /// Returns the slot at (`chain`, `pos`).
    pub fn slot(&self, chain: usize, pos: usize) -> Option<&Slot> {
        self.chain(chain)?.slot(pos)
    }

    /// Returns the plugin slot at (`chain`, `pos`).
    pub fn plugin_slot_mut(&mut self, chain: usize, pos: usize) -> Option<&mut PluginSlot> {
        self.chain_mut(chain)?.plugin_slot_mut(pos)
    }

    /// Renumbers modulation references after a source was removed.
    pub fn on_modulation_source_removed(&mut self, kind: SourceKind, id: usize) {
        for entry in &mut self.chains {
            entry.chain.on_modulation_source_removed(kind, id);
        }
    }

    // --- Latency ---

    /// Latency of the whole splitter, as of the last recompute.
    pub fn latency_samples(&self) -> usize {
        self.latency
    }

    /// Recomputes every chain's latency, takes the maximum and sizes each
    /// chain's compensation delay against it. Records a notification.
    pub fn recalculate_latency(&mut self) -> usize {
        let latency = self
            .chains
            .iter_mut()
            .map(|e| e.chain.recalculate_latency())
            .max()
            .unwrap_or(0);
        for entry in &mut self.chains {
            entry.chain.set_required_latency(latency);
        }
        self.latency = latency;
        self.pending_latency = Some(latency);
        tracing::debug!("splitter_latency: {latency} samples");
        latency
    }

    /// Takes the latency recorded by the last recompute, if not yet taken.
    pub fn take_latency_notification(&mut self) -> Option<usize> {
        self.pending_latency.take()
    }

    // --- Processing ---

    /// Prepares chains, crossover and scratch buffers for a new bus layout.
    ///
    /// Allocates; control thread only.
    pub fn prepare(&mut self, setup: &ProcessSetup) {
        self.setup = *setup;
        for entry in &mut self.chains {
            entry.chain.prepare(setup);
        }
        if let Topology::Multiband(crossover) = &mut self.topology {
            crossover.prepare(setup.sample_rate);
        }
        self.allocate_buffers();
        self.recalculate_latency();
    }

    /// Clears all processing state.
    pub fn reset(&mut self) {
        for entry in &mut self.chains {
            entry.chain.reset();
        }
        if let Topology::Multiband(crossover) = &mut self.topology {
            crossover.reset();
        }
    }

    /// Routes one block through the chains in place.
    ///
    /// Blocks longer than the prepared block size are processed in pieces.
    pub fn process(&mut self, buffer: &mut AudioBuffer, ctx: &mut ProcessContext<'_>) {
        let n = buffer.num_samples();
        let capacity = self.input.capacity();
        if n <= capacity {
            self.process_block(buffer, ctx);
            return;
        }
        if capacity == 0 {
            return;
        }

        let mut chunk = std::mem::replace(&mut self.chunk, AudioBuffer::new(0, 0));
        let channels = chunk.num_channels().min(buffer.num_channels());
        let mut offset = 0;
        while offset < n {
            let len = capacity.min(n - offset);
            chunk.set_num_samples(len);
            for ch in 0..channels {
                chunk.channel_mut(ch).copy_from_slice(&buffer.channel(ch)[offset..offset + len]);
            }
            self.process_block(&mut chunk, ctx);
            for ch in 0..channels {
                buffer.channel_mut(ch)[offset..offset + len].copy_from_slice(chunk.channel(ch));
            }
            offset += len;
        }
        self.chunk = chunk;
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer, ctx: &mut ProcessContext<'_>) {
        // Chains skipped below still count toward the splitter latency.
        for (i, entry) in self.chains.iter_mut().enumerate() {
            ctx.set_chain(i);
            entry.chain.poll_latency_changes(ctx);
        }
        let num_soloed = self.num_soloed;
        match &mut self.topology {
            Topology::Series => {
                if let Some(entry) = self.chains.first_mut() {
                    ctx.set_chain(0);
                    entry.chain.process(buffer, ctx);
                }
            }
            Topology::Parallel => {
                self.input.copy_from(buffer);
                buffer.clear();
                for (i, (entry, scratch)) in self.chains.iter_mut().zip(&mut self.scratch).enumerate() {
                    if !is_eligible(num_soloed, entry.is_soloed) {
                        continue;
                    }
                    scratch.copy_from(&self.input);
                    ctx.set_chain(i);
                    entry.chain.process(scratch, ctx);
                    buffer.accumulate_from(scratch);
                }
            }
            Topology::Multiband(crossover) => {
                crossover.process(buffer, &mut self.scratch);
                buffer.clear();
                for (i, (entry, band)) in self.chains.iter_mut().zip(&mut self.scratch).enumerate() {
                    ctx.set_chain(i);
                    entry.chain.process(band, ctx);
                    buffer.accumulate_from(band);
                }
            }
            Topology::LeftRight => {
                if buffer.num_channels() < 2 || self.input.num_channels() < 2 {
                    process_through_first(&mut self.chains, num_soloed, buffer, ctx);
                    return;
                }
                self.input.copy_from(buffer);
                buffer.clear();
                for (i, (entry, scratch)) in self.chains.iter_mut().zip(&mut self.scratch).enumerate().take(2) {
                    if !is_eligible(num_soloed, entry.is_soloed) {
                        continue;
                    }
                    scratch.copy_from(&self.input);
                    scratch.clear_channel(1 - i);
                    ctx.set_chain(i);
                    entry.chain.process(scratch, ctx);
                    buffer.accumulate_from(scratch);
                }
            }
            Topology::MidSide => {
                if !process_mid_side(&mut self.chains, &mut self.scratch, num_soloed, buffer, ctx) {
                    process_through_first(&mut self.chains, num_soloed, buffer, ctx);
                }
            }
        }
    }

    // --- Internals ---

    fn allocate_buffers(&mut self) {
        let channels = self.setup.num_channels;
        let block_size = self.setup.block_size;
        self.scratch
            .resize_with(self.chains.len(), || AudioBuffer::new(channels, block_size));
        for buffer in &mut self.scratch {
            if buffer.num_channels() != channels || buffer.capacity() != block_size {
                buffer.resize(channels, block_size);
            }
        }
        self.input.resize(channels, block_size);
        self.chunk.resize(channels, block_size);
    }

    fn sync_bands(&mut self) {
        if let Topology::Multiband(crossover) = &mut self.topology {
            for (i, entry) in self.chains.iter().enumerate() {
                crossover.set_band_state(i, entry.is_soloed, entry.chain.is_muted());
            }
        }
    }
}

/// Mono fallback for the stereo-only topologies: chain 0 processes the
/// whole bus in place, if eligible.
fn process_through_first(
    chains: &mut [ChainEntry],
    num_soloed: usize,
    buffer: &mut AudioBuffer,
    ctx: &mut ProcessContext<'_>,
) {
    match chains.first_mut() {
        Some(entry) if is_eligible(num_soloed, entry.is_soloed) => {
            ctx.set_chain(0);
            entry.chain.process(buffer, ctx);
        }
        _ => buffer.clear(),
    }
}

/// Encodes to mid/side, runs the two chains and decodes. Returns `false`
/// without touching anything if the bus or the scratch buffers are not
/// stereo.
fn process_mid_side(
    chains: &mut [ChainEntry],
    scratch: &mut [AudioBuffer],
    num_soloed: usize,
    buffer: &mut AudioBuffer,
    ctx: &mut ProcessContext<'_>,
) -> bool {
    let [mid, side, ..] = scratch else {
        return false;
    };
    if buffer.num_channels() < 2 || mid.num_channels() < 2 || side.num_channels() < 2 {
        return false;
    }
    let n = buffer.num_samples();
    mid.set_num_samples(n);
    side.set_num_samples(n);

    if let (Some((left, right)), Some((mid_l, mid_r)), Some((side_l, side_r))) =
        (buffer.stereo_mut(), mid.stereo_mut(), side.stereo_mut())
    {
        let len = left.len().min(mid_l.len()).min(side_l.len());
        for i in 0..len {
            let m = mono_sum(left[i], right[i]);
            let s = 0.5 * (left[i] - right[i]);
            mid_l[i] = m;
            mid_r[i] = m;
            side_l[i] = s;
            side_r[i] = s;
        }
    }

    for (i, (entry, encoded)) in chains.iter_mut().zip([&mut *mid, &mut *side]).enumerate() {
        ctx.set_chain(i);
        entry.chain.process(encoded, ctx);
        if !is_eligible(num_soloed, entry.is_soloed) {
            encoded.clear();
        }
    }

    if let (Some((left, right)), Some((mid_l, mid_r)), Some((side_l, side_r))) =
        (buffer.stereo_mut(), mid.stereo_mut(), side.stereo_mut())
    {
        let len = left.len().min(mid_l.len()).min(side_l.len());
        for i in 0..len {
            left[i] = mid_l[i] + side_l[i];
            right[i] = mid_r[i] - side_r[i];
        }
    }
    true
}
