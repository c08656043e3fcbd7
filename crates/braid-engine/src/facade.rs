//! Control-thread boundary of a running graph.
//!
//! [`ControlFacade`] owns the render state behind two locks:
//!
//! - a re-entrant structural lock taken by every mutator, so composite
//!   operations (restore, topology switch) can call other mutators on the
//!   same thread;
//! - a render lock shared with the [`AudioHandle`]. Mutators hold it only
//!   while they touch the graph; the audio thread try-locks it and skips the
//!   block on contention.
//!
//! Latency changes reported by modules on the audio thread arrive through
//! the latency queue. Every mutator drains the queue first and recomputes
//! latency if anything arrived; [`ControlFacade::poll_latency_events`] does
//! the same on demand. Each recompute is forwarded to the latency listener.

use std::sync::Arc;

use braid_core::{PluginModule, ProcessSetup};
use braid_graph::{
    EditorBounds, EnvelopeSource, LatencyConsumer, LfoSource, ModulationConfig,
    ModulationSourceSet, SourceKind, SplitType, Splitter, latency_queue,
};
use braid_state::{HostConfig, PersistenceCodec, Preset, StateError, write_state};
use parking_lot::{Mutex, ReentrantMutex};

use crate::audio::{AudioHandle, RenderState};

/// Host callback receiving the graph latency in samples.
pub type LatencyListener = Arc<dyn Fn(usize) + Send + Sync>;

/// Thread-safe owner of a routing graph and its modulation sources.
///
/// All mutators are synchronous and return `false` (or `None`) without
/// changing anything when an index is out of range.
pub struct ControlFacade {
    structure: ReentrantMutex<()>,
    render: Arc<Mutex<RenderState>>,
    latency_events: Mutex<LatencyConsumer>,
    listener: Mutex<Option<LatencyListener>>,
}

impl ControlFacade {
    /// Creates a facade over an empty Series graph.
    pub fn new(setup: ProcessSetup, latency_queue_capacity: usize) -> Self {
        let (producer, consumer) = latency_queue(latency_queue_capacity);
        let state = RenderState {
            splitter: Splitter::new(SplitType::Series, setup),
            sources: ModulationSourceSet::new(setup.sample_rate),
            latency_events: producer,
        };
        Self {
            structure: ReentrantMutex::new(()),
            render: Arc::new(Mutex::new(state)),
            latency_events: Mutex::new(consumer),
            listener: Mutex::new(None),
        }
    }

    /// Creates a facade from a validated host config.
    pub fn from_config(config: &HostConfig) -> Result<Self, StateError> {
        config.validate()?;
        Ok(Self::new(config.process_setup(), config.latency_queue_capacity))
    }

    /// Returns a handle for the audio thread.
    pub fn audio_handle(&self) -> AudioHandle {
        AudioHandle::new(Arc::clone(&self.render))
    }

    /// Installs the host latency listener.
    pub fn set_latency_listener(&self, listener: impl Fn(usize) + Send + Sync + 'static) {
        *self.listener.lock() = Some(Arc::new(listener));
    }

    // ── Locking ──────────────────────────────────────────────────────────────

    /// Runs `f` on the render state under both locks, after folding in
    /// pending latency events. A latency notification recorded during `f`
    /// is forwarded to the listener once the render lock is released.
    fn edit<R>(&self, f: impl FnOnce(&mut RenderState) -> R) -> R {
        let _structure = self.structure.lock();
        let (result, notification) = {
            let mut state = self.render.lock();
            self.drain_latency_events(&mut state);
            let result = f(&mut state);
            (result, state.splitter.take_latency_notification())
        };
        if let Some(latency) = notification {
            self.notify_latency(latency);
        }
        result
    }

    /// Read-only access to the graph.
    pub fn with_splitter<R>(&self, f: impl FnOnce(&Splitter) -> R) -> R {
        let _structure = self.structure.lock();
        let state = self.render.lock();
        f(&state.splitter)
    }

    /// Read-only access to the modulation sources.
    pub fn with_sources<R>(&self, f: impl FnOnce(&ModulationSourceSet) -> R) -> R {
        let _structure = self.structure.lock();
        let state = self.render.lock();
        f(&state.sources)
    }

    fn drain_latency_events(&self, state: &mut RenderState) -> usize {
        let mut consumer = self.latency_events.lock();
        let mut drained = 0;
        while let Ok(event) = consumer.pop() {
            tracing::debug!(
                chain = event.chain,
                slot = event.slot,
                latency = event.latency_samples,
                "module latency changed"
            );
            drained += 1;
        }
        if drained > 0 {
            state.splitter.recalculate_latency();
        }
        drained
    }

    /// Calls the listener with no facade lock but the re-entrant structural
    /// one held, so the listener may call back into the facade.
    fn notify_latency(&self, latency: usize) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(latency);
        }
    }

    /// Folds in latency changes reported by the audio thread. Returns the
    /// number of events drained.
    pub fn poll_latency_events(&self) -> usize {
        let _structure = self.structure.lock();
        let (drained, notification) = {
            let mut state = self.render.lock();
            let drained = self.drain_latency_events(&mut state);
            (drained, state.splitter.take_latency_notification())
        };
        if let Some(latency) = notification {
            self.notify_latency(latency);
        }
        drained
    }

    // ── Graph queries ────────────────────────────────────────────────────────

    /// Bus layout the graph is prepared for.
    pub fn setup(&self) -> ProcessSetup {
        self.with_splitter(|s| *s.setup())
    }

    /// Current topology.
    pub fn split_type(&self) -> SplitType {
        self.with_splitter(Splitter::split_type)
    }

    /// Number of chains.
    pub fn num_chains(&self) -> usize {
        self.with_splitter(Splitter::num_chains)
    }

    /// Latency of the graph in samples, as of the last recompute.
    pub fn latency_samples(&self) -> usize {
        self.with_splitter(Splitter::latency_samples)
    }

    /// Crossover frequencies; empty unless multiband.
    pub fn crossover_frequencies(&self) -> Vec<f32> {
        self.with_splitter(Splitter::crossover_frequencies)
    }

    // ── Topology ─────────────────────────────────────────────────────────────

    /// Re-prepares the graph and sources for a new bus layout.
    pub fn prepare(&self, setup: ProcessSetup) {
        self.edit(|state| {
            state.splitter.prepare(&setup);
            state.sources.prepare(setup.sample_rate);
        });
        tracing::info!(
            sample_rate = setup.sample_rate,
            block_size = setup.block_size,
            num_channels = setup.num_channels,
            "graph prepared"
        );
    }

    /// Switches topology, carrying chains over into the new splitter.
    /// Switching to the current topology is a no-op.
    pub fn set_split_type(&self, split_type: SplitType) -> bool {
        let _structure = self.structure.lock();
        if self.split_type() == split_type {
            return true;
        }
        let dropped = self.edit(|state| {
            let placeholder = Splitter::new(SplitType::Series, *state.splitter.setup());
            let previous = std::mem::replace(&mut state.splitter, placeholder);
            let max = split_type.max_chains().unwrap_or(usize::MAX);
            let dropped = previous.num_chains().saturating_sub(max);
            state.splitter = Splitter::from_previous(previous, split_type);
            dropped
        });
        if dropped > 0 {
            tracing::warn!(dropped, "chains beyond the {split_type} topology were dropped");
        }
        true
    }

    /// Appends a chain.
    pub fn add_chain(&self) -> bool {
        self.edit(|state| state.splitter.add_chain())
    }

    /// Removes chain `index`.
    pub fn remove_chain(&self, index: usize) -> bool {
        self.edit(|state| state.splitter.remove_chain(index))
    }

    /// Moves a chain to a new position.
    pub fn move_chain(&self, from: usize, to: usize) -> bool {
        self.edit(|state| state.splitter.move_chain(from, to))
    }

    /// Solos or unsolos chain `index`.
    pub fn set_chain_solo(&self, index: usize, is_soloed: bool) -> bool {
        self.edit(|state| state.splitter.set_chain_solo(index, is_soloed))
    }

    /// Mutes or unmutes chain `index`.
    pub fn set_chain_mute(&self, index: usize, is_muted: bool) -> bool {
        self.edit(|state| state.splitter.set_chain_mute(index, is_muted))
    }

    /// Bypasses chain `index`.
    pub fn set_chain_bypass(&self, index: usize, is_bypassed: bool) -> bool {
        self.edit(|state| state.splitter.set_chain_bypass(index, is_bypassed))
    }

    /// Moves crossover point `index`; multiband only.
    pub fn set_crossover_frequency(&self, index: usize, frequency: f32) -> bool {
        self.edit(|state| state.splitter.set_crossover_frequency(index, frequency))
    }

    // ── Slots ────────────────────────────────────────────────────────────────

    /// Inserts a gain stage (position clamped).
    pub fn insert_gain_stage(&self, chain: usize, pos: usize) -> bool {
        self.edit(|state| state.splitter.insert_gain_stage(chain, pos))
    }

    /// Inserts a module (position clamped).
    pub fn insert_plugin(&self, chain: usize, pos: usize, module: Box<dyn PluginModule>) -> bool {
        self.edit(|state| state.splitter.insert_plugin(chain, pos, module))
    }

    /// Removes a slot.
    pub fn remove_slot(&self, chain: usize, pos: usize) -> bool {
        self.edit(|state| state.splitter.remove_slot(chain, pos))
    }

    /// Moves a slot, possibly to another chain.
    pub fn move_slot(&self, from_chain: usize, from_pos: usize, to_chain: usize, to_pos: usize) -> bool {
        self.edit(|state| state.splitter.move_slot(from_chain, from_pos, to_chain, to_pos))
    }

    /// Bypasses a slot.
    pub fn set_slot_bypass(&self, chain: usize, pos: usize, is_bypassed: bool) -> bool {
        self.edit(|state| state.splitter.set_slot_bypass(chain, pos, is_bypassed))
    }

    /// Sets a gain stage's linear gain.
    pub fn set_gain_linear(&self, chain: usize, pos: usize, gain: f32) -> bool {
        self.edit(|state| state.splitter.set_gain_linear(chain, pos, gain))
    }

    /// Sets a gain stage's pan.
    pub fn set_pan(&self, chain: usize, pos: usize, pan: f32) -> bool {
        self.edit(|state| state.splitter.set_pan(chain, pos, pan))
    }

    /// Swaps the module of a plugin slot; returns the old module.
    pub fn replace_plugin(
        &self,
        chain: usize,
        pos: usize,
        module: Box<dyn PluginModule>,
    ) -> Option<Box<dyn PluginModule>> {
        self.edit(|state| state.splitter.replace_plugin(chain, pos, module))
    }

    /// Records where a plugin slot's editor window was shown.
    pub fn set_editor_bounds(&self, chain: usize, pos: usize, bounds: Option<EditorBounds>) -> bool {
        self.edit(|state| match state.splitter.plugin_slot_mut(chain, pos) {
            Some(slot) => {
                slot.set_editor_bounds(bounds);
                true
            }
            None => false,
        })
    }

    // ── Modulation ───────────────────────────────────────────────────────────

    /// Copy of a plugin slot's modulation table.
    pub fn modulation(&self, chain: usize, pos: usize) -> Option<ModulationConfig> {
        self.with_splitter(|s| {
            s.slot(chain, pos)
                .and_then(|slot| slot.as_plugin())
                .map(|p| p.modulation().clone())
        })
    }

    /// Edits a plugin slot's modulation table in place.
    ///
    /// ```rust,ignore
    /// facade.edit_modulation(0, 1, |config| {
    ///     config.set_active(true);
    ///     let t = config.add_target("Cutoff");
    ///     config.add_source(t, Source::new(SourceKind::Lfo, 1, 0.5))
    /// });
    /// ```
    pub fn edit_modulation<R>(
        &self,
        chain: usize,
        pos: usize,
        f: impl FnOnce(&mut ModulationConfig) -> R,
    ) -> Option<R> {
        self.edit(|state| {
            state
                .splitter
                .plugin_slot_mut(chain, pos)
                .map(|slot| f(slot.modulation_mut()))
        })
    }

    /// Appends an LFO; returns its 1-based id.
    pub fn add_lfo(&self) -> usize {
        self.edit(|state| state.sources.add_lfo())
    }

    /// Removes LFO `id` and renumbers every reference to higher LFOs.
    pub fn remove_lfo(&self, id: usize) -> bool {
        self.remove_source(SourceKind::Lfo, id)
    }

    /// Edits LFO `id`.
    pub fn edit_lfo(&self, id: usize, f: impl FnOnce(&mut LfoSource)) -> bool {
        self.edit(|state| state.sources.lfo_mut(id).map(f).is_some())
    }

    /// Appends an envelope follower; returns its 1-based id.
    pub fn add_envelope(&self) -> usize {
        self.edit(|state| state.sources.add_envelope())
    }

    /// Removes envelope `id` and renumbers every reference to higher
    /// envelopes.
    pub fn remove_envelope(&self, id: usize) -> bool {
        self.remove_source(SourceKind::Envelope, id)
    }

    /// Edits envelope `id`.
    pub fn edit_envelope(&self, id: usize, f: impl FnOnce(&mut EnvelopeSource)) -> bool {
        self.edit(|state| state.sources.envelope_mut(id).map(f).is_some())
    }

    /// Sets macro `id` (1-based).
    pub fn set_macro(&self, id: usize, value: f32) -> bool {
        self.edit(|state| state.sources.set_macro(id, value))
    }

    fn remove_source(&self, kind: SourceKind, id: usize) -> bool {
        self.edit(|state| {
            let removed = match kind {
                SourceKind::Lfo => state.sources.remove_lfo(id),
                SourceKind::Envelope => state.sources.remove_envelope(id),
                SourceKind::Macro => false,
            };
            if removed {
                state.splitter.on_modulation_source_removed(kind, id);
                tracing::debug!("remove_source: {kind} {id}");
            }
            removed
        })
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Serializes the graph to JSON.
    pub fn write_state(&self) -> Result<String, StateError> {
        self.with_splitter(write_state)
    }

    /// Replaces the graph with the one described by `text`.
    ///
    /// The new graph is built before the render lock is taken; on error the
    /// current graph stays installed.
    pub fn restore_state(&self, codec: &PersistenceCodec<'_>, text: &str) -> Result<(), StateError> {
        let _structure = self.structure.lock();
        let splitter = codec.restore_str(text, &self.setup())?;
        self.install(splitter, None);
        Ok(())
    }

    /// Captures the graph and sources as a preset.
    pub fn capture_preset(&self, name: impl Into<String>) -> Preset {
        let _structure = self.structure.lock();
        let state = self.render.lock();
        Preset::capture(name, &state.splitter, &state.sources)
    }

    /// Replaces the graph and sources with a preset's.
    pub fn load_preset(&self, codec: &PersistenceCodec<'_>, preset: &Preset) -> Result<(), StateError> {
        let _structure = self.structure.lock();
        let (splitter, sources) = preset.restore(codec, &self.setup())?;
        self.install(splitter, Some(sources));
        Ok(())
    }

    fn install(&self, mut splitter: Splitter, sources: Option<ModulationSourceSet>) {
        splitter.recalculate_latency();
        let replaced = self.edit(|state| {
            let old_sources = sources.map(|s| std::mem::replace(&mut state.sources, s));
            (std::mem::replace(&mut state.splitter, splitter), old_sources)
        });
        drop(replaced);
    }
}
