//! Chain: an ordered pipeline of slots forming one signal path.
//!
//! A chain owns its slots, its bypass/mute flags and a latency-compensation
//! delay. The delay length is pushed down by the owning splitter as
//! `required − own` so that every chain of a splitter reaches the output with
//! the same total latency.
//!
//! Slot indices are positions. Inserts clamp an out-of-range position to the
//! end; every other positional mutator returns `false` and leaves the chain
//! untouched when the position is out of range or the slot kind does not
//! match.

use braid_core::{AudioBuffer, CompensationDelay, PluginModule, ProcessSetup};
use parking_lot::Mutex;

use crate::context::ProcessContext;
use crate::modulation::{SourceKind, apply_modulation};
use crate::slot::{GainStage, PluginSlot, Slot};

/// One signal path of a splitter.
pub struct Chain {
    slots: Vec<Slot>,
    is_bypassed: bool,
    is_muted: bool,
    own_latency: usize,
    required_latency: usize,
    /// Try-locked on the audio thread; resized from the control thread.
    delay: Mutex<CompensationDelay>,
    setup: ProcessSetup,
}

impl Chain {
    /// Creates an empty chain for the given bus layout.
    pub fn new(setup: ProcessSetup) -> Self {
        Self {
            slots: Vec::new(),
            is_bypassed: false,
            is_muted: false,
            own_latency: 0,
            required_latency: 0,
            delay: Mutex::new(CompensationDelay::new(setup.num_channels, 0)),
            setup,
        }
    }

    /// Returns the number of slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the chain has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns all slots in processing order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Returns the slot at `pos`.
    pub fn slot(&self, pos: usize) -> Option<&Slot> {
        self.slots.get(pos)
    }

    /// Returns the slot at `pos` mutably.
    pub fn slot_mut(&mut self, pos: usize) -> Option<&mut Slot> {
        self.slots.get_mut(pos)
    }

    /// Returns the plugin slot at `pos`, if that slot is a plugin.
    pub fn plugin_slot_mut(&mut self, pos: usize) -> Option<&mut PluginSlot> {
        self.slots.get_mut(pos).and_then(Slot::as_plugin_mut)
    }

    /// Returns true if bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.is_bypassed
    }

    /// Bypasses the chain. The caller must recompute latency afterwards.
    pub fn set_bypassed(&mut self, is_bypassed: bool) {
        self.is_bypassed = is_bypassed;
    }

    /// Returns true if muted.
    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    /// Mutes the chain. Mute beats bypass.
    pub fn set_muted(&mut self, is_muted: bool) {
        self.is_muted = is_muted;
    }

    /// Inserts a unity gain stage; returns the position it landed at.
    pub fn insert_gain_stage(&mut self, pos: usize) -> usize {
        let stage = GainStage::new(self.setup.num_channels, self.setup.sample_rate);
        self.insert_slot(pos, Slot::GainStage(stage))
    }

    /// Inserts a hosted module; returns the position it landed at.
    pub fn insert_plugin(&mut self, pos: usize, module: Box<dyn PluginModule>) -> usize {
        self.insert_slot(pos, Slot::Plugin(PluginSlot::new(module)))
    }

    /// Inserts a prepared-or-not slot, clamping `pos` to the end.
    pub fn insert_slot(&mut self, pos: usize, mut slot: Slot) -> usize {
        slot.prepare(&self.setup);
        let pos = pos.min(self.slots.len());
        self.slots.insert(pos, slot);
        pos
    }

    /// Removes and returns the slot at `pos`.
    pub fn take_slot(&mut self, pos: usize) -> Option<Slot> {
        (pos < self.slots.len()).then(|| self.slots.remove(pos))
    }

    /// Removes the slot at `pos`.
    pub fn remove_slot(&mut self, pos: usize) -> bool {
        self.take_slot(pos).is_some()
    }

    /// Moves a slot within the chain. `to` is clamped to the last position.
    pub fn move_slot(&mut self, from: usize, to: usize) -> bool {
        let Some(slot) = self.take_slot(from) else {
            return false;
        };
        let to = to.min(self.slots.len());
        self.slots.insert(to, slot);
        true
    }

    /// Bypasses the slot at `pos`.
    pub fn set_slot_bypass(&mut self, pos: usize, is_bypassed: bool) -> bool {
        match self.slots.get_mut(pos) {
            Some(slot) => {
                slot.set_bypassed(is_bypassed);
                true
            }
            None => false,
        }
    }

    /// Sets the gain of the gain stage at `pos`.
    pub fn set_gain_linear(&mut self, pos: usize, gain: f32) -> bool {
        match self.slots.get_mut(pos).and_then(Slot::as_gain_stage_mut) {
            Some(stage) => {
                stage.set_gain_linear(gain);
                true
            }
            None => false,
        }
    }

    /// Sets the pan of the gain stage at `pos`.
    pub fn set_pan(&mut self, pos: usize, pan: f32) -> bool {
        match self.slots.get_mut(pos).and_then(Slot::as_gain_stage_mut) {
            Some(stage) => {
                stage.set_pan(pan);
                true
            }
            None => false,
        }
    }

    /// Swaps the module of the plugin slot at `pos`, returning the old one.
    pub fn replace_plugin(
        &mut self,
        pos: usize,
        mut module: Box<dyn PluginModule>,
    ) -> Option<Box<dyn PluginModule>> {
        let slot = self.slots.get_mut(pos).and_then(Slot::as_plugin_mut)?;
        module.prepare(&self.setup);
        Some(slot.replace_module(module))
    }

    /// Latency of this chain's own processing, as of the last recompute.
    pub fn latency_samples(&self) -> usize {
        self.own_latency
    }

    /// Latency the splitter asked this chain to match.
    pub fn required_latency(&self) -> usize {
        self.required_latency
    }

    /// Delay currently applied for compensation.
    pub fn compensation_samples(&self) -> usize {
        self.delay.lock().delay_samples()
    }

    /// Recomputes own latency: the sum over active plugin slots, or 0 when
    /// the chain is bypassed. Idempotent.
    pub fn recalculate_latency(&mut self) -> usize {
        for slot in &mut self.slots {
            if let Slot::Plugin(p) = slot {
                p.poll_latency();
            }
        }
        self.own_latency = if self.is_bypassed {
            0
        } else {
            self.slots.iter().map(Slot::latency_samples).sum()
        };
        self.own_latency
    }

    /// Sizes the compensation delay to `max(0, required − own)`.
    pub fn set_required_latency(&mut self, required: usize) {
        self.required_latency = required;
        let compensation = required.saturating_sub(self.own_latency);
        self.delay.get_mut().set_delay(compensation);
    }

    /// Prepares every slot and the delay line for a new bus layout.
    pub fn prepare(&mut self, setup: &ProcessSetup) {
        self.setup = *setup;
        for slot in &mut self.slots {
            slot.prepare(setup);
        }
        self.delay.get_mut().set_num_channels(setup.num_channels);
    }

    /// Clears the compensation delay line to silence.
    pub fn clear_compensation(&mut self) {
        self.delay.get_mut().clear();
    }

    /// Clears slot and delay state.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.delay.get_mut().clear();
    }

    /// Renumbers modulation references in every plugin slot.
    pub fn on_modulation_source_removed(&mut self, kind: SourceKind, id: usize) {
        for slot in &mut self.slots {
            if let Slot::Plugin(p) = slot {
                p.modulation.on_source_removed(kind, id);
            }
        }
    }

    /// Reports latency changes of every active plugin slot, whether or not
    /// the chain produces audio this block. Real-time safe.
    pub fn poll_latency_changes(&mut self, ctx: &mut ProcessContext<'_>) {
        for (pos, slot) in self.slots.iter_mut().enumerate() {
            if let Slot::Plugin(plugin) = slot
                && !plugin.is_bypassed()
                && let Some(latency) = plugin.poll_latency()
            {
                ctx.report_latency(pos, latency);
            }
        }
    }

    /// Processes one block in place.
    ///
    /// Order: latency poll, compensation delay, then mute (zero), bypass
    /// (pass through) or the slots in order. Plugin slots get their
    /// modulation applied just before they run. Real-time safe: if the delay
    /// is being resized the block passes undelayed.
    pub fn process(&mut self, buffer: &mut AudioBuffer, ctx: &mut ProcessContext<'_>) {
        self.poll_latency_changes(ctx);
        if let Some(mut delay) = self.delay.try_lock() {
            delay.process_block_inplace(buffer);
        }
        if self.is_muted {
            buffer.clear();
            return;
        }
        if self.is_bypassed {
            return;
        }
        for (pos, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Slot::GainStage(stage) => {
                    if !stage.is_bypassed() {
                        stage.process_block(buffer);
                    }
                }
                Slot::Plugin(plugin) => {
                    if plugin.is_bypassed() {
                        continue;
                    }
                    apply_modulation(plugin, ctx.sources());
                    plugin.module.process_block(buffer);
                    if let Some(latency) = plugin.poll_latency() {
                        ctx.report_latency(pos, latency);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::ModulationSourceSet;
    use braid_core::{Effect, ModuleStateError, ParamDescriptor, ParameterInfo, PluginDescriptor};

    struct Fixed {
        descriptor: PluginDescriptor,
        params: Vec<ParamDescriptor>,
        latency: usize,
    }

    impl Fixed {
        fn boxed(name: &str, latency: usize) -> Box<dyn PluginModule> {
            Box::new(Self {
                descriptor: PluginDescriptor::new(name, "test"),
                params: Vec::new(),
                latency,
            })
        }
    }

    impl Effect for Fixed {
        fn process_block(&mut self, _: &mut AudioBuffer) {}
        fn prepare(&mut self, _: &ProcessSetup) {}
        fn reset(&mut self) {}
        fn latency_samples(&self) -> usize {
            self.latency
        }
    }

    impl ParameterInfo for Fixed {
        fn param_count(&self) -> usize {
            self.params.len()
        }
        fn param_info(&self, index: usize) -> Option<&ParamDescriptor> {
            self.params.get(index)
        }
        fn get_param(&self, _: usize) -> f32 {
            0.0
        }
        fn set_param(&mut self, _: usize, _: f32) {}
    }

    impl PluginModule for Fixed {
        fn descriptor(&self) -> &PluginDescriptor {
            &self.descriptor
        }
        fn set_channel_count(&mut self, _: usize) -> bool {
            true
        }
        fn save_state(&self) -> Vec<u8> {
            Vec::new()
        }
        fn load_state(&mut self, _: &[u8]) -> Result<(), ModuleStateError> {
            Ok(())
        }
    }

    fn chain() -> Chain {
        Chain::new(ProcessSetup::new(48000.0, 16, 2))
    }

    fn names(chain: &Chain) -> Vec<&str> {
        chain.slots().iter().map(Slot::name).collect()
    }

    #[test]
    fn inserts_clamp_to_the_end() {
        let mut c = chain();
        assert_eq!(c.insert_plugin(7, Fixed::boxed("A", 0)), 0);
        assert_eq!(c.insert_gain_stage(99), 1);
        assert_eq!(c.insert_plugin(0, Fixed::boxed("B", 0)), 0);
        assert_eq!(names(&c), vec!["B", "A", "Gain Stage"]);
    }

    #[test]
    fn move_slot_reorders_and_rejects_bad_source() {
        let mut c = chain();
        c.insert_plugin(0, Fixed::boxed("A", 0));
        c.insert_plugin(1, Fixed::boxed("B", 0));
        c.insert_plugin(2, Fixed::boxed("C", 0));

        assert!(c.move_slot(0, 9));
        assert_eq!(names(&c), vec!["B", "C", "A"]);
        assert!(!c.move_slot(3, 0));
        assert_eq!(names(&c), vec!["B", "C", "A"]);
    }

    #[test]
    fn gain_setters_need_a_gain_stage() {
        let mut c = chain();
        c.insert_plugin(0, Fixed::boxed("A", 0));
        c.insert_gain_stage(1);

        assert!(!c.set_gain_linear(0, 0.5));
        assert!(!c.set_pan(0, 0.5));
        assert!(c.set_gain_linear(1, 0.5));
        assert!(c.set_pan(1, -0.5));
        assert!(!c.set_slot_bypass(2, true));
        assert!(!c.remove_slot(2));
    }

    #[test]
    fn replace_plugin_keeps_bypass() {
        let mut c = chain();
        c.insert_plugin(0, Fixed::boxed("A", 0));
        c.insert_gain_stage(1);
        c.set_slot_bypass(0, true);

        let old = c.replace_plugin(0, Fixed::boxed("B", 0));
        assert_eq!(old.map(|m| m.name().to_string()).as_deref(), Some("A"));
        assert!(c.slot(0).is_some_and(Slot::is_bypassed));
        assert_eq!(names(&c), vec!["B", "Gain Stage"]);
        assert!(c.replace_plugin(1, Fixed::boxed("C", 0)).is_none());
    }

    #[test]
    fn latency_sums_active_plugins() {
        let mut c = chain();
        c.insert_plugin(0, Fixed::boxed("A", 10));
        c.insert_plugin(1, Fixed::boxed("B", 5));
        c.insert_gain_stage(2);
        assert_eq!(c.recalculate_latency(), 15);
        assert_eq!(c.recalculate_latency(), 15);

        c.set_slot_bypass(1, true);
        assert_eq!(c.recalculate_latency(), 10);

        c.set_bypassed(true);
        assert_eq!(c.recalculate_latency(), 0);
    }

    #[test]
    fn compensation_is_required_minus_own() {
        let mut c = chain();
        c.insert_plugin(0, Fixed::boxed("A", 10));
        c.recalculate_latency();
        c.set_required_latency(25);
        assert_eq!(c.compensation_samples(), 15);
        assert_eq!(c.required_latency(), 25);

        c.set_required_latency(4);
        assert_eq!(c.compensation_samples(), 0);
    }

    #[test]
    fn compensation_delays_the_signal() {
        let mut c = chain();
        c.set_required_latency(3);
        let sources = ModulationSourceSet::new(48000.0);
        let mut ctx = ProcessContext::new(&sources, None);

        let mut impulse = vec![0.0; 8];
        impulse[0] = 1.0;
        let mut buf = AudioBuffer::from_channels(vec![impulse.clone(), impulse]);
        c.process(&mut buf, &mut ctx);
        assert_eq!(buf.channel(0)[3], 1.0);
        assert_eq!(buf.channel(1)[0], 0.0);
    }

    #[test]
    fn mute_beats_bypass() {
        let mut c = chain();
        c.set_bypassed(true);
        c.set_muted(true);
        let sources = ModulationSourceSet::new(48000.0);
        let mut ctx = ProcessContext::new(&sources, None);

        let mut buf = AudioBuffer::from_channels(vec![vec![1.0; 8], vec![1.0; 8]]);
        c.process(&mut buf, &mut ctx);
        assert!(buf.channel(0).iter().chain(buf.channel(1)).all(|&s| s == 0.0));
    }
}
