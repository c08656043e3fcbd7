//! Property-based tests for braid-state: any graph of gain stages and
//! modulated modules survives a write and restore unchanged.

mod common;

use braid_graph::{ChannelLayoutConfigurator, Slot, Source, SourceKind, SplitType, Splitter};
use braid_state::{PersistenceCodec, write_state};
use common::{Catalog, Filter, Recorder, stereo};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum SlotPlan {
    Gain { gain: f32, pan: f32, bypassed: bool },
    Module { latency: usize, rest: f32, lfo: usize, amount: f32, bypassed: bool },
}

fn slot_plan() -> impl Strategy<Value = SlotPlan> {
    prop_oneof![
        (0.0f32..4.0, -1.0f32..=1.0, any::<bool>())
            .prop_map(|(gain, pan, bypassed)| SlotPlan::Gain { gain, pan, bypassed }),
        (0usize..64, 0.0f32..=1.0, 1usize..4, -1.0f32..=1.0, any::<bool>()).prop_map(
            |(latency, rest, lfo, amount, bypassed)| SlotPlan::Module {
                latency,
                rest,
                lfo,
                amount,
                bypassed,
            }
        ),
    ]
}

fn split_type() -> impl Strategy<Value = SplitType> {
    (0usize..5).prop_map(|i| SplitType::ALL[i])
}

fn build(split: SplitType, chains: &[(bool, bool, bool, Vec<SlotPlan>)]) -> Splitter {
    let mut splitter = Splitter::new(split, stereo());
    while splitter.num_chains() < chains.len() && splitter.add_chain() {}
    for (index, (soloed, muted, bypassed, slots)) in chains.iter().enumerate().take(splitter.num_chains()) {
        splitter.set_chain_solo(index, *soloed);
        splitter.set_chain_mute(index, *muted);
        splitter.set_chain_bypass(index, *bypassed);
        for (pos, plan) in slots.iter().enumerate() {
            match *plan {
                SlotPlan::Gain { gain, pan, bypassed } => {
                    splitter.insert_gain_stage(index, pos);
                    splitter.set_gain_linear(index, pos, gain);
                    splitter.set_pan(index, pos, pan);
                    splitter.set_slot_bypass(index, pos, bypassed);
                }
                SlotPlan::Module { latency, rest, lfo, amount, bypassed } => {
                    splitter.insert_plugin(index, pos, Filter::boxed("Filter", latency));
                    splitter.set_slot_bypass(index, pos, bypassed);
                    let modulation = splitter.plugin_slot_mut(index, pos).unwrap().modulation_mut();
                    modulation.set_active(true);
                    let t = modulation.add_target("Cutoff");
                    modulation.set_rest_value(t, rest);
                    modulation.add_source(t, Source::new(SourceKind::Lfo, lfo, amount));
                }
            }
        }
    }
    splitter
}

fn summarize(slot: &Slot) -> (bool, Option<(f32, f32)>, Option<(String, f32)>) {
    let gain = slot.as_gain_stage().map(|g| (g.gain_linear(), g.pan()));
    let module = slot.as_plugin().map(|p| {
        let config = &p.modulation().parameter_configs[0];
        (config.target_parameter_name.clone(), config.rest_value)
    });
    (slot.is_bypassed(), gain, module)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Topology, chain order and flags, slot settings and modulation
    /// tables are identical after a round trip.
    #[test]
    fn graph_round_trips(
        split in split_type(),
        chains in prop::collection::vec(
            (any::<bool>(), any::<bool>(), any::<bool>(), prop::collection::vec(slot_plan(), 0..4)),
            1..5,
        ),
    ) {
        let original = build(split, &chains);
        let text = write_state(&original).unwrap();
        let errors = Recorder::default();
        let codec = PersistenceCodec::new(&Catalog, &ChannelLayoutConfigurator, &errors);
        let restored = codec.restore_str(&text, &stereo()).unwrap();

        prop_assert!(errors.messages.borrow().is_empty());
        prop_assert_eq!(restored.split_type(), original.split_type());
        prop_assert_eq!(restored.num_chains(), original.num_chains());
        prop_assert_eq!(restored.num_chains_soloed(), original.num_chains_soloed());
        prop_assert_eq!(restored.latency_samples(), original.latency_samples());
        prop_assert_eq!(restored.crossover_frequencies(), original.crossover_frequencies());

        for (a, b) in original.chains().iter().zip(restored.chains()) {
            prop_assert_eq!(a.is_soloed, b.is_soloed);
            prop_assert_eq!(a.chain.is_muted(), b.chain.is_muted());
            prop_assert_eq!(a.chain.is_bypassed(), b.chain.is_bypassed());
            prop_assert_eq!(a.chain.num_slots(), b.chain.num_slots());
            for (x, y) in a.chain.slots().iter().zip(b.chain.slots()) {
                prop_assert_eq!(summarize(x), summarize(y));
                if let (Some(p), Some(q)) = (x.as_plugin(), y.as_plugin()) {
                    prop_assert_eq!(p.modulation(), q.modulation());
                }
            }
        }
    }
}
