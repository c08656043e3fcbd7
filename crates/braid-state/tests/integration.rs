//! Integration tests for braid-state: whole-graph round trips, tolerant
//! reads of hand-edited documents, collaborator failures and preset files.

mod common;

use braid_core::ProcessSetup;
use braid_graph::{
    ChannelLayoutConfigurator, EditorBounds, ModulationSourceSet, Rect, Slot, Source, SourceKind,
    SplitType, Splitter,
};
use braid_state::{PersistenceCodec, Preset, StateError, write_document, write_state};
use common::{Catalog, Filter, Recorder, SAMPLE_RATE, stereo};

fn codec<'a>(errors: &'a Recorder) -> PersistenceCodec<'a> {
    PersistenceCodec::new(&Catalog, &ChannelLayoutConfigurator, errors)
}

fn round_trip(splitter: &Splitter) -> (Splitter, Vec<String>) {
    let text = write_state(splitter).unwrap();
    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(&text, &stereo()).unwrap();
    let messages = errors.messages.borrow().clone();
    (restored, messages)
}

fn gain_of(splitter: &Splitter, chain: usize, pos: usize) -> Option<(f32, f32, bool)> {
    let stage = splitter.slot(chain, pos)?.as_gain_stage()?;
    Some((stage.gain_linear(), stage.pan(), stage.is_bypassed()))
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn parallel_graph_round_trips() {
    let mut splitter = Splitter::new(SplitType::Parallel, stereo());
    splitter.add_chain();
    splitter.add_chain();

    splitter.insert_gain_stage(0, 0);
    splitter.set_gain_linear(0, 0, 0.5);
    splitter.set_pan(0, 0, -0.25);
    splitter.insert_plugin(1, 0, Filter::boxed("Filter", 12));
    splitter.insert_gain_stage(1, 1);
    splitter.set_slot_bypass(1, 1, true);
    splitter.set_chain_solo(1, true);
    splitter.set_chain_mute(2, true);
    splitter.set_chain_bypass(0, true);

    {
        let plugin = splitter.plugin_slot_mut(1, 0).unwrap();
        plugin.module_mut().set_param(0, 0.8);
        plugin.module_mut().set_param(1, 0.1);
        plugin.set_editor_bounds(Some(EditorBounds {
            window: Rect::new(10, 20, 640, 480),
            display_area: Rect::new(0, 0, 1920, 1080),
        }));
        let modulation = plugin.modulation_mut();
        modulation.set_active(true);
        let t = modulation.add_target("Cutoff");
        modulation.set_rest_value(t, 0.3);
        modulation.add_source(t, Source::new(SourceKind::Lfo, 1, 0.5));
        modulation.add_source(t, Source::new(SourceKind::Macro, 4, -1.0));
    }

    let (restored, messages) = round_trip(&splitter);
    assert!(messages.is_empty(), "unexpected errors: {messages:?}");

    assert_eq!(restored.split_type(), SplitType::Parallel);
    assert_eq!(restored.num_chains(), 3);
    let flags: Vec<(bool, bool, bool)> = restored
        .chains()
        .iter()
        .map(|e| (e.is_soloed, e.chain.is_muted(), e.chain.is_bypassed()))
        .collect();
    assert_eq!(
        flags,
        vec![(false, false, true), (true, false, false), (false, true, false)]
    );
    assert_eq!(restored.num_chains_soloed(), 1);

    assert_eq!(gain_of(&restored, 0, 0), Some((0.5, -0.25, false)));
    assert_eq!(gain_of(&restored, 1, 1), Some((1.0, 0.0, true)));

    let plugin = restored.slot(1, 0).and_then(Slot::as_plugin).unwrap();
    assert_eq!(plugin.module().name(), "Filter");
    assert_eq!(plugin.module().get_param(0), 0.8);
    assert_eq!(plugin.module().get_param(1), 0.1);
    let original = splitter.slot(1, 0).and_then(Slot::as_plugin).unwrap();
    assert_eq!(plugin.editor_bounds(), original.editor_bounds());
    assert_eq!(plugin.modulation(), original.modulation());

    assert_eq!(restored.latency_samples(), 12);
}

#[test]
fn multiband_frequencies_round_trip() {
    let mut splitter = Splitter::new(SplitType::Multiband, stereo());
    splitter.add_chain();
    splitter.add_chain();
    for (i, hz) in [250.0, 2000.0, 8000.0].into_iter().enumerate() {
        assert!(splitter.set_crossover_frequency(i, hz));
    }

    let (restored, _) = round_trip(&splitter);
    assert_eq!(restored.split_type(), SplitType::Multiband);
    assert_eq!(restored.num_chains(), 4);
    assert_eq!(restored.crossover_frequencies(), vec![250.0, 2000.0, 8000.0]);
}

#[test]
fn cached_frequencies_survive_a_restore() {
    let mut splitter = Splitter::new(SplitType::Multiband, stereo());
    splitter.add_chain();
    splitter.set_crossover_frequency(0, 300.0);
    splitter.set_crossover_frequency(1, 3000.0);
    let parallel = Splitter::from_previous(splitter, SplitType::Parallel);
    assert_eq!(parallel.cached_crossover_frequencies(), &[300.0, 3000.0]);

    let (restored, _) = round_trip(&parallel);
    assert_eq!(restored.split_type(), SplitType::Parallel);
    assert_eq!(restored.cached_crossover_frequencies(), &[300.0, 3000.0]);

    let multiband = Splitter::from_previous(restored, SplitType::Multiband);
    assert_eq!(multiband.crossover_frequencies(), vec![300.0, 3000.0]);
}

#[test]
fn document_carries_schema_version_and_names() {
    let mut splitter = Splitter::new(SplitType::MidSide, stereo());
    splitter.insert_gain_stage(1, 0);
    let doc = write_document(&splitter);
    assert_eq!(doc["schemaVersion"], 1);
    assert_eq!(doc["Splitter"]["splitType"], "midside");
    assert_eq!(doc["Splitter"]["Chains"]["Chain_1"]["Plugins"]["Slot_0"]["slotType"], "GainStage");
    assert!(doc["Splitter"].get("Crossovers").is_none());
}

// ============================================================================
// Collaborator failures
// ============================================================================

#[test]
fn missing_module_is_reported_and_omitted() {
    let mut splitter = Splitter::new(SplitType::Series, stereo());
    splitter.insert_plugin(0, 0, Filter::boxed("Missing", 0));
    splitter.insert_gain_stage(0, 1);
    splitter.insert_plugin(0, 2, Filter::boxed("Filter", 0));

    let (restored, messages) = round_trip(&splitter);
    assert_eq!(messages, vec!["Could not load Missing: plugin not found".to_string()]);
    let chain = restored.chain(0).unwrap();
    assert_eq!(chain.num_slots(), 2);
    assert!(chain.slot(0).unwrap().as_gain_stage().is_some());
    assert_eq!(chain.slot(1).unwrap().name(), "Filter");
}

#[test]
fn mono_module_on_stereo_bus_is_reported() {
    let mut descriptor = Filter::descriptor("MonoComp", 0);
    descriptor.num_inputs = 1;
    let mut splitter = Splitter::new(SplitType::Series, ProcessSetup::new(SAMPLE_RATE, 128, 1));
    splitter.insert_plugin(0, 0, Box::new(Filter::new(descriptor)));
    let text = write_state(&splitter).unwrap();

    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(&text, &stereo()).unwrap();
    assert!(restored.chain(0).unwrap().is_empty());

    let messages = errors.messages.borrow();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("MonoComp"), "{}", messages[0]);
    assert!(messages[0].contains("mono"), "{}", messages[0]);
}

#[test]
fn undecodable_state_keeps_module_defaults() {
    let doc = r#"{
        "schemaVersion": 1,
        "Splitter": { "splitType": "series", "Chains": { "Chain_0": {
            "isSoloed": false, "isChainBypassed": false, "isChainMuted": false,
            "Plugins": { "Slot_0": {
                "slotType": "Plugin", "isSlotBypassed": true,
                "PluginDescription": { "name": "Filter", "format": "test" },
                "PluginData": "***not base64***"
            } } } } }
    }"#;
    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(doc, &stereo()).unwrap();
    assert!(errors.messages.borrow().is_empty());
    let slot = restored.slot(0, 0).unwrap();
    assert!(slot.is_bypassed());
    let plugin = slot.as_plugin().unwrap();
    assert_eq!(plugin.module().get_param(0), 0.5);
    assert!(!plugin.modulation().is_active);
    assert!(plugin.editor_bounds().is_none());
}

// ============================================================================
// Tolerant reads
// ============================================================================

#[test]
fn missing_fields_take_defaults() {
    let doc = r#"{
        "Splitter": { "splitType": "Parallel", "Chains": {
            "Chain_0": { "Plugins": {
                "Slot_1": { "slotType": "GainStage", "Pan": 0.5 },
                "Slot_0": { "slotType": "GainStage", "Gain": 0.25, "isSlotBypassed": "yes" },
                "Slot_2": { "slotType": "Reverb" }
            } },
            "Chain_1": {}
        } }
    }"#;
    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(doc, &stereo()).unwrap();
    assert_eq!(restored.split_type(), SplitType::Parallel);
    assert_eq!(restored.num_chains(), 2);
    assert_eq!(gain_of(&restored, 0, 0), Some((0.25, 0.0, false)));
    assert_eq!(gain_of(&restored, 0, 1), Some((1.0, 0.5, false)));
    assert_eq!(restored.chain(0).unwrap().num_slots(), 2);
    assert!(restored.chain(1).unwrap().is_empty());
    assert!(!restored.chain(1).unwrap().is_muted());
}

#[test]
fn unknown_split_type_falls_back_to_series() {
    let doc = r#"{ "schemaVersion": 1, "Splitter": { "splitType": "diagonal" } }"#;
    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(doc, &stereo()).unwrap();
    assert_eq!(restored.split_type(), SplitType::Series);
    assert_eq!(restored.num_chains(), 1);
}

#[test]
fn extra_chains_of_fixed_topology_are_dropped() {
    let doc = r#"{ "schemaVersion": 1, "Splitter": { "splitType": "leftright", "Chains": {
        "Chain_0": { "isChainMuted": true }, "Chain_1": {}, "Chain_2": { "isChainMuted": true }
    } } }"#;
    let errors = Recorder::default();
    let restored = codec(&errors).restore_str(doc, &stereo()).unwrap();
    assert_eq!(restored.num_chains(), 2);
    assert!(restored.chain(0).unwrap().is_muted());
    assert!(!restored.chain(1).unwrap().is_muted());
}

#[test]
fn fatal_documents_are_errors() {
    let errors = Recorder::default();
    let codec = codec(&errors);
    assert!(matches!(
        codec.restore_str("not json", &stereo()),
        Err(StateError::Json(_))
    ));
    assert!(matches!(
        codec.restore_str("[1, 2]", &stereo()),
        Err(StateError::NotAnObject(_))
    ));
    assert!(matches!(
        codec.restore_str(r#"{ "schemaVersion": 2, "Splitter": {} }"#, &stereo()),
        Err(StateError::UnsupportedVersion { found: 2, supported: 1 })
    ));
    assert!(matches!(
        codec.restore_str(r#"{ "schemaVersion": 1, "Splitter": 3 }"#, &stereo()),
        Err(StateError::NotAnObject(_))
    ));
}

// ============================================================================
// Preset files
// ============================================================================

#[test]
fn preset_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("presets").join("wide.json");

    let mut splitter = Splitter::new(SplitType::LeftRight, stereo());
    splitter.insert_plugin(0, 0, Filter::boxed("Filter", 4));
    splitter
        .plugin_slot_mut(0, 0)
        .unwrap()
        .modulation_mut()
        .add_target("Resonance");
    let mut sources = ModulationSourceSet::new(SAMPLE_RATE);
    sources.add_envelope();
    sources.add_envelope();
    sources.set_macro(1, 1.0);

    Preset::capture("Wide", &splitter, &sources)
        .with_description("left filtered")
        .save(&path)
        .unwrap();
    assert!(path.exists());

    let preset = Preset::load(&path).unwrap();
    assert_eq!(preset.name, "Wide");
    assert_eq!(preset.description.as_deref(), Some("left filtered"));

    let errors = Recorder::default();
    let (restored, restored_sources) = preset.restore(&codec(&errors), &stereo()).unwrap();
    assert_eq!(restored.split_type(), SplitType::LeftRight);
    assert_eq!(restored.latency_samples(), 4);
    let plugin = restored.slot(0, 0).and_then(Slot::as_plugin).unwrap();
    assert_eq!(plugin.modulation().parameter_configs[0].target_parameter_name, "Resonance");
    assert_eq!(restored_sources.num_envelopes(), 2);
    assert_eq!(restored_sources.macro_value(1), Some(1.0));
}

#[test]
fn loading_a_missing_preset_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = Preset::load(&path).unwrap_err();
    assert!(matches!(err, StateError::ReadFile { .. }));
    assert!(err.to_string().contains("nope.json"));
}
