//! JSON codec for the routing graph and its modulation sources.
//!
//! The document mirrors the graph one to one: splitter, chains, slots and
//! each plugin slot's modulation table (key names in [`crate::schema`]).
//!
//! Reading is tolerant. A missing or mistyped field is logged with
//! `tracing::warn!` and replaced by its default, a missing repeating group
//! yields no entries, and a plugin slot whose module cannot be created or
//! cannot run on the bus is left out after reporting to the [`ErrorSink`].
//! Only a document that is not an object, or one written by a newer schema,
//! fails the whole restore.
//!
//! # Example
//!
//! ```rust,ignore
//! let codec = PersistenceCodec::new(&loader, &ChannelLayoutConfigurator, &TracingErrorSink);
//! let text = write_state(&splitter)?;
//! let restored = codec.restore_str(&text, &setup)?;
//! ```

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use braid_core::{LfoWaveform, PluginDescriptor, PluginModule, ProcessSetup};
use braid_graph::{
    ChainEntry, EditorBounds, EnvelopeInput, ErrorSink, ModulationConfig, ModulationSourceSet,
    ModuleConfigurator, NUM_MACROS, PluginLoader, PluginSlot, Rect, Slot, Source, SourceKind,
    SplitType, Splitter,
};
use serde_json::{Map, Value};

use crate::error::StateError;
use crate::schema::{self as key, indexed_key, parse_indexed_key};

type Object = Map<String, Value>;

/// Restores graphs from persisted documents.
///
/// Module creation, layout checks and user-facing error reporting are
/// delegated to the host's collaborators.
pub struct PersistenceCodec<'a> {
    loader: &'a dyn PluginLoader,
    configurator: &'a dyn ModuleConfigurator,
    errors: &'a dyn ErrorSink,
}

impl<'a> PersistenceCodec<'a> {
    /// Creates a codec over the host's collaborators.
    pub fn new(
        loader: &'a dyn PluginLoader,
        configurator: &'a dyn ModuleConfigurator,
        errors: &'a dyn ErrorSink,
    ) -> Self {
        Self {
            loader,
            configurator,
            errors,
        }
    }

    /// Parses `text` as JSON and restores the graph it describes.
    pub fn restore_str(&self, text: &str, setup: &ProcessSetup) -> Result<Splitter, StateError> {
        let document: Value = serde_json::from_str(text)?;
        self.restore(&document, setup)
    }

    /// Builds a new splitter from a document produced by [`write_document`].
    ///
    /// The returned splitter is reset and its latency recomputed.
    pub fn restore(&self, document: &Value, setup: &ProcessSetup) -> Result<Splitter, StateError> {
        let root = document
            .as_object()
            .ok_or_else(|| StateError::not_an_object("document"))?;
        check_schema_version(root)?;

        let section = match root.get(key::SPLITTER) {
            Some(Value::Object(section)) => section,
            Some(_) => return Err(StateError::not_an_object(key::SPLITTER)),
            None => {
                tracing::warn!("state document has no splitter section, restoring an empty graph");
                return Ok(Splitter::new(SplitType::default(), *setup));
            }
        };

        let split_type = read_field(section, key::SPLIT_TYPE, SplitType::default(), |v| {
            v.as_str().and_then(|s| SplitType::from_str(s).ok())
        });
        let mut splitter = Splitter::new(split_type, *setup);

        let chains = indexed_members(section, key::CHAINS, key::CHAIN_PREFIX, true);
        while splitter.num_chains() < chains.len() && splitter.add_chain() {}
        if chains.len() > splitter.num_chains() {
            tracing::warn!(
                persisted = chains.len(),
                kept = splitter.num_chains(),
                "restore: more chains than the {split_type} topology holds, extra chains dropped"
            );
        }

        for (index, value) in chains.into_iter().enumerate().take(splitter.num_chains()) {
            match value.as_object() {
                Some(chain) => self.restore_chain(&mut splitter, index, chain, setup),
                None => tracing::warn!("restore: chain {index} is not an object, left empty"),
            }
        }

        if split_type == SplitType::Multiband {
            let points = indexed_members(section, key::CROSSOVERS, key::CROSSOVER_PREFIX, true);
            for (index, value) in points.into_iter().enumerate() {
                match value.as_f64() {
                    Some(hz) => {
                        splitter.set_crossover_frequency(index, hz as f32);
                    }
                    None => tracing::warn!("restore: crossover {index} is not a number, kept default"),
                }
            }
        }

        let cached: Vec<f32> = indexed_members(
            section,
            key::CACHED_CROSSOVER_FREQUENCIES,
            key::CACHED_FREQUENCY_PREFIX,
            false,
        )
        .into_iter()
        .filter_map(|v| v.as_f64().map(|hz| hz as f32))
        .collect();
        if !cached.is_empty() {
            splitter.set_cached_crossover_frequencies(cached);
        }

        splitter.reset();
        let latency = splitter.recalculate_latency();
        tracing::info!(
            split_type = %split_type,
            chains = splitter.num_chains(),
            latency,
            "graph restored"
        );
        Ok(splitter)
    }

    fn restore_chain(&self, splitter: &mut Splitter, index: usize, chain: &Object, setup: &ProcessSetup) {
        splitter.set_chain_solo(index, read_bool(chain, key::IS_SOLOED, false));
        splitter.set_chain_mute(index, read_bool(chain, key::IS_CHAIN_MUTED, false));
        splitter.set_chain_bypass(index, read_bool(chain, key::IS_CHAIN_BYPASSED, false));

        for value in indexed_members(chain, key::PLUGINS, key::SLOT_PREFIX, true) {
            let Some(slot) = value.as_object() else {
                tracing::warn!("restore: slot in chain {index} is not an object, skipped");
                continue;
            };
            match slot.get(key::SLOT_TYPE).and_then(Value::as_str) {
                Some(key::SLOT_TYPE_GAIN_STAGE) => restore_gain_stage(splitter, index, slot),
                Some(key::SLOT_TYPE_PLUGIN) => self.restore_plugin(splitter, index, slot, setup),
                other => tracing::warn!(slot_type = ?other, "restore: unknown slot type in chain {index}, skipped"),
            }
        }
    }

    fn restore_plugin(&self, splitter: &mut Splitter, chain: usize, slot: &Object, setup: &ProcessSetup) {
        let Some(descriptor) = slot.get(key::PLUGIN_DESCRIPTION).and_then(read_descriptor) else {
            self.errors
                .report("Could not restore a plugin slot: its plugin description is missing");
            return;
        };

        let mut module = match self
            .loader
            .instantiate(&descriptor, setup.sample_rate, setup.block_size)
        {
            Ok(module) => module,
            Err(message) => {
                self.errors
                    .report(&format!("Could not load {}: {message}", descriptor.name));
                return;
            }
        };

        if !self.configurator.configure(module.as_mut(), setup) {
            let bus = if setup.is_stereo() { "stereo" } else { "mono" };
            self.errors.report(&format!(
                "Could not load {}: it does not support a {bus} layout here, \
                 a mono plugin cannot run on a stereo chain and vice versa",
                descriptor.name
            ));
            return;
        }

        restore_module_state(module.as_mut(), slot);

        let pos = slot_count(splitter, chain);
        splitter.insert_plugin(chain, pos, module);
        splitter.set_slot_bypass(chain, pos, read_bool(slot, key::IS_SLOT_BYPASSED, false));

        let Some(plugin) = splitter.plugin_slot_mut(chain, pos) else {
            return;
        };
        plugin.set_editor_bounds(read_editor_bounds(slot));
        match slot.get(key::MODULATION_CONFIG) {
            Some(config) => plugin.set_modulation(read_modulation(config)),
            None => tracing::warn!(
                module = %descriptor.name,
                "restore: no modulation config, using an inactive one"
            ),
        }
    }
}

fn restore_gain_stage(splitter: &mut Splitter, chain: usize, slot: &Object) {
    let pos = slot_count(splitter, chain);
    splitter.insert_gain_stage(chain, pos);
    splitter.set_gain_linear(chain, pos, read_f32(slot, key::GAIN, 1.0));
    splitter.set_pan(chain, pos, read_f32(slot, key::PAN, 0.0));
    splitter.set_slot_bypass(chain, pos, read_bool(slot, key::IS_SLOT_BYPASSED, false));
}

fn restore_module_state(module: &mut dyn PluginModule, slot: &Object) {
    let Some(encoded) = slot.get(key::PLUGIN_DATA).and_then(Value::as_str) else {
        tracing::warn!(module = module.name(), "restore: no plugin data, module keeps its defaults");
        return;
    };
    let loaded = BASE64
        .decode(encoded)
        .map_err(|e| e.to_string())
        .and_then(|bytes| module.load_state(&bytes).map_err(|e| e.to_string()));
    if let Err(e) = loaded {
        tracing::warn!(module = module.name(), "restore: plugin data rejected: {e}");
    }
}

fn slot_count(splitter: &Splitter, chain: usize) -> usize {
    splitter.chain(chain).map_or(0, |c| c.num_slots())
}

fn check_schema_version(root: &Object) -> Result<(), StateError> {
    match root.get(key::SCHEMA_VERSION_KEY).and_then(Value::as_u64) {
        Some(found) if found > u64::from(key::SCHEMA_VERSION) => Err(StateError::UnsupportedVersion {
            found,
            supported: key::SCHEMA_VERSION,
        }),
        Some(_) => Ok(()),
        None => {
            tracing::warn!(
                "state document has no schema version, assuming {}",
                key::SCHEMA_VERSION
            );
            Ok(())
        }
    }
}

// --- Writing ---

/// Serializes the whole graph into a document.
pub fn write_document(splitter: &Splitter) -> Value {
    object([
        (key::SCHEMA_VERSION_KEY, Value::from(key::SCHEMA_VERSION)),
        (key::SPLITTER, write_splitter(splitter)),
    ])
}

/// Serializes the graph to pretty-printed JSON.
pub fn write_state(splitter: &Splitter) -> Result<String, StateError> {
    Ok(serde_json::to_string_pretty(&write_document(splitter))?)
}

fn write_splitter(splitter: &Splitter) -> Value {
    let mut section = Object::new();
    section.insert(key::SPLIT_TYPE.into(), splitter.split_type().as_str().into());
    section.insert(
        key::CHAINS.into(),
        indexed_group(key::CHAIN_PREFIX, splitter.chains().iter().map(write_chain)),
    );
    if splitter.split_type() == SplitType::Multiband {
        let points = splitter.crossover_frequencies().into_iter().map(Value::from);
        section.insert(key::CROSSOVERS.into(), indexed_group(key::CROSSOVER_PREFIX, points));
    }
    let cached = splitter.cached_crossover_frequencies();
    if !cached.is_empty() {
        let freqs = cached.iter().copied().map(Value::from);
        section.insert(
            key::CACHED_CROSSOVER_FREQUENCIES.into(),
            indexed_group(key::CACHED_FREQUENCY_PREFIX, freqs),
        );
    }
    Value::Object(section)
}

fn write_chain(entry: &ChainEntry) -> Value {
    let chain = &entry.chain;
    object([
        (key::IS_SOLOED, Value::from(entry.is_soloed)),
        (key::IS_CHAIN_BYPASSED, Value::from(chain.is_bypassed())),
        (key::IS_CHAIN_MUTED, Value::from(chain.is_muted())),
        (
            key::PLUGINS,
            indexed_group(key::SLOT_PREFIX, chain.slots().iter().map(write_slot)),
        ),
    ])
}

fn write_slot(slot: &Slot) -> Value {
    match slot {
        Slot::GainStage(stage) => object([
            (key::SLOT_TYPE, Value::from(key::SLOT_TYPE_GAIN_STAGE)),
            (key::IS_SLOT_BYPASSED, Value::from(stage.is_bypassed())),
            (key::GAIN, Value::from(stage.gain_linear())),
            (key::PAN, Value::from(stage.pan())),
        ]),
        Slot::Plugin(plugin) => write_plugin(plugin),
    }
}

fn write_plugin(plugin: &PluginSlot) -> Value {
    let mut obj = Object::new();
    obj.insert(key::SLOT_TYPE.into(), key::SLOT_TYPE_PLUGIN.into());
    obj.insert(key::IS_SLOT_BYPASSED.into(), plugin.is_bypassed().into());
    obj.insert(
        key::PLUGIN_DESCRIPTION.into(),
        write_descriptor(plugin.module().descriptor()),
    );
    obj.insert(
        key::PLUGIN_DATA.into(),
        BASE64.encode(plugin.save_state()).into(),
    );
    if let Some(bounds) = plugin.editor_bounds() {
        obj.insert(key::PLUGIN_EDITOR_BOUNDS.into(), bounds.window.to_string().into());
        obj.insert(key::DISPLAY_AREA.into(), bounds.display_area.to_string().into());
    }
    obj.insert(key::MODULATION_CONFIG.into(), write_modulation(plugin.modulation()));
    Value::Object(obj)
}

/// Serializes a module descriptor.
pub fn write_descriptor(descriptor: &PluginDescriptor) -> Value {
    object([
        (key::DESCRIPTOR_NAME, Value::from(descriptor.name.as_str())),
        (key::DESCRIPTOR_MANUFACTURER, Value::from(descriptor.manufacturer.as_str())),
        (key::DESCRIPTOR_FORMAT, Value::from(descriptor.format.as_str())),
        (key::DESCRIPTOR_IDENTIFIER, Value::from(descriptor.identifier.as_str())),
        (key::DESCRIPTOR_UNIQUE_ID, Value::from(descriptor.unique_id)),
        (key::DESCRIPTOR_VERSION, Value::from(descriptor.version.as_str())),
        (key::DESCRIPTOR_NUM_INPUTS, Value::from(descriptor.num_inputs)),
        (key::DESCRIPTOR_NUM_OUTPUTS, Value::from(descriptor.num_outputs)),
    ])
}

/// Serializes a slot's modulation table.
pub fn write_modulation(config: &ModulationConfig) -> Value {
    let targets = config.parameter_configs.iter().map(|target| {
        let mut obj = Object::new();
        obj.insert(
            key::TARGET_PARAMETER_NAME.into(),
            target.target_parameter_name.as_str().into(),
        );
        obj.insert(key::REST_VALUE.into(), target.rest_value.into());
        for (m, source) in target.sources.iter().enumerate() {
            obj.insert(
                indexed_key(key::SOURCE_PREFIX, m),
                object([
                    (key::SOURCE_ID, Value::from(source.source_id)),
                    (key::SOURCE_TYPE, Value::from(source.source_kind.as_str())),
                    (key::SOURCE_AMOUNT, Value::from(source.modulation_amount)),
                ]),
            );
        }
        Value::Object(obj)
    });

    let mut obj = Object::new();
    obj.insert(key::IS_ACTIVE.into(), config.is_active.into());
    for (k, target) in targets.enumerate() {
        obj.insert(indexed_key(key::PARAM_CONFIG_PREFIX, k), target);
    }
    Value::Object(obj)
}

/// Serializes LFO and envelope settings and macro values.
pub fn write_sources(sources: &ModulationSourceSet) -> Value {
    let lfos = (1..=sources.num_lfos())
        .filter_map(|id| sources.lfo(id))
        .map(|lfo| {
            object([
                (key::LFO_FREQUENCY, Value::from(lfo.frequency())),
                (key::LFO_DEPTH, Value::from(lfo.depth())),
                (key::LFO_WAVEFORM, Value::from(lfo.waveform().index())),
                (key::LFO_PHASE_OFFSET, Value::from(lfo.phase_offset())),
                (key::LFO_INVERT, Value::from(lfo.is_inverted())),
            ])
        });
    let envelopes = (1..=sources.num_envelopes())
        .filter_map(|id| sources.envelope(id))
        .map(|env| {
            object([
                (key::ENVELOPE_ATTACK, Value::from(env.attack_ms())),
                (key::ENVELOPE_RELEASE, Value::from(env.release_ms())),
                (key::ENVELOPE_AMOUNT, Value::from(env.amount())),
                (key::ENVELOPE_INPUT, Value::from(envelope_input_name(env.input()))),
            ])
        });
    let macros = (1..=NUM_MACROS)
        .map(|id| Value::from(sources.macro_value(id).unwrap_or(0.0)));

    object([
        (key::LFOS, indexed_group(key::LFO_PREFIX, lfos)),
        (key::ENVELOPES, indexed_group(key::ENVELOPE_PREFIX, envelopes)),
        (key::MACROS, indexed_group(key::MACRO_PREFIX, macros)),
    ])
}

fn envelope_input_name(input: EnvelopeInput) -> &'static str {
    match input {
        EnvelopeInput::Main => "main",
        EnvelopeInput::Sidechain => "sidechain",
    }
}

// --- Reading ---

/// Parses a module descriptor. Returns `None` if `value` is not an object.
pub fn read_descriptor(value: &Value) -> Option<PluginDescriptor> {
    let obj = value.as_object()?;
    let mut descriptor = PluginDescriptor::new(
        read_string(obj, key::DESCRIPTOR_NAME, ""),
        read_string(obj, key::DESCRIPTOR_FORMAT, ""),
    );
    descriptor.manufacturer = read_string(obj, key::DESCRIPTOR_MANUFACTURER, "");
    descriptor.identifier = read_string(obj, key::DESCRIPTOR_IDENTIFIER, "");
    descriptor.unique_id = read_field(obj, key::DESCRIPTOR_UNIQUE_ID, 0, Value::as_i64);
    descriptor.version = read_string(obj, key::DESCRIPTOR_VERSION, "");
    descriptor.num_inputs = read_usize(obj, key::DESCRIPTOR_NUM_INPUTS, 2);
    descriptor.num_outputs = read_usize(obj, key::DESCRIPTOR_NUM_OUTPUTS, 2);
    Some(descriptor)
}

/// Parses a modulation table. Anything unreadable yields an inactive,
/// empty table.
pub fn read_modulation(value: &Value) -> ModulationConfig {
    let mut config = ModulationConfig::default();
    let Some(obj) = value.as_object() else {
        tracing::warn!("modulation config is not an object, using an inactive one");
        return config;
    };
    config.set_active(read_bool(obj, key::IS_ACTIVE, false));

    for value in prefixed_members(obj, key::PARAM_CONFIG_PREFIX) {
        let Some(target_obj) = value.as_object() else {
            tracing::warn!("modulation target is not an object, skipped");
            continue;
        };
        let target = config.add_target(read_string(target_obj, key::TARGET_PARAMETER_NAME, ""));
        config.set_rest_value(target, read_f32(target_obj, key::REST_VALUE, 0.0));

        for source in prefixed_members(target_obj, key::SOURCE_PREFIX) {
            let Some(source) = source.as_object() else {
                tracing::warn!("modulation source is not an object, skipped");
                continue;
            };
            let kind = source
                .get(key::SOURCE_TYPE)
                .and_then(Value::as_str)
                .and_then(|s| SourceKind::from_str(s).ok());
            let Some(kind) = kind else {
                tracing::warn!("modulation source has no valid source type, skipped");
                continue;
            };
            let id = read_usize(source, key::SOURCE_ID, 1);
            let amount = read_f32(source, key::SOURCE_AMOUNT, 0.0);
            config.add_source(target, Source::new(kind, id, amount));
        }
    }
    config
}

/// Rebuilds a source set from a document produced by [`write_sources`].
pub fn read_sources(value: &Value, sample_rate: f32) -> Result<ModulationSourceSet, StateError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StateError::not_an_object(key::MODULATION_SOURCES))?;
    let mut sources = ModulationSourceSet::new(sample_rate);

    for value in indexed_members(obj, key::LFOS, key::LFO_PREFIX, false) {
        let id = sources.add_lfo();
        let (Some(lfo), Some(settings)) = (sources.lfo_mut(id), value.as_object()) else {
            tracing::warn!("LFO {id} is not an object, using defaults");
            continue;
        };
        lfo.set_frequency(read_f32(settings, key::LFO_FREQUENCY, 1.0));
        lfo.set_depth(read_f32(settings, key::LFO_DEPTH, 1.0));
        lfo.set_waveform(read_field(settings, key::LFO_WAVEFORM, LfoWaveform::default(), |v| {
            v.as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(LfoWaveform::from_index)
        }));
        lfo.set_phase_offset(read_f32(settings, key::LFO_PHASE_OFFSET, 0.0));
        lfo.set_inverted(read_bool(settings, key::LFO_INVERT, false));
    }

    for value in indexed_members(obj, key::ENVELOPES, key::ENVELOPE_PREFIX, false) {
        let id = sources.add_envelope();
        let (Some(env), Some(settings)) = (sources.envelope_mut(id), value.as_object()) else {
            tracing::warn!("envelope {id} is not an object, using defaults");
            continue;
        };
        env.set_attack_ms(read_f32(settings, key::ENVELOPE_ATTACK, 10.0));
        env.set_release_ms(read_f32(settings, key::ENVELOPE_RELEASE, 100.0));
        env.set_amount(read_f32(settings, key::ENVELOPE_AMOUNT, 1.0));
        env.set_input(read_field(settings, key::ENVELOPE_INPUT, EnvelopeInput::Main, |v| {
            match v.as_str()? {
                "main" => Some(EnvelopeInput::Main),
                "sidechain" => Some(EnvelopeInput::Sidechain),
                _ => None,
            }
        }));
    }

    for (index, value) in indexed_members(obj, key::MACROS, key::MACRO_PREFIX, false)
        .into_iter()
        .enumerate()
        .take(NUM_MACROS)
    {
        match value.as_f64() {
            Some(v) => {
                sources.set_macro(index + 1, v as f32);
            }
            None => tracing::warn!("macro {} is not a number, left at 0", index + 1),
        }
    }

    Ok(sources)
}

fn read_editor_bounds(slot: &Object) -> Option<EditorBounds> {
    let parse = |field: &str| -> Option<Rect> {
        let text = slot.get(field)?.as_str()?;
        match Rect::from_str(text) {
            Ok(rect) => Some(rect),
            Err(e) => {
                tracing::warn!("restore: {field}: {e}");
                None
            }
        }
    };
    let window = parse(key::PLUGIN_EDITOR_BOUNDS)?;
    Some(EditorBounds {
        window,
        display_area: parse(key::DISPLAY_AREA).unwrap_or_default(),
    })
}

// --- Field helpers ---

fn object<'k>(entries: impl IntoIterator<Item = (&'k str, Value)>) -> Value {
    Value::Object(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn indexed_group(prefix: &str, values: impl Iterator<Item = Value>) -> Value {
    Value::Object(
        values
            .enumerate()
            .map(|(i, v)| (indexed_key(prefix, i), v))
            .collect(),
    )
}

/// Members of `obj` named `<prefix><index>`, in index order.
fn prefixed_members<'v>(obj: &'v Object, prefix: &str) -> Vec<&'v Value> {
    let mut members: Vec<(usize, &Value)> = obj
        .iter()
        .filter_map(|(k, v)| parse_indexed_key(k, prefix).map(|i| (i, v)))
        .collect();
    members.sort_by_key(|&(i, _)| i);
    members.into_iter().map(|(_, v)| v).collect()
}

/// Members of the repeating group `obj[group]`, in index order. A missing
/// group yields nothing and is logged when `required`.
fn indexed_members<'v>(obj: &'v Object, group: &str, prefix: &str, required: bool) -> Vec<&'v Value> {
    match obj.get(group) {
        Some(Value::Object(members)) => prefixed_members(members, prefix),
        Some(_) => {
            tracing::warn!(group, "state group is not an object, treated as empty");
            Vec::new()
        }
        None => {
            if required {
                tracing::warn!(group, "state group missing, treated as empty");
            }
            Vec::new()
        }
    }
}

fn read_field<T: fmt::Debug>(
    obj: &Object,
    field: &str,
    default: T,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> T {
    match obj.get(field).and_then(parse) {
        Some(value) => value,
        None => {
            tracing::warn!(field, ?default, "state field missing or malformed, using default");
            default
        }
    }
}

fn read_bool(obj: &Object, field: &str, default: bool) -> bool {
    read_field(obj, field, default, Value::as_bool)
}

fn read_f32(obj: &Object, field: &str, default: f32) -> f32 {
    read_field(obj, field, default, |v| v.as_f64().map(|f| f as f32))
}

fn read_usize(obj: &Object, field: &str, default: usize) -> usize {
    read_field(obj, field, default, |v| {
        v.as_u64().and_then(|n| usize::try_from(n).ok())
    })
}

fn read_string(obj: &Object, field: &str, default: &str) -> String {
    read_field(obj, field, default.to_string(), |v| v.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_field_substitutes_defaults() {
        let obj = json!({ "a": true, "b": "not a number" });
        let obj = obj.as_object().unwrap();
        assert!(read_bool(obj, "a", false));
        assert!(!read_bool(obj, "missing", false));
        assert_eq!(read_f32(obj, "b", 0.25), 0.25);
        assert_eq!(read_string(obj, "missing", "x"), "x");
    }

    #[test]
    fn prefixed_members_sort_numerically() {
        let obj = json!({ "Slot_10": 10, "Slot_2": 2, "Slot_0": 0, "Other": -1 });
        let members: Vec<i64> = prefixed_members(obj.as_object().unwrap(), "Slot_")
            .into_iter()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(members, vec![0, 2, 10]);
    }

    #[test]
    fn modulation_round_trips() {
        let mut config = ModulationConfig::default();
        config.set_active(true);
        let t = config.add_target("Cutoff");
        config.set_rest_value(t, 0.4);
        config.add_source(t, Source::new(SourceKind::Lfo, 2, -0.5));
        config.add_source(t, Source::new(SourceKind::Macro, 1, 0.25));
        config.add_target("Resonance");

        assert_eq!(read_modulation(&write_modulation(&config)), config);
    }

    #[test]
    fn modulation_skips_sources_without_type() {
        let doc = json!({
            "isActive": true,
            "ParamConfig_0": {
                "TargetParameterName": "Drive",
                "RestValue": 0.5,
                "Source_0": { "SourceId": 1, "SourceAmount": 0.3 },
                "Source_1": { "SourceId": 2, "SourceType": "envelope", "SourceAmount": 0.7 }
            }
        });
        let config = read_modulation(&doc);
        assert!(config.is_active);
        assert_eq!(config.parameter_configs.len(), 1);
        let sources = &config.parameter_configs[0].sources;
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_kind, SourceKind::Envelope);
        assert_eq!(sources[0].source_id, 2);
    }

    #[test]
    fn descriptor_round_trips() {
        let mut descriptor = PluginDescriptor::new("Tape Echo", "VST3");
        descriptor.manufacturer = "Acme".into();
        descriptor.identifier = "/plugins/tape.vst3".into();
        descriptor.unique_id = -42;
        descriptor.version = "2.1.0".into();
        descriptor.num_inputs = 1;
        descriptor.num_outputs = 2;
        let read = read_descriptor(&write_descriptor(&descriptor)).unwrap();
        assert_eq!(read, descriptor);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let doc = json!({ "schemaVersion": 99 });
        let err = check_schema_version(doc.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, StateError::UnsupportedVersion { found: 99, supported: 1 }));
    }

    #[test]
    fn sources_round_trip() {
        let mut sources = ModulationSourceSet::new(48000.0);
        let lfo = sources.add_lfo();
        {
            let lfo = sources.lfo_mut(lfo).unwrap();
            lfo.set_frequency(3.5);
            lfo.set_depth(0.5);
            lfo.set_waveform(LfoWaveform::ALL[2]);
            lfo.set_inverted(true);
        }
        let env = sources.add_envelope();
        {
            let env = sources.envelope_mut(env).unwrap();
            env.set_attack_ms(5.0);
            env.set_release_ms(250.0);
            env.set_amount(-0.5);
            env.set_input(EnvelopeInput::Sidechain);
        }
        sources.set_macro(3, 0.75);

        let restored = read_sources(&write_sources(&sources), 48000.0).unwrap();
        assert_eq!(restored.num_lfos(), 1);
        let lfo = restored.lfo(1).unwrap();
        assert_eq!(lfo.frequency(), 3.5);
        assert_eq!(lfo.depth(), 0.5);
        assert_eq!(lfo.waveform(), LfoWaveform::ALL[2]);
        assert!(lfo.is_inverted());

        assert_eq!(restored.num_envelopes(), 1);
        let env = restored.envelope(1).unwrap();
        assert!((env.attack_ms() - 5.0).abs() < 1e-3);
        assert!((env.release_ms() - 250.0).abs() < 1e-3);
        assert_eq!(env.amount(), -0.5);
        assert_eq!(env.input(), EnvelopeInput::Sidechain);

        assert_eq!(restored.macro_value(3), Some(0.75));
        assert_eq!(restored.macro_value(1), Some(0.0));
    }
}
