//! Document key constants.
//!
//! The key strings are the on-disk contract; renaming one breaks every saved
//! session. Repeating groups are JSON objects whose members are named
//! `<prefix><index>` with a 0-based index (see [`indexed_key`]).
//!
//! ```text
//! { "schemaVersion": 1,
//!   "Splitter": { "splitType": "parallel",
//!     "Chains": { "Chain_0": { "isSoloed", "isChainBypassed", "isChainMuted",
//!         "Plugins": { "Slot_0": { "slotType": "Plugin" | "GainStage", … } } } },
//!     "Crossovers": { "Crossover_0": 1000.0 },
//!     "CachedCrossoverFrequencies": { "freq_0": 1000.0 } } }
//! ```

/// Newest schema version this build writes and reads.
pub const SCHEMA_VERSION: u32 = 1;

/// Root: schema version of the document.
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

// --- Splitter ---

/// Root: the splitter section.
pub const SPLITTER: &str = "Splitter";
/// Splitter: topology name.
pub const SPLIT_TYPE: &str = "splitType";
/// Splitter: the chains group.
pub const CHAINS: &str = "Chains";
/// Chains: member prefix.
pub const CHAIN_PREFIX: &str = "Chain_";
/// Splitter: crossover points of a multiband splitter.
pub const CROSSOVERS: &str = "Crossovers";
/// Crossovers: member prefix.
pub const CROSSOVER_PREFIX: &str = "Crossover_";
/// Splitter: frequencies remembered from the last multiband configuration.
pub const CACHED_CROSSOVER_FREQUENCIES: &str = "CachedCrossoverFrequencies";
/// Cached frequencies: member prefix.
pub const CACHED_FREQUENCY_PREFIX: &str = "freq_";

// --- Chain ---

/// Chain: solo flag.
pub const IS_SOLOED: &str = "isSoloed";
/// Chain: bypass flag.
pub const IS_CHAIN_BYPASSED: &str = "isChainBypassed";
/// Chain: mute flag.
pub const IS_CHAIN_MUTED: &str = "isChainMuted";
/// Chain: the slots group.
pub const PLUGINS: &str = "Plugins";
/// Slots: member prefix.
pub const SLOT_PREFIX: &str = "Slot_";

// --- Slot ---

/// Slot: kind tag.
pub const SLOT_TYPE: &str = "slotType";
/// Slot kind tag of a hosted module.
pub const SLOT_TYPE_PLUGIN: &str = "Plugin";
/// Slot kind tag of a gain stage.
pub const SLOT_TYPE_GAIN_STAGE: &str = "GainStage";
/// Slot: bypass flag.
pub const IS_SLOT_BYPASSED: &str = "isSlotBypassed";
/// Gain stage: linear gain.
pub const GAIN: &str = "Gain";
/// Gain stage: pan position.
pub const PAN: &str = "Pan";
/// Plugin: the module descriptor.
pub const PLUGIN_DESCRIPTION: &str = "PluginDescription";
/// Plugin: base64 module state.
pub const PLUGIN_DATA: &str = "PluginData";
/// Plugin: editor window rectangle, `"x y width height"`.
pub const PLUGIN_EDITOR_BOUNDS: &str = "PluginEditorBounds";
/// Plugin: display area the editor was on.
pub const DISPLAY_AREA: &str = "DisplayArea";

// --- Plugin descriptor ---

/// Descriptor: display name.
pub const DESCRIPTOR_NAME: &str = "name";
/// Descriptor: vendor.
pub const DESCRIPTOR_MANUFACTURER: &str = "manufacturer";
/// Descriptor: format tag.
pub const DESCRIPTOR_FORMAT: &str = "format";
/// Descriptor: format-specific locator.
pub const DESCRIPTOR_IDENTIFIER: &str = "identifier";
/// Descriptor: numeric id.
pub const DESCRIPTOR_UNIQUE_ID: &str = "uniqueId";
/// Descriptor: version string.
pub const DESCRIPTOR_VERSION: &str = "version";
/// Descriptor: input channel count.
pub const DESCRIPTOR_NUM_INPUTS: &str = "numInputs";
/// Descriptor: output channel count.
pub const DESCRIPTOR_NUM_OUTPUTS: &str = "numOutputs";

// --- Modulation config ---

/// Plugin: modulation table.
pub const MODULATION_CONFIG: &str = "ModulationConfig";
/// Modulation: enable flag.
pub const IS_ACTIVE: &str = "isActive";
/// Modulation: target member prefix.
pub const PARAM_CONFIG_PREFIX: &str = "ParamConfig_";
/// Target: parameter name.
pub const TARGET_PARAMETER_NAME: &str = "TargetParameterName";
/// Target: rest value.
pub const REST_VALUE: &str = "RestValue";
/// Target: source member prefix.
pub const SOURCE_PREFIX: &str = "Source_";
/// Source: 1-based id within its kind.
pub const SOURCE_ID: &str = "SourceId";
/// Source: kind name.
pub const SOURCE_TYPE: &str = "SourceType";
/// Source: weight.
pub const SOURCE_AMOUNT: &str = "SourceAmount";

// --- Modulation sources ---

/// Root of the sources document.
pub const MODULATION_SOURCES: &str = "ModulationSources";
/// Sources: the LFO group.
pub const LFOS: &str = "Lfos";
/// LFOs: member prefix.
pub const LFO_PREFIX: &str = "Lfo_";
/// LFO: frequency in Hz.
pub const LFO_FREQUENCY: &str = "frequency";
/// LFO: depth.
pub const LFO_DEPTH: &str = "depth";
/// LFO: waveform index.
pub const LFO_WAVEFORM: &str = "waveform";
/// LFO: start phase.
pub const LFO_PHASE_OFFSET: &str = "phaseOffset";
/// LFO: polarity flag.
pub const LFO_INVERT: &str = "invert";
/// Sources: the envelope group.
pub const ENVELOPES: &str = "Envelopes";
/// Envelopes: member prefix.
pub const ENVELOPE_PREFIX: &str = "Envelope_";
/// Envelope: attack in ms.
pub const ENVELOPE_ATTACK: &str = "attackMs";
/// Envelope: release in ms.
pub const ENVELOPE_RELEASE: &str = "releaseMs";
/// Envelope: output amount.
pub const ENVELOPE_AMOUNT: &str = "amount";
/// Envelope: `"main"` or `"sidechain"`.
pub const ENVELOPE_INPUT: &str = "input";
/// Sources: the macro group.
pub const MACROS: &str = "Macros";
/// Macros: member prefix.
pub const MACRO_PREFIX: &str = "Macro_";

/// Builds the member name of entry `index` of a repeating group.
pub fn indexed_key(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

/// Parses the index out of a member name, if it carries `prefix`.
pub fn parse_indexed_key(key: &str, prefix: &str) -> Option<usize> {
    key.strip_prefix(prefix)?.parse().ok()
}
