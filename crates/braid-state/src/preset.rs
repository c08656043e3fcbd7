//! Preset files: a named graph plus its modulation sources.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use braid_core::ProcessSetup;
use braid_graph::{ModulationSourceSet, Splitter};

use crate::codec::{PersistenceCodec, read_sources, write_document, write_sources};
use crate::error::StateError;
use crate::schema::SCHEMA_VERSION;

/// A saved graph with metadata.
///
/// # JSON Format
///
/// ```json
/// {
///   "name": "Wide Bass",
///   "description": "Low band in mono, highs widened",
///   "schemaVersion": 1,
///   "State": { "schemaVersion": 1, "Splitter": { "splitType": "multiband", "...": "..." } },
///   "ModulationSources": { "Lfos": {}, "Envelopes": {}, "Macros": { "Macro_0": 0.0 } }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Schema version of the embedded documents.
    #[serde(rename = "schemaVersion", default = "default_schema_version")]
    pub schema_version: u32,

    /// Graph document, as written by [`write_document`].
    #[serde(rename = "State", default)]
    pub state: Value,

    /// Sources document, as written by [`write_sources`].
    #[serde(rename = "ModulationSources", default)]
    pub sources: Value,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Preset {
    /// Create a preset with nothing captured yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema_version: SCHEMA_VERSION,
            state: Value::Null,
            sources: Value::Null,
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Capture the current graph and sources.
    pub fn capture(name: impl Into<String>, splitter: &Splitter, sources: &ModulationSourceSet) -> Self {
        Self {
            state: write_document(splitter),
            sources: write_sources(sources),
            ..Self::new(name)
        }
    }

    /// Restore the graph and sources.
    ///
    /// A preset without a sources document restores an empty source set.
    pub fn restore(
        &self,
        codec: &PersistenceCodec<'_>,
        setup: &ProcessSetup,
    ) -> Result<(Splitter, ModulationSourceSet), StateError> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: u64::from(self.schema_version),
                supported: SCHEMA_VERSION,
            });
        }
        let splitter = codec.restore(&self.state, setup)?;
        let sources = if self.sources.is_null() {
            ModulationSourceSet::new(setup.sample_rate)
        } else {
            read_sources(&self.sources, setup.sample_rate)?
        };
        tracing::info!(preset = %self.name, "preset restored");
        Ok((splitter, sources))
    }

    /// Load a preset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| StateError::read_file(path, e))?;
        Self::from_json(&content)
    }

    /// Load a preset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the preset to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StateError::create_dir(parent, e))?;
        }

        let content = self.to_json()?;
        std::fs::write(path, content).map_err(|e| StateError::write_file(path, e))?;
        tracing::debug!(path = %path.display(), "preset saved");
        Ok(())
    }

    /// Convert the preset to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
