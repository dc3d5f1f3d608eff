//! Build snapshots: one fully extracted, immutable build's worth of strings,
//! experiments and metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SnapshotError;
use crate::plugins::{Experiment, PluginResults};
use crate::script::{ClientScript, ScriptFlag};

/// What the snapshot remembers about each script it consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSummary {
    pub path: String,
    pub flags: Vec<ScriptFlag>,
    pub fingerprint: Option<String>,
}

impl From<&ClientScript> for ScriptSummary {
    fn from(script: &ClientScript) -> Self {
        Self {
            path: script.path.clone(),
            flags: script.flags.clone(),
            fingerprint: script.fingerprint.clone(),
        }
    }
}

/// One extracted build. Immutable once finalized; superseded snapshots are
/// retained by the caller for diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    pub build_number: u64,
    pub build_hash: String,
    /// Build timestamp, epoch milliseconds as the bundle encodes it.
    pub built_at: i64,
    pub strings: BTreeMap<String, String>,
    /// Experiments keyed by their id.
    pub experiments: BTreeMap<String, Experiment>,
    pub scripts: Vec<ScriptSummary>,
}

impl BuildSnapshot {
    /// Assemble a snapshot from a finished plugin run.
    ///
    /// Missing string or experiment results just mean those plugins had no
    /// applicable scripts; absent client-info fields are fatal, reported by
    /// name so "nothing found" reads differently from "found but malformed".
    pub fn finalize(
        results: &PluginResults,
        scripts: &[ClientScript],
    ) -> Result<Self, SnapshotError> {
        let info = results.client_info().cloned().unwrap_or_default();

        let mut missing = Vec::new();
        if info.build_number.is_none() {
            missing.push("build_number");
        }
        if info.build_hash.is_none() {
            missing.push("build_hash");
        }
        if info.built_at.is_none() {
            missing.push("built_at");
        }
        if !missing.is_empty() {
            return Err(SnapshotError::MissingFields { missing });
        }

        let experiments = results
            .experiments()
            .unwrap_or_default()
            .iter()
            .map(|exp| (exp.hash_key.clone(), exp.clone()))
            .collect();

        Ok(Self {
            build_number: info.build_number.unwrap_or_default(),
            build_hash: info.build_hash.unwrap_or_default(),
            built_at: info.built_at.unwrap_or_default(),
            strings: results.strings().cloned().unwrap_or_default(),
            experiments,
            scripts: scripts.iter().map(ScriptSummary::from).collect(),
        })
    }
}
