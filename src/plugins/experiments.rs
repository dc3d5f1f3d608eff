//! Experiments plugin: feature-flag definitions and their treatment buckets.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::warn;
use tree_sitter::Node;

use super::{AstPlugin, PluginOutput};
use crate::ast::value::coerce;
use crate::ast::{classify, node_text, object_has_property, NodeKind};
use crate::constants::{COERCE_IGNORE_FIELDS, EXPERIMENT_FIELDS};
use crate::script::{ClientScript, ScriptFlag};

/// Who an experiment buckets over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    User,
    Guild,
    None,
}

impl ExperimentKind {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "guild" => Some(Self::Guild),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// One treatment bucket of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    pub label: String,
}

/// A finalized experiment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// The experiment's id/key, unique within a build.
    pub hash_key: String,
    /// Display title.
    pub title: String,
    pub kind: ExperimentKind,
    /// Ordered treatment buckets.
    pub treatments: Vec<Treatment>,
    /// murmur3 32-bit hash of `hash_key`, as the client computes it.
    pub hash: u32,
}

/// Validated accumulator entry, pre-finalize.
struct RawExperiment {
    kind: ExperimentKind,
    id: String,
    label: String,
    treatments: Vec<Treatment>,
}

#[derive(Default)]
pub struct ExperimentsPlugin {
    experiments: Vec<RawExperiment>,
}

impl ExperimentsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a coerced experiment object against the closed schema.
    fn validate(value: &serde_json::Value) -> Result<RawExperiment, String> {
        let object = value.as_object().ok_or("not an object")?;

        let kind = object
            .get("kind")
            .and_then(|k| k.as_str())
            .and_then(ExperimentKind::from_str)
            .ok_or("invalid experiment kind")?;
        let id = object
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or("invalid experiment id")?
            .to_string();
        let label = object
            .get("label")
            .and_then(|l| l.as_str())
            .ok_or("invalid experiment title")?
            .to_string();

        let treatments = object
            .get("treatments")
            .and_then(|t| t.as_array())
            .ok_or("invalid experiment treatments object")?;
        let treatments = treatments
            .iter()
            .map(|t| {
                let t = t.as_object().ok_or("invalid treatment")?;
                Ok(Treatment {
                    id: t
                        .get("id")
                        .and_then(|i| i.as_i64())
                        .ok_or("invalid treatment id")?,
                    label: t
                        .get("label")
                        .and_then(|l| l.as_str())
                        .ok_or("invalid treatment label")?
                        .to_string(),
                })
            })
            .collect::<Result<Vec<_>, &str>>()?;

        let mut seen = HashSet::new();
        if !treatments.iter().all(|t| seen.insert(t.id)) {
            return Err("duplicate treatment ids".to_string());
        }

        Ok(RawExperiment {
            kind,
            id,
            label,
            treatments,
        })
    }
}

impl AstPlugin for ExperimentsPlugin {
    fn name(&self) -> &'static str {
        "experiments"
    }

    fn required_flags(&self) -> &[ScriptFlag] {
        &[ScriptFlag::Experiments]
    }

    fn visit(
        &mut self,
        script: &ClientScript,
        node: &Node,
        source: &str,
    ) -> Result<(), anyhow::Error> {
        if classify(node) != NodeKind::Object {
            return Ok(());
        }
        if !EXPERIMENT_FIELDS
            .iter()
            .all(|field| object_has_property(node, source, field))
        {
            return Ok(());
        }

        // Both coercion failures and schema violations drop only this
        // record; the warning carries enough context to diagnose shape
        // drift in the bundle.
        let value = match coerce(node, source, COERCE_IGNORE_FIELDS) {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(
                    path = %script.path,
                    error = %err,
                    snippet = %node_text(node, source).chars().take(120).collect::<String>(),
                    "failed to coerce experiment"
                );
                return Ok(());
            }
        };

        let id = value.get("id").and_then(|i| i.as_str()).map(str::to_string);
        match Self::validate(&value) {
            Ok(raw) => self.experiments.push(raw),
            Err(reason) => {
                warn!(
                    path = %script.path,
                    id = id.as_deref().unwrap_or("<unresolved>"),
                    reason,
                    "dropping invalid experiment"
                );
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> PluginOutput {
        let experiments = self
            .experiments
            .drain(..)
            .map(|raw| Experiment {
                hash: murmur3::murmur3_32(&mut Cursor::new(raw.id.as_bytes()), 0).unwrap_or(0),
                hash_key: raw.id,
                title: raw.label,
                kind: raw.kind,
                treatments: raw.treatments,
            })
            .collect();
        PluginOutput::Experiments(experiments)
    }
}
