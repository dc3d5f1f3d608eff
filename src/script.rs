//! Client scripts and the pure capability-sniffing pre-pass.
//!
//! A [`ClientScript`] is created empty by the fetch layer, gets its content
//! attached on load, and has its capability flags derived here by plain text
//! checks before any AST work. Flag detection is deliberately a separate
//! pre-pass over content rather than a side effect of plugin traversal, so
//! flag state never depends on plugin order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{HAS_BUILD_NUMBER, HAS_CLIENT_INFO, HAS_EXPERIMENT, HAS_LANGUAGE_OBJECT};

/// Known payload kinds a script may carry, discovered by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptFlag {
    /// Contains the localization key/value table.
    LanguageObject,
    /// Contains build number / hash / timestamp metadata.
    ClientInfo,
    /// Contains feature-experiment definitions.
    Experiments,
}

/// One fetched bundle file flowing through a pipeline run.
///
/// Owned exclusively by the run that created it; never shared across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientScript {
    /// Path component of the script URL, e.g. `"ff00aa11.js"`.
    pub path: String,
    /// Raw script text; `None` until the fetch layer attaches it.
    pub content: Option<String>,
    /// Capability flags attached by [`sniff_flags`].
    pub flags: Vec<ScriptFlag>,
    /// Blake3 hex digest of the content, for change detection.
    pub fingerprint: Option<String>,
}

impl ClientScript {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            flags: Vec::new(),
            fingerprint: None,
        }
    }

    /// Attach loaded content, fingerprint it, and run the sniff pre-pass.
    pub fn with_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let flags = sniff_flags(&content);
        let fingerprint = blake3::hash(content.as_bytes()).to_hex().to_string();
        Self {
            path: path.into(),
            content: Some(content),
            flags,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn has_flag(&self, flag: ScriptFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Pure capability detection over raw script text.
pub fn sniff_flags(content: &str) -> Vec<ScriptFlag> {
    let mut flags = Vec::new();
    if HAS_LANGUAGE_OBJECT.is_match(content) {
        flags.push(ScriptFlag::LanguageObject);
    }
    if HAS_CLIENT_INFO.is_match(content) || HAS_BUILD_NUMBER.is_match(content) {
        flags.push(ScriptFlag::ClientInfo);
    }
    if HAS_EXPERIMENT.is_match(content) {
        flags.push(ScriptFlag::Experiments);
    }
    flags
}

/// Sniff a whole batch of scripts in parallel. Sniffing is pure per-script,
/// so scripts are processed independently on the rayon pool.
pub fn sniff_batch(scripts: &mut [ClientScript]) {
    scripts.par_iter_mut().for_each(|script| {
        if let Some(content) = &script.content {
            script.flags = sniff_flags(content);
            if script.fingerprint.is_none() {
                script.fingerprint = Some(blake3::hash(content.as_bytes()).to_hex().to_string());
            }
        }
    });
}
