//! AST visitor/plugin framework.
//!
//! Each registered plugin declares its applicability gates (required
//! capability flags and/or required content patterns, all ANDed). Applicable
//! scripts are parsed once and walked in a single pre-order traversal per
//! plugin; a plugin fault on one node never stops the scan of other nodes,
//! plugins, or scripts. Every plugin finalizes exactly once per run, after
//! all of its applicable scripts have been visited.

pub mod client_info;
pub mod experiments;
pub mod strings;

use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, warn};
use tree_sitter::{Node, Tree};

use crate::ast::{parse_js, preorder};
use crate::script::{ClientScript, ScriptFlag};

pub use client_info::{ClientInfo, ClientInfoPlugin};
pub use experiments::{Experiment, ExperimentKind, ExperimentsPlugin, Treatment};
pub use strings::StringsPlugin;

/// An extraction pass over parsed scripts, accumulating one named result
/// across every script that satisfies its gates.
pub trait AstPlugin {
    fn name(&self) -> &'static str;

    /// Capability flags the script must carry. Empty means no flag gate.
    fn required_flags(&self) -> &[ScriptFlag] {
        &[]
    }

    /// Patterns the script content must match. Empty means no pattern gate.
    fn required_patterns(&self) -> Vec<&Regex> {
        Vec::new()
    }

    /// Per-node callback, invoked for every node of every applicable script.
    /// An `Err` is logged by the framework and traversal continues.
    fn visit(&mut self, script: &ClientScript, node: &Node, source: &str)
        -> Result<(), anyhow::Error>;

    /// Invoked exactly once per run, after all applicable scripts.
    fn finish(&mut self) -> PluginOutput;
}

/// Finalized result of one plugin.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginOutput {
    Strings(BTreeMap<String, String>),
    ClientInfo(ClientInfo),
    Experiments(Vec<Experiment>),
}

/// Results of a parser run, keyed by plugin name.
#[derive(Debug, Default)]
pub struct PluginResults {
    results: HashMap<String, PluginOutput>,
}

impl PluginResults {
    pub fn get(&self, name: &str) -> Option<&PluginOutput> {
        self.results.get(name)
    }

    pub fn strings(&self) -> Option<&BTreeMap<String, String>> {
        self.results.values().find_map(|output| match output {
            PluginOutput::Strings(strings) => Some(strings),
            _ => None,
        })
    }

    pub fn client_info(&self) -> Option<&ClientInfo> {
        self.results.values().find_map(|output| match output {
            PluginOutput::ClientInfo(info) => Some(info),
            _ => None,
        })
    }

    pub fn experiments(&self) -> Option<&[Experiment]> {
        self.results.values().find_map(|output| match output {
            PluginOutput::Experiments(experiments) => Some(experiments.as_slice()),
            _ => None,
        })
    }
}

/// Single-pass AST parser dispatching nodes to registered plugins.
pub struct AstParser {
    plugins: Vec<Box<dyn AstPlugin>>,
}

impl AstParser {
    pub fn new(plugins: Vec<Box<dyn AstPlugin>>) -> Self {
        Self { plugins }
    }

    /// Run every plugin over every applicable script.
    ///
    /// Scripts are processed in caller order and plugins in registration
    /// order. Parsing is CPU-bound and independent per script, so trees are
    /// built on the rayon pool up front; traversal and accumulation stay
    /// sequential, which gives each plugin its all-scripts-before-finalize
    /// barrier by construction.
    pub fn run(mut self, scripts: &[ClientScript]) -> PluginResults {
        // Applicability is computed up front so the parse pass shares only
        // plain data across the pool (plugins are not Sync).
        let wanted: Vec<bool> = scripts
            .iter()
            .map(|script| {
                self.plugins
                    .iter()
                    .any(|plugin| is_applicable(plugin.as_ref(), script))
            })
            .collect();

        let trees: Vec<Option<Tree>> = scripts
            .par_iter()
            .enumerate()
            .map(|(index, script)| {
                if !wanted[index] {
                    return None;
                }
                let content = script.content.as_deref()?;
                match parse_js(content) {
                    Ok(tree) => Some(tree),
                    Err(err) => {
                        warn!(path = %script.path, error = %err, "skipping unparseable script");
                        None
                    }
                }
            })
            .collect();

        for (script, tree) in scripts.iter().zip(&trees) {
            let Some(tree) = tree else { continue };
            // Content is present whenever a tree is.
            let Some(source) = script.content.as_deref() else {
                continue;
            };
            for plugin in &mut self.plugins {
                if !is_applicable(plugin.as_ref(), script) {
                    continue;
                }
                debug!(plugin = plugin.name(), path = %script.path, "visiting script");
                preorder(tree.root_node(), &mut |node| {
                    if let Err(err) = plugin.visit(script, &node, source) {
                        error!(
                            plugin = plugin.name(),
                            path = %script.path,
                            error = %err,
                            "plugin failed on node; continuing"
                        );
                    }
                });
            }
        }

        let mut results = PluginResults::default();
        for plugin in &mut self.plugins {
            let output = plugin.finish();
            results.results.insert(plugin.name().to_string(), output);
        }
        results
    }
}

/// All declared gates must hold; a plugin with no gates is always
/// applicable. Scripts without content never apply.
fn is_applicable(plugin: &dyn AstPlugin, script: &ClientScript) -> bool {
    let Some(content) = script.content.as_deref() else {
        return false;
    };
    plugin
        .required_flags()
        .iter()
        .all(|flag| script.has_flag(*flag))
        && plugin
            .required_patterns()
            .iter()
            .all(|pattern| pattern.is_match(content))
}
