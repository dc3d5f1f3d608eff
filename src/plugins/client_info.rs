//! Client-info plugin: build number, build hash and build timestamp.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::{AstPlugin, PluginOutput};
use crate::ast::{classify, key_name, number_value, string_value, NodeKind};
use crate::constants::{BUILD_HASH_KEY, BUILD_NUMBER_KEY, BUILT_AT_KEY};
use crate::script::{ClientScript, ScriptFlag};

/// Build metadata as accumulated during traversal. All fields optional here;
/// snapshot finalization enforces presence and fails naming the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub build_number: Option<u64>,
    pub build_hash: Option<String>,
    pub built_at: Option<i64>,
}

#[derive(Default)]
pub struct ClientInfoPlugin {
    info: ClientInfo,
}

impl ClientInfoPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a literal property value as an integer. The bundle encodes both
    /// the build number and the timestamp as numeric string literals.
    fn literal_int(node: &Node, source: &str) -> Option<i64> {
        match classify(node) {
            NodeKind::Number => number_value(node, source).map(|n| n as i64),
            NodeKind::String => string_value(node, source)?.trim().parse().ok(),
            _ => None,
        }
    }
}

impl AstPlugin for ClientInfoPlugin {
    fn name(&self) -> &'static str {
        "client-info"
    }

    fn required_flags(&self) -> &[ScriptFlag] {
        &[ScriptFlag::ClientInfo]
    }

    fn visit(
        &mut self,
        _script: &ClientScript,
        node: &Node,
        source: &str,
    ) -> Result<(), anyhow::Error> {
        if classify(node) != NodeKind::Object {
            return Ok(());
        }

        let mut cursor = node.walk();
        for prop in node.named_children(&mut cursor) {
            if classify(&prop) != NodeKind::Pair {
                continue;
            }
            let Some(key) = prop
                .child_by_field_name("key")
                .and_then(|k| key_name(&k, source))
            else {
                continue;
            };
            let Some(value) = prop.child_by_field_name("value") else {
                continue;
            };

            match key.as_str() {
                // The bundle historically ships a second buildNumber
                // property whose value is a function; only the
                // literal-valued instance is the real one.
                BUILD_NUMBER_KEY => {
                    if let Some(n) = Self::literal_int(&value, source) {
                        if n >= 0 {
                            self.info.build_number = Some(n as u64);
                        }
                    }
                }
                BUILD_HASH_KEY => {
                    if let Some(hash) = string_value(&value, source) {
                        self.info.build_hash = Some(hash);
                    }
                }
                BUILT_AT_KEY => {
                    if let Some(ts) = Self::literal_int(&value, source) {
                        self.info.built_at = Some(ts);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> PluginOutput {
        PluginOutput::ClientInfo(std::mem::take(&mut self.info))
    }
}
