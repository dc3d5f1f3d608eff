//! Strings plugin: pulls the localization key → text table out of the one
//! script that carries it.

use std::collections::BTreeMap;
use tracing::debug;
use tree_sitter::Node;

use super::{AstPlugin, PluginOutput};
use crate::ast::{classify, key_name, object_has_property, string_value, NodeKind};
use crate::constants::STRINGS_SENTINEL_KEY;
use crate::script::{ClientScript, ScriptFlag};

pub struct StringsPlugin {
    sentinel: String,
    strings: BTreeMap<String, String>,
}

impl StringsPlugin {
    pub fn new() -> Self {
        Self::with_sentinel(STRINGS_SENTINEL_KEY)
    }

    /// The sentinel key identifies the one true localization object among
    /// the thousands of object literals in the script. Upstream has renamed
    /// it before, hence the knob.
    pub fn with_sentinel(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            strings: BTreeMap::new(),
        }
    }
}

impl Default for StringsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPlugin for StringsPlugin {
    fn name(&self) -> &'static str {
        "strings"
    }

    fn required_flags(&self) -> &[ScriptFlag] {
        &[ScriptFlag::LanguageObject]
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
        if !object_has_property(node, source, &self.sentinel) {
            return Ok(());
        }
        debug!(path = %script.path, "found the language object");

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
            if key == self.sentinel {
                continue;
            }
            // Literal values only; template strings and concatenations need
            // evaluation this plugin does not do.
            let Some(value) = prop
                .child_by_field_name("value")
                .and_then(|v| string_value(&v, source))
            else {
                continue;
            };
            self.strings.insert(key, value);
        }
        Ok(())
    }

    fn finish(&mut self) -> PluginOutput {
        PluginOutput::Strings(std::mem::take(&mut self.strings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::AstParser;
    use crate::script::ClientScript;

    fn run_on(source: &str) -> BTreeMap<String, String> {
        let scripts = vec![ClientScript::with_content("strings.js", source)];
        let results = AstParser::new(vec![Box::new(StringsPlugin::new())]).run(&scripts);
        results.strings().unwrap().clone()
    }

    #[test]
    fn extracts_table_from_sentinel_object() {
        let strings = run_on(
            r#"e.exports = {DISCORD: "Discord", HELLO: "Hello", BYE: "Goodbye"};"#,
        );
        assert_eq!(strings.get("HELLO").unwrap(), "Hello");
        assert_eq!(strings.get("BYE").unwrap(), "Goodbye");
        assert!(!strings.contains_key("DISCORD"));
    }

    #[test]
    fn ignores_objects_without_the_sentinel() {
        let strings = run_on(r#"var other = {HELLO: "not localization"};
                               e.exports = {DISCORD: "Discord", REAL: "yes"};"#);
        assert_eq!(strings.len(), 1);
        assert_eq!(strings.get("REAL").unwrap(), "yes");
    }

    #[test]
    fn skips_non_literal_values() {
        let strings = run_on(
            r#"e.exports = {DISCORD: "Discord", OK: "fine", DYNAMIC: t.format(n)};"#,
        );
        assert_eq!(strings.get("OK").unwrap(), "fine");
        assert!(!strings.contains_key("DYNAMIC"));
    }

    #[test]
    fn unflagged_script_contributes_nothing() {
        // No DISCORD: sentinel in content, so the sniff pre-pass never sets
        // the flag and the plugin's gate fails.
        let scripts = vec![ClientScript::with_content(
            "plain.js",
            r#"var o = {HELLO: "Hello"};"#,
        )];
        let results = AstParser::new(vec![Box::new(StringsPlugin::new())]).run(&scripts);
        assert!(results.strings().unwrap().is_empty());
    }
}
