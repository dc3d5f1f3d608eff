//! Chunk-Manifest Decoder: recovers the lazy-chunk id → file-name table from
//! the bundle loader's own syntax tree, across the table's historical
//! encodings.

mod strategies;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use tree_sitter::Tree;

use crate::ast::{parse_js, preorder};
use crate::constants::BUNDLE_EXT;
use crate::error::DecodeError;
use crate::script::ClientScript;

pub use strategies::{Strategy, STRATEGIES};

/// One lazy chunk: numeric id plus its content-addressed file name, always
/// normalized to end in the bundle extension exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub chunk_id: u64,
    pub file_name: String,
}

/// Decode the chunk manifest from a parsed loader tree.
///
/// One pre-order traversal; at every node each shape strategy runs
/// independently and the first match is accepted for that node. Nodes with
/// no matching shape are skipped silently; most of the tree is not a
/// manifest entry. Repeated chunk ids are allowed across encodings; the
/// last write wins, keeping the entry's original position.
///
/// An empty result is fatal: it means every shape test is stale relative to
/// the bundler's current output, and nothing downstream can proceed.
pub fn decode_chunk_manifest(
    tree: &Tree,
    source: &str,
    path: &str,
) -> Result<Vec<ChunkEntry>, DecodeError> {
    let mut entries: Vec<ChunkEntry> = Vec::new();
    let mut by_id: HashMap<u64, usize> = HashMap::new();

    preorder(tree.root_node(), &mut |node| {
        for (name, strategy) in STRATEGIES {
            if let Some(mut entry) = strategy(&node, source) {
                entry.file_name = normalize_file_name(entry.file_name);
                debug!(
                    strategy = name,
                    chunk_id = entry.chunk_id,
                    file_name = %entry.file_name,
                    "matched manifest entry"
                );
                match by_id.get(&entry.chunk_id) {
                    Some(&index) => entries[index] = entry,
                    None => {
                        by_id.insert(entry.chunk_id, entries.len());
                        entries.push(entry);
                    }
                }
                break;
            }
        }
    });

    if entries.is_empty() {
        warn!(path, "no manifest shape matched anything in the loader tree");
        return Err(DecodeError::EmptyManifest {
            path: path.to_string(),
        });
    }

    debug!(path, count = entries.len(), "decoded chunk manifest");
    Ok(entries)
}

/// Parse a loader script and decode its manifest in one step.
pub fn decode_loader_script(script: &ClientScript) -> Result<Vec<ChunkEntry>, DecodeError> {
    let content = script.content.as_deref().ok_or_else(|| DecodeError::LoaderParse {
        path: script.path.clone(),
    })?;
    let tree = parse_js(content).map_err(|err| {
        warn!(path = %script.path, error = %err, "loader script failed to parse");
        DecodeError::LoaderParse {
            path: script.path.clone(),
        }
    })?;
    decode_chunk_manifest(&tree, content, &script.path)
}

/// Force the name to carry the bundle extension exactly once.
fn normalize_file_name(mut name: String) -> String {
    while name.ends_with(BUNDLE_EXT) {
        name.truncate(name.len() - BUNDLE_EXT.len());
    }
    name.push_str(BUNDLE_EXT);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(source: &str) -> Result<Vec<ChunkEntry>, DecodeError> {
        let tree = parse_js(source).unwrap();
        decode_chunk_manifest(&tree, source, "loader.js")
    }

    #[test]
    fn decodes_object_property_encoding() {
        let entries = decode(r#"t.u = {42: "abcd1234.js"};"#).unwrap();
        assert_eq!(
            entries,
            vec![ChunkEntry {
                chunk_id: 42,
                file_name: "abcd1234.js".into()
            }]
        );
    }

    #[test]
    fn decodes_bare_hash_encoding_and_appends_extension() {
        let entries = decode(r#"t.u = {7: "ff00aa11"};"#).unwrap();
        assert_eq!(
            entries,
            vec![ChunkEntry {
                chunk_id: 7,
                file_name: "ff00aa11.js".into()
            }]
        );
    }

    #[test]
    fn decodes_ternary_encoding() {
        let source = r#"t.u = e => 42 === e ? 42 + ".abc123.js" : "" + e + ".js";"#;
        let entries = decode(source).unwrap();
        assert_eq!(entries[0].chunk_id, 42);
        assert_eq!(entries[0].file_name, "42.abc123.js");
    }

    #[test]
    fn bare_hash_rejects_ignore_list_and_reserved_prefix() {
        // lib/, istanbul and src prefixed values are well-known non-chunks;
        // absolute paths belong to a different resource kind; all-digit and
        // all-letter tokens are not content hashes.
        let source = r#"var m = {1: "lib/worker", 2: "istanbul852", 3: "srcmap1",
                                 4: "/asset9x", 5: "12345", 6: "justletters"};"#;
        assert!(matches!(
            decode(source),
            Err(DecodeError::EmptyManifest { .. })
        ));
    }

    #[test]
    fn file_names_never_double_the_extension() {
        let entries = decode(r#"var m = {9: "aaa111.js.js"};"#).unwrap();
        assert_eq!(entries[0].file_name, "aaa111.js");
    }

    #[test]
    fn duplicate_ids_last_write_wins() {
        let source = r#"var a = {5: "aaaa1111.js"}; var b = {5: "bbbb2222"};"#;
        let entries = decode(source).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "bbbb2222.js");
    }

    #[test]
    fn unrelated_loader_code_is_skipped_silently() {
        let source = r#"
            var map = {42: "abcd1234.js"};
            function load(e) { return fetch(base + map[e]); }
            var misc = {name: "loader", version: 3};
        "#;
        let entries = decode(source).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].chunk_id, 42);
    }

    #[test]
    fn empty_manifest_is_fatal() {
        assert!(matches!(
            decode("function nothing() { return 1; }"),
            Err(DecodeError::EmptyManifest { .. })
        ));
    }

    #[test]
    fn decode_loader_script_wraps_parse_failures() {
        let script = ClientScript::new("loader.js");
        assert!(matches!(
            decode_loader_script(&script),
            Err(DecodeError::LoaderParse { .. })
        ));
    }
}
