//! Shape tests for the chunk-manifest table's historical encodings.
//!
//! The upstream bundler has shipped its id → file-name table under several
//! structurally unrelated encodings, and changes without notice. Each
//! encoding is one independent function returning `Option<ChunkEntry>`;
//! extending the decoder to a new shape means adding a function to
//! [`STRATEGIES`] and nothing else.

use tree_sitter::Node;

use super::ChunkEntry;
use crate::ast::{classify, node_text, number_value, string_value, NodeKind};
use crate::constants::{
    is_hash_token, BUNDLE_EXT, MANIFEST_IGNORE_PREFIXES, RESERVED_PATH_PREFIX,
};

/// One shape test. All strategies run against every visited node; the first
/// match wins for that node.
pub type Strategy = fn(&Node, &str) -> Option<ChunkEntry>;

/// Ordered strategy list. The encodings are mutually exclusive across
/// observed bundles, so order does not bias results.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("ternary", ternary_encoding),
    ("object-property", object_property_encoding),
    ("bare-hash", bare_hash_encoding),
];

/// Encoding 1: `e === 42 ? 42 + ".abc123.js" : ...`
///
/// A ternary whose test and consequent are both binary expressions; the
/// consequent's right operand is the extension-bearing suffix and the test's
/// left operand carries the chunk id. The emitted file name is the id literal
/// concatenated with that suffix.
fn ternary_encoding(node: &Node, source: &str) -> Option<ChunkEntry> {
    if classify(node) != NodeKind::Ternary {
        return None;
    }
    let condition = node.child_by_field_name("condition")?;
    let consequence = node.child_by_field_name("consequence")?;
    if classify(&condition) != NodeKind::Binary || classify(&consequence) != NodeKind::Binary {
        return None;
    }

    let suffix_node = consequence.child_by_field_name("right")?;
    let suffix = string_value(&suffix_node, source)?;
    if !suffix.ends_with(BUNDLE_EXT) {
        return None;
    }

    let id_node = condition.child_by_field_name("left")?;
    let chunk_id = integer_value(&id_node, source)?;

    Some(ChunkEntry {
        chunk_id,
        file_name: format!("{}{}", node_text(&id_node, source), suffix),
    })
}

/// Encoding 2: an object property `{42: "abcd1234.js"}` whose key is numeric
/// and whose value already carries the bundle extension.
fn object_property_encoding(node: &Node, source: &str) -> Option<ChunkEntry> {
    let (chunk_id, value) = numeric_pair(node, source)?;
    if !value.ends_with(BUNDLE_EXT) {
        return None;
    }
    Some(ChunkEntry {
        chunk_id,
        file_name: value,
    })
}

/// Encoding 3: `{7: "ff00aa11"}`, a bare content hash with no extension.
///
/// Accepted only when the value survives the ignore list, does not start
/// with the path prefix reserved for other resource kinds, does not already
/// end in the bundle extension, and looks like a content hash. The decoder
/// appends the extension on emit.
fn bare_hash_encoding(node: &Node, source: &str) -> Option<ChunkEntry> {
    let (chunk_id, value) = numeric_pair(node, source)?;
    if value.ends_with(BUNDLE_EXT)
        || value.starts_with(RESERVED_PATH_PREFIX)
        || MANIFEST_IGNORE_PREFIXES.iter().any(|p| value.starts_with(p))
        || !is_hash_token(&value)
    {
        return None;
    }
    Some(ChunkEntry {
        chunk_id,
        file_name: format!("{}{}", value, BUNDLE_EXT),
    })
}

/// Match a `pair` with a numeric (or numeric-string) key and a string value.
fn numeric_pair(node: &Node, source: &str) -> Option<(u64, String)> {
    if classify(node) != NodeKind::Pair {
        return None;
    }
    let key = node.child_by_field_name("key")?;
    let chunk_id = integer_value(&key, source)?;
    let value = node.child_by_field_name("value")?;
    let value = string_value(&value, source)?;
    if value.is_empty() {
        return None;
    }
    Some((chunk_id, value))
}

/// Read a non-negative integer from a numeric literal or a numeric string.
fn integer_value(node: &Node, source: &str) -> Option<u64> {
    match classify(node) {
        NodeKind::Number => {
            let n = number_value(node, source)?;
            (n >= 0.0 && n.fract() == 0.0).then_some(n as u64)
        }
        NodeKind::String => string_value(node, source)?.parse().ok(),
        _ => None,
    }
}
