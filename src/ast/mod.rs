//! JavaScript parsing front-end and node classification.
//!
//! Scripts are parsed with tree-sitter; the rest of the crate never touches
//! raw `node.kind()` strings. [`NodeKind`] is the closed set of syntax shapes
//! the core understands, classified once per node, so "unsupported kind" is a
//! default match arm instead of a scattered string comparison.

pub mod value;

use anyhow::anyhow;
use tree_sitter::{Node, Parser, Tree};

/// Parse JavaScript source into a tree-sitter tree.
///
/// Returns an error when the parser yields nothing usable; minified bundles
/// with recoverable errors still parse (tree-sitter is error-tolerant) and
/// are handled best-effort downstream.
pub fn parse_js(content: &str) -> Result<Tree, anyhow::Error> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| anyhow!("Failed to set JavaScript parser language: {}", e))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| anyhow!("Failed to parse script"))?;

    // tree-sitter recovers from localized errors, which minified bundles
    // trigger routinely. Only a tree with no usable statements at all counts
    // as a parse failure.
    let root = tree.root_node();
    if root.has_error() {
        let mut cursor = root.walk();
        let usable = root.named_children(&mut cursor).any(|c| c.kind() != "ERROR");
        if !usable {
            return Err(anyhow!("Script is not valid JavaScript"));
        }
    }
    Ok(tree)
}

/// The closed set of node shapes the extraction core can classify.
///
/// Everything else is `Other`, which the evaluator rejects and the decoder
/// skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Pair,
    Array,
    String,
    Number,
    True,
    False,
    Null,
    Identifier,
    PropertyIdentifier,
    Member,
    Subscript,
    Ternary,
    Binary,
    Unary,
    Other,
}

/// Classify a tree-sitter node into the closed kind set.
pub fn classify(node: &Node) -> NodeKind {
    match node.kind() {
        "object" => NodeKind::Object,
        "pair" => NodeKind::Pair,
        "array" => NodeKind::Array,
        "string" => NodeKind::String,
        "number" => NodeKind::Number,
        "true" => NodeKind::True,
        "false" => NodeKind::False,
        "null" => NodeKind::Null,
        "identifier" => NodeKind::Identifier,
        "property_identifier" => NodeKind::PropertyIdentifier,
        "member_expression" => NodeKind::Member,
        "subscript_expression" => NodeKind::Subscript,
        "ternary_expression" => NodeKind::Ternary,
        "binary_expression" => NodeKind::Binary,
        "unary_expression" => NodeKind::Unary,
        _ => NodeKind::Other,
    }
}

/// Get text from a tree-sitter node, UTF-8 safe.
pub fn node_text(node: &Node, source: &str) -> String {
    let bytes = source.as_bytes();
    let (start, end) = (node.start_byte(), node.end_byte());
    if start < bytes.len() && end <= bytes.len() {
        String::from_utf8_lossy(&bytes[start..end]).to_string()
    } else {
        String::new()
    }
}

/// Decode a string literal node to its value.
///
/// Concatenates `string_fragment` children and resolves the common escape
/// sequences minified bundles actually contain; falls back to quote trimming
/// for degenerate nodes.
pub fn string_value(node: &Node, source: &str) -> Option<String> {
    if classify(node) != NodeKind::String {
        return None;
    }

    let mut out = String::new();
    let mut saw_child = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        saw_child = true;
        match child.kind() {
            "string_fragment" => out.push_str(&node_text(&child, source)),
            "escape_sequence" => {
                let esc = node_text(&child, source);
                match esc.as_str() {
                    "\\n" => out.push('\n'),
                    "\\t" => out.push('\t'),
                    "\\r" => out.push('\r'),
                    "\\\\" => out.push('\\'),
                    "\\\"" => out.push('"'),
                    "\\'" => out.push('\''),
                    "\\`" => out.push('`'),
                    other => {
                        // \uXXXX and friends: keep the raw payload rather
                        // than drop the record over an escape.
                        out.push_str(other.trim_start_matches('\\'));
                    }
                }
            }
            _ => {}
        }
    }

    if !saw_child {
        out = node_text(node, source)
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_string();
    }
    Some(out)
}

/// Decode a numeric literal node.
pub fn number_value(node: &Node, source: &str) -> Option<f64> {
    if classify(node) != NodeKind::Number {
        return None;
    }
    let text = node_text(node, source);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse::<f64>().ok()
}

/// Resolve an object-pair key to its property name.
///
/// Keys appear as bare identifiers, string literals, or numeric literals;
/// computed keys resolve to `None`.
pub fn key_name(key: &Node, source: &str) -> Option<String> {
    match classify(key) {
        NodeKind::PropertyIdentifier | NodeKind::Identifier => Some(node_text(key, source)),
        NodeKind::String => string_value(key, source),
        NodeKind::Number => Some(node_text(key, source)),
        _ => None,
    }
}

/// True for enum-like access chains: member accesses built purely from
/// identifiers, with no computed segment. Their value needs runtime binding
/// resolution this crate does not perform.
pub fn is_enum_chain(node: &Node) -> bool {
    if classify(node) != NodeKind::Member {
        return false;
    }
    let (Some(object), Some(property)) = (
        node.child_by_field_name("object"),
        node.child_by_field_name("property"),
    ) else {
        return false;
    };

    match classify(&object) {
        NodeKind::Member => is_enum_chain(&object),
        NodeKind::Identifier => classify(&property) == NodeKind::PropertyIdentifier,
        _ => false,
    }
}

/// Single pre-order traversal, visiting every node in the tree.
pub fn preorder<'t, F: FnMut(Node<'t>)>(node: Node<'t>, f: &mut F) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        preorder(child, f);
    }
}

/// Does an object node have a property with the given name?
pub fn object_has_property(object: &Node, source: &str, name: &str) -> bool {
    if classify(object) != NodeKind::Object {
        return false;
    }
    let mut cursor = object.walk();
    let found = object.named_children(&mut cursor).any(|prop| {
        classify(&prop) == NodeKind::Pair
            && prop
                .child_by_field_name("key")
                .and_then(|k| key_name(&k, source))
                .is_some_and(|k| k == name)
    });
    found
}
