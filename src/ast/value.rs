//! Value Coercion Evaluator: turns a restricted grammar of syntax nodes into
//! plain [`serde_json::Value`]s without executing anything.
//!
//! The whitelist is deliberate. Anything needing runtime binding resolution
//! (identifiers, calls, computed access) is rejected per-record rather than
//! guessed at; callers log the offending kind and drop only that record.

use serde_json::{Map, Value};
use tree_sitter::Node;

use super::{classify, is_enum_chain, key_name, node_text, number_value, string_value, NodeKind};
use crate::error::CoerceError;

/// Coerce a syntax node into a JSON value.
///
/// Properties whose key is in `ignore_fields` are skipped entirely, not
/// recursed into; they embed closures this evaluator cannot represent.
///
/// Returns `Ok(None)` for enum-like member chains: unrepresentable but not
/// fatal, so object coercion omits the field instead of failing the record.
pub fn coerce(
    node: &Node,
    source: &str,
    ignore_fields: &[&str],
) -> Result<Option<Value>, CoerceError> {
    match classify(node) {
        NodeKind::String => Ok(string_value(node, source).map(Value::String)),
        NodeKind::Number => Ok(number_value(node, source).map(json_number)),
        NodeKind::True => Ok(Some(Value::Bool(true))),
        NodeKind::False => Ok(Some(Value::Bool(false))),
        NodeKind::Null => Ok(Some(Value::Null)),

        NodeKind::Object => {
            let mut object = Map::new();
            let mut cursor = node.walk();
            for prop in node.named_children(&mut cursor) {
                if classify(&prop) != NodeKind::Pair {
                    // Spread elements, methods, shorthand props: skip.
                    continue;
                }
                let Some(key) = prop
                    .child_by_field_name("key")
                    .and_then(|k| key_name(&k, source))
                else {
                    continue;
                };
                if ignore_fields.contains(&key.as_str()) {
                    continue;
                }
                let Some(value_node) = prop.child_by_field_name("value") else {
                    continue;
                };
                if let Some(value) = coerce(&value_node, source, ignore_fields)? {
                    object.insert(key, value);
                }
            }
            Ok(Some(Value::Object(object)))
        }

        NodeKind::Array => {
            let mut elements = Vec::new();
            let mut cursor = node.walk();
            for element in node.named_children(&mut cursor) {
                // An omitted element still holds its position.
                elements.push(coerce(&element, source, ignore_fields)?.unwrap_or(Value::Null));
            }
            Ok(Some(Value::Array(elements)))
        }

        NodeKind::Unary => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| node_text(&op, source));
            if operator.as_deref() != Some("!") {
                return Err(unsupported(node));
            }
            let argument = node
                .child_by_field_name("argument")
                .ok_or_else(|| unsupported(node))?;
            let value = coerce(&argument, source, ignore_fields)?.unwrap_or(Value::Null);
            Ok(Some(Value::Bool(!is_truthy(&value))))
        }

        NodeKind::Member if is_enum_chain(node) => Ok(None),

        NodeKind::Pair
        | NodeKind::Identifier
        | NodeKind::PropertyIdentifier
        | NodeKind::Member
        | NodeKind::Subscript
        | NodeKind::Ternary
        | NodeKind::Binary
        | NodeKind::Other => Err(unsupported(node)),
    }
}

fn unsupported(node: &Node) -> CoerceError {
    CoerceError::UnsupportedNodeKind {
        kind: node.kind(),
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

/// Prefer integer representation when the literal is integral; bundle data
/// (chunk ids, bucket ids, timestamps) is integral in practice.
fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// JavaScript truthiness for the values this evaluator produces.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::find_first;
    use crate::ast::parse_js;
    use serde_json::json;

    fn coerce_first_object(source: &str, ignore: &[&str]) -> Result<Option<Value>, CoerceError> {
        let tree = parse_js(source).unwrap();
        let object = find_first(tree.root_node(), NodeKind::Object).unwrap();
        coerce(&object, source, ignore)
    }

    #[test]
    fn coerces_literals_objects_and_arrays() {
        let source = r#"var e = {kind: "guild", id: "exp1", count: 2, flag: !0,
                       treatments: [{id: 0, label: "control"}, {id: 1, label: "test"}]};"#;
        let value = coerce_first_object(source, &[]).unwrap().unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "guild",
                "id": "exp1",
                "count": 2,
                "flag": true,
                "treatments": [
                    {"id": 0, "label": "control"},
                    {"id": 1, "label": "test"}
                ]
            })
        );
    }

    #[test]
    fn skips_ignored_fields_without_recursing() {
        // defaultConfig holds a closure that would otherwise fail coercion.
        let source = r#"var e = {id: "exp", defaultConfig: {cb: function(){}}, label: "L"};"#;
        let value = coerce_first_object(source, &["defaultConfig"]).unwrap().unwrap();
        assert_eq!(value, json!({"id": "exp", "label": "L"}));
    }

    #[test]
    fn omits_enum_chain_fields_instead_of_failing() {
        let source = r#"var e = {id: "exp", kind: a.Z.USER};"#;
        let value = coerce_first_object(source, &[]).unwrap().unwrap();
        assert_eq!(value, json!({"id": "exp"}));
    }

    #[test]
    fn logical_not_follows_js_truthiness() {
        for (source, expected) in [
            ("var v = {x: !0};", json!({"x": true})),
            ("var v = {x: !1};", json!({"x": false})),
            (r#"var v = {x: !""};"#, json!({"x": true})),
        ] {
            assert_eq!(coerce_first_object(source, &[]).unwrap().unwrap(), expected);
        }
    }

    #[test]
    fn rejects_call_expressions_with_kind_context() {
        let source = r#"var e = {id: "exp", buckets: [1].concat(more)};"#;
        let err = coerce_first_object(source, &[]).unwrap_err();
        match err {
            CoerceError::UnsupportedNodeKind { kind, .. } => {
                assert_eq!(kind, "call_expression");
            }
        }
    }

    #[test]
    fn rejects_bare_identifiers() {
        let source = "var e = {id: someBinding};";
        assert!(coerce_first_object(source, &[]).is_err());
    }
}
