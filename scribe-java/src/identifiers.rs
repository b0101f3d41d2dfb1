//! Type-name scanning over generated test code.
//!
//! Both scans walk a real syntax tree, so names inside string literals and
//! comments are never reported. Package and import declarations are skipped.

use std::collections::BTreeSet;

use tree_sitter::Node;

use crate::Result;
use crate::helpers::node_text;

/// Capitalized identifiers used anywhere in the code (`Foo`, `Mockito`, ...).
pub fn capitalized_identifiers(source: &str) -> Result<BTreeSet<String>> {
    let tree = crate::parse_java(source)?;
    let mut out = BTreeSet::new();
    walk_capitalized(tree.root_node(), source, &mut out);
    Ok(out)
}

/// Type names appearing in generic argument position (`List<Foo>` → `Foo`).
pub fn generic_arguments(source: &str) -> Result<BTreeSet<String>> {
    let tree = crate::parse_java(source)?;
    let mut out = BTreeSet::new();
    walk_generics(tree.root_node(), source, false, &mut out);
    Ok(out)
}

fn is_declaration_header(node: Node<'_>) -> bool {
    matches!(node.kind(), "package_declaration" | "import_declaration")
}

fn walk_capitalized(node: Node<'_>, source: &str, out: &mut BTreeSet<String>) {
    if is_declaration_header(node) {
        return;
    }
    if matches!(node.kind(), "identifier" | "type_identifier") {
        let text = node_text(node, source);
        if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            out.insert(text.to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_capitalized(child, source, out);
    }
}

fn walk_generics(node: Node<'_>, source: &str, in_arguments: bool, out: &mut BTreeSet<String>) {
    if is_declaration_header(node) {
        return;
    }
    if in_arguments && node.kind() == "type_identifier" {
        out.insert(node_text(node, source).to_string());
        return;
    }
    let in_arguments = in_arguments || node.kind() == "type_arguments";
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_generics(child, source, in_arguments, out);
    }
}
