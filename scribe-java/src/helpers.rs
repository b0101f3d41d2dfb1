use tree_sitter::Node;

use crate::{DeclKind, Visibility};

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Whether a declaration carries the given modifier keyword (`public`, `static`, ...).
pub fn has_modifier(node: Node<'_>, keyword: &str) -> bool {
    let Some(mods) = find_child_by_kind(node, "modifiers") else {
        return false;
    };
    let mut cursor = mods.walk();
    mods.children(&mut cursor).any(|c| c.kind() == keyword)
}

pub fn visibility(node: Node<'_>) -> Visibility {
    if has_modifier(node, "public") {
        Visibility::Public
    } else if has_modifier(node, "protected") {
        Visibility::Protected
    } else if has_modifier(node, "private") {
        Visibility::Private
    } else {
        Visibility::Package
    }
}

/// Simple names of the annotations on a declaration, in source order.
///
/// `@org.springframework.stereotype.Service` yields `Service`.
pub fn annotation_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(mods) = find_child_by_kind(node, "modifiers") else {
        return Vec::new();
    };
    let mut cursor = mods.walk();
    mods.children(&mut cursor)
        .filter(|c| c.kind() == "marker_annotation" || c.kind() == "annotation")
        .filter_map(|c| child_by_field(c, "name"))
        .map(|name| last_segment(node_text(name, source)).to_string())
        .collect()
}

/// The declared package (`package a.b.c;`), if any.
pub fn package_name(root: Node<'_>, source: &str) -> Option<String> {
    let decl = find_child_by_kind(root, "package_declaration")?;
    let mut cursor = decl.walk();
    let name = decl
        .children(&mut cursor)
        .find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier")?;
    Some(node_text(name, source).to_string())
}

/// The first top-level type declaration in the file.
pub fn primary_type(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    root.children(&mut cursor)
        .find(|c| DeclKind::from_node_kind(c.kind()).is_some())
}

/// Children of a type body, flattening `enum_body_declarations`.
pub fn body_members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

/// Recursively collect the simple names of type references under a wrapper
/// node (`superclass`, `super_interfaces`, `extends_interfaces`, ...).
///
/// `generic_type` contributes its outer name only; `scoped_type_identifier`
/// its last segment.
pub fn collect_type_refs(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "type_identifier" => out.push(node_text(node, source).to_string()),
        "generic_type" => {
            let mut cursor = node.walk();
            if let Some(outer) = node
                .children(&mut cursor)
                .find(|c| c.kind() == "type_identifier" || c.kind() == "scoped_type_identifier")
            {
                collect_type_refs(outer, source, out);
            }
        }
        "scoped_type_identifier" => {
            let mut cursor = node.walk();
            if let Some(last) = node
                .children(&mut cursor)
                .filter(|c| c.kind() == "type_identifier")
                .last()
            {
                out.push(node_text(last, source).to_string());
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect_type_refs(child, source, out);
            }
        }
    }
}

/// Reduce a declared type to its bare simple name.
///
/// `java.util.List<Foo>` → `List`, `int[]` → `int`, `String...` → `String`.
pub fn simple_type_name(type_text: &str) -> &str {
    let base = type_text
        .split('<')
        .next()
        .unwrap_or(type_text)
        .trim_end_matches("...")
        .trim_end_matches("[]")
        .trim();
    last_segment(base)
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
