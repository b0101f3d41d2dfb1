// Structural facts for one Java source file: public methods, instance
// fields, and the coarse role ("stereotype") of the primary type.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::helpers::{
    annotation_names, body_members, child_by_field, collect_type_refs, find_child_by_kind,
    has_modifier, node_text, package_name, primary_type, visibility,
};
use crate::{DeclKind, Result, Visibility};

const ENTRY_POINT_ANNOTATIONS: &[&str] = &["SpringBootApplication"];
const CONTROLLER_ANNOTATIONS: &[&str] = &["RestController", "Controller"];
const REPOSITORY_ANNOTATIONS: &[&str] = &["Repository"];
const SERVICE_ANNOTATIONS: &[&str] = &["Service", "Component"];
const MODEL_ANNOTATIONS: &[&str] = &["Entity", "Embeddable", "MappedSuperclass", "Data", "Value"];

/// Supertypes that mark a type as a persistence repository.
const REPOSITORY_BASES: &[&str] = &[
    "JpaRepository",
    "CrudRepository",
    "PagingAndSortingRepository",
    "MongoRepository",
    "ReactiveCrudRepository",
    "JpaSpecificationExecutor",
];

/// Types whose presence means the class talks to a database directly.
const PERSISTENCE_TYPES: &[&str] = &[
    "EntityManager",
    "JdbcTemplate",
    "NamedParameterJdbcTemplate",
    "DataSource",
    "SessionFactory",
    "MongoTemplate",
];

/// Coarse role of a source file, inferred from annotations, supertypes and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stereotype {
    /// Application entry point (`@SpringBootApplication` or a `main` method).
    EntryPoint,
    /// Web controller.
    Controller,
    /// Persistence repository.
    Repository,
    /// Business service or component.
    Service,
    /// Data holder: entity, record, or accessor-only POJO.
    Model,
    #[default]
    Plain,
}

impl Stereotype {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntryPoint => "entry_point",
            Self::Controller => "controller",
            Self::Repository => "repository",
            Self::Service => "service",
            Self::Model => "model",
            Self::Plain => "plain",
        }
    }

    /// Entry points and controllers never get generated tests.
    pub fn is_excluded(self) -> bool {
        matches!(self, Self::EntryPoint | Self::Controller)
    }
}

impl std::fmt::Display for Stereotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method declared by the primary type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
}

impl MethodSignature {
    /// Zero-argument `getX()` returning a value, or `isX()` returning a boolean.
    pub fn is_getter(&self) -> bool {
        if !self.parameter_types.is_empty() {
            return false;
        }
        if has_accessor_prefix(&self.name, "get") {
            return self.return_type != "void";
        }
        has_accessor_prefix(&self.name, "is")
            && matches!(self.return_type.as_str(), "boolean" | "Boolean")
    }

    /// One-argument `setX(value)`.
    pub fn is_setter(&self) -> bool {
        has_accessor_prefix(&self.name, "set") && self.parameter_types.len() == 1
    }

    fn is_object_method(&self) -> bool {
        matches!(self.name.as_str(), "toString" | "equals" | "hashCode")
    }

    fn is_accessor_shaped(&self) -> bool {
        self.is_getter() || self.is_setter() || self.is_object_method()
    }
}

fn has_accessor_prefix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

/// An instance field of the primary type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_name: String,
    pub visibility: Visibility,
}

/// Everything the strategy classifier and prompt builder need to know about a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFacts {
    /// Declared package; empty for the default package.
    pub package: String,
    /// Name of the primary type, if one was found.
    pub class_name: Option<String>,
    pub kind: Option<DeclKind>,
    /// Public methods in declaration order; overloads keep the first declaration.
    pub methods: Vec<MethodSignature>,
    /// Non-static fields in declaration order.
    pub fields: Vec<FieldDecl>,
    pub stereotype: Stereotype,
    /// Direct database access (`EntityManager`, `JdbcTemplate`, `@Entity`, ...).
    pub persistence_access: bool,
    /// Best-effort extraction notes (syntax errors, missing declarations).
    pub warnings: Vec<String>,
}

impl SourceFacts {
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Extract structural facts from one Java source file.
///
/// Deterministic: the same text always yields the same facts. Never fails on
/// malformed Java; problems are reported through [`SourceFacts::warnings`].
pub fn analyze(source: &str) -> Result<SourceFacts> {
    let tree = crate::parse_java(source)?;
    let root = tree.root_node();

    let mut facts = SourceFacts {
        package: package_name(root, source).unwrap_or_default(),
        ..SourceFacts::default()
    };

    if root.has_error() {
        facts
            .warnings
            .push("source contains syntax errors; facts may be partial".to_string());
    }

    let Some(decl) = primary_type(root) else {
        facts.warnings.push("no type declaration found".to_string());
        return Ok(facts);
    };

    facts.kind = DeclKind::from_node_kind(decl.kind());
    facts.class_name = child_by_field(decl, "name").map(|n| node_text(n, source).to_string());
    let implicitly_public = facts.kind == Some(DeclKind::Interface);
    let mut has_main = false;

    if facts.kind == Some(DeclKind::Record) {
        if let Some(params) = child_by_field(decl, "parameters") {
            collect_record_components(params, source, &mut facts.fields);
        }
    }

    if let Some(body) = child_by_field(decl, "body") {
        for member in body_members(body) {
            match member.kind() {
                "method_declaration" => {
                    let Some(sig) = method_signature(member, source) else {
                        continue;
                    };
                    has_main |= is_main(member, &sig);
                    let public = has_modifier(member, "public")
                        || (implicitly_public && !has_modifier(member, "private"));
                    if public && facts.method(&sig.name).is_none() {
                        facts.methods.push(sig);
                    }
                }
                "field_declaration" if !has_modifier(member, "static") => {
                    collect_fields(member, source, &mut facts.fields);
                }
                _ => {}
            }
        }
    }

    let annotations = annotation_names(decl, source);
    let supertypes = supertypes(decl, source);

    facts.persistence_access =
        annotations.iter().any(|a| a == "Entity") || references_persistence(root, source);
    facts.stereotype = stereotype(&annotations, &supertypes, &facts, has_main);

    if facts.methods.is_empty() {
        facts.warnings.push("no public methods found".to_string());
    }

    debug!(
        class = facts.class_name.as_deref().unwrap_or("?"),
        stereotype = %facts.stereotype,
        methods = facts.methods.len(),
        fields = facts.fields.len(),
        "Analyzed source"
    );

    Ok(facts)
}

fn stereotype(
    annotations: &[String],
    supertypes: &[String],
    facts: &SourceFacts,
    has_main: bool,
) -> Stereotype {
    let annotated = |names: &[&str]| annotations.iter().any(|a| names.contains(&a.as_str()));

    if has_main || annotated(ENTRY_POINT_ANNOTATIONS) {
        Stereotype::EntryPoint
    } else if annotated(CONTROLLER_ANNOTATIONS) {
        Stereotype::Controller
    } else if annotated(REPOSITORY_ANNOTATIONS)
        || supertypes
            .iter()
            .any(|s| REPOSITORY_BASES.contains(&s.as_str()))
    {
        Stereotype::Repository
    } else if annotated(SERVICE_ANNOTATIONS) {
        Stereotype::Service
    } else if facts.kind == Some(DeclKind::Record)
        || annotated(MODEL_ANNOTATIONS)
        || is_accessor_only(&facts.methods)
    {
        Stereotype::Model
    } else {
        Stereotype::Plain
    }
}

/// Every public method is a getter, setter or `Object` override, with at
/// least one getter and one setter present.
fn is_accessor_only(methods: &[MethodSignature]) -> bool {
    !methods.is_empty()
        && methods.iter().all(MethodSignature::is_accessor_shaped)
        && methods.iter().any(MethodSignature::is_getter)
        && methods.iter().any(MethodSignature::is_setter)
}

fn method_signature(node: tree_sitter::Node<'_>, source: &str) -> Option<MethodSignature> {
    let name = node_text(child_by_field(node, "name")?, source).to_string();
    let return_type = node_text(child_by_field(node, "type")?, source).to_string();

    let mut parameter_types = Vec::new();
    if let Some(params) = child_by_field(node, "parameters") {
        let mut cursor = params.walk();
        for param in params.children(&mut cursor) {
            match param.kind() {
                "formal_parameter" => {
                    if let Some(ty) = child_by_field(param, "type") {
                        parameter_types.push(node_text(ty, source).to_string());
                    }
                }
                "spread_parameter" => {
                    let mut inner = param.walk();
                    if let Some(ty) = param
                        .named_children(&mut inner)
                        .find(|c| c.kind() != "modifiers" && c.kind() != "variable_declarator")
                    {
                        parameter_types.push(format!("{}...", node_text(ty, source)));
                    }
                }
                _ => {}
            }
        }
    }

    Some(MethodSignature {
        name,
        return_type,
        parameter_types,
    })
}

fn is_main(node: tree_sitter::Node<'_>, sig: &MethodSignature) -> bool {
    sig.name == "main"
        && sig.return_type == "void"
        && sig.parameter_types.len() == 1
        && has_modifier(node, "public")
        && has_modifier(node, "static")
}

fn collect_fields(node: tree_sitter::Node<'_>, source: &str, out: &mut Vec<FieldDecl>) {
    let Some(ty) = child_by_field(node, "type") else {
        return;
    };
    let type_name = node_text(ty, source).to_string();
    let vis = visibility(node);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "variable_declarator" {
            if let Some(name_node) = child_by_field(child, "name") {
                out.push(FieldDecl {
                    name: node_text(name_node, source).to_string(),
                    type_name: type_name.clone(),
                    visibility: vis,
                });
            }
        }
    }
}

/// Record components behave like private final fields.
fn collect_record_components(params: tree_sitter::Node<'_>, source: &str, out: &mut Vec<FieldDecl>) {
    let mut cursor = params.walk();
    for param in params.children(&mut cursor) {
        if param.kind() != "formal_parameter" {
            continue;
        }
        if let (Some(ty), Some(name)) = (child_by_field(param, "type"), child_by_field(param, "name")) {
            out.push(FieldDecl {
                name: node_text(name, source).to_string(),
                type_name: node_text(ty, source).to_string(),
                visibility: Visibility::Private,
            });
        }
    }
}

fn supertypes(decl: tree_sitter::Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for field in ["superclass", "interfaces"] {
        if let Some(node) = child_by_field(decl, field) {
            collect_type_refs(node, source, &mut out);
        }
    }
    // `interface Foo extends Bar` has no field name for the extends clause.
    if let Some(node) = find_child_by_kind(decl, "extends_interfaces") {
        collect_type_refs(node, source, &mut out);
    }
    out
}

fn references_persistence(node: tree_sitter::Node<'_>, source: &str) -> bool {
    if node.kind() == "type_identifier" && PERSISTENCE_TYPES.contains(&node_text(node, source)) {
        return true;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| references_persistence(child, source))
}
