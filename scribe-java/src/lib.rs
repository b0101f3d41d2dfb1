//! Java syntax layer for Scribe.
//!
//! Everything that needs to look inside a `.java` file goes through this
//! crate: [`facts::analyze`] extracts the structural facts that drive test
//! strategy selection, [`declarations::scan_declaration`] feeds the
//! project-wide symbol index, and [`identifiers`] finds type names used in
//! generated test code.

pub mod declarations;
pub mod facts;
mod helpers;
pub mod identifiers;

use serde::{Deserialize, Serialize};

pub use declarations::{TypeDeclaration, scan_declaration};
pub use facts::{FieldDecl, MethodSignature, SourceFacts, Stereotype, analyze};
pub use helpers::simple_type_name;

/// Error type for the Java syntax layer.
#[derive(thiserror::Error, Debug)]
pub enum SyntaxError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Parse Java source into a tree-sitter syntax tree.
///
/// Syntax errors do not fail the parse; tree-sitter recovers and marks the
/// affected nodes, which callers can detect with `has_error()`.
pub fn parse_java(source: &str) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| SyntaxError::TreeSitter(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| SyntaxError::Parse("parser returned no tree".to_string()))
}

// ── Declaration kind ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Record,
}

impl DeclKind {
    pub(crate) fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(Self::Class),
            "interface_declaration" | "annotation_type_declaration" => Some(Self::Interface),
            "enum_declaration" => Some(Self::Enum),
            "record_declaration" => Some(Self::Record),
            _ => None,
        }
    }
}

// ── Visibility ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    /// No access modifier (package-private).
    Package,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::Package => "package",
        };
        f.write_str(s)
    }
}
