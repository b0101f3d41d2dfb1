use serde::{Deserialize, Serialize};

use crate::helpers::{child_by_field, node_text, package_name, primary_type};
use crate::{DeclKind, Result};

/// The package and first type declared by a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub package: Option<String>,
    pub name: String,
    pub kind: DeclKind,
}

impl TypeDeclaration {
    /// `package.Name`, or just `Name` in the default package.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{pkg}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Find the package and first class/interface/enum/record declaration.
///
/// Returns `Ok(None)` when the file declares no type.
pub fn scan_declaration(source: &str) -> Result<Option<TypeDeclaration>> {
    let tree = crate::parse_java(source)?;
    let root = tree.root_node();

    let Some(decl) = primary_type(root) else {
        return Ok(None);
    };
    let Some(kind) = DeclKind::from_node_kind(decl.kind()) else {
        return Ok(None);
    };
    let Some(name_node) = child_by_field(decl, "name") else {
        return Ok(None);
    };

    Ok(Some(TypeDeclaration {
        package: package_name(root, source),
        name: node_text(name_node, source).to_string(),
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_class_with_package() {
        let decl = scan_declaration(
            "package com.example.jagah.service;\n\nimport java.util.List;\n\npublic class MathService {}\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(decl.name, "MathService");
        assert_eq!(decl.kind, DeclKind::Class);
        assert_eq!(decl.qualified_name(), "com.example.jagah.service.MathService");
    }

    #[test]
    fn scans_first_declaration_only() {
        let decl = scan_declaration("package p;\ninterface Shape {}\nclass Circle {}\n")
            .unwrap()
            .unwrap();
        assert_eq!(decl.name, "Shape");
        assert_eq!(decl.kind, DeclKind::Interface);
    }

    #[test]
    fn scans_record_and_enum() {
        let rec = scan_declaration("package p;\npublic record Point(int x, int y) {}\n")
            .unwrap()
            .unwrap();
        assert_eq!(rec.kind, DeclKind::Record);

        let en = scan_declaration("package p;\nenum Color { RED, GREEN }\n")
            .unwrap()
            .unwrap();
        assert_eq!(en.kind, DeclKind::Enum);
        assert_eq!(en.qualified_name(), "p.Color");
    }

    #[test]
    fn default_package_and_empty_file() {
        let decl = scan_declaration("class Loose {}\n").unwrap().unwrap();
        assert_eq!(decl.package, None);
        assert_eq!(decl.qualified_name(), "Loose");

        assert!(scan_declaration("// nothing here\n").unwrap().is_none());
    }
}
