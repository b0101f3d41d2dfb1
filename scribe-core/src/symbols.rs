//! Project-wide symbol index: simple type name → fully-qualified name.
//!
//! Built once per run before any file is analyzed and shared read-only
//! afterwards. Files are scanned in sorted path order so that "the later
//! file wins" is deterministic under [`CollisionPolicy::LastWins`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use scribe_java::TypeDeclaration;

use crate::config::{CollisionPolicy, ProjectSection};
use crate::discover::discover_sources;
use crate::error::ConfigError;

/// Two or more files declaring the same simple type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub simple_name: String,
    /// Every candidate in scan order; the last one is the indexed entry.
    pub qualified_names: Vec<String>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct IndexEntry {
    qualified_name: String,
    file: PathBuf,
}

/// Immutable simple-name lookup table over the project's declared types.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolIndex {
    entries: BTreeMap<String, IndexEntry>,
    collisions: Vec<Collision>,
}

impl SymbolIndex {
    /// Scan every source file under `source_root` and index its primary
    /// type declaration.
    ///
    /// Parsing runs on the rayon pool; entries are folded in path order.
    /// Unreadable or unparsable files are logged and skipped.
    #[instrument(skip_all, name = "symbol_index", fields(root = %source_root.display()))]
    pub fn build(
        source_root: &Path,
        project: &ProjectSection,
        policy: CollisionPolicy,
    ) -> Result<Self, ConfigError> {
        let files = discover_sources(
            source_root,
            &project.include_patterns,
            &project.exclude_patterns,
        );

        let scanned: Vec<(PathBuf, Option<TypeDeclaration>)> = files
            .par_iter()
            .map(|path| (path.clone(), scan_file(path)))
            .collect();

        let declarations = scanned
            .into_iter()
            .filter_map(|(path, decl)| decl.map(|d| (path, d)));
        let index = Self::from_declarations(declarations, policy)?;

        info!(
            files = files.len(),
            symbols = index.len(),
            collisions = index.collisions.len(),
            "Symbol index built"
        );
        Ok(index)
    }

    /// Fold declarations, in the given order, into an index.
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = (PathBuf, TypeDeclaration)>,
        policy: CollisionPolicy,
    ) -> Result<Self, ConfigError> {
        let mut entries: BTreeMap<String, IndexEntry> = BTreeMap::new();
        let mut collisions: BTreeMap<String, Collision> = BTreeMap::new();

        for (file, decl) in declarations {
            // Default-package types cannot be imported.
            if decl.package.is_none() {
                continue;
            }
            let qualified_name = decl.qualified_name();
            let entry = IndexEntry {
                qualified_name: qualified_name.clone(),
                file: file.clone(),
            };

            if let Some(previous) = entries.insert(decl.name.clone(), entry) {
                if policy == CollisionPolicy::Error {
                    return Err(ConfigError::Invalid(format!(
                        "type name {} is declared by both {} and {}",
                        decl.name,
                        previous.file.display(),
                        file.display()
                    )));
                }
                warn!(
                    name = %decl.name,
                    kept = %qualified_name,
                    replaced = %previous.qualified_name,
                    "Simple type name collision; later file wins"
                );
                let collision = collisions
                    .entry(decl.name.clone())
                    .or_insert_with(|| Collision {
                        simple_name: decl.name.clone(),
                        qualified_names: vec![previous.qualified_name],
                        files: vec![previous.file],
                    });
                collision.qualified_names.push(qualified_name);
                collision.files.push(file);
            }
        }

        Ok(Self {
            entries,
            collisions: collisions.into_values().collect(),
        })
    }

    /// Fully-qualified name for a simple type name, if the project declares it.
    pub fn resolve(&self, simple_name: &str) -> Option<&str> {
        self.entries
            .get(simple_name)
            .map(|e| e.qualified_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(simple name, qualified name)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, e)| (name.as_str(), e.qualified_name.as_str()))
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}

fn scan_file(path: &Path) -> Option<TypeDeclaration> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read source file");
            return None;
        }
    };
    match scribe_java::scan_declaration(&source) {
        Ok(decl) => {
            if decl.is_none() {
                debug!(path = %path.display(), "No type declaration");
            }
            decl
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot parse source file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_java::DeclKind;

    fn decl(package: Option<&str>, name: &str) -> TypeDeclaration {
        TypeDeclaration {
            package: package.map(String::from),
            name: name.to_string(),
            kind: DeclKind::Class,
        }
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn later_declaration_wins() {
        let index = SymbolIndex::from_declarations(
            vec![
                (PathBuf::from("a/User.java"), decl(Some("com.a"), "User")),
                (PathBuf::from("b/User.java"), decl(Some("com.b"), "User")),
                (PathBuf::from("b/Order.java"), decl(Some("com.b"), "Order")),
            ],
            CollisionPolicy::LastWins,
        )
        .unwrap();

        assert_eq!(index.resolve("User"), Some("com.b.User"));
        assert_eq!(index.resolve("Order"), Some("com.b.Order"));
        assert_eq!(index.len(), 2);

        let collisions = index.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].simple_name, "User");
        assert_eq!(collisions[0].qualified_names, vec!["com.a.User", "com.b.User"]);
    }

    #[test]
    fn error_policy_rejects_collision() {
        let err = SymbolIndex::from_declarations(
            vec![
                (PathBuf::from("a/User.java"), decl(Some("com.a"), "User")),
                (PathBuf::from("b/User.java"), decl(Some("com.b"), "User")),
            ],
            CollisionPolicy::Error,
        )
        .unwrap_err();
        assert!(err.to_string().contains("User"));
    }

    #[test]
    fn default_package_is_not_indexed() {
        let index = SymbolIndex::from_declarations(
            vec![(PathBuf::from("Main.java"), decl(None, "Main"))],
            CollisionPolicy::LastWins,
        )
        .unwrap();
        assert!(index.is_empty());
        assert_eq!(index.resolve("Main"), None);
    }

    #[test]
    fn build_scans_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "com/acme/billing/Invoice.java",
            "package com.acme.billing;\npublic class Invoice {}\n",
        );
        write(
            dir.path(),
            "com/acme/legacy/Invoice.java",
            "package com.acme.legacy;\npublic class Invoice {}\n",
        );
        write(
            dir.path(),
            "com/acme/model/Status.java",
            "package com.acme.model;\npublic enum Status { OPEN, CLOSED }\n",
        );
        write(dir.path(), "com/acme/Empty.java", "// nothing here\n");

        let index = SymbolIndex::build(
            dir.path(),
            &ProjectSection::default(),
            CollisionPolicy::LastWins,
        )
        .unwrap();

        assert_eq!(index.resolve("Invoice"), Some("com.acme.legacy.Invoice"));
        assert_eq!(index.resolve("Status"), Some("com.acme.model.Status"));
        assert_eq!(index.len(), 2);
        let names: Vec<&str> = index.iter().map(|(simple, _)| simple).collect();
        assert_eq!(names, vec!["Invoice", "Status"]);
    }
}
