use std::path::{Path, PathBuf};

use crate::imports::ResolvedImports;

/// A complete test source file ready to be compiled or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArtifact {
    /// Package of the class under test; empty for the default package.
    pub package: String,
    /// `import X;` lines, sorted and unique.
    pub imports: Vec<String>,
    pub body: String,
    /// Test class name, e.g. `PaymentValidatorTest`.
    pub test_class: String,
    /// Where the file lives under the test root.
    pub path: PathBuf,
}

impl TestArtifact {
    pub fn new(package: &str, test_class: &str, resolved: ResolvedImports, path: PathBuf) -> Self {
        Self {
            package: package.to_string(),
            imports: resolved.lines(),
            body: resolved.body,
            test_class: test_class.to_string(),
            path,
        }
    }

    /// Full Java source text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.package.is_empty() {
            out.push_str("package ");
            out.push_str(&self.package);
            out.push_str(";\n\n");
        }
        for line in &self.imports {
            out.push_str(line);
            out.push('\n');
        }
        if !self.imports.is_empty() {
            out.push('\n');
        }
        out.push_str(self.body.trim());
        out.push('\n');
        out
    }

    /// Write the rendered file, creating parent directories.
    pub fn write(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.render())
    }
}

/// `<test_root>/<package dirs>/<test_class>.java`.
pub fn destination(test_root: &Path, package: &str, test_class: &str) -> PathBuf {
    let mut path = test_root.to_path_buf();
    for segment in package.split('.').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push(format!("{test_class}.java"));
    path
}
