// Source file discovery under a root directory, driven by glob patterns.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Collect files under `root` matching any include pattern and no exclude
/// pattern. Patterns are relative to `root`. The result is sorted and
/// deduplicated, which fixes the scan order for the whole run.
pub fn discover_sources(root: &Path, include: &[String], exclude: &[String]) -> Vec<PathBuf> {
    let excludes: Vec<glob::Pattern> = exclude
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %p, error = %e, "Invalid exclude pattern");
                None
            }
        })
        .collect();

    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let mut matched_files = Vec::new();

    for pattern in include {
        let full_pattern = format!("{}/{}", escaped_root.trim_end_matches('/'), pattern);
        match glob::glob(&full_pattern) {
            Ok(paths) => {
                for entry in paths.flatten() {
                    if entry.is_file() && !is_excluded(&entry, root, &excludes) {
                        matched_files.push(entry);
                    }
                }
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
            }
        }
    }

    matched_files.sort();
    matched_files.dedup();
    matched_files
}

fn is_excluded(path: &Path, root: &Path, excludes: &[glob::Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    excludes.iter().any(|p| p.matches_path(relative))
}

/// Path relative to `root` with `/` separators, for logs and reports.
pub fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "class X {}").unwrap();
    }

    #[test]
    fn finds_sorted_java_files_and_applies_excludes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "com/acme/b/Zeta.java");
        touch(dir.path(), "com/acme/a/Alpha.java");
        touch(dir.path(), "com/acme/package-info.java");
        touch(dir.path(), "com/acme/notes.txt");

        let files = discover_sources(
            dir.path(),
            &["**/*.java".to_string()],
            &["**/package-info.java".to_string()],
        );
        let rel: Vec<String> = files
            .iter()
            .map(|f| display_relative(f, dir.path()))
            .collect();
        assert_eq!(rel, vec!["com/acme/a/Alpha.java", "com/acme/b/Zeta.java"]);
    }

    #[test]
    fn overlapping_includes_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "app/Main.java");

        let files = discover_sources(
            dir.path(),
            &["**/*.java".to_string(), "app/*.java".to_string()],
            &[],
        );
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = discover_sources(&dir.path().join("absent"), &["**/*.java".to_string()], &[]);
        assert!(files.is_empty());
    }
}
