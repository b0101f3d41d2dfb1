//! Import resolution for generated test code.
//!
//! Generated text is split into the import lines it already declares and a
//! body. The body is then scanned for framework keywords and for type names
//! the project declares. Because scans only ever see the body, resolving an
//! already-assembled file yields the same set again.

use std::collections::BTreeSet;

use scribe_java::SyntaxError;
use scribe_java::identifiers::{capitalized_identifiers, generic_arguments};

use crate::llm::strip_code_fences;
use crate::symbols::SymbolIndex;

/// Imports every generated test gets.
pub const FIXED_IMPORTS: &[&str] = &[
    "org.junit.jupiter.api.Test",
    "static org.junit.jupiter.api.Assertions.*",
    "java.util.*",
];

/// Text fragment → import target. `assert*` calls are covered by the static
/// `Assertions.*` import in [`FIXED_IMPORTS`].
const KEYWORD_IMPORTS: &[(&str, &str)] = &[
    ("@BeforeEach", "org.junit.jupiter.api.BeforeEach"),
    ("@AfterEach", "org.junit.jupiter.api.AfterEach"),
    ("@BeforeAll", "org.junit.jupiter.api.BeforeAll"),
    ("@AfterAll", "org.junit.jupiter.api.AfterAll"),
    ("@DisplayName", "org.junit.jupiter.api.DisplayName"),
    ("@Nested", "org.junit.jupiter.api.Nested"),
    ("@ParameterizedTest", "org.junit.jupiter.params.ParameterizedTest"),
    ("@ValueSource", "org.junit.jupiter.params.provider.ValueSource"),
    ("@CsvSource", "org.junit.jupiter.params.provider.CsvSource"),
    ("@ExtendWith", "org.junit.jupiter.api.extension.ExtendWith"),
    ("MockitoExtension", "org.mockito.junit.jupiter.MockitoExtension"),
    ("@Mock", "org.mockito.Mock"),
    ("@InjectMocks", "org.mockito.InjectMocks"),
    ("@Spy", "org.mockito.Spy"),
    ("@Captor", "org.mockito.Captor"),
    ("ArgumentCaptor", "org.mockito.ArgumentCaptor"),
    ("Mockito.", "org.mockito.Mockito"),
    ("when(", "static org.mockito.Mockito.when"),
    ("verify(", "static org.mockito.Mockito.verify"),
    ("mock(", "static org.mockito.Mockito.mock"),
    ("any(", "static org.mockito.ArgumentMatchers.any"),
    ("anyInt(", "static org.mockito.ArgumentMatchers.anyInt"),
    ("anyLong(", "static org.mockito.ArgumentMatchers.anyLong"),
    ("anyString(", "static org.mockito.ArgumentMatchers.anyString"),
    ("eq(", "static org.mockito.ArgumentMatchers.eq"),
];

/// `java.lang` types never need an import, even if the project shadows them.
const JAVA_LANG: &[&str] = &[
    "ArithmeticException",
    "AssertionError",
    "Boolean",
    "Byte",
    "CharSequence",
    "Character",
    "Class",
    "ClassCastException",
    "Comparable",
    "Deprecated",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "FunctionalInterface",
    "IllegalArgumentException",
    "IllegalStateException",
    "IndexOutOfBoundsException",
    "Integer",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "NumberFormatException",
    "Object",
    "Override",
    "Record",
    "Runnable",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "SuppressWarnings",
    "System",
    "Thread",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

/// Resolved imports plus the body they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImports {
    /// Import targets without the `import` keyword or `;`, e.g.
    /// `static org.mockito.Mockito.when`. Sorted, unique.
    pub imports: BTreeSet<String>,
    /// Generated code with fences, `package` and `import` lines removed.
    pub body: String,
}

impl ResolvedImports {
    /// `import X;` lines in lexicographic order.
    pub fn lines(&self) -> Vec<String> {
        self.imports.iter().map(|i| format!("import {i};")).collect()
    }
}

/// Separate the import lines a generated file already declares from the
/// rest of its text. `package` lines are dropped.
pub fn split_generated(text: &str) -> (BTreeSet<String>, String) {
    let mut declared = BTreeSet::new();
    let mut body_lines = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(target) = trimmed
            .strip_prefix("import ")
            .and_then(|rest| rest.strip_suffix(';'))
        {
            declared.insert(target.split_whitespace().collect::<Vec<_>>().join(" "));
        } else if trimmed.starts_with("package ") && trimmed.ends_with(';') {
            // The package line is always regenerated.
        } else {
            body_lines.push(line);
        }
    }

    let body = body_lines.join("\n").trim().to_string();
    (declared, body)
}

/// Compute the import set for generated test text.
pub fn resolve(
    generated: &str,
    package: &str,
    class_name: &str,
    index: &SymbolIndex,
) -> Result<ResolvedImports, SyntaxError> {
    let cleaned = strip_code_fences(generated);
    let (mut imports, body) = split_generated(&cleaned);

    imports.extend(FIXED_IMPORTS.iter().map(|s| (*s).to_string()));
    if !package.is_empty() {
        imports.insert(format!("{package}.{class_name}"));
    }

    for (keyword, target) in KEYWORD_IMPORTS {
        if contains_keyword(&body, keyword) {
            imports.insert((*target).to_string());
        }
    }

    let mut names = capitalized_identifiers(&body)?;
    names.extend(generic_arguments(&body)?);
    for name in &names {
        if name == class_name || name == "Test" || JAVA_LANG.contains(&name.as_str()) {
            continue;
        }
        if let Some(qualified) = index.resolve(name) {
            imports.insert(qualified.to_string());
        }
    }

    Ok(ResolvedImports { imports, body })
}

/// Find `keyword` in `text` where it is not glued to a longer identifier.
fn contains_keyword(text: &str, keyword: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let starts_ident = keyword.starts_with(is_ident);
    let ends_ident = keyword.ends_with(is_ident);

    text.match_indices(keyword).any(|(pos, _)| {
        let before_ok = !starts_ident
            || text[..pos]
                .chars()
                .next_back()
                .is_none_or(|c| !is_ident(c));
        let after_ok = !ends_ident
            || text[pos + keyword.len()..]
                .chars()
                .next()
                .is_none_or(|c| !is_ident(c));
        before_ok && after_ok
    })
}
