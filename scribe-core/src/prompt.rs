// Prompt construction for test generation. Pure: the same request and
// failure history always produce the same text.

use std::fmt::Write as _;

use scribe_java::SourceFacts;

use crate::strategy::TestStrategy;

/// The per-file inputs that stay fixed across repair attempts.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub strategy: &'a TestStrategy,
    pub facts: &'a SourceFacts,
    /// Class under test.
    pub class_name: &'a str,
    /// Name the generated test class must have.
    pub test_class: &'a str,
    pub source: &'a str,
}

/// Heading that introduces each prior verification failure.
pub const REPAIR_HEADING: &str = "Fix compilation errors:";

/// Build the generation prompt.
///
/// `failures` holds the verification logs of earlier attempts, oldest first;
/// each is appended verbatim after the base instructions.
pub fn build_prompt(request: &PromptRequest<'_>, failures: &[String]) -> String {
    let mut out = String::new();
    let uses_mocking = request.strategy.uses_mocking();
    let is_model = matches!(request.strategy, TestStrategy::ModelStrategy);

    let _ = writeln!(
        out,
        "Write a FULLY COMPILABLE JUnit 5 test class named {} for the following Java class {}.",
        request.test_class, request.class_name
    );
    out.push_str("STRICT RULES:\n");
    out.push_str("1. Use ONLY the methods listed here:\n");
    for line in method_lines(request.facts) {
        out.push_str(&line);
        out.push('\n');
    }
    let _ = writeln!(out, "2. Mockito usage allowed: {uses_mocking}");
    out.push_str("3. Instantiate POJO fields normally; mock only real object dependencies.\n");
    out.push_str("4. For Optional<T>, always check isPresent() before calling get().\n");
    out.push_str("5. For List/Iterable, always check iterator().hasNext().\n");
    out.push_str("6. Generate positive test cases for all methods.\n");
    if is_model {
        out.push_str(
            "7. Do NOT create negative tests expecting exceptions (like NullPointerException). \
             Test getters/setters only with valid values.\n",
        );
    } else if uses_mocking {
        out.push_str(
            "7. Mock only service/repository/other object dependencies, \
             not fields of primitive/wrapper types.\n",
        );
    } else {
        out.push_str("7. Do not use any mocking framework; call the class directly.\n");
    }

    out.push_str("Dependencies to mock:\n");
    let targets = request.strategy.mock_targets();
    if targets.is_empty() {
        out.push_str("None\n");
    } else {
        for target in targets {
            let _ = writeln!(out, "{}: {}", target.name, target.type_name);
        }
    }

    out.push_str("===== SOURCE =====\n");
    out.push_str(request.source.trim_end());
    out.push('\n');
    out.push_str("===== END SOURCE =====\n");
    out.push_str("Write only valid Java code (class body). Do not include package or import lines.\n");

    for log in failures {
        out.push('\n');
        out.push_str(REPAIR_HEADING);
        out.push('\n');
        out.push_str(log);
        if !log.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}

/// `- name -> ReturnType` for each public method, in declaration order.
pub fn method_lines(facts: &SourceFacts) -> Vec<String> {
    facts
        .methods
        .iter()
        .map(|m| format!("- {} -> {}", m.name, m.return_type))
        .collect()
}
