//! Test strategy selection from a file's structural facts.

use serde::Serialize;

use scribe_java::{SourceFacts, Stereotype, simple_type_name};

const PRIMITIVE_TYPES: &[&str] = &[
    "byte", "short", "int", "long", "float", "double", "boolean", "char",
];

const VALUE_TYPES: &[&str] = &[
    "Byte",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Boolean",
    "Character",
    "String",
    "CharSequence",
];

/// Why a file gets no test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Controller,
    EntryPoint,
    Repository,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Controller => "controller",
            Self::EntryPoint => "entry point",
            Self::Repository => "repository",
        })
    }
}

/// A field the generated test should replace with a mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockTarget {
    pub name: String,
    pub type_name: String,
}

/// How a file should be tested. Exactly one per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", content = "detail", rename_all = "snake_case")]
pub enum TestStrategy {
    /// No artifact is produced.
    Skip(SkipReason),
    /// Positive construction/getter/setter tests, no mocking.
    ModelStrategy,
    /// Mock the listed dependencies (may be empty for bare services).
    MockDependencyStrategy(Vec<MockTarget>),
    /// Direct tests without a mocking framework.
    PlainStrategy,
}

impl TestStrategy {
    pub fn uses_mocking(&self) -> bool {
        matches!(self, Self::MockDependencyStrategy(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    pub fn mock_targets(&self) -> &[MockTarget] {
        match self {
            Self::MockDependencyStrategy(targets) => targets,
            _ => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Skip(_) => "skip",
            Self::ModelStrategy => "model",
            Self::MockDependencyStrategy(_) => "mock",
            Self::PlainStrategy => "plain",
        }
    }
}

/// True for primitives, boxed primitives and text types.
pub fn is_value_type(type_name: &str) -> bool {
    let simple = simple_type_name(type_name);
    PRIMITIVE_TYPES.contains(&simple) || VALUE_TYPES.contains(&simple)
}

/// Pick the strategy for one file. Rules are evaluated in order; the first
/// match wins.
pub fn classify(facts: &SourceFacts) -> TestStrategy {
    match facts.stereotype {
        Stereotype::Controller => return TestStrategy::Skip(SkipReason::Controller),
        Stereotype::EntryPoint => return TestStrategy::Skip(SkipReason::EntryPoint),
        Stereotype::Repository => return TestStrategy::Skip(SkipReason::Repository),
        Stereotype::Model => return TestStrategy::ModelStrategy,
        Stereotype::Service | Stereotype::Plain => {}
    }

    let targets: Vec<MockTarget> = facts
        .fields
        .iter()
        .filter(|f| !is_value_type(&f.type_name))
        .map(|f| MockTarget {
            name: f.name.clone(),
            type_name: f.type_name.clone(),
        })
        .collect();

    if !targets.is_empty() || facts.stereotype == Stereotype::Service || facts.persistence_access
    {
        TestStrategy::MockDependencyStrategy(targets)
    } else {
        TestStrategy::PlainStrategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn facts_of(source: &str) -> SourceFacts {
        scribe_java::analyze(source).unwrap()
    }

    #[test]
    fn gateway_field_becomes_mock_target() {
        let facts = facts_of(
            "package com.acme.pay;\n\npublic class PaymentValidator {\n    private PaymentGateway gateway;\n\n    public Boolean isValid(String input) {\n        return gateway.accepts(input);\n    }\n}\n",
        );
        let strategy = classify(&facts);
        assert_eq!(
            strategy,
            TestStrategy::MockDependencyStrategy(vec![MockTarget {
                name: "gateway".into(),
                type_name: "PaymentGateway".into(),
            }])
        );
        assert!(strategy.uses_mocking());
    }

    #[test]
    fn pojo_gets_model_strategy_without_mocks() {
        let facts = facts_of(
            "package com.acme.model;\n\npublic class Point {\n    private int x;\n    private int y;\n\n    public int getX() { return x; }\n    public void setX(int x) { this.x = x; }\n    public int getY() { return y; }\n    public void setY(int y) { this.y = y; }\n}\n",
        );
        let strategy = classify(&facts);
        assert_eq!(strategy, TestStrategy::ModelStrategy);
        assert!(!strategy.uses_mocking());
        assert!(strategy.mock_targets().is_empty());
    }

    #[test]
    fn skips_controllers_entry_points_and_repositories() {
        let controller = facts_of(
            "@RestController\npublic class MathController {\n    public int add(int a, int b) { return a + b; }\n}\n",
        );
        assert_eq!(
            classify(&controller),
            TestStrategy::Skip(SkipReason::Controller)
        );

        let app = facts_of(
            "public class App {\n    public static void main(String[] args) {}\n}\n",
        );
        assert_eq!(classify(&app), TestStrategy::Skip(SkipReason::EntryPoint));

        let repo = facts_of(
            "public interface UserRepository extends JpaRepository<User, Long> {\n    List<User> findByName(String name);\n}\n",
        );
        assert_eq!(classify(&repo), TestStrategy::Skip(SkipReason::Repository));
    }

    #[test]
    fn service_without_fields_still_mocks() {
        let facts = facts_of(
            "@Service\npublic class MathService {\n    public int add(int a, int b) { return a + b; }\n}\n",
        );
        assert_eq!(
            classify(&facts),
            TestStrategy::MockDependencyStrategy(vec![])
        );
    }

    #[test]
    fn persistence_access_forces_mocking() {
        let facts = facts_of(
            "public class ReportDao {\n    private final int pageSize = 50;\n\n    public int count(EntityManager em) { return 0; }\n}\n",
        );
        assert!(facts.persistence_access);
        assert!(classify(&facts).uses_mocking());
    }

    #[test]
    fn value_fields_give_plain_strategy() {
        let facts = facts_of(
            "public class Slugger {\n    private String separator = \"-\";\n    private int maxLength;\n\n    public String slug(String title) { return title; }\n}\n",
        );
        assert_eq!(classify(&facts), TestStrategy::PlainStrategy);
    }

    #[test]
    fn value_type_checks_ignore_generics_and_arrays() {
        assert!(is_value_type("int[]"));
        assert!(is_value_type("java.lang.String"));
        assert!(is_value_type("CharSequence"));
        assert!(!is_value_type("Optional<String>"));
        assert!(!is_value_type("List<Integer>"));
        assert!(!is_value_type("PaymentGateway"));
    }

    fn stereotype_strategy() -> impl Strategy<Value = Stereotype> {
        prop_oneof![
            Just(Stereotype::EntryPoint),
            Just(Stereotype::Controller),
            Just(Stereotype::Repository),
            Just(Stereotype::Service),
            Just(Stereotype::Model),
            Just(Stereotype::Plain),
        ]
    }

    proptest! {
        #[test]
        fn model_never_mocks(
            field_types in proptest::collection::vec("[A-Z][a-z]{1,8}", 0..6),
            persistence in any::<bool>(),
        ) {
            let facts = SourceFacts {
                stereotype: Stereotype::Model,
                persistence_access: persistence,
                fields: field_types
                    .iter()
                    .enumerate()
                    .map(|(i, t)| scribe_java::FieldDecl {
                        name: format!("f{i}"),
                        type_name: t.clone(),
                        visibility: scribe_java::Visibility::Private,
                    })
                    .collect(),
                ..SourceFacts::default()
            };
            let strategy = classify(&facts);
            prop_assert_eq!(&strategy, &TestStrategy::ModelStrategy);
            prop_assert!(strategy.mock_targets().is_empty());
        }

        #[test]
        fn excluded_stereotypes_always_skip(stereotype in stereotype_strategy()) {
            let facts = SourceFacts { stereotype, ..SourceFacts::default() };
            prop_assert_eq!(
                classify(&facts).is_skip(),
                stereotype.is_excluded() || stereotype == Stereotype::Repository
            );
        }
    }
}
