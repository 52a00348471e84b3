use super::common;
use modeguard::companion::MemoryCompanionResolver;
use modeguard::error::{Finding, Severity};
use modeguard::report::Stage;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn suite_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pipeline_suite.yaml")
}

/// A single pipeline test case from the suite.
#[derive(Debug, serde::Deserialize)]
struct TestCase {
    id: String,
    name: String,
    input: String,
    #[serde(default)]
    companions: BTreeMap<String, Vec<String>>,
    expected: Expected,
}

#[derive(Debug, serde::Deserialize)]
struct Expected {
    outcome: String,
    #[serde(default)]
    stage: Option<Stage>,
    #[serde(default)]
    error_count: Option<usize>,
    #[serde(default)]
    warnings: Option<usize>,
    #[serde(default)]
    errors: Vec<ExpectedFinding>,
}

#[derive(Debug, serde::Deserialize)]
struct ExpectedFinding {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    location: Option<String>,
    severity: Severity,
    #[serde(default)]
    issue: Option<String>,
}

impl ExpectedFinding {
    fn matches(&self, actual: &Finding) -> bool {
        actual.severity == self.severity
            && self.mode.as_ref().is_none_or(|m| actual.mode.as_ref() == Some(m))
            && self
                .location
                .as_ref()
                .is_none_or(|l| actual.context.location.as_ref() == Some(l))
            && self.issue.as_ref().is_none_or(|i| actual.issue == *i)
    }
}

fn resolver(companions: &BTreeMap<String, Vec<String>>) -> MemoryCompanionResolver {
    if companions.is_empty() {
        return MemoryCompanionResolver::without_tree();
    }
    companions
        .iter()
        .fold(MemoryCompanionResolver::new(), |resolver, (slug, files)| {
            files.iter().fold(resolver, |r, file| r.with_file(slug, file, common::WORKFLOW))
        })
}

#[test]
fn pipeline_suite() {
    let content = std::fs::read_to_string(suite_path()).expect("read suite fixture");
    let cases: Vec<TestCase> = serde_saphyr::from_str(&content).expect("parse suite fixture");
    assert!(!cases.is_empty(), "suite has no cases");

    let pipeline = common::pipeline();
    let mut failures = Vec::new();

    for case in &cases {
        let report = match pipeline.run(&case.input, &resolver(&case.companions)) {
            Ok(report) => report,
            Err(e) => {
                failures.push(format!("{} ({}): fatal error: {}", case.id, case.name, e));
                continue;
            }
        };

        let expect_pass = case.expected.outcome == "pass";
        if report.passed() != expect_pass {
            failures.push(format!(
                "{} ({}): expected {}, got {:?} with errors {:?}",
                case.id, case.name, case.expected.outcome, report.outcome, report.errors
            ));
            continue;
        }
        if report.failed_stage() != case.expected.stage {
            failures.push(format!(
                "{} ({}): expected stage {:?}, got {:?}",
                case.id,
                case.name,
                case.expected.stage,
                report.failed_stage()
            ));
        }
        if let Some(count) = case.expected.error_count
            && report.errors.len() != count
        {
            failures.push(format!(
                "{} ({}): expected {} errors, got {:?}",
                case.id, case.name, count, report.errors
            ));
        }
        if let Some(count) = case.expected.warnings
            && report.warnings.len() != count
        {
            failures.push(format!(
                "{} ({}): expected {} warnings, got {:?}",
                case.id, case.name, count, report.warnings
            ));
        }
        for expected in &case.expected.errors {
            if !report.errors.iter().any(|actual| expected.matches(actual)) {
                failures.push(format!(
                    "{} ({}): no error matching {:?} in {:?}",
                    case.id, case.name, expected, report.errors
                ));
            }
        }
    }

    assert!(failures.is_empty(), "suite failures:\n{}", failures.join("\n"));
}
