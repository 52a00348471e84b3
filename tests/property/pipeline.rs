use modeguard::companion::MemoryCompanionResolver;
use modeguard::config::ValidatorConfig;
use modeguard::error::Severity;
use modeguard::pipeline::Pipeline;
use modeguard::report::Stage;
use proptest::prelude::*;

const MARKERS: &str = "MANDATORY MEMORY PROTOCOL; PRE-FLIGHT: memory:search_nodes; \
POST-FLIGHT: Write: Observation envelope, Link: Relations, Confirm: List entity IDs";

fn arb_slug() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}(-[a-z0-9]{1,4}){0,2}"
}

/// `fileRegex` values drawn from safe and unsafe shapes.
fn arb_file_regex() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(r"^docs/.*\.md$".to_string()),
        Just(r"^src/.*".to_string()),
        Just(r"^src/auth/.*$".to_string()),
        Just(r"^(?!.*secret).*$".to_string()),
        Just(r"^lib/[a-z]+\.ts$".to_string()),
        Just(r"^(src|lib)/(".to_string()),
        "[a-z/]{1,10}",
    ]
}

/// One capability entry rendered as a single flow-style YAML item.
fn arb_group() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("read".to_string()),
        Just("edit".to_string()),
        Just("command".to_string()),
        arb_file_regex().prop_map(|re| format!("['edit', {{fileRegex: '{}'}}]", re)),
    ]
}

fn arb_mode() -> impl Strategy<Value = (String, Vec<String>, bool)> {
    (arb_slug(), prop::collection::vec(arb_group(), 0..4), any::<bool>())
}

fn render(modes: &[(String, Vec<String>, bool)]) -> String {
    if modes.is_empty() {
        return "customModes: []\n".to_string();
    }
    let mut yaml = "customModes:\n".to_string();
    for (slug, groups, with_markers) in modes {
        // Quoted so slugs like `y` or `null` stay strings.
        yaml.push_str(&format!("  - slug: \"{slug}\"\n    name: \"{slug}\"\n    groups:"));
        if groups.is_empty() {
            yaml.push_str(" []\n");
        } else {
            yaml.push('\n');
            for group in groups {
                yaml.push_str(&format!("      - {group}\n"));
            }
        }
        if *with_markers {
            yaml.push_str(&format!("    customInstructions: \"{MARKERS}\"\n"));
        }
    }
    yaml
}

fn companions(modes: &[(String, Vec<String>, bool)]) -> MemoryCompanionResolver {
    modes.iter().fold(MemoryCompanionResolver::new(), |r, (slug, _, _)| {
        r.with_file(slug, "40-memory-io.md", "")
            .with_file(slug, "10-workflow.md", "Phase 0: Memory Consultation")
    })
}

fn pipeline() -> Pipeline {
    Pipeline::builtin(&ValidatorConfig::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Same input and companions always yield the same report.
    #[test]
    fn runs_are_idempotent(modes in prop::collection::vec(arb_mode(), 0..4)) {
        let yaml = render(&modes);
        let resolver = companions(&modes);
        let pipeline = pipeline();
        let first = pipeline.run(&yaml, &resolver).unwrap();
        let second = pipeline.run(&yaml, &resolver).unwrap();
        prop_assert_eq!(first, second);
    }

    // Only the failing stage contributes errors, and nothing runs after it.
    #[test]
    fn failure_is_confined_to_one_stage(modes in prop::collection::vec(arb_mode(), 0..4)) {
        let report = pipeline().run(&render(&modes), &companions(&modes)).unwrap();
        match report.failed_stage() {
            None => prop_assert!(report.errors.is_empty()),
            Some(stage) => {
                prop_assert!(!report.errors.is_empty());
                prop_assert_eq!(report.stages_run.last(), Some(&stage));
                prop_assert!(report.errors.iter().all(|f| f.severity.is_error()));
            }
        }
        prop_assert!(report.warnings.iter().all(|f| !f.severity.is_error()));
    }

    // Two parameterized edit entries yield exactly one critical structural finding.
    #[test]
    fn double_edit_is_one_critical(
        slug in arb_slug(),
        first in arb_file_regex(),
        second in arb_file_regex(),
    ) {
        let groups = vec![
            format!("['edit', {{fileRegex: '{}'}}]", first),
            format!("['edit', {{fileRegex: '{}'}}]", second),
        ];
        let modes = vec![(slug.clone(), groups, false)];
        let report = pipeline().run(&render(&modes), &companions(&modes)).unwrap();

        prop_assert_eq!(report.failed_stage(), Some(Stage::Structural));
        prop_assert_eq!(report.errors.len(), 1);
        prop_assert_eq!(report.errors[0].severity, Severity::Critical);
        prop_assert_eq!(report.errors[0].mode.as_deref(), Some(slug.as_str()));
        prop_assert!(!report.stages_run.contains(&Stage::Security));
    }
}
