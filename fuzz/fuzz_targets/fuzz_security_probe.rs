#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modeguard::baseline::SecurityBaseline;
use modeguard::config::ValidatorConfig;
use modeguard::security::{self, SecurityRules};
use modeguard::types::{CapabilityGroup, GroupOptions, Mode, ModeDocument};

#[derive(Debug, Arbitrary)]
struct Input {
    file_regex: String,
    probe_paths: Vec<String>,
}

fuzz_target!(|input: Input| {
    let Ok(baseline) = SecurityBaseline::builtin() else {
        return;
    };
    let config = ValidatorConfig {
        probe_paths: input.probe_paths,
        ..Default::default()
    };
    let doc = ModeDocument {
        custom_modes: vec![Mode {
            slug: "fuzz".into(),
            groups: vec![CapabilityGroup::Parameterized {
                name: "edit".into(),
                options: GroupOptions {
                    file_regex: Some(input.file_regex),
                    ..Default::default()
                },
            }],
            ..Default::default()
        }],
    };

    // Arbitrary patterns must yield findings, never a panic.
    let result = security::check(&doc, &baseline, &SecurityRules::from_config(&config));
    assert!(result.errors.iter().all(|f| f.severity.is_error()));
});
