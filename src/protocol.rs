//! Lifecycle protocol compliance.
//!
//! Every mode's instructions must carry the full set of lifecycle markers,
//! and its companion directory must hold the memory file and a workflow that
//! names the consultation phase.

use crate::companion::CompanionResolver;
use crate::config::ValidatorConfig;
use crate::error::{Finding, StageResult};
use crate::types::{Mode, ModeDocument};

/// Markers and companion files the protocol stage looks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolRules {
    pub required_markers: Vec<String>,
    pub memory_file: String,
    pub workflow_file: String,
    pub workflow_marker: String,
}

impl ProtocolRules {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        ProtocolRules {
            required_markers: config.required_markers.clone(),
            memory_file: config.memory_file.clone(),
            workflow_file: config.workflow_file.clone(),
            workflow_marker: config.workflow_marker.clone(),
        }
    }

    /// Required markers absent from `instructions`, in declaration order.
    pub fn missing_markers<'a>(&'a self, instructions: &str) -> Vec<&'a str> {
        self.required_markers
            .iter()
            .map(String::as_str)
            .filter(|marker| !instructions.contains(marker))
            .collect()
    }
}

pub fn check(doc: &ModeDocument, resolver: &dyn CompanionResolver, rules: &ProtocolRules) -> StageResult {
    let mut result = StageResult::default();
    for mode in &doc.custom_modes {
        check_mode(mode, resolver, rules, &mut result);
    }
    result
}

fn check_mode(
    mode: &Mode,
    resolver: &dyn CompanionResolver,
    rules: &ProtocolRules,
    result: &mut StageResult,
) {
    let slug = mode.slug.as_str();

    let missing = rules.missing_markers(&mode.custom_instructions);
    if !missing.is_empty() {
        result.push(
            Finding::critical(
                slug,
                format!("Missing memory protocol elements: {}", missing.join(", ")),
            )
            .with_description(
                "Mode must have complete memory protocol checkpoints in customInstructions",
            ),
        );
    }

    let files = match resolver.list(slug) {
        Ok(Some(files)) => files,
        Ok(None) => {
            result.push(
                Finding::warning(
                    slug,
                    format!("Missing mode rules directory: {}", resolver.dir_label(slug)),
                )
                .with_description(
                    "Mode should have corresponding rules directory with workflow and memory files",
                ),
            );
            return;
        }
        Err(e) => {
            tracing::warn!(mode = slug, error = %e, "could not list companion directory");
            result.push(Finding::warning(
                slug,
                format!(
                    "Could not list mode rules directory {}: {}",
                    resolver.dir_label(slug),
                    e
                ),
            ));
            return;
        }
    };

    if !files.iter().any(|f| *f == rules.memory_file) {
        result.push(
            Finding::error(
                slug,
                format!("Missing corresponding {} file", rules.memory_file),
            )
            .with_description(format!(
                "Expected file: {}/{}",
                resolver.dir_label(slug),
                rules.memory_file
            )),
        );
    }

    if !files.iter().any(|f| *f == rules.workflow_file) {
        return;
    }
    match resolver.read(slug, &rules.workflow_file) {
        Ok(Some(content)) => {
            if !content.contains(&rules.workflow_marker) {
                result.push(
                    Finding::warning(
                        slug,
                        format!(
                            "Workflow file missing {} phase",
                            rules.workflow_marker.to_lowercase()
                        ),
                    )
                    .with_description(format!(
                        "{} should include Phase 0: {}",
                        rules.workflow_file, rules.workflow_marker
                    )),
                );
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(mode = slug, error = %e, "could not read workflow file");
            result.push(
                Finding::warning(slug, format!("Could not read workflow file: {}", e))
                    .with_description(format!("Ensure {} is readable", rules.workflow_file)),
            );
        }
    }
}
