use modeguard::companion::{FsCompanionResolver, MemoryCompanionResolver};
use modeguard::config::ValidatorConfig;
use modeguard::pipeline::Pipeline;
use modeguard::report::ValidationReport;
use std::path::{Path, PathBuf};

/// Instructions that carry every lifecycle marker.
pub const PROTOCOL_INSTRUCTIONS: &str = "MANDATORY MEMORY PROTOCOL
PRE-FLIGHT: run memory:search_nodes for the task
POST-FLIGHT:
Write: Observation envelope
Link: Relations
Confirm: List entity IDs";

pub const WORKFLOW: &str = "# Workflow\n\n## Phase 0: Memory Consultation\n\nSearch first.\n";

/// Render one mode entry. `groups` are YAML items written on one line each,
/// e.g. `read` or `['edit', {fileRegex: '^docs/.*\.md$'}]`.
pub fn mode_entry(slug: &str, groups: &[&str], instructions: &str) -> String {
    let mut yaml = format!("  - slug: {slug}\n    name: {slug}\n    groups:\n");
    for group in groups {
        yaml.push_str(&format!("      - {group}\n"));
    }
    if !instructions.is_empty() {
        yaml.push_str("    customInstructions: |\n");
        for line in instructions.lines() {
            yaml.push_str(&format!("      {line}\n"));
        }
    }
    yaml
}

pub fn document(entries: &[String]) -> String {
    if entries.is_empty() {
        return "customModes: []\n".to_string();
    }
    format!("customModes:\n{}", entries.concat())
}

/// A mode that passes every stage given compliant companions.
pub fn compliant_mode(slug: &str) -> String {
    mode_entry(
        slug,
        &["read", r"['edit', {fileRegex: '^docs/.*\.md$'}]"],
        PROTOCOL_INSTRUCTIONS,
    )
}

/// In-memory companions holding the memory file and workflow for each slug.
pub fn compliant_companions(slugs: &[&str]) -> MemoryCompanionResolver {
    slugs.iter().fold(MemoryCompanionResolver::new(), |resolver, slug| {
        resolver
            .with_file(slug, "40-memory-io.md", "# Memory IO\n")
            .with_file(slug, "10-workflow.md", WORKFLOW)
    })
}

pub fn pipeline() -> Pipeline {
    Pipeline::builtin(&ValidatorConfig::default()).expect("builtin pipeline")
}

pub fn run(yaml: &str, companions: &MemoryCompanionResolver) -> ValidationReport {
    pipeline().run(yaml, companions).expect("not fatal")
}

/// A project tree on disk.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new(roomodes: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(".roomodes"), roomodes).expect("write .roomodes");
        Project { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn roomodes(&self) -> PathBuf {
        self.root().join(".roomodes")
    }

    pub fn write(&self, relative: &str, contents: &str) -> &Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, contents).expect("write file");
        self
    }

    pub fn companion(&self, slug: &str, file: &str, contents: &str) -> &Self {
        self.write(&format!(".roo/rules/rules-{slug}/{file}"), contents)
    }

    pub fn compliant_companions(&self, slug: &str) -> &Self {
        self.companion(slug, "40-memory-io.md", "# Memory IO\n")
            .companion(slug, "10-workflow.md", WORKFLOW)
    }

    pub fn resolver(&self) -> FsCompanionResolver {
        FsCompanionResolver::new(self.root().join(".roo/rules"), "rules-")
    }
}
