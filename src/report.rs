//! Aggregated run result and its renderings.

use crate::error::{Finding, StageResult};
use crate::linters::LinterReport;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Process exit status for a passing run.
pub const EXIT_PASSED: i32 = 0;
/// Process exit status when any stage reported error-severity findings.
pub const EXIT_FAILED: i32 = 1;

/// Markdown lists are truncated past this many items.
const MARKDOWN_LIST_LIMIT: usize = 100;

// ─── Stage ──────────────────────────────────────────────────────────────────

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lexical,
    Decode,
    Schema,
    Structural,
    Naming,
    Protocol,
    Security,
}

impl Stage {
    pub const ORDER: [Stage; 7] = [
        Stage::Lexical,
        Stage::Decode,
        Stage::Schema,
        Stage::Structural,
        Stage::Naming,
        Stage::Protocol,
        Stage::Security,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Lexical => "lexical",
            Stage::Decode => "decode",
            Stage::Schema => "schema",
            Stage::Structural => "structural",
            Stage::Naming => "naming",
            Stage::Protocol => "protocol",
            Stage::Security => "security",
        }
    }

    /// Heading printed above a failed stage's findings.
    pub fn heading(self) -> &'static str {
        match self {
            Stage::Lexical => "Formatting errors:",
            Stage::Decode => "YAML decode errors:",
            Stage::Schema => "Schema validation errors:",
            Stage::Structural => "Structural validation errors:",
            Stage::Naming => "Memory file naming validation errors:",
            Stage::Protocol => "Memory protocol compliance validation errors:",
            Stage::Security => "Security validation errors:",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── ValidationReport ───────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { stage: Stage },
}

/// Result of one pipeline run.
///
/// `errors` holds the findings of the single stage that failed, if any.
/// `warnings` holds advisory findings of every stage that ran, in stage order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub outcome: Outcome,
    pub stages_run: Vec<Stage>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        ValidationReport {
            target: None,
            outcome: Outcome::Passed,
            stages_run: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationReport {
    /// Record a stage that cannot produce findings.
    pub(crate) fn mark_run(&mut self, stage: Stage) {
        self.stages_run.push(stage);
    }

    /// Merge one stage's result. Returns `false` when the stage failed and
    /// the pipeline must stop.
    pub(crate) fn absorb(&mut self, stage: Stage, result: StageResult) -> bool {
        self.stages_run.push(stage);
        self.warnings.extend(result.warnings);
        if result.errors.is_empty() {
            return true;
        }
        self.errors = result.errors;
        self.outcome = Outcome::Failed { stage };
        false
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        match self.outcome {
            Outcome::Passed => None,
            Outcome::Failed { stage } => Some(stage),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() { EXIT_PASSED } else { EXIT_FAILED }
    }

    pub fn status(&self) -> &'static str {
        if self.passed() { "pass" } else { "fail" }
    }

    /// Human-readable rendering: failures to `err`, warnings and the
    /// confirmation line to `out`.
    pub fn write_text(&self, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<()> {
        if let Some(stage) = self.failed_stage() {
            writeln!(err, "{}", stage.heading())?;
            for finding in &self.errors {
                writeln!(err, "  {}", finding)?;
                if let Some(description) = &finding.context.description {
                    writeln!(err, "    {}", description)?;
                }
            }
        }

        if !self.warnings.is_empty() {
            writeln!(out, "Warnings:")?;
            for warning in &self.warnings {
                match (&warning.mode, &warning.context.pattern) {
                    (Some(mode), Some(pattern)) => {
                        writeln!(out, "  {}: {} ({})", mode, warning.issue, pattern)?
                    }
                    (Some(mode), None) => writeln!(out, "  {}: {}", mode, warning.issue)?,
                    (None, _) => writeln!(out, "  {}", warning.issue)?,
                }
                if let Some(description) = &warning.context.description {
                    writeln!(out, "    {}", description)?;
                }
            }
        }

        let target = self.target.as_deref().unwrap_or("<input>");
        match self.failed_stage() {
            None => writeln!(
                out,
                "OK: `{}` formatting, schema, structural, naming, protocol, and security validation passed.",
                target
            ),
            Some(stage) => writeln!(
                err,
                "FAILED: `{}` {} stage reported {} error(s).",
                target,
                stage,
                self.errors.len()
            ),
        }
    }
}

// ─── Summary snapshot ───────────────────────────────────────────────────────

/// Snapshot written for downstream tooling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    pub timestamp: String,
    pub project_root: String,
    pub target: String,
    pub status: String,
    pub report: ValidationReport,
    pub linters: Vec<LinterReport>,
}

impl Summary {
    /// Overall status also fails when an external linter failed.
    pub fn new(project_root: &Path, target: &Path, report: ValidationReport, linters: Vec<LinterReport>) -> Self {
        let linters_ok = linters.iter().all(LinterReport::is_ok);
        let status = if report.passed() && linters_ok { "pass" } else { "fail" };
        Summary {
            timestamp: now_utc_rfc3339(),
            project_root: project_root.display().to_string(),
            target: target.display().to_string(),
            status: status.to_string(),
            report,
            linters,
        }
    }

    pub fn to_markdown(&self) -> String {
        use std::fmt::Write as _;
        let mut md = String::new();
        let _ = writeln!(md, "# Mode Validation Summary\n");
        let _ = writeln!(md, "- **Timestamp (UTC):** {}", self.timestamp);
        let _ = writeln!(md, "- **Target:** `{}`", md_escape(&self.target));
        let _ = writeln!(md, "- **Status:** **{}**", self.status.to_uppercase());
        match self.report.failed_stage() {
            None => {
                let _ = writeln!(md, "- **Validation:** passed");
            }
            Some(stage) => {
                let _ = writeln!(md, "- **Validation:** failed at {} stage", stage);
            }
        }
        for linter in &self.linters {
            let _ = writeln!(md, "- **{}:** {}", linter.name, linter.summary_line());
        }
        md.push_str("\n---\n\n");

        if let Some(stage) = self.report.failed_stage() {
            let _ = writeln!(md, "## {} Errors\n", capitalize(stage.as_str()));
            write_md_list(&mut md, self.report.errors.iter().map(Finding::to_string));
        }
        if !self.report.warnings.is_empty() {
            md.push_str("## Warnings\n\n");
            write_md_list(&mut md, self.report.warnings.iter().map(Finding::to_string));
        }
        for linter in &self.linters {
            if linter.findings.is_empty() {
                continue;
            }
            let _ = writeln!(md, "## {} Findings\n", linter.name);
            write_md_list(
                &mut md,
                linter
                    .findings
                    .iter()
                    .map(|f| format!("**{}** {}", f.level, f.message)),
            );
        }
        md
    }
}

/// Pointer record for the consumer that acts on a validation result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub receiver_slug: String,
    pub handoff_type: String,
    pub summary_json: String,
    pub summary_md: String,
    pub status: String,
    pub timestamp: String,
}

/// Files produced by [`write_summary`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryPaths {
    pub summary_json: PathBuf,
    pub summary_md: PathBuf,
    pub handoff: PathBuf,
}

/// Write `mode_validation_summary.{json,md}` into `reports_dir` and the
/// handoff record into `handoff_dir`. Handoff paths are relative to `root`
/// when possible.
pub fn write_summary(
    summary: &Summary,
    root: &Path,
    reports_dir: &Path,
    handoff_dir: &Path,
) -> io::Result<SummaryPaths> {
    std::fs::create_dir_all(reports_dir)?;
    std::fs::create_dir_all(handoff_dir)?;

    let json_path = reports_dir.join("mode_validation_summary.json");
    let md_path = reports_dir.join("mode_validation_summary.md");
    let handoff_path = handoff_dir.join("mode_validation_handoff.json");

    std::fs::write(&json_path, serde_json::to_string_pretty(summary).map_err(io::Error::other)?)?;
    std::fs::write(&md_path, summary.to_markdown())?;

    let relative = |p: &Path| {
        p.strip_prefix(root)
            .unwrap_or(p)
            .display()
            .to_string()
    };
    let handoff = Handoff {
        receiver_slug: "mode-writer".to_string(),
        handoff_type: "mode_validation_result".to_string(),
        summary_json: relative(&json_path),
        summary_md: relative(&md_path),
        status: summary.status.clone(),
        timestamp: summary.timestamp.clone(),
    };
    std::fs::write(&handoff_path, serde_json::to_string_pretty(&handoff).map_err(io::Error::other)?)?;

    tracing::info!(path = %json_path.display(), "wrote validation summary");
    Ok(SummaryPaths {
        summary_json: json_path,
        summary_md: md_path,
        handoff: handoff_path,
    })
}

/// Current UTC time as RFC 3339 with whole seconds, e.g. `2025-01-31T09:15:00Z`.
pub fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn md_escape(s: &str) -> String {
    s.replace('<', "\\<").replace('>', "\\>")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_md_list(md: &mut String, items: impl ExactSizeIterator<Item = String>) {
    use std::fmt::Write as _;
    let total = items.len();
    for item in items.take(MARKDOWN_LIST_LIMIT) {
        let _ = writeln!(md, "- {}", md_escape(item.trim()));
    }
    if total > MARKDOWN_LIST_LIMIT {
        let _ = writeln!(md, "\n(+{} more)", total - MARKDOWN_LIST_LIMIT);
    }
    md.push('\n');
}
