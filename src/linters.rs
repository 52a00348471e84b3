//! Optional third-party linters run alongside the built-in stages.
//!
//! A linter that is not on `PATH` is skipped with a hint; it never fails the
//! run. Findings are parsed from each tool's machine-readable output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

/// How a linter's stdout is turned into findings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// `file:line:col: [level] message  (rule)` per line.
    Parsable,
    /// A JSON array of issue objects.
    JsonArray,
    /// Exit status only.
    ExitCode,
    /// `opa eval` JSON; every message in the queried `deny` set is an error.
    OpaDeny,
}

/// What the linter is pointed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinterInput {
    /// The configuration path, appended after the arguments.
    Target,
    /// The decoded document wrapped as `{"roomodes": ...}` in a temporary
    /// JSON file, substituted for `{input}`.
    WrappedJson,
}

/// Invocation recipe for one external linter.
#[derive(Clone, Debug)]
pub struct ExternalLinter {
    pub name: &'static str,
    pub program: &'static str,
    /// Arguments before the target; `{config}` is replaced by the config path.
    pub args: &'static [&'static str],
    /// Config file name inside the tools directory.
    pub config_file: &'static str,
    pub format: OutputFormat,
    pub input: LinterInput,
    pub install_hint: &'static str,
}

const CONFIG_PLACEHOLDER: &str = "{config}";
const INPUT_PLACEHOLDER: &str = "{input}";

pub const YAMLLINT: ExternalLinter = ExternalLinter {
    name: "yamllint",
    program: "yamllint",
    args: &["-c", CONFIG_PLACEHOLDER, "-f", "parsable"],
    config_file: "yamllint.yaml",
    format: OutputFormat::Parsable,
    input: LinterInput::Target,
    install_hint: "Install with: pip install yamllint",
};

pub const SPECTRAL: ExternalLinter = ExternalLinter {
    name: "spectral",
    program: "spectral",
    args: &["lint", "-r", CONFIG_PLACEHOLDER, "-f", "json"],
    config_file: "spectral.yaml",
    format: OutputFormat::JsonArray,
    input: LinterInput::Target,
    install_hint: "Install with: npm i -g @stoplight/spectral-cli",
};

pub const CONFTEST: ExternalLinter = ExternalLinter {
    name: "conftest",
    program: "conftest",
    args: &["test", "-p", CONFIG_PLACEHOLDER],
    config_file: "conftest-policy.yaml",
    format: OutputFormat::ExitCode,
    input: LinterInput::Target,
    install_hint: "Install with: go install github.com/open-policy-agent/conftest@latest",
};

pub const OPA: ExternalLinter = ExternalLinter {
    name: "opa",
    program: "opa",
    args: &[
        "eval",
        "--format",
        "json",
        "--data",
        CONFIG_PLACEHOLDER,
        "--input",
        INPUT_PLACEHOLDER,
        "data.security.deny",
    ],
    config_file: "security_policy.rego",
    format: OutputFormat::OpaDeny,
    input: LinterInput::WrappedJson,
    install_hint: "Install from: https://www.openpolicyagent.org/docs/latest/#running-opa",
};

pub const ALL: [ExternalLinter; 4] = [YAMLLINT, SPECTRAL, CONFTEST, OPA];

/// One parsed linter message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterFinding {
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterReport {
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub errors: usize,
    pub warnings: usize,
    pub findings: Vec<LinterFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl LinterReport {
    fn skipped(linter: &ExternalLinter) -> Self {
        LinterReport {
            name: linter.name.to_string(),
            available: false,
            exit_code: None,
            errors: 0,
            warnings: 0,
            findings: Vec::new(),
            hint: Some(linter.install_hint.to_string()),
        }
    }

    /// Skipped linters never fail a run.
    pub fn is_ok(&self) -> bool {
        !self.available || (self.exit_code == Some(0) && self.errors == 0)
    }

    pub fn summary_line(&self) -> String {
        if !self.available {
            return "not available".to_string();
        }
        format!("{} errors, {} warnings", self.errors, self.warnings)
    }
}

impl ExternalLinter {
    /// Run against `target`, or skip when the program is not on `PATH`.
    pub fn run(&self, tools_dir: &Path, target: &Path) -> io::Result<LinterReport> {
        let Some(program) = find_on_path(self.program) else {
            tracing::warn!(linter = self.name, hint = self.install_hint, "linter not found; skipping");
            return Ok(LinterReport::skipped(self));
        };

        let config = tools_dir.join(self.config_file);
        // Held until the linter exits; the file is removed on drop.
        let input = match self.input {
            LinterInput::Target => None,
            LinterInput::WrappedJson => Some(wrapped_json_input(target)?),
        };
        let args = self.args.iter().map(|arg| match *arg {
            CONFIG_PLACEHOLDER => config.as_os_str().to_owned(),
            INPUT_PLACEHOLDER => input
                .as_ref()
                .map(|file| file.path().as_os_str().to_owned())
                .unwrap_or_else(|| target.as_os_str().to_owned()),
            other => other.into(),
        });

        let mut command = Command::new(&program);
        command.args(args);
        if self.input == LinterInput::Target {
            command.arg(target);
        }
        tracing::debug!(linter = self.name, program = %program.display(), "running linter");
        let output = command.output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = match self.format {
            OutputFormat::Parsable => parse_parsable(&stdout),
            OutputFormat::JsonArray => parse_json_array(&stdout),
            OutputFormat::ExitCode => Vec::new(),
            OutputFormat::OpaDeny => parse_opa_deny(&stdout),
        };
        let mut errors = findings.iter().filter(|f| f.level == "error").count();
        let warnings = findings.iter().filter(|f| f.level == "warning").count();
        let exit_code = output.status.code();
        if self.format == OutputFormat::ExitCode && exit_code != Some(0) {
            errors += 1;
        }

        Ok(LinterReport {
            name: self.name.to_string(),
            available: true,
            exit_code,
            errors,
            warnings,
            findings,
            hint: None,
        })
    }
}

/// Run every known linter. A linter that fails to launch is logged and
/// reported as unavailable.
pub fn run_all(tools_dir: &Path, target: &Path) -> Vec<LinterReport> {
    ALL.iter()
        .map(|linter| {
            linter.run(tools_dir, target).unwrap_or_else(|e| {
                tracing::warn!(linter = linter.name, error = %e, "linter failed to start");
                LinterReport::skipped(linter)
            })
        })
        .collect()
}

/// Decode `target` and write it as `{"roomodes": <document>}` JSON.
fn wrapped_json_input(target: &Path) -> io::Result<NamedTempFile> {
    let raw = std::fs::read_to_string(target)?;
    let doc = crate::parse::parse(&raw).map_err(io::Error::other)?;
    let mut file = tempfile::Builder::new()
        .prefix("modeguard-input-")
        .suffix(".json")
        .tempfile()?;
    serde_json::to_writer(&mut file, &serde_json::json!({ "roomodes": doc }))?;
    file.flush()?;
    Ok(file)
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Parse yamllint `-f parsable` lines.
pub fn parse_parsable(stdout: &str) -> Vec<LinterFinding> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let level = ["error", "warning", "info"]
                .into_iter()
                .find(|lvl| line.contains(&format!(" [{}] ", lvl)))
                .unwrap_or("info");
            let (body, rule) = match line.rsplit_once("  (") {
                Some((body, rule)) if line.ends_with(')') => {
                    (body, Some(rule.trim_end_matches(')').to_string()))
                }
                _ => (line, None),
            };
            let message = body
                .split_once("] ")
                .map(|(_, msg)| msg)
                .unwrap_or(body)
                .to_string();
            LinterFinding {
                level: level.to_string(),
                message,
                rule,
            }
        })
        .collect()
}

/// Parse spectral `-f json` output. Non-JSON output becomes one info
/// finding per line. Spectral severities 0 and 1 map to error and warning.
pub fn parse_json_array(stdout: &str) -> Vec<LinterFinding> {
    match serde_json::from_str::<Vec<serde_json::Value>>(stdout) {
        Ok(items) => items
            .iter()
            .map(|item| {
                let level = match item.get("severity").and_then(serde_json::Value::as_u64) {
                    Some(0) => "error",
                    Some(1) => "warning",
                    _ => "info",
                };
                LinterFinding {
                    level: level.to_string(),
                    message: item
                        .get("message")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    rule: item
                        .get("code")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string),
                }
            })
            .collect(),
        Err(_) => stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| LinterFinding {
                level: "info".to_string(),
                message: line.to_string(),
                rule: None,
            })
            .collect(),
    }
}

/// Parse `opa eval --format json` output for a `deny` query. Each string in
/// an expression value is one error; an empty set yields nothing.
pub fn parse_opa_deny(stdout: &str) -> Vec<LinterFinding> {
    let Ok(doc) = serde_json::from_str::<Value>(stdout) else {
        return Vec::new();
    };
    doc.get("result")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|result| result.get("expressions").and_then(Value::as_array))
        .flatten()
        .filter_map(|expr| {
            let rule = expr.get("text").and_then(Value::as_str).map(str::to_string);
            expr.get("value").and_then(Value::as_array).map(|items| (rule, items))
        })
        .flat_map(|(rule, items)| {
            items.iter().map(move |item| LinterFinding {
                level: "error".to_string(),
                message: item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()),
                rule: rule.clone(),
            })
        })
        .collect()
}
