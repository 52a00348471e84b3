use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Finding severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// `Critical` and `Error` fail a stage; `Warning` and `Info` are advisory.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Critical | Severity::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional structured context attached to a [`Finding`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingContext {
    /// Location inside the decoded document, `/`-joined, or `(root)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Candidate file path that triggered the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Offending `fileRegex` source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Forbidden baseline category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One reported validation issue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub issue: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub context: FindingContext,
}

impl Finding {
    pub fn new(mode: Option<&str>, severity: Severity, issue: impl Into<String>) -> Self {
        Finding {
            mode: mode.map(str::to_string),
            issue: issue.into(),
            severity,
            context: FindingContext::default(),
        }
    }

    pub fn critical(mode: &str, issue: impl Into<String>) -> Self {
        Finding::new(Some(mode), Severity::Critical, issue)
    }

    pub fn error(mode: &str, issue: impl Into<String>) -> Self {
        Finding::new(Some(mode), Severity::Error, issue)
    }

    pub fn warning(mode: &str, issue: impl Into<String>) -> Self {
        Finding::new(Some(mode), Severity::Warning, issue)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.context.location = Some(location.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.context.path = Some(path.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.context.pattern = Some(pattern.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.context.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.context.description = Some(description.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.mode, &self.context.location) {
            (Some(mode), _) => write!(f, "{}: {} ({})", mode, self.issue, self.severity)?,
            (None, Some(loc)) => write!(f, "{}: {} ({})", loc, self.issue, self.severity)?,
            (None, None) => write!(f, "{} ({})", self.issue, self.severity)?,
        }
        if let Some(path) = &self.context.path {
            write!(f, " - {}", path)?;
        }
        Ok(())
    }
}

/// Findings produced by one pipeline stage, split by severity class.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl StageResult {
    /// Route a finding into `errors` or `warnings` by its severity.
    pub fn push(&mut self, finding: Finding) {
        if finding.severity.is_error() {
            self.errors.push(finding);
        } else {
            self.warnings.push(finding);
        }
    }

    pub fn extend(&mut self, other: StageResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Error kind for decode failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Empty,
    Syntax,
    MultiDocument,
}

/// Produced by [`crate::parse::parse`] when the raw text is not a single YAML document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "{}:{}: {}", line, col, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Conditions that abort a run before any finding can be reported.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Tabs detected in file. Only spaces are allowed.")]
    Tabs,
    #[error("Indentation not a multiple of {unit} spaces at line {line} (got {found}).")]
    Indentation {
        line: usize,
        found: usize,
        unit: usize,
    },
    #[error("indentation unit must be at least 1 space")]
    InvalidIndentUnit,
    #[error("`{}` does not exist.", .0.display())]
    NotFound(PathBuf),
    #[error("could not read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML decode failed: {0}")]
    Decode(#[from] ParseError),
    #[error("invalid schema `{origin}`: {message}")]
    Schema { origin: String, message: String },
    #[error("invalid security baseline `{origin}`: {message}")]
    Baseline { origin: String, message: String },
    #[error("invalid validator config `{}`: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("invalid setting `{name}`: {message}")]
    Setting { name: String, message: String },
    #[error("Could not find project root containing `{marker}` by walking upward from {}.", start.display())]
    ProjectRootNotFound { start: PathBuf, marker: String },
}

/// Exit status when no project root could be located.
pub const EXIT_ROOT_NOT_FOUND: i32 = 3;
/// Exit status for any other fatal condition.
pub const EXIT_FATAL: i32 = 4;

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::ProjectRootNotFound { .. } => EXIT_ROOT_NOT_FOUND,
            _ => EXIT_FATAL,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FatalError::NotFound(path)
        } else {
            FatalError::Io { path, source }
        }
    }
}
