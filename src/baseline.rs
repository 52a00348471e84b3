//! Forbidden path categories used by the security stage.

use crate::error::FatalError;
use regex::Regex;
use serde_json::Value;
use std::path::Path;

/// File name looked up in the tools directory.
pub const BASELINE_FILE_NAME: &str = "security_baseline.json";

const BUILTIN_BASELINE: &str = include_str!("../assets/security_baseline.json");

/// One named category of paths no mode may edit.
#[derive(Clone, Debug)]
pub struct ForbiddenCategory {
    pub name: String,
    pub pattern: String,
    regex: Regex,
}

impl ForbiddenCategory {
    /// Category name with a trailing `_files` removed (`auth_files` → `auth`).
    pub fn stem(&self) -> &str {
        self.name.strip_suffix("_files").unwrap_or(&self.name)
    }

    /// True if the category regex finds a match anywhere in `path`.
    pub fn covers(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Immutable mapping from category name to path regex, in file order.
#[derive(Clone, Debug)]
pub struct SecurityBaseline {
    categories: Vec<ForbiddenCategory>,
}

impl SecurityBaseline {
    /// Parse `{"forbidden_patterns": {"<name>": "<regex>", ...}}`.
    pub fn from_json_str(s: &str, origin: &str) -> Result<Self, FatalError> {
        let invalid = |message: String| FatalError::Baseline {
            origin: origin.to_string(),
            message,
        };

        let value: Value = serde_json::from_str(s).map_err(|e| invalid(e.to_string()))?;
        let patterns = value
            .get("forbidden_patterns")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("missing object field 'forbidden_patterns'".to_string()))?;

        let pairs = patterns
            .iter()
            .map(|(name, pattern)| match pattern.as_str() {
                Some(p) => Ok((name.clone(), p.to_string())),
                None => Err(invalid(format!("pattern for '{}' must be a string", name))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_pairs(pairs, origin)
    }

    pub fn from_pairs<I, N, P>(pairs: I, origin: &str) -> Result<Self, FatalError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut categories = Vec::new();
        for (name, pattern) in pairs {
            let name = name.into();
            let pattern = pattern.into();
            let regex = Regex::new(&pattern).map_err(|e| FatalError::Baseline {
                origin: origin.to_string(),
                message: format!("category '{}': {}", name, e),
            })?;
            categories.push(ForbiddenCategory {
                name,
                pattern,
                regex,
            });
        }
        Ok(SecurityBaseline { categories })
    }

    pub fn load_from(path: &Path) -> Result<Self, FatalError> {
        let s = std::fs::read_to_string(path).map_err(|e| FatalError::io(path, e))?;
        Self::from_json_str(&s, &path.display().to_string())
    }

    /// The baseline shipped with the crate.
    pub fn builtin() -> Result<Self, FatalError> {
        Self::from_json_str(BUILTIN_BASELINE, "<builtin>")
    }

    /// Load `explicit` if given, else `<tools_dir>/security_baseline.json` if
    /// it exists, else the builtin baseline.
    pub fn discover(tools_dir: &Path, explicit: Option<&Path>) -> Result<Self, FatalError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let conventional = tools_dir.join(BASELINE_FILE_NAME);
        if conventional.is_file() {
            tracing::debug!(path = %conventional.display(), "loading security baseline");
            Self::load_from(&conventional)
        } else {
            tracing::debug!("using builtin security baseline");
            Self::builtin()
        }
    }

    pub fn categories(&self) -> &[ForbiddenCategory] {
        &self.categories
    }

    /// First category whose regex covers `path`.
    pub fn classify(&self, path: &str) -> Option<&ForbiddenCategory> {
        self.categories.iter().find(|c| c.covers(path))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
