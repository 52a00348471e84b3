//! Companion memory-file naming convention.

use crate::companion::CompanionResolver;
use crate::config::ValidatorConfig;
use crate::error::{FatalError, Finding, StageResult};
use globset::{Glob, GlobMatcher};

/// Compiled naming settings.
#[derive(Clone, Debug)]
pub struct NamingRules {
    memory_glob: GlobMatcher,
    memory_file: String,
    forbidden: Vec<String>,
}

impl NamingRules {
    pub fn new(
        memory_glob: &str,
        memory_file: impl Into<String>,
        forbidden: Vec<String>,
    ) -> Result<Self, FatalError> {
        let glob = Glob::new(memory_glob).map_err(|e| FatalError::Setting {
            name: "memory_glob".to_string(),
            message: e.to_string(),
        })?;
        Ok(NamingRules {
            memory_glob: glob.compile_matcher(),
            memory_file: memory_file.into(),
            forbidden,
        })
    }

    pub fn from_config(config: &ValidatorConfig) -> Result<Self, FatalError> {
        Self::new(
            &config.memory_glob,
            config.memory_file.clone(),
            config.forbidden_memory_names.clone(),
        )
    }

    pub fn memory_file(&self) -> &str {
        &self.memory_file
    }

    fn is_memory_file(&self, name: &str) -> bool {
        self.memory_glob.is_match(name)
    }
}

/// Check each mode's companion directory holds exactly one memory file with
/// the required name and none of the forbidden aliases.
///
/// Without a rules tree there is nothing to check. Modes whose companion
/// directory is missing are left to the protocol stage.
pub fn check<'a, I>(slugs: I, resolver: &dyn CompanionResolver, rules: &NamingRules) -> StageResult
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = StageResult::default();
    if !resolver.tree_exists() {
        return result;
    }

    for slug in slugs {
        let files = match resolver.list(slug) {
            Ok(Some(files)) => files,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(mode = slug, error = %e, "could not list companion directory");
                result.push(Finding::warning(
                    slug,
                    format!(
                        "Could not list companion directory {}: {}",
                        resolver.dir_label(slug),
                        e
                    ),
                ));
                continue;
            }
        };

        let memory_files: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|name| rules.is_memory_file(name))
            .collect();

        match memory_files.as_slice() {
            [] => result.push(Finding::error(
                slug,
                format!(
                    "Missing memory file - must have exactly one file named {}",
                    rules.memory_file
                ),
            )),
            [only] if *only != rules.memory_file => result.push(Finding::error(
                slug,
                format!(
                    "Incorrect memory file name: {} - must be named {}",
                    only, rules.memory_file
                ),
            )),
            [_] => {}
            many => result.push(Finding::error(
                slug,
                format!(
                    "Multiple memory files found: {} - must have exactly one file named {}",
                    many.join(", "),
                    rules.memory_file
                ),
            )),
        }

        for forbidden in &rules.forbidden {
            if files.iter().any(|f| f == forbidden) {
                result.push(Finding::error(
                    slug,
                    format!(
                        "Forbidden memory file name: {} - must use {}",
                        forbidden, rules.memory_file
                    ),
                ));
            }
        }
    }

    result
}
