//! Security baseline enforcement for `edit` path restrictions.
//!
//! Each parameterized `edit` entry's `fileRegex` is probed with concrete
//! candidate paths synthesized from the baseline categories. The probe is a
//! black box: it never inspects the regex structure, so it can miss unsafe
//! patterns, but its answer is deterministic.

use crate::baseline::SecurityBaseline;
use crate::config::{CATEGORY_PLACEHOLDER, ValidatorConfig};
use crate::error::{Finding, StageResult};
use crate::types::{Mode, ModeDocument};
use fancy_regex::Regex;

pub const NEGATIVE_LOOKAHEAD_ONLY: &str = "Negative lookahead - use positive allowlist";
pub const UNANCHORED_WILDCARD: &str = "Unanchored wildcard - add ^ and $";

/// Candidate path sources for the probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityRules {
    /// Path shapes containing `{category}`, rendered once per category.
    pub probe_templates: Vec<String>,
    /// Concrete paths, attributed to the first category that covers them.
    pub probe_paths: Vec<String>,
}

impl SecurityRules {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        SecurityRules {
            probe_templates: config.probe_templates.clone(),
            probe_paths: config.probe_paths.clone(),
        }
    }

    /// Render every template for one category stem, in template order.
    pub fn candidate_paths(&self, stem: &str) -> Vec<String> {
        self.probe_templates
            .iter()
            .map(|t| t.replace(CATEGORY_PLACEHOLDER, stem))
            .collect()
    }
}

pub fn check(doc: &ModeDocument, baseline: &SecurityBaseline, rules: &SecurityRules) -> StageResult {
    let mut result = StageResult::default();
    for mode in &doc.custom_modes {
        check_mode(mode, baseline, rules, &mut result);
    }
    result
}

fn check_mode(mode: &Mode, baseline: &SecurityBaseline, rules: &SecurityRules, result: &mut StageResult) {
    let slug = mode.slug.as_str();

    for options in mode.edit_restrictions() {
        let source = options.file_regex.as_deref().unwrap_or("");

        for issue in ineffective_constructs(source) {
            result.push(Finding::warning(slug, issue).with_pattern(source));
        }

        // Lookaround is valid in `fileRegex`, so the backtracking engine compiles it.
        let regex = match Regex::new(source) {
            Ok(regex) => regex,
            Err(e) => {
                result.push(
                    Finding::error(slug, "Invalid fileRegex")
                        .with_pattern(source)
                        .with_description(e.to_string()),
                );
                continue;
            }
        };

        for category in baseline.categories() {
            for path in rules.candidate_paths(category.stem()) {
                if matches_from_start(&regex, &path) {
                    result.push(forbidden_access(slug, &category.name, path, source));
                }
            }
        }

        for path in &rules.probe_paths {
            if !matches_from_start(&regex, path) {
                continue;
            }
            if let Some(category) = baseline.classify(path) {
                result.push(forbidden_access(slug, &category.name, path.clone(), source));
            }
        }
    }
}

fn forbidden_access(slug: &str, category: &str, path: String, source: &str) -> Finding {
    Finding::error(slug, format!("Can access forbidden {}", category))
        .with_path(path)
        .with_pattern(source)
        .with_category(category)
}

/// True if `regex` matches a prefix of `path`.
///
/// A leftmost search returns a match at offset 0 whenever one exists, so
/// checking the start offset is equivalent to an anchored match. A search
/// that exceeds the backtrack limit counts as no match.
pub fn matches_from_start(regex: &Regex, path: &str) -> bool {
    match regex.find(path) {
        Ok(found) => found.is_some_and(|m| m.start() == 0),
        Err(e) => {
            tracing::warn!(pattern = regex.as_str(), path, error = %e, "fileRegex search aborted");
            false
        }
    }
}

/// Known-fragile constructs in a regex source, as advisory issue texts.
pub fn ineffective_constructs(source: &str) -> Vec<&'static str> {
    let mut issues = Vec::new();
    if source.contains("(?!") && lacks_positive_content(source) {
        issues.push(NEGATIVE_LOOKAHEAD_ONLY);
    }
    if has_unanchored_wildcard(source) {
        issues.push(UNANCHORED_WILDCARD);
    }
    issues
}

/// Nothing but anchors, wildcards, and lookaround groups remains once those
/// are stripped.
fn lacks_positive_content(source: &str) -> bool {
    let stripped = strip_lookarounds(source);
    let mut chars = stripped.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '^' | '$' => {}
            '.' => {
                if matches!(chars.peek(), Some('*' | '+' | '?')) {
                    chars.next();
                }
            }
            '(' | ')' => {}
            _ => return false,
        }
    }
    true
}

/// Remove `(?=…)`, `(?!…)`, `(?<=…)`, `(?<!…)` groups, honouring nesting
/// and escapes.
fn strip_lookarounds(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            out.push(chars[i]);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }
        if chars[i] == '(' && is_lookaround_open(&chars[i..]) {
            i = skip_group(&chars, i);
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn is_lookaround_open(rest: &[char]) -> bool {
    matches!(
        rest,
        ['(', '?', '=' | '!', ..] | ['(', '?', '<', '=' | '!', ..]
    )
}

/// Index just past the group opened at `start`.
fn skip_group(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

/// An unescaped `.*` outside character classes and lookaround groups, in a
/// pattern that is not terminated by an unescaped `$`.
fn has_unanchored_wildcard(source: &str) -> bool {
    let stripped = strip_lookarounds(source);
    let chars: Vec<char> = stripped.chars().collect();
    let mut in_class = false;
    let mut wildcard = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '.' if !in_class && chars.get(i + 1) == Some(&'*') => wildcard = true,
            _ => {}
        }
        i += 1;
    }
    wildcard && !is_end_anchored(&stripped)
}

fn is_end_anchored(source: &str) -> bool {
    let trimmed = source.trim_end_matches(')');
    match trimmed.strip_suffix('$') {
        Some(rest) => {
            let escapes = rest.chars().rev().take_while(|&c| c == '\\').count();
            escapes % 2 == 0
        }
        None => false,
    }
}
