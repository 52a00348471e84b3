//! Schema conformance stage.
//!
//! Validates the decoded tree against a draft 2020-12 JSON Schema, adds the
//! slug uniqueness rule the schema language cannot express, and sorts the
//! findings by (location, message) so output is stable across runs.

use crate::error::{FatalError, Finding, Severity, StageResult};
use crate::types::{MODES_KEY, ModeDocument};
use jsonschema::Draft;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// File name looked up in the tools directory.
pub const SCHEMA_FILE_NAME: &str = "roomodes.schema.json";

/// Location marker for violations at the top of the document.
pub const ROOT_LOCATION: &str = "(root)";

const BUILTIN_SCHEMA: &str = include_str!("../assets/roomodes.schema.json");

/// One step of a location path. Indices order before keys, and numerically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Index(usize),
    Key(String),
}

impl Segment {
    fn as_string(&self) -> String {
        match self {
            Segment::Index(i) => i.to_string(),
            Segment::Key(k) => k.clone(),
        }
    }
}

/// Compiled mode-collection schema.
pub struct ModeSchema {
    validator: jsonschema::Validator,
    origin: String,
}

impl std::fmt::Debug for ModeSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSchema").field("origin", &self.origin).finish()
    }
}

impl ModeSchema {
    pub fn new(schema: &Value, origin: &str) -> Result<Self, FatalError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|e| FatalError::Schema {
                origin: origin.to_string(),
                message: e.to_string(),
            })?;
        Ok(ModeSchema {
            validator,
            origin: origin.to_string(),
        })
    }

    pub fn from_json_str(s: &str, origin: &str) -> Result<Self, FatalError> {
        let schema: Value = serde_json::from_str(s).map_err(|e| FatalError::Schema {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::new(&schema, origin)
    }

    pub fn load_from(path: &Path) -> Result<Self, FatalError> {
        let s = std::fs::read_to_string(path).map_err(|e| FatalError::io(path, e))?;
        Self::from_json_str(&s, &path.display().to_string())
    }

    /// The schema shipped with the crate.
    pub fn builtin() -> Result<Self, FatalError> {
        Self::from_json_str(BUILTIN_SCHEMA, "<builtin>")
    }

    /// Load `explicit` if given, else `<tools_dir>/roomodes.schema.json` if it
    /// exists, else the builtin schema.
    pub fn discover(tools_dir: &Path, explicit: Option<&Path>) -> Result<Self, FatalError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let conventional = tools_dir.join(SCHEMA_FILE_NAME);
        if conventional.is_file() {
            tracing::debug!(path = %conventional.display(), "loading mode schema");
            Self::load_from(&conventional)
        } else {
            tracing::debug!("using builtin mode schema");
            Self::builtin()
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Collect every schema violation plus duplicate slugs, sorted.
    pub fn check(&self, doc: &Value) -> StageResult {
        let mut keyed: Vec<(Vec<Segment>, Finding)> = self
            .validator
            .iter_errors(doc)
            .map(|err| {
                let segments = pointer_segments(&err.instance_path.to_string());
                let finding = Finding::new(None, Severity::Error, err.to_string())
                    .with_location(render_location(&segments));
                (segments, finding)
            })
            .collect();

        keyed.extend(duplicate_slugs(doc));
        keyed.sort_by(|(a_loc, a), (b_loc, b)| a_loc.cmp(b_loc).then_with(|| a.issue.cmp(&b.issue)));

        let mut result = StageResult::default();
        for (_, finding) in keyed {
            result.push(finding);
        }
        result
    }
}

/// Convert a schema-valid tree into the typed model.
///
/// A failure here means the schema is looser than the model; it is reported
/// as a single schema finding at the root.
pub fn decode(doc: Value) -> Result<ModeDocument, Finding> {
    serde_json::from_value(doc).map_err(|e| {
        Finding::new(None, Severity::Error, format!("document does not match the mode model: {}", e))
            .with_location(ROOT_LOCATION)
    })
}

fn duplicate_slugs(doc: &Value) -> Vec<(Vec<Segment>, Finding)> {
    let Some(modes) = doc.get(MODES_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::new();
    for (i, mode) in modes.iter().enumerate() {
        let Some(slug) = mode.get("slug").and_then(Value::as_str) else {
            continue;
        };
        match first_seen.get(slug) {
            Some(&first) => {
                let segments = vec![
                    Segment::Key(MODES_KEY.to_string()),
                    Segment::Index(i),
                    Segment::Key("slug".to_string()),
                ];
                let finding = Finding::new(
                    None,
                    Severity::Error,
                    format!(
                        "duplicate slug \"{}\" (first declared at {}/{})",
                        slug, MODES_KEY, first
                    ),
                )
                .with_location(render_location(&segments));
                out.push((segments, finding));
            }
            None => {
                first_seen.insert(slug, i);
            }
        }
    }
    out
}

/// Split a JSON pointer (`/customModes/0/slug`) into unescaped segments.
fn pointer_segments(pointer: &str) -> Vec<Segment> {
    pointer
        .split('/')
        .skip(1)
        .map(|raw| {
            let key = raw.replace("~1", "/").replace("~0", "~");
            match key.parse::<usize>() {
                Ok(i) => Segment::Index(i),
                Err(_) => Segment::Key(key),
            }
        })
        .collect()
}

fn render_location(segments: &[Segment]) -> String {
    if segments.is_empty() {
        ROOT_LOCATION.to_string()
    } else {
        segments
            .iter()
            .map(Segment::as_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}
