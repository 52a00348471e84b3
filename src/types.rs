use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Capability name that grants file edits.
pub const EDIT: &str = "edit";

/// Top-level key holding the mode collection.
pub const MODES_KEY: &str = "customModes";

// ─── Document ───────────────────────────────────────────────────────────────

/// The decoded configuration: an ordered collection of modes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeDocument {
    #[serde(rename = "customModes")]
    pub custom_modes: Vec<Mode>,
}

impl ModeDocument {
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.custom_modes.iter().map(|m| m.slug.as_str())
    }
}

// ─── Mode ───────────────────────────────────────────────────────────────────

/// A named operational profile with restricted capabilities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mode {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub groups: Vec<CapabilityGroup>,
    #[serde(default)]
    pub custom_instructions: String,
}

impl Mode {
    /// Parameterized `edit` entries, in declaration order.
    pub fn edit_restrictions(&self) -> impl Iterator<Item = &GroupOptions> {
        self.groups.iter().filter_map(|g| match g {
            CapabilityGroup::Parameterized { name, options } if name == EDIT => Some(options),
            _ => None,
        })
    }

    /// True when a bare `edit` capability (no options) is granted.
    pub fn has_bare_edit(&self) -> bool {
        self.groups
            .iter()
            .any(|g| matches!(g, CapabilityGroup::Simple(name) if name == EDIT))
    }
}

// ─── CapabilityGroup ────────────────────────────────────────────────────────

/// One permission grant on a mode.
///
/// In YAML a grant is either a bare capability name (`- read`) or a
/// two-element sequence of name and options (`- [edit, {fileRegex: ...}]`).
#[derive(Clone, Debug, PartialEq)]
pub enum CapabilityGroup {
    Simple(String),
    Parameterized { name: String, options: GroupOptions },
}

impl CapabilityGroup {
    pub fn name(&self) -> &str {
        match self {
            CapabilityGroup::Simple(name) => name,
            CapabilityGroup::Parameterized { name, .. } => name,
        }
    }

    pub fn options(&self) -> Option<&GroupOptions> {
        match self {
            CapabilityGroup::Simple(_) => None,
            CapabilityGroup::Parameterized { options, .. } => Some(options),
        }
    }
}

impl Serialize for CapabilityGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;
        match self {
            CapabilityGroup::Simple(name) => serializer.serialize_str(name),
            CapabilityGroup::Parameterized { name, options } => {
                let mut tup = serializer.serialize_tuple(2)?;
                tup.serialize_element(name)?;
                tup.serialize_element(options)?;
                tup.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for CapabilityGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(name) => Ok(CapabilityGroup::Simple(name)),
            Value::Array(mut items) => {
                if items.len() != 2 {
                    return Err(serde::de::Error::custom(format!(
                        "capability entry must be [name, options], got {} elements",
                        items.len()
                    )));
                }
                let options = items.pop().unwrap_or(Value::Null);
                let name = match items.pop() {
                    Some(Value::String(name)) => name,
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "capability name must be a string, got {}",
                            other.unwrap_or(Value::Null)
                        )));
                    }
                };
                if !options.is_object() {
                    return Err(serde::de::Error::custom(format!(
                        "options for capability '{}' must be a mapping",
                        name
                    )));
                }
                let options: GroupOptions =
                    serde_json::from_value(options).map_err(serde::de::Error::custom)?;
                Ok(CapabilityGroup::Parameterized { name, options })
            }
            other => Err(serde::de::Error::custom(format!(
                "capability entry must be a string or [name, options], got {}",
                other
            ))),
        }
    }
}

/// Configuration map of a parameterized capability.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOptions {
    #[serde(rename = "fileRegex", default, skip_serializing_if = "Option::is_none")]
    pub file_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
