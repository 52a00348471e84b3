//! Mode-model rules a generic schema cannot express.

use crate::error::{Finding, StageResult};
use crate::types::ModeDocument;

/// Check every mode for at most one parameterized `edit` entry, and warn on
/// an `edit` grant that carries no path restriction.
pub fn check(doc: &ModeDocument) -> StageResult {
    let mut result = StageResult::default();

    for mode in &doc.custom_modes {
        let edit_count = mode.edit_restrictions().count();

        if edit_count > 1 {
            result.push(
                Finding::critical(&mode.slug, "Multiple edit entries detected").with_description(
                    format!(
                        "Mode has {} edit entries which can cause capability-matching ambiguity",
                        edit_count
                    ),
                ),
            );
        } else if edit_count == 0 && mode.has_bare_edit() {
            result.push(
                Finding::warning(&mode.slug, "Edit permission without fileRegex")
                    .with_description("Edit group should be restricted with fileRegex"),
            );
        }
    }

    result
}
