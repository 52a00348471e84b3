//! Raw-text formatting checks that run before YAML decoding.
//!
//! Indentation drift can silently change how a YAML document nests, so these
//! checks reject the input outright instead of reporting findings.

use crate::error::FatalError;

/// Default indentation unit, in spaces.
pub const DEFAULT_INDENT: usize = 2;

/// Reject tab characters anywhere, and any non-blank line whose leading
/// space count is not a multiple of `indent`.
pub fn check_formatting(raw: &str, indent: usize) -> Result<(), FatalError> {
    if indent == 0 {
        return Err(FatalError::InvalidIndentUnit);
    }
    if raw.contains('\t') {
        return Err(FatalError::Tabs);
    }

    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let leading = line.bytes().take_while(|&b| b == b' ').count();
        if leading % indent != 0 {
            return Err(FatalError::Indentation {
                line: i + 1,
                found: leading,
                unit: indent,
            });
        }
    }
    Ok(())
}
