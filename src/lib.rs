//! Validator for `.roomodes` agent-mode configurations.
//!
//! A `.roomodes` file declares a collection of agent modes, each with a
//! capability set and free-form instructions. Modes may restrict the `edit`
//! capability to paths matching a `fileRegex`, and each mode is paired with a
//! companion rules directory. This crate checks the file and its companions
//! through an ordered pipeline:
//!
//! ```text
//! raw text → lexical → decode → schema → structural → naming → protocol → security
//!                                                                      → ValidationReport
//! ```
//!
//! Lexical and decode failures are fatal. Every later stage either passes
//! (possibly with warnings) or stops the run with its errors.
//!
//! # Quick Start
//!
//! ```rust
//! use modeguard::companion::MemoryCompanionResolver;
//!
//! let yaml = "customModes:\n  - slug: reviewer\n    name: Reviewer\n    groups:\n      - read\n";
//! let companions = MemoryCompanionResolver::without_tree();
//!
//! let report = modeguard::validate(yaml, &companions).expect("not fatal");
//! // The reviewer mode lacks the lifecycle markers in its instructions.
//! assert!(!report.passed());
//! ```

pub mod baseline;
pub mod companion;
pub mod config;
pub mod error;
pub mod lexical;
pub mod linters;
pub mod naming;
pub mod parse;
pub mod pipeline;
pub mod project;
pub mod protocol;
pub mod report;
pub mod schema;
pub mod security;
pub mod structure;
pub mod types;

pub use error::*;
pub use types::*;

pub use parse::parse;
pub use pipeline::Pipeline;
pub use report::{Stage, ValidationReport};

/// Convenience entry point: run the default pipeline over `input`.
///
/// Uses the default settings with the bundled schema and security baseline.
///
/// # Errors
///
/// Returns a [`FatalError`] when the text fails the lexical check or is not a
/// single YAML document.
pub fn validate(
    input: &str,
    companions: &dyn companion::CompanionResolver,
) -> Result<ValidationReport, FatalError> {
    Pipeline::builtin(&config::ValidatorConfig::default())?.run(input, companions)
}
