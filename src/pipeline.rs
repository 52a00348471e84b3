//! Ordered validation pipeline.
//!
//! ```text
//! raw text → lexical → decode → schema → structural → naming → protocol → security
//! ```
//!
//! Lexical and decode failures abort the run with a [`FatalError`]. Every
//! later stage produces a [`StageResult`]; the first one carrying errors ends
//! the run and no later stage executes.

use crate::baseline::SecurityBaseline;
use crate::companion::CompanionResolver;
use crate::config::ValidatorConfig;
use crate::error::{FatalError, StageResult};
use crate::naming::NamingRules;
use crate::protocol::ProtocolRules;
use crate::report::{Stage, ValidationReport};
use crate::schema::ModeSchema;
use crate::security::SecurityRules;
use crate::types::ModeDocument;
use crate::{lexical, naming, parse, protocol, schema, security, structure};
use std::path::Path;

/// Compiled inputs for every stage. Build once, run many times.
#[derive(Debug)]
pub struct Pipeline {
    indent: usize,
    schema: ModeSchema,
    baseline: SecurityBaseline,
    naming: NamingRules,
    protocol: ProtocolRules,
    security: SecurityRules,
}

impl Pipeline {
    pub fn new(
        config: &ValidatorConfig,
        schema: ModeSchema,
        baseline: SecurityBaseline,
    ) -> Result<Self, FatalError> {
        if config.indent == 0 {
            return Err(FatalError::InvalidIndentUnit);
        }
        Ok(Pipeline {
            indent: config.indent,
            schema,
            baseline,
            naming: NamingRules::from_config(config)?,
            protocol: ProtocolRules::from_config(config),
            security: SecurityRules::from_config(config),
        })
    }

    /// Pipeline over the bundled schema and baseline.
    pub fn builtin(config: &ValidatorConfig) -> Result<Self, FatalError> {
        Self::new(config, ModeSchema::builtin()?, SecurityBaseline::builtin()?)
    }

    pub fn schema(&self) -> &ModeSchema {
        &self.schema
    }

    pub fn baseline(&self) -> &SecurityBaseline {
        &self.baseline
    }

    /// Validate raw text. The same input and companion state always yields
    /// the same report.
    pub fn run(
        &self,
        raw: &str,
        companions: &dyn CompanionResolver,
    ) -> Result<ValidationReport, FatalError> {
        let mut report = ValidationReport::default();

        lexical::check_formatting(raw, self.indent)?;
        report.mark_run(Stage::Lexical);

        let value = parse::parse(raw)?;
        report.mark_run(Stage::Decode);

        let mut schema_result = self.schema.check(&value);
        let mut doc = None;
        if !schema_result.has_errors() {
            // A schema looser than the typed model surfaces here.
            match schema::decode(value) {
                Ok(decoded) => doc = Some(decoded),
                Err(finding) => schema_result.push(finding),
            }
        }
        if !report.absorb(Stage::Schema, schema_result) {
            log_failure(&report);
            return Ok(report);
        }
        let Some(doc) = doc else {
            return Ok(report);
        };
        tracing::debug!(modes = doc.custom_modes.len(), "decoded mode document");

        for stage in [Stage::Structural, Stage::Naming, Stage::Protocol, Stage::Security] {
            let result = self.run_stage(stage, &doc, companions);
            tracing::debug!(
                stage = %stage,
                errors = result.errors.len(),
                warnings = result.warnings.len(),
                "stage complete"
            );
            if !report.absorb(stage, result) {
                log_failure(&report);
                return Ok(report);
            }
        }

        tracing::info!(warnings = report.warnings.len(), "validation passed");
        Ok(report)
    }

    /// Read and validate `path`, recording it as the report target.
    pub fn run_file(
        &self,
        path: &Path,
        companions: &dyn CompanionResolver,
    ) -> Result<ValidationReport, FatalError> {
        let raw = parse::read_text(path)?;
        let mut report = self.run(&raw, companions)?;
        report.target = Some(path.display().to_string());
        Ok(report)
    }

    fn run_stage(
        &self,
        stage: Stage,
        doc: &ModeDocument,
        companions: &dyn CompanionResolver,
    ) -> StageResult {
        match stage {
            Stage::Structural => structure::check(doc),
            Stage::Naming => naming::check(doc.slugs(), companions, &self.naming),
            Stage::Protocol => protocol::check(doc, companions, &self.protocol),
            Stage::Security => security::check(doc, &self.baseline, &self.security),
            Stage::Lexical | Stage::Decode | Stage::Schema => StageResult::default(),
        }
    }
}

fn log_failure(report: &ValidationReport) {
    if let Some(stage) = report.failed_stage() {
        tracing::info!(stage = %stage, errors = report.errors.len(), "validation failed");
    }
}
