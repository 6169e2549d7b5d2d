//! LLM-backed pipeline stages.
//!
//! Each stage turns a prompt into a typed verdict through a
//! [`TextGenerator`]. The verdict stages ([`Classifier`], [`Comparator`],
//! [`Validator`]) never return errors: on transport or parse failure they
//! fall back to a fixed verdict chosen by their [`FailurePolicy`]. The
//! [`Converter`] propagates failures so the orchestrator can decide.

pub mod classifier;
pub mod comparator;
pub mod converter;
pub mod validator;

pub use classifier::Classifier;
pub use comparator::{Comparator, ComparisonVerdict};
pub use converter::Converter;
pub use validator::{IssueKind, ValidationVerdict, Validator};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contract::{GenerationRequest, TextGenerator};
use crate::document::{Direction, Document};
use crate::error::Result;

/// Small, fast model used for coarse verdicts.
pub const FAST_MODEL: &str = "claude-haiku-4-5-20251001";
/// Large model used for conversion and validation.
pub const LARGE_MODEL: &str = "claude-sonnet-4-20250514";

/// Default number of convert/validate rounds, first attempt included.
pub const DEFAULT_CONVERSION_ATTEMPTS: u32 = 2;

/// What a verdict stage returns when it cannot reach a verdict.
///
/// `Open` picks the permissive outcome (keep processing), `Closed` the
/// restrictive one (abstain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Open,
    Closed,
}

/// Model and output budget for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    pub model: String,
    pub max_tokens: u32,
}

impl StageSettings {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
        }
    }

    pub(crate) fn request(&self, system: impl Into<String>, user: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            system: system.into(),
            user: user.into(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

/// Outcome of [`Stages::convert_and_validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// The last converted attempt.
    pub content: Document,
    pub validation_passed: bool,
    /// Issues reported for the last attempt; empty when it passed.
    pub issues: Vec<String>,
    pub attempts: u32,
}

/// The four stages configured for one run.
#[derive(Debug, Clone)]
pub struct Stages {
    pub classifier: Classifier,
    pub comparator: Comparator,
    pub converter: Converter,
    pub validator: Validator,
    /// Convert/validate rounds per file, at least one.
    pub conversion_attempts: u32,
}

impl Default for Stages {
    fn default() -> Self {
        Self {
            classifier: Classifier::default(),
            comparator: Comparator::default(),
            converter: Converter::default(),
            validator: Validator::default(),
            conversion_attempts: DEFAULT_CONVERSION_ATTEMPTS,
        }
    }
}

impl Stages {
    /// Convert `source`, validate the result, and retry with the validator's
    /// issues while attempts remain.
    ///
    /// Converter failures propagate. A validation failure is not an error:
    /// it comes back as `validation_passed == false` with the issues of the
    /// final attempt.
    pub async fn convert_and_validate<G>(
        &self,
        generator: &G,
        source: &Document,
        target_path: &str,
        direction: Direction,
        reference: Option<&str>,
    ) -> Result<ConversionResult>
    where
        G: TextGenerator + ?Sized,
    {
        let attempts = self.conversion_attempts.max(1);
        if reference.is_some() {
            info!(path = %source.path(), "[CONVERTER] Using existing target as structural reference");
        }

        let mut converted = self
            .converter
            .convert(generator, source.content(), direction, reference)
            .await?;
        let mut verdict = self
            .validator
            .validate(generator, source.content(), &converted, direction)
            .await;
        let mut attempt = 1;

        while !verdict.passed && attempt < attempts {
            warn!(
                path = %source.path(),
                attempt,
                issues = ?verdict.issues,
                "[CONVERTER] Validation failed, retrying with feedback"
            );
            converted = self
                .converter
                .retry(generator, source.content(), &converted, &verdict.issues, direction, reference)
                .await?;
            verdict = self
                .validator
                .validate(generator, source.content(), &converted, direction)
                .await;
            attempt += 1;
        }

        if verdict.passed {
            info!(path = %source.path(), attempts = attempt, "[VALIDATOR] Validation passed");
        } else {
            warn!(path = %source.path(), attempts = attempt, issues = ?verdict.issues, "[VALIDATOR] Validation failed");
        }

        Ok(ConversionResult {
            content: Document::new(target_path, direction.target(), converted),
            validation_passed: verdict.passed,
            issues: if verdict.passed { Vec::new() } else { verdict.issues },
            attempts: attempt,
        })
    }
}
