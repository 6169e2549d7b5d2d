//! Validator: check a conversion for lost content or damaged structure.
//!
//! Issues are free-text strings prefixed with a category tag, for example
//! `CONTENT_LOSS: the "Setup" section is missing`. See [`IssueKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use super::{FailurePolicy, StageSettings, LARGE_MODEL};
use crate::contract::TextGenerator;
use crate::document::Direction;
use crate::generation::complete_json;

/// The issue reported when the validator itself could not produce a verdict.
pub const PARSE_ERROR_ISSUE: &str = "PARSE_ERROR: Could not parse validation response";

/// Category tag at the start of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    ContentLoss,
    CodeBlockCorrupted,
    LinkBroken,
    MeaningChanged,
    StructureBroken,
    ParseError,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::ContentLoss,
        IssueKind::CodeBlockCorrupted,
        IssueKind::LinkBroken,
        IssueKind::MeaningChanged,
        IssueKind::StructureBroken,
        IssueKind::ParseError,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            IssueKind::ContentLoss => "CONTENT_LOSS",
            IssueKind::CodeBlockCorrupted => "CODE_BLOCK_CORRUPTED",
            IssueKind::LinkBroken => "LINK_BROKEN",
            IssueKind::MeaningChanged => "MEANING_CHANGED",
            IssueKind::StructureBroken => "STRUCTURE_BROKEN",
            IssueKind::ParseError => "PARSE_ERROR",
        }
    }

    /// Category of an issue string, if it starts with a known tag.
    pub fn of(issue: &str) -> Option<IssueKind> {
        let tag = issue.split(':').next()?.trim();
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl ValidationVerdict {
    fn on_failure(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Closed => Self {
                passed: false,
                issues: vec![PARSE_ERROR_ISSUE.to_string()],
            },
            FailurePolicy::Open => Self {
                passed: true,
                issues: Vec::new(),
            },
        }
    }
}

fn system_prompt(direction: Direction) -> String {
    let (description, guidance) = match direction {
        Direction::ToDialect => (
            "a Markdown-to-GitBook conversion",
            "Since this is a Markdown-to-GitBook conversion:\n\
             - GitBook-specific syntax ({% hint %}, {% tabs %}, {% tab %}, {% embed %}, etc.) being ADDED is expected and correct.\n\
             - Only flag STRUCTURE_BROKEN if actual document structure (headers, lists, paragraphs) was damaged or reordered.",
        ),
        Direction::ToPlain => (
            "a GitBook-to-Markdown conversion",
            "Since this is a GitBook-to-Markdown conversion:\n\
             - GitBook-specific syntax ({% hint %}, {% tabs %}, {% tab %}, {% embed %}, {% include %}, {% file %}, etc.) \
             being REMOVED or converted to standard markdown equivalents (blockquotes, headers, sections) is expected and correct. \
             Do NOT flag this as STRUCTURE_BROKEN.\n\
             - Only flag STRUCTURE_BROKEN if actual document structure (headers, lists, paragraphs) was lost or reordered \
             beyond the expected syntax conversion.",
        ),
    };

    format!(
        "You are a technical documentation QA reviewer. Your task is to validate that {description} was done correctly.\n\n\
         {guidance}\n\n\
         Check for these issues:\n\
         1. CONTENT_LOSS: Important text content from original is missing (not just syntax changes)\n\
         2. CODE_BLOCK_CORRUPTED: Code blocks were modified or corrupted\n\
         3. LINK_BROKEN: Links or images were removed or modified incorrectly\n\
         4. MEANING_CHANGED: The meaning of text was altered\n\
         5. STRUCTURE_BROKEN: Actual document structure (headers, lists, paragraphs) was damaged; \
         NOT format-specific syntax being converted as expected\n\n\
         Respond in JSON format ONLY:\n\
         {{\n  \"passed\": true/false,\n  \"issues\": [\"ISSUE_TYPE: description\", ...]\n}}\n\n\
         If all checks pass, respond with: {{\"passed\": true, \"issues\": []}}"
    )
}

#[derive(Debug, Clone)]
pub struct Validator {
    pub settings: StageSettings,
    pub on_failure: FailurePolicy,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            settings: StageSettings::new(LARGE_MODEL, 4096),
            on_failure: FailurePolicy::Closed,
        }
    }
}

impl Validator {
    pub async fn validate<G>(
        &self,
        generator: &G,
        original: &str,
        converted: &str,
        direction: Direction,
    ) -> ValidationVerdict
    where
        G: TextGenerator + ?Sized,
    {
        let user = format!(
            "Validate this conversion:\n\n\
             === ORIGINAL ({}) ===\n{original}\n\n\
             === CONVERTED ({}) ===\n{converted}\n\n\
             Respond with JSON only.",
            direction.source().label(),
            direction.target().label(),
        );
        let request = self.settings.request(system_prompt(direction), user);

        match complete_json::<_, ValidationVerdict>(generator, request).await {
            Ok(mut verdict) => {
                if verdict.passed {
                    verdict.issues.clear();
                }
                info!(passed = verdict.passed, issues = verdict.issues.len(), "[VALIDATOR] Validated");
                verdict
            }
            Err(e) => {
                warn!(error = %e, policy = ?self.on_failure, "[VALIDATOR] Failed, using fallback verdict");
                ValidationVerdict::on_failure(self.on_failure)
            }
        }
    }
}
