//! Comparator: are two documents, possibly in different dialects, the same content?

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{FailurePolicy, StageSettings, FAST_MODEL};
use crate::contract::TextGenerator;
use crate::generation::complete_json;

const SYSTEM_PROMPT: &str = r#"You are a technical documentation comparator. Given two versions of the same document (possibly in different formats: one may use GitBook syntax, the other plain Markdown), determine if they have the same **content**.

Ignore these differences (they are NOT real changes):
- GitBook syntax tags: {% hint %}, {% tabs %}, {% tab %}, {% endhint %}, {% endtab %}, {% endtabs %}
- Hint/callout format differences: {% hint style="info" %} vs > **Note:**
- Heading level differences (## vs ###)
- Whitespace, blank lines, trailing spaces
- Markdown formatting differences (bold syntax, list markers - vs *)
- Code fence language label differences (e.g., ```kotlin vs ```java only if same code)
- HTML tags used for formatting (<br />, <div>, <figure>, etc.)
- Link format differences (relative vs absolute paths to same target)

Flag these as REAL changes:
- Added, removed, or reworded paragraphs
- Changed code examples (different code content, not just formatting)
- Added or removed sections
- Changed parameter names, types, or descriptions
- Changed step-by-step instructions
- Different default values or configuration options

Respond in JSON format ONLY:
{
  "identical": true/false,
  "reason": "brief explanation of what differs (or 'content is identical')"
}"#;

/// Ephemeral per-run comparison result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    #[serde(default)]
    pub identical: bool,
    #[serde(default)]
    pub reason: String,
}

impl ComparisonVerdict {
    fn on_failure(policy: FailurePolicy) -> Self {
        match policy {
            FailurePolicy::Open => Self {
                identical: false,
                reason: "comparison failed - fail-open (treating as different)".into(),
            },
            FailurePolicy::Closed => Self {
                identical: true,
                reason: "comparison failed - fail-closed (treating as identical)".into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Comparator {
    pub settings: StageSettings,
    pub on_failure: FailurePolicy,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            settings: StageSettings::new(FAST_MODEL, 512),
            on_failure: FailurePolicy::Open,
        }
    }
}

impl Comparator {
    pub async fn compare<G>(
        &self,
        generator: &G,
        content_a: &str,
        content_b: &str,
        label_a: &str,
        label_b: &str,
    ) -> ComparisonVerdict
    where
        G: TextGenerator + ?Sized,
    {
        let user = format!(
            "Compare these two documents for content differences:\n\n\
             === {label_a} ===\n{content_a}\n\n\
             === {label_b} ===\n{content_b}\n\n\
             Are they the same content (ignoring format/syntax differences)?"
        );
        let request = self.settings.request(SYSTEM_PROMPT, user);

        match complete_json::<_, ComparisonVerdict>(generator, request).await {
            Ok(verdict) => {
                info!(identical = verdict.identical, reason = %verdict.reason, "[COMPARATOR] Compared");
                verdict
            }
            Err(e) => {
                warn!(error = %e, policy = ?self.on_failure, "[COMPARATOR] Failed, using fallback verdict");
                ComparisonVerdict::on_failure(self.on_failure)
            }
        }
    }
}
