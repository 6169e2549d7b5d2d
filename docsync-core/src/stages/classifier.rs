//! Classifier: decides publish/sync-back eligibility of a newly seen file.

use serde::Deserialize;
use tracing::{info, warn};

use super::{FailurePolicy, StageSettings, FAST_MODEL};
use crate::cache::ClassificationVerdict;
use crate::contract::TextGenerator;
use crate::generation::complete_json;

/// Characters of leading content the classifier sees.
pub const PREVIEW_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = r#"You are a documentation file classifier. Given a file path and a content snippet, determine:

1. **publish**: Should this file be published to the docs site? (true/false)
2. **syncBack**: Should edits to this file in docs sync back to private repos? (true/false)

Classification rules:
- CHANGELOG.md, CHANGES.md, HISTORY.md -> publish: false (auto-generated, not user-facing docs)
- README.md at repo root -> publish: false (repo meta, not product docs)
- LICENSE, CONTRIBUTING, CODE_OF_CONDUCT -> publish: false
- .github/, .ci/, config files -> publish: false
- SDK feature guides (e.g., messages.md, conversations.md) -> publish: true, syncBack: true
- SDK getting started / quickstart -> publish: true, syncBack: true
- API reference docs -> publish: true, syncBack: true
- Internal dev notes, TODOs -> publish: false

Respond in JSON format ONLY:
{
  "publish": true/false,
  "syncBack": true/false,
  "reason": "brief explanation"
}"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    #[serde(default)]
    publish: bool,
    #[serde(default)]
    sync_back: bool,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    pub settings: StageSettings,
    pub on_failure: FailurePolicy,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            settings: StageSettings::new(FAST_MODEL, 256),
            on_failure: FailurePolicy::Open,
        }
    }
}

impl Classifier {
    /// Classify `path` from a short leading excerpt of its content.
    pub async fn classify<G>(&self, generator: &G, path: &str, preview: &str) -> ClassificationVerdict
    where
        G: TextGenerator + ?Sized,
    {
        let user = format!("File: {path}\n\nContent preview:\n{preview}");
        let request = self.settings.request(SYSTEM_PROMPT, user);

        match complete_json::<_, RawVerdict>(generator, request).await {
            Ok(raw) => {
                info!(path, publish = raw.publish, sync_back = raw.sync_back, reason = %raw.reason, "[CLASSIFIER] Classified");
                ClassificationVerdict::new(raw.publish, raw.sync_back, raw.reason)
            }
            Err(e) => {
                warn!(path, error = %e, policy = ?self.on_failure, "[CLASSIFIER] Failed, using fallback verdict");
                fallback(self.on_failure)
            }
        }
    }
}

fn fallback(policy: FailurePolicy) -> ClassificationVerdict {
    match policy {
        FailurePolicy::Open => ClassificationVerdict::new(true, true, "classification failed - fail-open"),
        FailurePolicy::Closed => ClassificationVerdict::new(false, false, "classification failed - fail-closed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockTextGenerator;
    use crate::error::SyncError;

    #[tokio::test]
    async fn test_classify_uses_fast_model_and_parses_verdict() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .withf(|req| req.model == FAST_MODEL && req.max_tokens == 256 && req.user.starts_with("File: a.md"))
            .times(1)
            .returning(|_| Ok(r#"{"publish": true, "syncBack": false, "reason": "guide"}"#.into()));

        let verdict = Classifier::default().classify(&generator, "a.md", "# A").await;
        assert!(verdict.publish);
        assert!(!verdict.sync_back);
        assert_eq!(verdict.reason, "guide");
    }

    #[tokio::test]
    async fn test_transport_failure_follows_policy() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(|_| Err(SyncError::transport("anthropic", Some(500), "boom")));

        let open = Classifier::default().classify(&generator, "a.md", "").await;
        assert!(open.publish && open.sync_back);

        let closed = Classifier {
            on_failure: FailurePolicy::Closed,
            ..Classifier::default()
        }
        .classify(&generator, "a.md", "")
        .await;
        assert!(!closed.publish && !closed.sync_back);
        assert_eq!(closed.reason, "classification failed - fail-closed");
    }
}
