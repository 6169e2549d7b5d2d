//! Converter: rewrite a document from one dialect into the other.
//!
//! Toward the docs dialect an existing target document may be supplied as a
//! structural reference; the model is told to keep the block directives the
//! reference already uses and not to invent new ones. The retry variant
//! receives the failed attempt and the validator's issues and re-supplies
//! the same reference.
//!
//! Failures are never swallowed here.

use tracing::info;

use super::{StageSettings, LARGE_MODEL};
use crate::contract::TextGenerator;
use crate::document::Direction;
use crate::error::Result;

pub const MARKDOWN_STYLE_GUIDE: &str = "
Markdown Style Guide (follow this for all output):
- # (H1): Page title only
- ## (H2): Major sections
- ### (H3): Subsections
- #### (H4): Detailed breakdowns (use sparingly). Do NOT use H5 or H6.
- Backticks for: code elements, property/method names, file names, values (true, false, null)
- Bold for: UI text displayed to users, dashboard paths, product names in UI context, important terms on first use
- Bold+Code (**`term`**) for highlighting specific code terms in sentences
- Italic: use rarely, only for subtle emphasis
- Fenced code blocks with language identifier (kotlin, swift, javascript, json, xml, bash, etc.)
- Single line break between paragraphs, double line break before/after code blocks
- Horizontal rules (---) are used as section dividers between major sections; preserve them exactly where they appear
";

/// Hint style, plain-Markdown prefix, emoji.
pub const CALLOUT_TABLE: [(&str, &str, &str); 4] = [
    ("info", "Note", "\u{2139}\u{FE0F}"),
    ("warning", "Warning", "\u{26A0}\u{FE0F}"),
    ("danger", "Danger", "\u{1F6A8}"),
    ("success", "Tip", "\u{2705}"),
];

fn to_plain_rules() -> String {
    let mut rules = String::from(
        "Conversion rules:\n\
         1. Remove GitBook-specific syntax while preserving the content meaning\n\
         2. Convert GitBook hints to appropriate markdown:\n",
    );
    for (style, prefix, emoji) in CALLOUT_TABLE {
        rules.push_str(&format!(
            "   - {{% hint style=\"{style}\" %}} -> > **{prefix}:** or > {emoji}\n"
        ));
    }
    rules.push_str(
        "3. Convert {% tabs %}/{% tab %} blocks: remove the tab syntax and keep each tab's inner content as-is. \
         If the heading hierarchy allows (max H4), use the tab title as a subheading one level below the parent. \
         Otherwise, use **bold text** as a visual separator for each tab section. \
         Do NOT duplicate or summarize tab content; just unwrap it.\n\
         4. Remove {% include %}, {% file %}, {% embed %} tags completely\n\
         5. Preserve all code blocks exactly as they are\n\
         6. Preserve all links and images exactly as they are\n\
         7. Preserve the document structure (headers, lists, horizontal rules/dividers, etc.)\n\
         8. Do NOT add any explanations - output ONLY the converted markdown",
    );
    rules
}

fn to_dialect_rules(with_reference: bool) -> String {
    let mut rules = String::from("Rules:\n1. Convert note/warning/tip blockquotes to GitBook hints:\n");
    for (style, prefix, emoji) in CALLOUT_TABLE {
        rules.push_str(&format!(
            "   - > **{prefix}:** or > {emoji} -> {{% hint style=\"{style}\" %}}...{{% endhint %}}\n"
        ));
    }
    rules.push_str(
        "2. Regular blockquotes (without Note/Warning/Tip prefix) should remain as blockquotes\n\
         3. Preserve all code blocks exactly as they are\n\
         4. Preserve all links and images exactly as they are\n\
         5. Preserve the document structure (headers, lists, etc.)\n\
         6. Do NOT add any explanations - output ONLY the converted markdown\n\
         7. If there's nothing to convert, return the original content as-is",
    );
    if with_reference {
        rules.push_str(
            "\n8. A REFERENCE GitBook file is provided. Preserve ALL GitBook-specific syntax ({% ... %} tags) \
             from the reference where the content maps to the same sections. Use the reference to determine \
             which sections should use which GitBook syntax. Common GitBook patterns include but are not limited to: \
             hints, tabs, includes, embeds, files, code wrappers, and content-refs. \
             Do NOT invent new GitBook syntax that doesn't exist in the reference.",
        );
    }
    rules
}

fn system_prompt(direction: Direction, task: &str, with_reference: bool) -> String {
    match direction {
        Direction::ToPlain => format!(
            "You are a technical documentation converter. Your task is to {task}.\n\n{MARKDOWN_STYLE_GUIDE}\n{}",
            to_plain_rules()
        ),
        Direction::ToDialect => format!(
            "You are a technical documentation converter. Your task is to {task}.\n\n\
             The input markdown follows this style guide; understand it to produce accurate GitBook output:\n\
             {MARKDOWN_STYLE_GUIDE}\n{}",
            to_dialect_rules(with_reference)
        ),
    }
}

fn convert_task(direction: Direction) -> &'static str {
    match direction {
        Direction::ToPlain => "convert GitBook-flavored markdown to pure GitHub-flavored markdown",
        Direction::ToDialect => "convert pure GitHub-flavored markdown to GitBook-flavored markdown",
    }
}

fn retry_task(direction: Direction) -> &'static str {
    match direction {
        Direction::ToPlain => "fix a GitBook-to-Markdown conversion that failed quality validation",
        Direction::ToDialect => "fix a Markdown-to-GitBook conversion that failed quality validation",
    }
}

#[derive(Debug, Clone)]
pub struct Converter {
    pub settings: StageSettings,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            settings: StageSettings::new(LARGE_MODEL, 8192),
        }
    }
}

impl Converter {
    /// Convert `content` in `direction`. `reference` is only used toward the docs dialect.
    pub async fn convert<G>(
        &self,
        generator: &G,
        content: &str,
        direction: Direction,
        reference: Option<&str>,
    ) -> Result<String>
    where
        G: TextGenerator + ?Sized,
    {
        let reference = reference_for(direction, reference);
        let system = system_prompt(direction, convert_task(direction), reference.is_some());
        let user = match (direction, reference) {
            (Direction::ToPlain, _) => format!(
                "Convert this GitBook markdown to pure GitHub-flavored markdown:\n\n---\n{content}\n---\n\n\
                 Output ONLY the converted markdown, nothing else."
            ),
            (Direction::ToDialect, Some(reference)) => format!(
                "Convert this GitHub-flavored markdown to GitBook-flavored markdown, using the reference file \
                 to preserve GitBook structures:\n\n\
                 === NEW CONTENT (Markdown) ===\n{content}\n\n\
                 === REFERENCE (existing GitBook file) ===\n{reference}\n\n\
                 Output ONLY the converted markdown, nothing else."
            ),
            (Direction::ToDialect, None) => format!(
                "Convert this GitHub-flavored markdown to GitBook-flavored markdown:\n\n---\n{content}\n---\n\n\
                 Output ONLY the converted markdown, nothing else."
            ),
        };

        info!(?direction, model = %self.settings.model, "[CONVERTER] Converting");
        generator.complete(self.settings.request(system, user)).await
    }

    /// Produce a corrected attempt addressing exactly `issues`.
    pub async fn retry<G>(
        &self,
        generator: &G,
        original: &str,
        previous_attempt: &str,
        issues: &[String],
        direction: Direction,
        reference: Option<&str>,
    ) -> Result<String>
    where
        G: TextGenerator + ?Sized,
    {
        let reference = reference_for(direction, reference);
        let system = system_prompt(direction, retry_task(direction), reference.is_some());
        let source_label = direction.source().label();

        let mut user = String::from("A previous conversion attempt had these validation issues:\n");
        for issue in issues {
            user.push_str(&format!("- {issue}\n"));
        }
        user.push_str(&format!(
            "\n=== ORIGINAL ({source_label}) ===\n{original}\n\n\
             === PREVIOUS ATTEMPT (failed validation) ===\n{previous_attempt}"
        ));
        if let Some(reference) = reference {
            user.push_str(&format!("\n\n=== REFERENCE (existing GitBook file) ===\n{reference}"));
        }
        user.push_str(match direction {
            Direction::ToPlain => "\n\nFix the issues listed above and output ONLY the corrected markdown, nothing else.",
            Direction::ToDialect => {
                "\n\nFix the issues listed above and output ONLY the corrected GitBook markdown, nothing else."
            }
        });

        info!(?direction, issues = issues.len(), "[CONVERTER] Retrying with validation feedback");
        generator.complete(self.settings.request(system, user)).await
    }
}

fn reference_for(direction: Direction, reference: Option<&str>) -> Option<&str> {
    match direction {
        Direction::ToDialect => reference.filter(|r| !r.trim().is_empty()),
        Direction::ToPlain => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_rule_only_when_reference_given() {
        let with = system_prompt(Direction::ToDialect, convert_task(Direction::ToDialect), true);
        let without = system_prompt(Direction::ToDialect, convert_task(Direction::ToDialect), false);
        assert!(with.contains("A REFERENCE GitBook file is provided"));
        assert!(!without.contains("A REFERENCE GitBook file is provided"));
    }

    #[test]
    fn to_plain_prompt_lists_every_callout() {
        let prompt = system_prompt(Direction::ToPlain, convert_task(Direction::ToPlain), false);
        for (style, prefix, _) in CALLOUT_TABLE {
            assert!(prompt.contains(&format!("{{% hint style=\"{style}\" %}}")));
            assert!(prompt.contains(&format!("**{prefix}:**")));
        }
        assert!(prompt.contains("Do NOT duplicate or summarize tab content"));
    }

    #[test]
    fn reference_is_ignored_toward_plain() {
        assert_eq!(reference_for(Direction::ToPlain, Some("{% hint %}")), None);
        assert_eq!(reference_for(Direction::ToDialect, Some("  \n")), None);
        assert_eq!(reference_for(Direction::ToDialect, Some("ref")), Some("ref"));
    }
}
