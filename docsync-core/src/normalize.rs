//! Dialect normalizer: reduce a document in either dialect to comparable plain text.
//!
//! The normalizer is an ordered list of [`Rule`]s, each a regex plus a
//! replacement strategy, grouped into [`Stage`]s that run in a fixed
//! sequence. Later stages assume the syntax handled by earlier ones is
//! already gone:
//!
//! 1. [`Stage::DialectBlock`]: unwrap `{% hint %}`, `{% tabs %}`, `{% tab %}`,
//!    `{% if %}` and `{% code %}` blocks, keeping their inner text.
//! 2. [`Stage::DialectEmbed`]: delete `{% include %}`, `{% file %}`, `{% embed %}`
//!    and `{% content-ref %}` including any body.
//! 3. [`Stage::DialectCatchAll`]: delete any remaining `{% ... %}` tag.
//! 4. [`Stage::Html`]: strip `<img>`, `<a>`, `<figure>`, `<figcaption>` and friends,
//!    keeping alt text and anchor text.
//! 5. [`Stage::Markdown`]: strip headings, emphasis, code, links, images, lists,
//!    quotes, rules and table syntax. Fenced code is dropped with its content.
//! 6. [`Stage::Callout`]: strip callout emoji and line-leading `Note:`-style
//!    labels. Labels are capitalised and need the colon, so prose starting
//!    with "Note the limit" or "Warning signs" survives.
//!
//! Whitespace is then collapsed. The whole pipeline is repeated until the
//! output stops changing, so `normalize(normalize(x)) == normalize(x)`.
//!
//! New dialect syntax is supported by appending a rule to the right stage;
//! the position of existing rules never has to change.
//!
//! Case is preserved on purpose: only syntax and whitespace are erased.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Pipeline stage a rule belongs to. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    DialectBlock,
    DialectEmbed,
    DialectCatchAll,
    Html,
    Markdown,
    Callout,
}

/// What to put in place of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Keep the first capture group, drop the surrounding markup.
    Unwrap,
    /// Drop the whole match.
    Delete,
    /// Replace the match with a fixed string.
    Replace(&'static str),
}

/// A single normalization rule.
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub stage: Stage,
    pub strategy: Strategy,
    pattern: Regex,
}

impl Rule {
    fn new(name: &'static str, stage: Stage, strategy: Strategy, pattern: &str) -> Self {
        Self {
            name,
            stage,
            strategy,
            pattern: Regex::new(pattern).expect("normalization rule pattern is valid"),
        }
    }

    /// Apply this rule alone to `text`.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match self.strategy {
            Strategy::Unwrap => self.pattern.replace_all(text, "${1}"),
            Strategy::Delete => self.pattern.replace_all(text, ""),
            Strategy::Replace(with) => self.pattern.replace_all(text, with),
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use Stage::*;
    use Strategy::*;
    vec![
        // 1. block directives wrapping inline content
        Rule::new("hint", DialectBlock, Unwrap,
            r#"(?s)\{%\s*hint\s+style="[^"]*"\s*%\}(.*?)\{%\s*endhint\s*%\}"#),
        Rule::new("tabs", DialectBlock, Unwrap,
            r"(?s)\{%\s*tabs\s*%\}(.*?)\{%\s*endtabs\s*%\}"),
        Rule::new("tab", DialectBlock, Unwrap,
            r#"(?s)\{%\s*tab\s+title="[^"]*"\s*%\}(.*?)\{%\s*endtab\s*%\}"#),
        Rule::new("conditional", DialectBlock, Unwrap,
            r"(?s)\{%\s*if\s+[^%]*%\}(.*?)\{%\s*endif\s*%\}"),
        Rule::new("code-wrapper", DialectBlock, Unwrap,
            r"(?s)\{%\s*code\b[^%]*%\}(.*?)\{%\s*endcode\s*%\}"),
        // 2. directives without inline text
        Rule::new("include", DialectEmbed, Delete,
            r#"\{%\s*include\s+"[^"]*"\s*%\}"#),
        Rule::new("file", DialectEmbed, Delete,
            r#"(?s)\{%\s*file\s+src="[^"]*"\s*%\}.*?\{%\s*endfile\s*%\}"#),
        Rule::new("embed", DialectEmbed, Delete,
            r#"\{%\s*embed\s+url="[^"]*"\s*%\}"#),
        Rule::new("content-ref", DialectEmbed, Delete,
            r"(?s)\{%\s*content-ref[^%]*%\}.*?\{%\s*endcontent-ref\s*%\}"),
        // 3. anything left in {% %}
        Rule::new("dialect-tag", DialectCatchAll, Delete, r"\{%[^%]*%\}"),
        // 4. html
        Rule::new("img-alt", Html, Unwrap, r#"(?i)<img\s[^>]*?alt="([^"]*)"[^>]*/?>"#),
        Rule::new("img", Html, Delete, r"(?i)<img[^>]*/?>"),
        Rule::new("anchor", Html, Unwrap, r"(?is)<a\s[^>]*>(.*?)</a>"),
        Rule::new("figcaption", Html, Delete, r"(?is)<figcaption[^>]*>.*?</figcaption>"),
        Rule::new("html-tag", Html, Delete, r"<[^>]+>"),
        // 5. markdown
        Rule::new("code-block", Markdown, Delete, r"(?s)```.*?```"),
        Rule::new("horizontal-rule", Markdown, Delete, r"(?m)^[ \t]*(?:[-*_][ \t]*){3,}$"),
        Rule::new("heading", Markdown, Delete, r"(?m)^[ \t]*#{1,6}[ \t]+"),
        Rule::new("blockquote", Markdown, Delete, r"(?m)^[ \t]*(?:>[ \t]*)+"),
        Rule::new("bullet", Markdown, Delete, r"(?m)^[ \t]*[-*+][ \t]+"),
        Rule::new("numbered", Markdown, Delete, r"(?m)^[ \t]*\d+\.[ \t]+"),
        Rule::new("bold", Markdown, Unwrap, r"\*\*(.*?)\*\*"),
        Rule::new("bold-underscore", Markdown, Unwrap, r"__(.*?)__"),
        Rule::new("italic", Markdown, Unwrap, r"\*([^*_\n]+)\*"),
        Rule::new("italic-underscore", Markdown, Unwrap, r"_([^*_\n]+)_"),
        Rule::new("inline-code", Markdown, Unwrap, r"`([^`]+)`"),
        // images first: ![alt](url) contains [alt](url)
        Rule::new("image", Markdown, Unwrap, r"!\[([^\]]*)\]\([^)]*\)"),
        Rule::new("link", Markdown, Unwrap, r"\[([^\]]+)\]\([^)]*\)"),
        Rule::new("table-delimiter", Markdown, Delete,
            r"(?m)^[ \t]*\|?(?:[ \t]*:?-+:?[ \t]*\|)+(?:[ \t]*:?-+:?[ \t]*)?$"),
        Rule::new("table-pipe", Markdown, Replace(" "), r"\|"),
        // 6. plain-text callouts
        Rule::new("callout-emoji", Callout, Delete, r"[\x{2139}\x{26A0}\x{1F6A8}\x{2705}\x{FE0F}]"),
        Rule::new("callout-prefix", Callout, Delete,
            r"(?m)^[ \t]*(?:Note|Warning|Danger|Tip|Info)[ \t]*:[ \t]*"),
    ]
});

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank-run pattern is valid"));

/// All rules in evaluation order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Look up a rule by name.
pub fn rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.name == name)
}

/// Normalize `text` to comparable plain text. Total and deterministic.
///
/// Passes repeat until the output stops changing. A pass that changes its
/// input either shortens it or turns a `|` into a space, so the loop ends.
pub fn normalize(text: &str) -> String {
    let mut current = single_pass(text);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// True when two documents differ only in syntax the normalizer erases.
pub fn equivalent(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn single_pass(text: &str) -> String {
    let mut result = text.to_string();
    for rule in RULES.iter() {
        if let Cow::Owned(replaced) = rule.apply(&result) {
            result = replaced;
        }
    }
    collapse_whitespace(&result)
}

/// Trim every line, squeeze runs of blank lines to one, trim the result.
pub fn collapse_whitespace(text: &str) -> String {
    let trimmed_lines = text.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_RUNS
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
