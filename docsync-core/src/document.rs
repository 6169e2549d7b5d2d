//! Documents as read from one of the three repositories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two lightweight-markup dialects in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// GitHub-flavoured Markdown, as kept in the public and private repos.
    SourcePlain,
    /// GitBook-flavoured Markdown with `{% ... %}` block directives.
    DocsDialect,
}

impl Dialect {
    pub fn label(self) -> &'static str {
        match self {
            Dialect::SourcePlain => "Markdown",
            Dialect::DocsDialect => "GitBook",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of a dialect conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// GitBook -> Markdown (backward sync).
    ToPlain,
    /// Markdown -> GitBook (forward sync).
    ToDialect,
}

impl Direction {
    pub fn source(self) -> Dialect {
        match self {
            Direction::ToPlain => Dialect::DocsDialect,
            Direction::ToDialect => Dialect::SourcePlain,
        }
    }

    pub fn target(self) -> Dialect {
        match self {
            Direction::ToPlain => Dialect::SourcePlain,
            Direction::ToDialect => Dialect::DocsDialect,
        }
    }
}

/// Raw document content with its dialect and repo-relative path.
///
/// A document is never edited in place; conversion yields a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: String,
    dialect: Dialect,
    content: String,
}

impl Document {
    pub fn new(path: impl Into<String>, dialect: Dialect, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            dialect,
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// First `max_chars` characters, cut on a char boundary.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }

    pub fn into_content(self) -> String {
        self.content
    }
}
