//! Mapping resolver: translate a path between the public, docs and private namespaces.
//!
//! A [`MappingTable`] holds three tiers of rules, consulted strictly in this order:
//!
//! 1. `overrides`: exact docs path -> counterpart paths (highest precedence)
//! 2. `patterns`: ordered prefix rewrites, first match wins
//! 3. `mappings`: legacy exact docs path -> counterpart paths
//!
//! Every rule names its endpoint in each namespace it participates in, so
//! the same rule serves forward (public -> docs), backward (docs -> private)
//! and inverse (docs -> public) lookups. A rule without an endpoint in a
//! namespace simply does not take part in lookups touching that namespace.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// The three path namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Public,
    Docs,
    Private,
}

/// Owner/repo/default-branch of a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// A repository resolved from the table, keyed by its table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub key: String,
    pub owner: String,
    pub repo: String,
    pub default_branch: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// An exact-path rule: used for both `overrides` and legacy `mappings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactRule {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub private_path: Option<String>,
    #[serde(default, rename = "publicAgentPath")]
    pub public_path: Option<String>,
}

/// A prefix-rewrite rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    pub docs_prefix: String,
    #[serde(default)]
    pub public_base: Option<String>,
    #[serde(default)]
    pub private_base: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
}

impl PatternRule {
    fn endpoint(&self, ns: Namespace) -> Option<&str> {
        match ns {
            Namespace::Docs => Some(self.docs_prefix.as_str()),
            Namespace::Public => self.public_base.as_deref(),
            Namespace::Private => self.private_base.as_deref(),
        }
    }
}

impl ExactRule {
    fn endpoint<'a>(&'a self, docs_path: &'a str, ns: Namespace) -> Option<&'a str> {
        match ns {
            Namespace::Docs => Some(docs_path),
            Namespace::Public => self.public_path.as_deref(),
            Namespace::Private => self.private_path.as_deref(),
        }
    }
}

/// Which rule tier produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Override,
    Pattern,
    Legacy,
}

/// A resolved correspondence between a path in one namespace and another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub source_path: String,
    pub target_path: String,
    /// Owning repository of the target; always set when the target namespace is private.
    pub repository: Option<RepoRef>,
    pub tier: Tier,
}

/// The static rule set, as read from the mapping configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default, deserialize_with = "without_annotations")]
    pub repositories: BTreeMap<String, RepositoryInfo>,
    #[serde(default, deserialize_with = "without_annotations")]
    pub overrides: BTreeMap<String, ExactRule>,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default, deserialize_with = "without_annotations")]
    pub mappings: BTreeMap<String, ExactRule>,
}

/// Deserialize a JSON object into a typed map, skipping `$`-prefixed annotation keys
/// such as `$comment`.
fn without_annotations<'de, D, V>(deserializer: D) -> std::result::Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: DeserializeOwned,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    raw.into_iter()
        .filter(|(key, _)| !key.starts_with('$'))
        .map(|(key, value)| {
            serde_json::from_value(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| serde::de::Error::custom(format!("entry {key:?}: {e}")))
        })
        .collect()
}

impl MappingTable {
    /// Parse a mapping table from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::Mapping(e.to_string()))
    }

    /// Read and parse a mapping table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let table = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            repositories = table.repositories.len(),
            overrides = table.overrides.len(),
            patterns = table.patterns.len(),
            legacy = table.mappings.len(),
            "Loaded mapping table"
        );
        Ok(table)
    }

    /// Resolve `path` from namespace `from` to namespace `to`.
    ///
    /// Returns `None` when no tier has a rule connecting the two namespaces
    /// for this path. Rules targeting the private namespace must name a
    /// repository present in `repositories`; rules that don't are skipped.
    pub fn resolve(&self, path: &str, from: Namespace, to: Namespace) -> Option<Mapping> {
        let found = self
            .resolve_override(path, from, to)
            .or_else(|| self.resolve_pattern(path, from, to))
            .or_else(|| self.resolve_legacy(path, from, to));
        match &found {
            Some(m) => debug!(path, ?from, ?to, target = %m.target_path, tier = ?m.tier, "Resolved mapping"),
            None => debug!(path, ?from, ?to, "No mapping"),
        }
        found
    }

    /// Public path -> docs path.
    pub fn resolve_forward(&self, public_path: &str) -> Option<Mapping> {
        self.resolve(public_path, Namespace::Public, Namespace::Docs)
    }

    /// Docs path -> private path and repository.
    pub fn resolve_backward(&self, docs_path: &str) -> Option<Mapping> {
        self.resolve(docs_path, Namespace::Docs, Namespace::Private)
    }

    /// Docs path -> public path, used to key the classification cache.
    pub fn resolve_inverse(&self, docs_path: &str) -> Option<Mapping> {
        self.resolve(docs_path, Namespace::Docs, Namespace::Public)
    }

    fn resolve_override(&self, path: &str, from: Namespace, to: Namespace) -> Option<Mapping> {
        let hit = if from == Namespace::Docs {
            self.overrides.get_key_value(path)
        } else {
            self.overrides
                .iter()
                .find(|(docs, rule)| rule.endpoint(docs, from) == Some(path))
        };
        let (docs, rule) = hit?;
        self.exact_mapping(path, docs, rule, to, Tier::Override)
    }

    fn resolve_legacy(&self, path: &str, from: Namespace, to: Namespace) -> Option<Mapping> {
        let hit = if from == Namespace::Docs {
            self.mappings.get_key_value(path)
        } else {
            self.mappings
                .iter()
                .find(|(docs, rule)| rule.endpoint(docs, from) == Some(path))
        };
        let (docs, rule) = hit?;
        self.exact_mapping(path, docs, rule, to, Tier::Legacy)
    }

    fn exact_mapping(
        &self,
        path: &str,
        docs: &str,
        rule: &ExactRule,
        to: Namespace,
        tier: Tier,
    ) -> Option<Mapping> {
        let target = rule.endpoint(docs, to)?;
        let repository = self.repository_for(rule.repo.as_deref(), to)?;
        Some(Mapping {
            source_path: path.to_string(),
            target_path: target.to_string(),
            repository,
            tier,
        })
    }

    fn resolve_pattern(&self, path: &str, from: Namespace, to: Namespace) -> Option<Mapping> {
        for pattern in &self.patterns {
            let (Some(from_base), Some(to_base)) = (pattern.endpoint(from), pattern.endpoint(to)) else {
                continue;
            };
            let Some(rest) = path.strip_prefix(from_base) else {
                continue;
            };
            let Some(repository) = self.repository_for(pattern.repo.as_deref(), to) else {
                continue;
            };
            return Some(Mapping {
                source_path: path.to_string(),
                target_path: format!("{to_base}{rest}"),
                repository,
                tier: Tier::Pattern,
            });
        }
        None
    }

    /// Outer `None`: the rule is unusable for `to`. Inner `None`: no repository needed.
    fn repository_for(&self, key: Option<&str>, to: Namespace) -> Option<Option<RepoRef>> {
        if to != Namespace::Private {
            return Some(None);
        }
        let key = key?;
        match self.repositories.get(key) {
            Some(info) => Some(Some(RepoRef {
                key: key.to_string(),
                owner: info.owner.clone(),
                repo: info.repo.clone(),
                default_branch: info.default_branch.clone(),
            })),
            None => {
                warn!(repo = key, "Mapping rule names an unknown repository, skipping rule");
                None
            }
        }
    }
}
