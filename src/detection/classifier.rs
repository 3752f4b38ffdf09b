//! Decides whether a foreground window looks like a game.
//!
//! Rules are checked in a fixed order and the first match wins:
//! ignored process names, forced process names, then module signatures.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Operator-supplied pattern lists, as stored in config.json.
///
/// Each entry is a case-insensitive regex matched anywhere in the name,
/// so a plain string like `xinput` acts as a substring test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Process names that are never captured (launchers, overlays).
    #[serde(default = "default_ignored_process_patterns")]
    pub ignored_process_patterns: Vec<String>,
    /// Process names that are always captured.
    #[serde(default)]
    pub forced_process_patterns: Vec<String>,
    /// Loaded module names that mark a process as a game.
    #[serde(default = "default_module_signature_patterns")]
    pub module_signature_patterns: Vec<String>,
}

fn default_ignored_process_patterns() -> Vec<String> {
    vec!["steam.exe".to_string()]
}

fn default_module_signature_patterns() -> Vec<String> {
    vec!["xinput".to_string()]
}

impl Default for ClassificationRule {
    fn default() -> Self {
        Self {
            ignored_process_patterns: default_ignored_process_patterns(),
            forced_process_patterns: Vec::new(),
            module_signature_patterns: default_module_signature_patterns(),
        }
    }
}

impl ClassificationRule {
    /// Compiles all pattern lists. Fails on the first invalid pattern.
    pub fn compile(&self) -> Result<Classifier> {
        Ok(Classifier {
            ignored: PatternList::compile(
                "ignored_process_patterns",
                &self.ignored_process_patterns,
            )?,
            forced: PatternList::compile("forced_process_patterns", &self.forced_process_patterns)?,
            module_signatures: PatternList::compile(
                "module_signature_patterns",
                &self.module_signature_patterns,
            )?,
        })
    }
}

#[derive(Clone, Debug)]
struct PatternList(Vec<Regex>);

impl PatternList {
    fn compile(list_name: &str, patterns: &[String]) -> Result<Self> {
        patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("Invalid pattern {:?} in {}", pattern, list_name))
            })
            .collect::<Result<Vec<_>>>()
            .map(PatternList)
    }

    /// Returns the first (candidate, pattern) pair that matches.
    fn find_match<'a>(
        &'a self,
        candidates: &'a BTreeSet<String>,
    ) -> Option<(&'a str, &'a str)> {
        candidates.iter().find_map(|candidate| {
            self.0
                .iter()
                .find(|re| re.is_match(candidate))
                .map(|re| (candidate.as_str(), re.as_str()))
        })
    }
}

/// Compiled form of [`ClassificationRule`].
#[derive(Clone, Debug)]
pub struct Classifier {
    ignored: PatternList,
    forced: PatternList,
    module_signatures: PatternList,
}

/// Which rule produced a verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Ignored { process: String, pattern: String },
    Forced { process: String, pattern: String },
    ModuleSignature { module: String, pattern: String },
    NoMatch,
}

impl Decision {
    pub fn is_game(&self) -> bool {
        matches!(self, Decision::Forced { .. } | Decision::ModuleSignature { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Ignored { process, pattern } => {
                write!(f, "ignored: process {} matches {:?}", process, pattern)
            }
            Decision::Forced { process, pattern } => {
                write!(f, "forced: process {} matches {:?}", process, pattern)
            }
            Decision::ModuleSignature { module, pattern } => {
                write!(f, "game: module {} matches {:?}", module, pattern)
            }
            Decision::NoMatch => write!(f, "no rule matched"),
        }
    }
}

impl Classifier {
    pub fn decide(&self, names: &BTreeSet<String>, modules: &BTreeSet<String>) -> Decision {
        if let Some((process, pattern)) = self.ignored.find_match(names) {
            return Decision::Ignored {
                process: process.to_string(),
                pattern: pattern.to_string(),
            };
        }
        if let Some((process, pattern)) = self.forced.find_match(names) {
            return Decision::Forced {
                process: process.to_string(),
                pattern: pattern.to_string(),
            };
        }
        if let Some((module, pattern)) = self.module_signatures.find_match(modules) {
            return Decision::ModuleSignature {
                module: module.to_string(),
                pattern: pattern.to_string(),
            };
        }
        Decision::NoMatch
    }
}

/// Returns true if the inspected window should be captured.
///
/// The scanner calls `Classifier::decide` directly so it can log the rule.
#[allow(dead_code)]
pub fn classify(
    names: &BTreeSet<String>,
    modules: &BTreeSet<String>,
    rules: &Classifier,
) -> bool {
    rules.decide(names, modules).is_game()
}
