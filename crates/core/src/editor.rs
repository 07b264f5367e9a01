//! Marker-driven content editor
//!
//! A single Solidity template carries every optional feature, each guarded by
//! marker comments. The editor removes or rewrites the guarded regions so the
//! same template can produce many feature-disabled variants:
//!
//! * `@<pattern>` removes the line that carries it ([`EditMode::Line`])
//! * `@start_<pattern>` .. `@end_<pattern>` removes the inclusive range ([`EditMode::Range`])
//! * `@start_replace_<pattern>` .. `@end_replace_<pattern>` rewrites every
//!   occurrence of the token declared by `_<pattern>[<token>]` ([`EditMode::Replace`])
//!
//! Missing or unbalanced markers are never an error: the edit degrades to a
//! no-op for that pattern, so callers can chain edits for features a template
//! does not use.

use std::fmt;
use std::str::FromStr;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Error, Result};

/// Marker patterns used by the bundled contract templates
pub const DEFAULT_MARKER_PATTERNS: &[&str] = &[
    "pause",
    "supplyCap",
    "adminTransfer",
    "adminBurn",
    "burn",
    "mint",
    "decimals",
    "selfBurn",
];

/// Prefixes a marker may carry in front of its pattern
const MARKER_PREFIXES: &[&str] = &["", "start_", "end_", "start_replace_", "end_replace_"];

/// Which marker algorithm an edit runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EditMode {
    /// Remove single lines tagged `@<pattern>`
    Line,
    /// Remove inclusive `@start_<pattern>` .. `@end_<pattern>` ranges
    Range,
    /// Rewrite a declared token inside `@start_replace_<pattern>` .. `@end_replace_<pattern>`
    Replace,
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Line => write!(f, "LINE"),
            EditMode::Range => write!(f, "RANGE"),
            EditMode::Replace => write!(f, "REPLACE"),
        }
    }
}

impl FromStr for EditMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LINE" => Ok(EditMode::Line),
            "RANGE" => Ok(EditMode::Range),
            "REPLACE" => Ok(EditMode::Replace),
            _ => Err(Error::invalid_argument(format!(
                "unknown edit mode '{}', expected one of LINE, RANGE, REPLACE",
                s
            ))),
        }
    }
}

/// How a marker is located inside a line
///
/// `Substring` is plain substring search: `@mint` also matches `@mintable`.
/// `Boundary` additionally requires that the marker is not followed by an
/// identifier character, so overlapping pattern names stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerMatching {
    #[default]
    Substring,
    Boundary,
}

impl MarkerMatching {
    /// Whether `line` carries `marker` under this matching rule
    pub fn matches(self, line: &str, marker: &str) -> bool {
        match self {
            MarkerMatching::Substring => line.contains(marker),
            MarkerMatching::Boundary => line.match_indices(marker).any(|(index, found)| {
                line[index + found.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !is_identifier_char(c))
            }),
        }
    }
}

impl FromStr for MarkerMatching {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "substring" => Ok(MarkerMatching::Substring),
            "boundary" => Ok(MarkerMatching::Boundary),
            _ => Err(Error::invalid_argument(format!(
                "unknown marker matching '{}', expected substring or boundary",
                s
            ))),
        }
    }
}

impl fmt::Display for MarkerMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerMatching::Substring => write!(f, "substring"),
            MarkerMatching::Boundary => write!(f, "boundary"),
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// One edit in a chain of edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditStep {
    pub mode: EditMode,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl EditStep {
    pub fn new(mode: EditMode, pattern: impl Into<String>) -> Self {
        Self {
            mode,
            pattern: pattern.into(),
            replacement: None,
        }
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }
}

/// State of a REPLACE walk
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplaceState {
    Idle,
    InRange { token: Option<String> },
}

/// Applies marker edits to template text
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentEditor {
    matching: MarkerMatching,
}

impl ContentEditor {
    pub fn new(matching: MarkerMatching) -> Self {
        Self { matching }
    }

    pub fn matching(&self) -> MarkerMatching {
        self.matching
    }

    /// Edit `content` for one `(mode, pattern)` pair.
    ///
    /// `replacement` is only read in [`EditMode::Replace`] and defaults to the
    /// empty string. Fails only when `pattern` is empty.
    pub fn edit(
        &self,
        content: &str,
        mode: EditMode,
        pattern: &str,
        replacement: Option<&str>,
    ) -> Result<String> {
        if pattern.is_empty() {
            return Err(Error::invalid_argument("edit pattern must not be empty"));
        }

        trace!(%mode, pattern, matching = %self.matching, "applying content edit");

        let edited = match mode {
            EditMode::Line => self.remove_lines(content, pattern),
            EditMode::Range => self.remove_ranges(content, pattern),
            EditMode::Replace => self.replace_tokens(content, pattern, replacement.unwrap_or("")),
        };
        Ok(edited)
    }

    /// Apply a single [`EditStep`]
    pub fn apply(&self, content: &str, step: &EditStep) -> Result<String> {
        self.edit(content, step.mode, &step.pattern, step.replacement.as_deref())
    }

    /// Apply `steps` in order, feeding each result into the next edit
    pub fn apply_all<'a, I>(&self, content: &str, steps: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a EditStep>,
    {
        steps
            .into_iter()
            .try_fold(content.to_string(), |acc, step| self.apply(&acc, step))
    }

    fn remove_lines(&self, content: &str, pattern: &str) -> String {
        let marker = format!("@{}", pattern);
        content
            .split('\n')
            .filter(|line| !self.matching.matches(line, &marker))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn remove_ranges(&self, content: &str, pattern: &str) -> String {
        let start = format!("@start_{}", pattern);
        let end = format!("@end_{}", pattern);

        let lines: Vec<&str> = content.split('\n').collect();
        let mut removed = vec![false; lines.len()];
        let mut open: Vec<usize> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if self.matching.matches(line, &start) {
                open.push(index);
            }
            if self.matching.matches(line, &end) {
                // an end without a pending start closes nothing
                if let Some(first) = open.pop() {
                    removed[first..=index].fill(true);
                }
            }
        }

        lines
            .iter()
            .zip(removed)
            .filter_map(|(line, gone)| (!gone).then_some(*line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn replace_tokens(&self, content: &str, pattern: &str, replacement: &str) -> String {
        let start = format!("@start_replace_{}", pattern);
        let end = format!("@end_replace_{}", pattern);
        let declaration = format!("_{}[", pattern);

        let mut state = ReplaceState::Idle;
        let mut edited = Vec::new();

        for line in content.split('\n') {
            if state == ReplaceState::Idle && self.matching.matches(line, &start) {
                state = ReplaceState::InRange { token: None };
            }

            let emitted = match &mut state {
                ReplaceState::Idle => line.to_string(),
                ReplaceState::InRange { token } => {
                    let mut current = line.to_string();
                    if let Some(group) = BracketGroup::declared_in(line, &declaration) {
                        // the declaring `[token]` group is consumed with the token
                        *token = (!group.inner.is_empty()).then(|| group.inner.to_string());
                        current = format!("{}{}", &line[..group.open], &line[group.close + 1..]);
                    }
                    match token.as_deref() {
                        Some(token) => current.replace(token, replacement),
                        None => current,
                    }
                }
            };
            edited.push(emitted);

            if self.matching.matches(line, &end) {
                state = ReplaceState::Idle;
            }
        }

        edited.join("\n")
    }
}

/// The `[...]` pair opened by a `_<pattern>[` declaration
struct BracketGroup<'a> {
    open: usize,
    close: usize,
    inner: &'a str,
}

impl<'a> BracketGroup<'a> {
    /// `declaration` ends with the opening `[`
    fn declared_in(line: &'a str, declaration: &str) -> Option<Self> {
        let open = line.find(declaration)? + declaration.len() - 1;
        let close = open + 1 + line[open + 1..].find(']')?;
        Some(Self {
            open,
            close,
            inner: &line[open + 1..close],
        })
    }
}

/// Edit with the default (substring) marker matching
pub fn edit(content: &str, mode: EditMode, pattern: &str, replacement: Option<&str>) -> Result<String> {
    ContentEditor::default().edit(content, mode, pattern, replacement)
}

/// Edit with a mode given by name; an unknown mode name fails fast
pub fn edit_with_mode_name(
    content: &str,
    mode: &str,
    pattern: &str,
    replacement: Option<&str>,
) -> Result<String> {
    let mode = mode.parse::<EditMode>()?;
    edit(content, mode, pattern, replacement)
}

/// Strip leftover marker comments for `patterns`.
///
/// Removes `// @<prefix><pattern>` (any marker prefix, case-insensitive,
/// word-bounded) together with a directly attached `[...]` group. A line that
/// held nothing but marker comments is dropped; any other touched line loses
/// the trailing whitespace the removal left behind.
pub fn clean(content: &str, patterns: &[&str]) -> Result<String> {
    if patterns.is_empty() {
        return Ok(content.to_string());
    }

    let words: Vec<String> = MARKER_PREFIXES
        .iter()
        .flat_map(|prefix| {
            patterns
                .iter()
                .map(move |pattern| regex::escape(&format!("{}{}", prefix, pattern)))
        })
        .collect();
    let marker = RegexBuilder::new(&format!(r"//\s*@\b(?:{})\b(?:\[[^\]]*\])?", words.join("|")))
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::generic(format!("Failed to build marker expression: {}", e)))?;

    let mut cleaned = Vec::new();
    for line in content.split('\n') {
        if !marker.is_match(line) {
            cleaned.push(line.to_string());
            continue;
        }
        let stripped = marker.replace_all(line, "");
        let stripped = stripped.trim_end();
        if !stripped.trim().is_empty() {
            cleaned.push(stripped.to_string());
        }
    }
    Ok(cleaned.join("\n"))
}
